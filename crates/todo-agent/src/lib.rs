pub mod agent;
pub mod bridge;
pub mod configuration;
pub mod conversation;
pub mod errors;
pub mod invoker;
pub mod models;
pub mod providers;
pub mod registry;
pub mod todo;
