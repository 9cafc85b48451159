//! Tools backed by the todo management REST service.
//!
//! [`client::TodoClient`] speaks HTTP to the service, [`format`] renders its
//! records for the model, and [`tools`] exposes each endpoint as a registered tool.

pub mod client;
pub mod format;
pub mod tools;

pub use client::{Priority, Todo, TodoApiError, TodoClient, TodoList};
pub use tools::register_todo_tools;
