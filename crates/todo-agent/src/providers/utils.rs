use anyhow::{anyhow, Result};
use regex::Regex;
use reqwest::{Response, StatusCode};
use serde_json::Value;
use std::sync::OnceLock;

/// Turn a provider HTTP response into its JSON body, or an error carrying the status
pub async fn handle_response(payload: &Value, response: Response) -> Result<Value> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::debug!(%status, %payload, "provider rejected request");
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        Err(anyhow!("Server error: {} {}", status, body))
    } else {
        Err(anyhow!("Request failed: {} - {}", status, body))
    }
}

/// Text sent to the model in place of a tool call whose request could not be parsed
pub fn unparsed_request_notice(id: &str, result: &str) -> String {
    format!("Tool call {} was not executed: {}", id, result)
}

fn invalid_name_chars() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]").ok()).as_ref()
}

/// Function names accepted by the chat APIs: `[a-zA-Z0-9_-]+`
pub fn sanitize_function_name(name: &str) -> String {
    match invalid_name_chars() {
        Some(re) => re.replace_all(name, "_").into_owned(),
        None => name.to_string(),
    }
}

pub fn is_valid_function_name(name: &str) -> bool {
    !name.is_empty() && invalid_name_chars().map_or(true, |re| !re.is_match(name))
}
