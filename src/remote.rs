//! Shared plumbing for the remote HTTP collaborators.

use reqwest::{Client, Response};
use std::time::Duration;

use crate::config::EndpointsConfig;
use crate::error::{Result, SimilarError};

/// Build the HTTP client used for every upstream call.
pub fn build_http_client(endpoints: &EndpointsConfig) -> Result<Client> {
    let client = Client::builder()
        .timeout(Duration::from_secs(endpoints.timeout_secs))
        .user_agent(endpoints.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Substitute the form-encoded `arg` for `$1` in a URL template.
pub fn fill_url_template(template: &str, arg: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(arg.as_bytes()).collect();
    template.replace("$1", &encoded)
}

/// Turn a non-success response into an error of the caller's `kind`, carrying the body.
pub async fn ensure_success(
    response: Response,
    what: &str,
    kind: fn(String) -> SimilarError,
) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());
    Err(kind(format!("{} returned {}: {}", what, status, body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_url_template_encodes() {
        let url = fill_url_template("https://example.org/sparql?query=$1", "SELECT ?item WHERE {}");
        assert_eq!(
            url,
            "https://example.org/sparql?query=SELECT+%3Fitem+WHERE+%7B%7D"
        );
    }

    #[test]
    fn test_fill_url_template_path_segment() {
        let url = fill_url_template("https://example.org/EntityData/$1.json", "Q42");
        assert_eq!(url, "https://example.org/EntityData/Q42.json");
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&EndpointsConfig::default()).is_ok());
    }
}
