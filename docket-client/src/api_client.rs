//! HTTP transport for the back-office REST API.

use async_trait::async_trait;
use docket_core::{ApiError, ConfigError, DocketResult};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::config::ClientConfig;

const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    fn to_reqwest(self) -> reqwest::Method {
        match self {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Sends one request and returns the decoded JSON body.
///
/// Empty bodies (including `204 No Content`) come back as `Value::Null`.
#[async_trait]
pub trait ApiTransport: Send + Sync + 'static {
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> DocketResult<Value>;
}

#[derive(Clone)]
pub struct RestClient {
    client: reqwest::Client,
    base_url: String,
    headers: HeaderMap,
}

impl RestClient {
    pub fn new(config: &ClientConfig) -> DocketResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::InvalidRequest {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim().trim_end_matches('/').to_string(),
            headers: build_headers(config)?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn parse_response(&self, url: &str, response: reqwest::Response) -> DocketResult<Value> {
        let status = response.status();
        let text = response.text().await.map_err(|e| ApiError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                message: error_message(status, &text),
            }
            .into());
        }
        if status == StatusCode::NO_CONTENT || text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| {
            ApiError::Decode {
                url: url.to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl ApiTransport for RestClient {
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> DocketResult<Value> {
        let url = self.url(path);
        let request_id = Uuid::now_v7().to_string();
        debug!(method = method.as_str(), %url, %request_id, "Sending API request");

        let mut request = self
            .client
            .request(method.to_reqwest(), &url)
            .headers(self.headers.clone())
            .header(REQUEST_ID_HEADER, request_id.as_str());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| ApiError::Transport {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        debug!(status = response.status().as_u16(), %url, %request_id, "API response");
        self.parse_response(&url, response).await
    }
}

fn build_headers(config: &ClientConfig) -> Result<HeaderMap, ConfigError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let language = header_value("language", config.language.trim())?;
    headers.insert(ACCEPT_LANGUAGE, language);
    if let Some(token) = &config.auth.bearer_token {
        let bearer = format!("Bearer {}", token.trim());
        let mut value = header_value("auth.bearer_token", &bearer)?;
        value.set_sensitive(true);
        headers.insert(AUTHORIZATION, value);
    }
    headers.insert(
        HeaderName::from_static("x-requested-with"),
        HeaderValue::from_static("XMLHttpRequest"),
    );
    Ok(headers)
}

fn header_value(field: &str, value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Pull a readable message out of an error body.
///
/// Prefers the JSON `message` or `error` field, then the raw text, then the
/// status reason phrase.
fn error_message(status: StatusCode, text: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(text) {
        let message = ["message", "error"]
            .iter()
            .find_map(|field| map.get(*field).and_then(Value::as_str));
        if let Some(message) = message {
            return message.to_string();
        }
    }
    let text = text.trim();
    if !text.is_empty() {
        return text.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("unknown status")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(token: Option<&str>) -> ClientConfig {
        let mut config = ClientConfig::from_toml_str(
            "api_base_url = \"https://office.example.test/api/\"\nrequest_timeout_ms = 2000\n",
        )
        .unwrap();
        config.auth.bearer_token = token.map(str::to_string);
        config
    }

    #[test]
    fn test_url_joining() {
        let client = RestClient::new(&config(None)).unwrap();
        assert_eq!(client.base_url(), "https://office.example.test/api");
        assert_eq!(
            client.url("/cases"),
            "https://office.example.test/api/cases"
        );
        assert_eq!(
            client.url("courts/4"),
            "https://office.example.test/api/courts/4"
        );
    }

    #[test]
    fn test_headers_carry_auth_and_language() {
        let headers = build_headers(&config(Some("abc123"))).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer abc123");
        assert!(headers[AUTHORIZATION].is_sensitive());
        assert_eq!(headers[ACCEPT_LANGUAGE], "ar");
        assert_eq!(headers[ACCEPT], "application/json");

        let anonymous = build_headers(&config(None)).unwrap();
        assert!(anonymous.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_invalid_token_rejected() {
        let err = build_headers(&config(Some("bad\ntoken"))).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "auth.bearer_token"
        ));
    }

    #[test]
    fn test_error_message_sources() {
        assert_eq!(
            error_message(
                StatusCode::UNPROCESSABLE_ENTITY,
                r#"{"message": "The name field is required."}"#
            ),
            "The name field is required."
        );
        assert_eq!(
            error_message(StatusCode::UNAUTHORIZED, r#"{"error": "Unauthenticated"}"#),
            "Unauthenticated"
        );
        assert_eq!(
            error_message(StatusCode::BAD_GATEWAY, "upstream down\n"),
            "upstream down"
        );
        assert_eq!(error_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[test]
    fn test_method_names() {
        assert_eq!(Method::Delete.as_str(), "DELETE");
        assert_eq!(Method::Put.to_reqwest(), reqwest::Method::PUT);
    }
}
