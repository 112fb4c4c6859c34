use std::time::Duration;

use log::debug;
use reqwest::{Client, RequestBuilder, Url};
use rocket::serde::json::{serde_json, Value};

use crate::model::user::{Credentials, LoginResponse, SessionUser};

use super::{endpoints, Backend, BackendError};

/// [`Backend`] implementation talking JSON over HTTP to the real API.
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Build a client for the API rooted at `base_url`, which must be an
    /// absolute `http` or `https` URL.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, BackendError> {
        let parsed = Url::parse(base_url).map_err(|e| BackendError::Config(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(BackendError::Config(format!(
                "{base_url}: expected an http or https URL"
            )));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Config(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Full URL of an API path.
    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send a request and decode its JSON body, turning non-success statuses
    /// into [`BackendError::Http`] carrying the backend's message.
    async fn send(&self, request: RequestBuilder, token: Option<&str>) -> Result<Value, BackendError> {
        let request = match token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        let status = response.status();
        debug!("Backend answered {status} for {}", response.url());
        let body = response
            .bytes()
            .await
            .map_err(|e| BackendError::Unreachable(e.to_string()))?;

        if !status.is_success() {
            return Err(BackendError::Http {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body).map_err(|e| BackendError::Decode(e.to_string()))
    }
}

#[rocket::async_trait]
impl Backend for HttpBackend {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, BackendError> {
        let request = self.client.post(self.url(endpoints::LOGIN)).json(credentials);
        let body = self.send(request, None).await?;
        serde_json::from_value(body).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn logout(&self, token: &str) -> Result<(), BackendError> {
        let request = self.client.post(self.url(endpoints::LOGOUT));
        self.send(request, Some(token)).await.map(|_| ())
    }

    async fn session(&self, token: &str) -> Result<SessionUser, BackendError> {
        let request = self.client.get(self.url(endpoints::SESSION));
        let body = self.send(request, Some(token)).await?;
        // Some deployments wrap the user in `{"user": {...}}`.
        let user = match body {
            Value::Object(mut fields) if fields.contains_key("user") => {
                fields.remove("user").unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value(user).map_err(|e| BackendError::Decode(e.to_string()))
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Result<Value, BackendError> {
        let request = self.client.get(self.url(path));
        self.send(request, token).await
    }

    async fn post(
        &self,
        path: &str,
        body: Value,
        token: Option<&str>,
    ) -> Result<Value, BackendError> {
        let request = self.client.post(self.url(path)).json(&body);
        self.send(request, token).await
    }
}

/// Pull a human-readable message out of an error body: `message` or `error`,
/// either a string or a list of strings.
fn error_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    ["message", "error"]
        .iter()
        .filter_map(|key| value.get(key))
        .find_map(|field| match field {
            Value::String(message) if !message.is_empty() => Some(message.clone()),
            Value::Array(parts) => {
                let parts = parts
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>();
                (!parts.is_empty()).then(|| parts.join(", "))
            }
            _ => None,
        })
}
