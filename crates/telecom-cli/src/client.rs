use crate::token_store::TokenStore;
use anyhow::{Context, Result, bail};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::Value;

/// HTTP access to the API with the saved token attached where needed.
pub struct ApiClient {
    http: Client,
    server: String,
    store: TokenStore,
}

impl ApiClient {
    pub fn new(server: &str, store: TokenStore) -> Self {
        Self {
            http: Client::new(),
            server: server.trim_end_matches('/').to_string(),
            store,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.server, path)
    }

    pub async fn get(&self, path: &str) -> Result<Value> {
        self.send(self.http.get(self.url(path))).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        self.send(self.http.post(self.url(path)).json(body)).await
    }

    pub async fn get_authed(&self, path: &str) -> Result<Value> {
        let req = self.authed(self.http.get(self.url(path)))?;
        self.send(req).await
    }

    pub async fn post_authed(&self, path: &str, body: &Value) -> Result<Value> {
        let req = self.authed(self.http.post(self.url(path)).json(body))?;
        self.send(req).await
    }

    pub async fn delete_authed(&self, path: &str) -> Result<Value> {
        let req = self.authed(self.http.delete(self.url(path)))?;
        self.send(req).await
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder> {
        match self.store.load()? {
            Some(token) => Ok(req.bearer_auth(token)),
            None => bail!("Not logged in. Run `telecom login` first."),
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value> {
        let resp = req.send().await.context("Failed to connect to server")?;
        let status = resp.status();
        let text = resp.text().await.context("Failed to read response")?;

        if status == StatusCode::UNAUTHORIZED {
            // The saved session is no good any more
            self.store.clear()?;
            tracing::debug!("Cleared saved token after 401");
        }
        if !status.is_success() {
            bail!("Server returned {}: {}", status, describe_error(&text));
        }
        serde_json::from_str(&text).context("Failed to parse response")
    }
}

/// Error body as shown to the user: the envelope summary when it is one,
/// otherwise the raw text (proxies and load balancers answer in HTML).
fn describe_error(text: &str) -> String {
    match serde_json::from_str::<Value>(text) {
        Ok(body) if body.is_object() => error_message(&body),
        _ if text.trim().is_empty() => "(empty response)".to_string(),
        _ => text.trim().to_string(),
    }
}

/// Human-readable summary of an error envelope: the message plus every
/// field error.
pub fn error_message(body: &Value) -> String {
    let mut message = body
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or("Unknown error")
        .to_string();

    if let Some(errors) = body.get("errors").and_then(|v| v.as_object()) {
        for (field, messages) in errors {
            let joined = messages
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|m| m.as_str())
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_default();
            message.push_str(&format!("\n  {}: {}", field, joined));
        }
    }
    if let Some(detail) = body.get("error").and_then(|v| v.as_str()) {
        message.push_str(&format!(" ({})", detail));
    }
    message
}
