//! REST backend over reqwest.
//!
//! # Security Note - Logging
//!
//! The bearer token is protected from reqwest's request logging by the
//! `RedactedHeader` wrapper, which implements `Display` and `Debug` to redact
//! the value. Avoid `RUST_LOG=reqwest=debug` in production regardless.

use std::fmt;
use std::sync::Arc;

use reqwest::header::{self, HeaderValue};
use reqwest::{Client, Method};
use secrecy::ExposeSecret;
use serde_json::Value;
use url::Url;

use crate::config::Config;
use crate::error::{LeadboardError, Result};

use super::credentials::{CredentialProvider, MemoryCredentials, Token};
use super::error::{ApiError, is_auth_status};
use super::{ListBackend, ListQuery, RawPage};

/// Wrapper for sensitive header values that redacts the value when formatted.
struct RedactedHeader {
    value: String,
}

impl RedactedHeader {
    fn bearer(token: &str) -> Self {
        Self {
            value: format!("Bearer {token}"),
        }
    }

    fn as_header_value(&self) -> Result<HeaderValue> {
        let mut value = HeaderValue::from_str(&self.value).map_err(|_| {
            LeadboardError::Config("token contains characters not allowed in a header".to_string())
        })?;
        value.set_sensitive(true);
        Ok(value)
    }
}

impl fmt::Display for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED]")
    }
}

impl fmt::Debug for RedactedHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactedHeader")
            .field("value", &"[REDACTED]")
            .finish()
    }
}

fn same_token(a: &Option<Token>, b: &Option<Token>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.expose_secret() == b.expose_secret(),
        (None, None) => true,
        _ => false,
    }
}

/// Backend reached over HTTP at `{base_url}/{resource}/`.
#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    credentials: Arc<dyn CredentialProvider>,
    page_size: Option<u32>,
}

impl fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url.as_str())
            .field("page_size", &self.page_size)
            .finish_non_exhaustive()
    }
}

impl HttpBackend {
    pub fn new(base_url: Url, credentials: Arc<dyn CredentialProvider>) -> Self {
        Self {
            client: Client::new(),
            base_url,
            credentials,
            page_size: None,
        }
    }

    /// Use a preconfigured client (proxy, TLS or timeout settings).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Page size used to derive page counts when the backend only sends `count`.
    pub fn with_page_size(mut self, page_size: Option<u32>) -> Self {
        self.page_size = page_size.filter(|size| *size > 0);
        self
    }

    /// Build from configuration, holding the configured token in memory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = Arc::new(MemoryCredentials::new(config.token()));
        Ok(Self::new(config.base_url()?, credentials).with_page_size(config.api.page_size))
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn credentials(&self) -> &Arc<dyn CredentialProvider> {
        &self.credentials
    }

    /// Resolve `path` (no leading slash) against the base URL.
    pub(crate) fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// `{base}/{collection}/{id}/`, with `id` percent-encoded as a single
    /// path segment.
    pub(crate) fn record_endpoint(&self, collection: &str, id: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                LeadboardError::Config(format!("base URL '{}' cannot hold a path", self.base_url))
            })?
            .pop_if_empty()
            .push(collection)
            .push(id)
            .push("");
        Ok(url)
    }

    /// Send one request and decode its JSON body.
    ///
    /// On 401/403 the credential provider is invalidated. The request is
    /// retried once, and only if the provider then yields a different token.
    pub(crate) async fn execute(
        &self,
        method: Method,
        url: Url,
        query: &[(String, String)],
        body: Option<&Value>,
    ) -> Result<Value> {
        let mut token = self.credentials.token();
        let mut retried = false;

        loop {
            let mut request = self
                .client
                .request(method.clone(), url.clone())
                .header(header::ACCEPT, HeaderValue::from_static("application/json"));
            if !query.is_empty() {
                request = request.query(query);
            }
            if let Some(token) = &token {
                let auth_header = RedactedHeader::bearer(token.expose_secret());
                request = request.header(header::AUTHORIZATION, auth_header.as_header_value()?);
            }
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| LeadboardError::Network(e.to_string()))?;
            let status = response.status();

            if is_auth_status(status) {
                self.credentials.invalidate(token.as_ref());
                let fresh = self.credentials.token();
                if !retried && fresh.is_some() && !same_token(&token, &fresh) {
                    tracing::debug!(%url, "retrying with refreshed credential");
                    retried = true;
                    token = fresh;
                    continue;
                }
                tracing::warn!(status = status.as_u16(), %url, "authentication expired");
                return Err(LeadboardError::AuthExpired {
                    status: status.as_u16(),
                });
            }

            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                let error = ApiError::from_body(status, &text);
                tracing::debug!(%url, %error, "request failed");
                return Err(error.into());
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| LeadboardError::Network(e.to_string()))?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return serde_json::from_slice(&bytes)
                .map_err(|e| LeadboardError::Format(format!("invalid JSON body: {e}")));
        }
    }
}

impl ListBackend for HttpBackend {
    async fn fetch_page(&self, resource: &str, query: &ListQuery) -> Result<RawPage> {
        query.validate()?;
        let url = self.endpoint(&format!("{resource}/"))?;
        tracing::debug!(resource, page = query.page, "fetching page");

        let body = self
            .execute(Method::GET, url, &query.to_query_pairs(), None)
            .await?;
        RawPage::from_json(body, query.page, self.page_size)
    }
}
