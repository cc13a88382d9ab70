use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::categories::Categories;
use crate::config::{normalize_base_url, ClientConfig};
use crate::error::{AxeraError, Result};
use crate::imaging::ImageData;
use crate::types::*;

/// Anything that can run a single generation.
///
/// [`AxeraClient`] is the real implementation; the recursive loop only needs
/// this seam, so it can be driven by any other backend.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Run one generation. Failures come back as
    /// [`GenerationResult::Failure`], never as a panic or error.
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult;
}

/// Async client for an Axera image service.
///
/// The plain operations ([`generate`](Self::generate),
/// [`interrogate`](Self::interrogate),
/// [`interrogate_structured`](Self::interrogate_structured)) never fail: any
/// transport or server problem is folded into the returned value. The
/// `try_*` variants expose the typed [`AxeraError`] instead.
///
/// # Example
/// ```no_run
/// use axera_rs::{AxeraClient, GenerationRequest, GenerationResult};
///
/// # async fn example() {
/// let client = AxeraClient::new("http://m5:5000");
/// match client.generate(&GenerationRequest::txt2img("a red fox")).await {
///     GenerationResult::Success(s) => println!("seed {:?}", s.seed),
///     GenerationResult::Failure { message } => eprintln!("{}", message),
/// }
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AxeraClient {
    http: Client,
    config: ClientConfig,
}

impl AxeraClient {
    /// Create a client for `base_url` with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_config(ClientConfig {
            base_url: normalize_base_url(base_url.into()),
            ..ClientConfig::default()
        })
    }

    /// Create a client from a full configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Returns the configured base URL.
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Point the client at a different service.
    pub fn set_base_url(&mut self, base_url: impl Into<String>) {
        self.config.base_url = normalize_base_url(base_url.into());
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Health ──────────────────────────────────────────────────────

    /// Check whether the service answers at its base URL.
    ///
    /// Any non-5xx status counts as alive; a bare API server usually
    /// answers `/` with 404.
    pub async fn health(&self) -> Result<bool> {
        let url = format!("{}/", self.config.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;
        Ok(!resp.status().is_server_error())
    }

    // ── Generation ──────────────────────────────────────────────────

    /// Run one generation, folding every failure into
    /// [`GenerationResult::Failure`].
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        let result: GenerationResult = self.try_generate(request).await.into();
        if let GenerationResult::Failure { message } = &result {
            log::warn!("[axera-rs] generate failed: {}", message);
        }
        result
    }

    /// Run one generation and return the typed error on failure.
    pub async fn try_generate(&self, request: &GenerationRequest) -> Result<GenerationSuccess> {
        log::debug!(
            "[axera-rs] generate mode={} seed={} init_image={}",
            request.mode,
            request.seed,
            request.init_image.is_some()
        );
        let json = self
            .post_json("/generate", &request.payload(), self.config.generate_timeout)
            .await?;
        let resp: GenerateResponse = serde_json::from_value(json)
            .map_err(|e| AxeraError::InvalidResponse(format!("unexpected /generate body: {}", e)))?;
        decode_generate_response(resp)
    }

    // ── Interrogation ───────────────────────────────────────────────

    /// Standard interrogation. Returns the service's JSON verbatim, or
    /// `{"error": "..."}` on failure.
    pub async fn interrogate(&self, image: &ImageData) -> Value {
        self.try_interrogate(image).await.unwrap_or_else(error_value)
    }

    pub async fn try_interrogate(&self, image: &ImageData) -> Result<Value> {
        let body = json!({ "image": image.to_base64() });
        self.post_json("/interrogate", &body, self.config.interrogate_timeout)
            .await
    }

    /// Structured interrogation against caller-supplied label vocabularies.
    ///
    /// An empty category map short-circuits to
    /// `{"error": "No valid categories provided"}` without touching the
    /// network.
    pub async fn interrogate_structured(&self, image: &ImageData, categories: &Categories) -> Value {
        self.try_interrogate_structured(image, categories)
            .await
            .unwrap_or_else(error_value)
    }

    pub async fn try_interrogate_structured(
        &self,
        image: &ImageData,
        categories: &Categories,
    ) -> Result<Value> {
        if categories.is_empty() {
            return Err(AxeraError::NoCategories);
        }
        let body = StructuredInterrogatePayload {
            image: image.to_base64(),
            categories,
        };
        self.post_json(
            "/interrogate/structured",
            &body,
            self.config.interrogate_timeout,
        )
        .await
    }

    /// Dispatch on whether the request carries categories.
    pub async fn interrogate_request(&self, request: &InterrogationRequest) -> Value {
        match &request.categories {
            Some(categories) => self.interrogate_structured(&request.image, categories).await,
            None => self.interrogate(&request.image).await,
        }
    }

    // ── Transport ───────────────────────────────────────────────────

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<Value> {
        let url = format!("{}{}", self.config.base_url, path);
        log::debug!("[axera-rs] POST {} (timeout {:?})", url, timeout);

        let resp = self
            .http
            .post(&url)
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| self.connection_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body_text = resp.text().await.unwrap_or_default();
            return Err(AxeraError::Http {
                status,
                body: body_text,
            });
        }

        resp.json().await.map_err(|e| {
            AxeraError::InvalidResponse(format!("{} returned malformed JSON: {}", path, e))
        })
    }

    fn connection_error(&self, source: reqwest::Error) -> AxeraError {
        AxeraError::Network {
            context: format!(
                "Connection error: cannot reach Axera at {}",
                self.config.base_url
            ),
            source,
        }
    }
}

#[async_trait]
impl ImageService for AxeraClient {
    async fn generate(&self, request: &GenerationRequest) -> GenerationResult {
        AxeraClient::generate(self, request).await
    }
}

fn error_value(err: AxeraError) -> Value {
    log::warn!("[axera-rs] interrogation failed: {}", err);
    json!({ "error": err.to_string() })
}

/// Turn a 2xx `/generate` body into a success, or the server's complaint.
fn decode_generate_response(resp: GenerateResponse) -> Result<GenerationSuccess> {
    if resp.status.as_deref() != Some("ok") {
        return Err(AxeraError::Server(
            resp.error_message().unwrap_or_else(|| "Unknown error".to_string()),
        ));
    }
    let encoded = resp
        .base64
        .ok_or_else(|| AxeraError::InvalidResponse("response missing base64 image".into()))?;
    Ok(GenerationSuccess {
        image: ImageData::from_base64(&encoded)?,
        seed: resp.seed,
        total_time_ms: resp.total_time_ms,
        text_time_ms: resp.text_time_ms,
    })
}
