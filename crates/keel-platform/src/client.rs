//! Platform API client and request executor
//!
//! `execute` and `execute_for` perform exactly one logical call. Each call
//! ends with an [`Outcome`], and every call whose outcome is not ok appends
//! exactly one entry to the caller's [`Diagnostics`]. Rate-limited responses
//! are re-sent transparently before the final response is classified.

use std::time::Duration;

use keel_core::retry::{Interruption, OperationContext};
use keel_core::ProviderConfig;
use rand::Rng;
use reqwest::header::{CONTENT_TYPE, RETRY_AFTER};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::request::{HttpOptions, Outcome, Request};

/// Wait used when a 429 carries no usable Retry-After header
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Longest wait honoured from a Retry-After header
const MAX_RETRY_AFTER: Duration = Duration::from_secs(300);

/// Client for the platform REST API
#[derive(Debug, Clone)]
pub struct PlatformClient {
    http: reqwest::Client,
    base_url: String,
    auth: Option<(String, String)>,
    rate_limit_retries: u32,
}

/// Why no response could be classified
enum SendError {
    Encode(String),
    Transport(reqwest::Error),
    Interrupted(Interruption),
}

impl PlatformClient {
    /// Create a client from provider configuration
    ///
    /// Fails when `platform-api` is unset or the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        let base_url = config.platform_api()?.to_string();

        let http = reqwest::Client::builder()
            .user_agent(config.network.user_agent.as_str())
            .timeout(config.network.http_timeout())
            .connect_timeout(config.network.connect_timeout())
            .danger_accept_invalid_certs(config.insecure_skip_verify)
            .build()?;

        if config.insecure_skip_verify {
            warn!("TLS certificate verification is disabled for {}", base_url);
        }

        Ok(Self {
            http,
            base_url,
            auth: config
                .basic_auth()
                .map(|(user, pass)| (user.to_string(), pass.to_string())),
            rate_limit_retries: config.network.rate_limit_retries,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Execute a request whose response body is not needed
    pub async fn execute(
        &self,
        ctx: &OperationContext,
        request: &Request,
        options: HttpOptions,
        diagnostics: &mut Diagnostics,
    ) -> Outcome<()> {
        self.dispatch(ctx, request, &options, diagnostics, |_| Ok(()))
            .await
    }

    /// Execute a request and decode a 2xx JSON body into `T`
    ///
    /// The body is only decoded for 2xx responses. An allowed non-2xx status
    /// yields an ok outcome without a value.
    pub async fn execute_for<T: DeserializeOwned>(
        &self,
        ctx: &OperationContext,
        request: &Request,
        options: HttpOptions,
        diagnostics: &mut Diagnostics,
    ) -> Outcome<T> {
        self.dispatch(ctx, request, &options, diagnostics, |body| {
            // An empty 2xx body decodes like JSON null
            let text = if body.trim().is_empty() { "null" } else { body };
            serde_json::from_str(text)
        })
        .await
    }

    async fn dispatch<T, F>(
        &self,
        ctx: &OperationContext,
        request: &Request,
        options: &HttpOptions,
        diagnostics: &mut Diagnostics,
        decode: F,
    ) -> Outcome<T>
    where
        F: FnOnce(&str) -> serde_json::Result<T>,
    {
        let method = request.method();
        let path = request.path();
        debug!(%method, url = %self.url(path), "-->");

        let (status, body) = match self.send(ctx, request).await {
            Ok(response) => response,
            Err(err) => {
                let reason = match err {
                    SendError::Encode(e) => format!("failed to encode request body: {}", e),
                    SendError::Transport(e) => e.to_string(),
                    SendError::Interrupted(cause) => cause.to_string(),
                };
                debug!(%method, url = %self.url(path), error = %reason, "<--");
                diagnostics.add_error(
                    format!("{} failed", method),
                    format!("{} {} failed with error: {}", method, path, reason),
                );
                return Outcome::failure(None, String::new());
            }
        };

        debug!(%method, url = %self.url(path), status = status.as_u16(), "<--");
        if !body.is_empty() {
            debug!("Response: {}", body);
        }

        let code = status.as_u16();
        if status.is_success() {
            return match decode(&body) {
                Ok(value) => Outcome::success(code, body, Some(value)),
                Err(e) => {
                    diagnostics.add_error(
                        format!("{} failed", method),
                        format!(
                            "{} {} failed with error: invalid response body: {}",
                            method, path, e
                        ),
                    );
                    Outcome::failure(Some(code), body)
                }
            };
        }

        if options.is_allowed(code) {
            return Outcome::success(code, body, None);
        }

        diagnostics.add_error(
            format!("{} failed", method),
            format!(
                "{} {} returned status code {}: {}",
                method,
                path,
                code,
                body.trim()
            ),
        );
        Outcome::failure(Some(code), body)
    }

    /// Send the request, re-sending while the platform answers 429
    async fn send(
        &self,
        ctx: &OperationContext,
        request: &Request,
    ) -> std::result::Result<(StatusCode, String), SendError> {
        let payload = request.body().encode().map_err(SendError::Encode)?;
        let url = self.url(request.path());
        if let Some(bytes) = &payload {
            debug!("Request: {}", String::from_utf8_lossy(bytes));
        }
        let mut rate_limited = 0;

        loop {
            let mut builder = self.http.request(request.method().into(), &url);
            if let Some(content_type) = request.body().content_type() {
                builder = builder.header(CONTENT_TYPE, content_type);
            }
            if let Some(bytes) = &payload {
                builder = builder.body(bytes.clone());
            }
            if let Some((user, pass)) = &self.auth {
                builder = builder.basic_auth(user, Some(pass));
            }

            let response = ctx
                .run(builder.send())
                .await
                .map_err(SendError::Interrupted)?
                .map_err(SendError::Transport)?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS && rate_limited < self.rate_limit_retries {
                rate_limited += 1;
                let wait = with_jitter(retry_after(&response));
                debug!(
                    url = %url,
                    attempt = rate_limited,
                    wait_ms = wait.as_millis() as u64,
                    "rate limited, retrying"
                );
                ctx.sleep(wait).await.map_err(SendError::Interrupted)?;
                continue;
            }

            // Read the whole body before anything is classified
            let body = ctx
                .run(response.text())
                .await
                .map_err(SendError::Interrupted)?
                .map_err(SendError::Transport)?;
            return Ok((status, body));
        }
    }
}

fn retry_after(response: &reqwest::Response) -> Duration {
    parse_retry_after(
        response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok()),
    )
}

/// Delay-seconds form only, capped at `MAX_RETRY_AFTER`
fn parse_retry_after(value: Option<&str>) -> Duration {
    value
        .and_then(|value| value.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs).min(MAX_RETRY_AFTER))
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

/// Add up to 25% random variation
fn with_jitter(wait: Duration) -> Duration {
    let spread_ms = u64::try_from(wait.as_millis() / 4).unwrap_or(u64::MAX);
    if spread_ms == 0 {
        return wait;
    }
    wait.saturating_add(Duration::from_millis(rand::rng().random_range(0..=spread_ms)))
}
