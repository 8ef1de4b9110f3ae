//! Client for the AI extraction service.
//!
//! One endpoint matters: uploading a PDF and getting back the best-effort
//! suggestion bundle. A `success = false` response is a normal outcome whose
//! message is surfaced to the user verbatim; only transport and protocol
//! failures become errors. Timeouts live in the HTTP client; there is no
//! retry layer.

use anyhow::{Context, Result};
use reqwest::{multipart, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::domain::suggestions::ExtractionOutcome;
use crate::error::ApiError;

#[derive(Clone)]
pub struct ExtractionClient {
    client: Client,
    base_url: String,
    token: String,
}

/// Error body the extraction service returns on non-2xx responses.
#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: String,
}

impl ExtractionClient {
    pub fn new(base_url: &str, token: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, "Extraction client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Check extraction service health.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Extraction service health check failed")?
            .error_for_status()
            .context("Extraction service unhealthy")?;

        Ok(())
    }

    /// Send an uploaded PDF for parsing.
    ///
    /// `property_hint` narrows the service's own unit lookup to one property
    /// when the operator already selected one.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub async fn parse_pdf_contract(
        &self,
        file_name: &str,
        content_type: &str,
        bytes: Vec<u8>,
        property_hint: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<ExtractionOutcome, ApiError> {
        let url = format!("{}/v1/documents/parse", self.base_url);

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(content_type)
            .map_err(|_| ApiError::BadRequest(format!("Unsupported content type {content_type}")))?;
        let mut form = multipart::Form::new().part("file", part);
        if let Some(hint) = property_hint {
            form = form.text("property", hint.to_string());
        }

        let mut req = self
            .client
            .post(&url)
            .header("X-Internal-Token", &self.token);
        if let Some(rid) = request_id {
            req = req.header("x-request-id", rid);
        }

        debug!(url = %url, file_name = file_name, "Extraction request");

        let response = req.multipart(form).send().await.map_err(|e| {
            error!(error = %e, "Extraction request failed");
            ApiError::Upstream(format!("Extraction service unavailable: {e}"))
        })?;

        let status = response.status();
        if status.is_success() {
            response.json::<ExtractionOutcome>().await.map_err(|e| {
                error!(error = %e, "Failed to parse extraction response");
                ApiError::Upstream(format!("Invalid extraction response: {e}"))
            })
        } else {
            let message = response
                .json::<UpstreamErrorBody>()
                .await
                .map(|b| b.message)
                .unwrap_or_else(|_| format!("Extraction service error: {status}"));

            match status {
                StatusCode::BAD_REQUEST => Err(ApiError::BadRequest(message)),
                StatusCode::UNAUTHORIZED => {
                    error!("Extraction service authentication failed");
                    Err(ApiError::Internal(anyhow::anyhow!(
                        "Extraction service auth error"
                    )))
                }
                _ => {
                    error!(status = %status, message = %message, "Extraction service error");
                    Err(ApiError::Upstream(message))
                }
            }
        }
    }
}
