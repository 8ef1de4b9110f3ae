//! Client for the persistence (catalog) service.
//!
//! The entity catalogs are owned by this collaborator; the engine treats
//! them as read-mostly snapshots and routes every mutation through here. A
//! failed create or refresh only fails that action; draft state is never
//! touched by a collaborator failure.

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::domain::catalog::{
    CatalogSnapshot, Contract, NewContract, NewProperty, NewPropertyUnit, NewTenant, Property,
    PropertyUnit, Tenant,
};
use crate::domain::documents::{DocumentRecord, NewDocument};
use crate::domain::reminders::Reminder;
use crate::error::ApiError;

#[derive(Clone)]
pub struct CatalogClient {
    client: Client,
    base_url: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UpstreamErrorBody {
    message: String,
}

impl CatalogClient {
    pub fn new(base_url: &str, token: &str, timeout_seconds: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        tracing::info!(base_url = base_url, "Catalog client initialized");

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Check catalog service health.
    pub async fn health_check(&self) -> Result<()> {
        let url = format!("{}/health", self.base_url);

        self.client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .context("Catalog service health check failed")?
            .error_for_status()
            .context("Catalog service unhealthy")?;

        Ok(())
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Catalog GET");

        let response = self
            .client
            .get(&url)
            .header("X-Internal-Token", &self.token)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Catalog request failed");
                ApiError::Upstream(format!("Catalog service unavailable: {e}"))
            })?;

        Self::decode(response).await
    }

    async fn post<T: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &T,
    ) -> Result<R, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "Catalog POST");

        let response = self
            .client
            .post(&url)
            .header("X-Internal-Token", &self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Catalog request failed");
                ApiError::Upstream(format!("Catalog service unavailable: {e}"))
            })?;

        Self::decode(response).await
    }

    async fn decode<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ApiError> {
        let status = response.status();
        if status.is_success() {
            return response.json::<R>().await.map_err(|e| {
                error!(error = %e, "Failed to parse catalog response");
                ApiError::Upstream(format!("Invalid catalog response: {e}"))
            });
        }

        let message = response
            .json::<UpstreamErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_else(|_| format!("Catalog service error: {status}"));

        match status {
            StatusCode::BAD_REQUEST => Err(ApiError::BadRequest(message)),
            StatusCode::NOT_FOUND => Err(ApiError::NotFound(message)),
            StatusCode::UNAUTHORIZED => {
                error!("Catalog service authentication failed");
                Err(ApiError::Internal(anyhow::anyhow!(
                    "Catalog service auth error"
                )))
            }
            _ => {
                error!(status = %status, message = %message, "Catalog service error");
                Err(ApiError::Upstream(message))
            }
        }
    }

    pub async fn get_properties(&self) -> Result<Vec<Property>, ApiError> {
        self.get("/v1/properties").await
    }

    pub async fn get_tenants(&self) -> Result<Vec<Tenant>, ApiError> {
        self.get("/v1/tenants").await
    }

    pub async fn get_contracts(&self) -> Result<Vec<Contract>, ApiError> {
        self.get("/v1/contracts").await
    }

    pub async fn get_units(&self, property_id: Uuid) -> Result<Vec<PropertyUnit>, ApiError> {
        self.get(&format!("/v1/properties/{property_id}/units"))
            .await
    }

    pub async fn get_reminders(&self) -> Result<Vec<Reminder>, ApiError> {
        self.get("/v1/reminders").await
    }

    pub async fn get_document(&self, id: Uuid) -> Result<DocumentRecord, ApiError> {
        self.get(&format!("/v1/documents/{id}")).await
    }

    #[instrument(skip(self, payload), fields(name = %payload.name))]
    pub async fn create_property(&self, payload: &NewProperty) -> Result<Property, ApiError> {
        self.post("/v1/properties", payload).await
    }

    #[instrument(skip(self, payload), fields(name = %payload.name))]
    pub async fn create_tenant(&self, payload: &NewTenant) -> Result<Tenant, ApiError> {
        self.post("/v1/tenants", payload).await
    }

    #[instrument(skip(self, payload), fields(code = %payload.code))]
    pub async fn create_unit(&self, payload: &NewPropertyUnit) -> Result<PropertyUnit, ApiError> {
        self.post(
            &format!("/v1/properties/{}/units", payload.property_id),
            payload,
        )
        .await
    }

    #[instrument(skip(self, payload), fields(code = %payload.code))]
    pub async fn create_contract(&self, payload: &NewContract) -> Result<Contract, ApiError> {
        self.post("/v1/contracts", payload).await
    }

    #[instrument(skip(self, payload), fields(name = %payload.name))]
    pub async fn create_document(&self, payload: &NewDocument) -> Result<DocumentRecord, ApiError> {
        self.post("/v1/documents", payload).await
    }

    /// Joined fetch of the read-mostly catalogs the matcher needs. Units are
    /// fetched only when a property scope is already known.
    pub async fn snapshot(&self, property_id: Option<Uuid>) -> Result<CatalogSnapshot, ApiError> {
        let (properties, tenants, contracts) = futures::try_join!(
            self.get_properties(),
            self.get_tenants(),
            self.get_contracts(),
        )?;
        let units = match property_id {
            Some(pid) => self.get_units(pid).await?,
            None => Vec::new(),
        };
        Ok(CatalogSnapshot {
            properties,
            tenants,
            contracts,
            units,
        })
    }
}
