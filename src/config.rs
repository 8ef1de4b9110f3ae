use anyhow::{Context, Result};
use std::env;
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    #[allow(dead_code)]
    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,
    pub server_addr: String,

    // CORS
    pub cors_allow_origins: Vec<String>,

    // AI extraction service
    pub extraction_service_url: String,
    pub extraction_service_token: String,
    pub extraction_service_timeout_seconds: u64,

    // Persistence (catalog) service
    pub catalog_service_url: String,
    pub catalog_service_token: String,
    pub catalog_service_timeout_seconds: u64,

    // Document type requirement table
    pub document_types_path: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));
        let server_addr = env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        // CORS
        let cors_allow_origins = env::var("CORS_ALLOW_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        // AI extraction service
        let extraction_service_url = service_url(
            "EXTRACTION_SERVICE_URL",
            "http://extraction-service:8000",
        )?;
        let extraction_service_token =
            env::var("EXTRACTION_SERVICE_TOKEN").context("EXTRACTION_SERVICE_TOKEN must be set")?;
        let extraction_service_timeout_seconds = env::var("EXTRACTION_SERVICE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120); // 2 minutes default for PDF parsing

        // Persistence (catalog) service
        let catalog_service_url = service_url("CATALOG_SERVICE_URL", "http://catalog-service:9000")?;
        let catalog_service_token =
            env::var("CATALOG_SERVICE_TOKEN").context("CATALOG_SERVICE_TOKEN must be set")?;
        let catalog_service_timeout_seconds = env::var("CATALOG_SERVICE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        // Document type requirement table
        let document_types_path = env::var("DOCUMENT_TYPES_PATH")
            .unwrap_or_else(|_| "config/document_types.json".to_string());

        Ok(Settings {
            env,
            server_addr,
            cors_allow_origins,
            extraction_service_url,
            extraction_service_token,
            extraction_service_timeout_seconds,
            catalog_service_url,
            catalog_service_token,
            catalog_service_timeout_seconds,
            document_types_path,
        })
    }
}

fn service_url(var: &str, default: &str) -> Result<String> {
    let raw = env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).with_context(|| format!("{var} is not a valid URL: {raw}"))?;
    Ok(raw)
}
