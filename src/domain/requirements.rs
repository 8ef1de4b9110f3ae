//! Per-document-type requirement policies.
//!
//! The policy table is an external, versioned JSON artifact loaded once at
//! startup and immutable afterwards. Each entry says which entity links a
//! document type requires or allows and which metadata fields apply to it.
//! Unknown or blank type strings resolve to the generic `ostalo` entry.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Canonical key every unknown document type falls back to.
pub const FALLBACK_TYPE_KEY: &str = "ostalo";

/// Metadata field input kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MetadataFieldKind {
    Text,
    Number,
    Date,
    Select,
}

impl Default for MetadataFieldKind {
    fn default() -> Self {
        Self::Text
    }
}

/// Descriptor of one type-specific metadata field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetadataFieldSpec {
    /// Stable field id; defaults to the normalized label when absent.
    #[serde(default)]
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub kind: MetadataFieldKind,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub options: Vec<String>,
}

impl MetadataFieldSpec {
    fn finalize(mut self) -> Self {
        if self.id.is_empty() {
            self.id = canonical_key(&self.label);
        }
        self
    }
}

/// Link and metadata policy for one document type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentTypeRequirements {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub requires_property: bool,
    #[serde(default)]
    pub requires_tenant: bool,
    #[serde(default)]
    pub requires_contract: bool,
    #[serde(default = "default_true")]
    pub allows_property: bool,
    #[serde(default = "default_true")]
    pub allows_tenant: bool,
    #[serde(default = "default_true")]
    pub allows_contract: bool,
    #[serde(default)]
    pub metadata_fields: Vec<MetadataFieldSpec>,
}

fn default_true() -> bool {
    true
}

impl Default for DocumentTypeRequirements {
    /// Permissive defaults: all links allowed, none required, no fields.
    fn default() -> Self {
        Self {
            label: String::new(),
            requires_property: false,
            requires_tenant: false,
            requires_contract: false,
            allows_property: true,
            allows_tenant: true,
            allows_contract: true,
            metadata_fields: Vec::new(),
        }
    }
}

impl DocumentTypeRequirements {
    /// A type is property-only when it requires a property link and forbids
    /// both tenant and contract links. Derived, never stored.
    pub fn is_property_only(&self) -> bool {
        self.requires_property && !self.allows_tenant && !self.allows_contract
    }

    pub fn field(&self, id: &str) -> Option<&MetadataFieldSpec> {
        self.metadata_fields.iter().find(|f| f.id == id)
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &MetadataFieldSpec> {
        self.metadata_fields.iter().filter(|f| f.required)
    }

    fn finalize(mut self, key: &str) -> Self {
        if self.label.is_empty() {
            self.label = key.to_string();
        }
        self.metadata_fields = self
            .metadata_fields
            .into_iter()
            .map(MetadataFieldSpec::finalize)
            .collect();
        self
    }
}

/// The loaded requirement table, keyed by canonical type key.
#[derive(Debug, Clone)]
pub struct RequirementsTable {
    entries: HashMap<String, DocumentTypeRequirements>,
    fallback: DocumentTypeRequirements,
}

impl RequirementsTable {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read document type config {}", path.display()))?;
        let parsed: HashMap<String, DocumentTypeRequirements> = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid document type config {}", path.display()))?;
        Ok(Self::from_entries(parsed))
    }

    pub fn from_entries(raw: HashMap<String, DocumentTypeRequirements>) -> Self {
        let entries: HashMap<String, DocumentTypeRequirements> = raw
            .into_iter()
            .map(|(key, value)| {
                let key = canonical_key(&key);
                let value = value.finalize(&key);
                (key, value)
            })
            .collect();

        let fallback = entries
            .get(FALLBACK_TYPE_KEY)
            .cloned()
            .unwrap_or_else(|| DocumentTypeRequirements::default().finalize(FALLBACK_TYPE_KEY));

        Self { entries, fallback }
    }

    /// Resolve a raw type string to its policy.
    ///
    /// Unknown and blank keys get the fallback entry.
    pub fn resolve(&self, raw_type: &str) -> &DocumentTypeRequirements {
        let key = canonical_key(raw_type);
        if key.is_empty() {
            return &self.fallback;
        }
        self.entries.get(&key).unwrap_or(&self.fallback)
    }

    pub fn known_types(&self) -> impl Iterator<Item = (&String, &DocumentTypeRequirements)> {
        self.entries.iter()
    }
}

/// Normalize a raw type string or field label to a canonical key:
/// lowercase, Croatian diacritics folded to ASCII, every non-alphanumeric
/// run collapsed to a single underscore.
pub fn canonical_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for ch in raw.trim().to_lowercase().chars() {
        let ch = match ch {
            'č' | 'ć' => 'c',
            'đ' => 'd',
            'š' => 's',
            'ž' => 'z',
            other => other,
        };
        if ch.is_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push('_');
            }
            pending_separator = false;
            key.push(ch);
        } else {
            pending_separator = true;
        }
    }
    key
}
