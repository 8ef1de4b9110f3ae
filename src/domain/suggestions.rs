//! AI extraction output types.
//!
//! Everything here is best-effort, advisory input: fragments may be missing,
//! partially filled, or carry a confidence in one of several raw shapes.
//! Confidence is normalized exactly once, at deserialization, into a 0-100
//! percentage; an unscored fragment stays `None` and is presented as
//! "not available", never as zero.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::catalog::{NewPropertyUnit, NewTenant, PropertyUnit};

/// Normalized extraction confidence on the 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Confidence(f64);

impl Confidence {
    /// Keys the extraction service has been observed to nest scores under.
    const OBJECT_KEYS: [&'static str; 4] = ["score", "confidence", "value", "percent"];

    pub fn percent(&self) -> f64 {
        self.0
    }

    /// Normalize a raw confidence value.
    ///
    /// Accepts a number on either the 0-1 or 0-100 scale, a numeric string
    /// (optionally suffixed with `%`), or an object carrying the score under
    /// one of a few known keys. Anything else is treated as unscored.
    pub fn from_raw(raw: &Value) -> Option<Self> {
        match raw {
            Value::Number(n) => n.as_f64().and_then(Self::from_number),
            Value::String(s) => {
                let trimmed = s.trim().trim_end_matches('%').trim();
                trimmed.parse::<f64>().ok().and_then(Self::from_number)
            }
            Value::Object(map) => Self::OBJECT_KEYS
                .iter()
                .find_map(|key| map.get(*key))
                .and_then(Self::from_raw),
            _ => None,
        }
    }

    fn from_number(n: f64) -> Option<Self> {
        if !n.is_finite() || n < 0.0 {
            return None;
        }
        // Scores at or below 1.0 are on the unit scale.
        let percent = if n <= 1.0 { n * 100.0 } else { n };
        Some(Self(percent.min(100.0)))
    }

    fn deserialize_raw<'de, D>(deserializer: D) -> Result<Option<Self>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        Ok(raw.as_ref().and_then(Self::from_raw))
    }
}

/// Display label for an optional confidence.
pub fn percent_label(confidence: Option<Confidence>) -> String {
    match confidence {
        Some(c) => format!("{:.0}%", c.percent()),
        None => "not available".to_string(),
    }
}

/// Suggested property fragment (partial name and/or address).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PropertySuggestion {
    #[serde(default, alias = "naziv")]
    pub name: Option<String>,
    #[serde(default, alias = "adresa")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "Confidence::deserialize_raw")]
    pub confidence: Option<Confidence>,
}

/// Suggested tenant fragment (name and/or tax id).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TenantSuggestion {
    #[serde(default, alias = "naziv")]
    pub name: Option<String>,
    #[serde(default)]
    pub oib: Option<String>,
    #[serde(default, deserialize_with = "Confidence::deserialize_raw")]
    pub confidence: Option<Confidence>,
}

/// Suggested contract fragment (internal reference code only).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContractSuggestion {
    #[serde(default, alias = "interna_oznaka", alias = "broj_ugovora")]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "Confidence::deserialize_raw")]
    pub confidence: Option<Confidence>,
}

/// Suggested sub-unit fragment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UnitSuggestion {
    #[serde(default, alias = "oznaka")]
    pub code: Option<String>,
    #[serde(default, alias = "naziv")]
    pub name: Option<String>,
    #[serde(default, alias = "etaza")]
    pub floor: Option<String>,
    #[serde(default, alias = "povrsina")]
    pub area_m2: Option<f64>,
    #[serde(default, deserialize_with = "Confidence::deserialize_raw")]
    pub confidence: Option<Confidence>,
}

impl TenantSuggestion {
    /// Creation payload for this suggestion; `None` without a usable name.
    pub fn to_new_tenant(&self) -> Option<NewTenant> {
        let name = self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())?;
        Some(NewTenant {
            name: name.to_string(),
            oib: self.oib.as_deref().map(str::trim).filter(|o| !o.is_empty()).map(str::to_string),
        })
    }
}

impl UnitSuggestion {
    /// A fragment "names" a unit when it carries a non-blank code or name.
    pub fn is_named(&self) -> bool {
        let named = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());
        named(&self.code) || named(&self.name)
    }

    /// Creation payload scoped to a resolved property; `None` when the
    /// fragment names nothing. Code and name back each other up.
    pub fn to_new_unit(&self, property_id: Uuid) -> Option<NewPropertyUnit> {
        let trimmed = |s: &Option<String>| {
            s.as_deref().map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
        };
        let code = trimmed(&self.code);
        let name = trimmed(&self.name);
        let code = code.clone().or_else(|| name.clone())?;
        let name = name.unwrap_or_else(|| code.clone());
        Some(NewPropertyUnit {
            property_id,
            code,
            name,
            floor: trimmed(&self.floor),
            area_m2: self.area_m2,
        })
    }
}

/// Best-effort extracted fragments for one uploaded document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AiSuggestionBundle {
    #[serde(default, alias = "tip_dokumenta")]
    pub document_type: Option<String>,
    #[serde(default, alias = "nekretnina")]
    pub property: Option<PropertySuggestion>,
    #[serde(default, alias = "najmoprimac")]
    pub tenant: Option<TenantSuggestion>,
    #[serde(default, alias = "ugovor")]
    pub contract: Option<ContractSuggestion>,
    #[serde(default, alias = "jedinica")]
    pub unit: Option<UnitSuggestion>,
    #[serde(default, alias = "broj_racuna")]
    pub invoice_number: Option<String>,
}

/// Full response of the AI extraction service for one PDF.
///
/// `success = false` is a normal outcome; `message` is surfaced to the user
/// verbatim and the draft falls back to manual entry. The service may also
/// report a unit it matched or created on its side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<AiSuggestionBundle>,
    #[serde(default)]
    pub matched_property_unit: Option<PropertyUnit>,
    #[serde(default)]
    pub created_property_unit: Option<PropertyUnit>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn percent(raw: Value) -> Option<f64> {
        Confidence::from_raw(&raw).map(|c| c.percent())
    }

    #[test]
    fn unit_scale_number_becomes_percentage() {
        assert_eq!(percent(json!(0.87)), Some(87.0));
        assert_eq!(percent(json!(1.0)), Some(100.0));
    }

    #[test]
    fn percent_scale_number_passes_through() {
        assert_eq!(percent(json!(42.5)), Some(42.5));
        assert_eq!(percent(json!(250)), Some(100.0));
    }

    #[test]
    fn string_shapes_are_parsed() {
        assert_eq!(percent(json!("0.5")), Some(50.0));
        assert_eq!(percent(json!("73%")), Some(73.0));
        assert_eq!(percent(json!("  88 % ")), Some(88.0));
        assert_eq!(percent(json!("n/a")), None);
    }

    #[test]
    fn object_shapes_are_unwrapped() {
        assert_eq!(percent(json!({ "score": 0.9 })), Some(90.0));
        assert_eq!(percent(json!({ "confidence": "64" })), Some(64.0));
        assert_eq!(percent(json!({ "unrelated": 0.9 })), None);
    }

    #[test]
    fn unscored_is_none_never_zero() {
        assert_eq!(percent(json!(null)), None);
        assert_eq!(percent(json!(true)), None);
        assert_eq!(percent(json!(-3.0)), None);
        assert_eq!(percent_label(None), "not available");
    }

    #[test]
    fn bundle_accepts_croatian_aliases() {
        let bundle: AiSuggestionBundle = serde_json::from_value(json!({
            "tip_dokumenta": "Ugovor o najmu",
            "nekretnina": { "naziv": "Poslovni toranj A", "adresa": "Ilica 1" },
            "najmoprimac": { "naziv": "Alfa d.o.o.", "oib": "12345678901" },
            "ugovor": { "broj_ugovora": "UG-2024-017" },
            "jedinica": { "oznaka": "P-12", "povrsina": 55.0, "confidence": { "score": 0.75 } }
        }))
        .unwrap();

        assert_eq!(bundle.document_type.as_deref(), Some("Ugovor o najmu"));
        assert_eq!(
            bundle.property.as_ref().unwrap().name.as_deref(),
            Some("Poslovni toranj A")
        );
        assert_eq!(
            bundle.tenant.as_ref().unwrap().oib.as_deref(),
            Some("12345678901")
        );
        assert_eq!(
            bundle.contract.as_ref().unwrap().code.as_deref(),
            Some("UG-2024-017")
        );
        let unit = bundle.unit.unwrap();
        assert!(unit.is_named());
        assert_eq!(unit.confidence.map(|c| c.percent()), Some(75.0));
    }
}
