use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::{Package, PackageId, Role};

/// Response envelope shared by every backend endpoint:
/// `{model: T|null, errors: string[]|null}`.
///
/// Decoding rules live in the gateway; this type only mirrors the wire shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub model: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Server-side pagination/sort request. Page numbers are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page_no: u32,
    pub page_size: u32,
    pub sort_column: String,
    pub sort_order: SortOrder,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_no: 0,
            page_size: 10,
            sort_column: "package_no".into(),
            sort_order: SortOrder::Asc,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<Package>,
    pub total_record: u64,
    pub total_page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelRequest {
    pub cancel_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NutritionExtractRequest {
    pub image_b64: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Nutrient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

/// Structured fields parsed out of a photographed nutrition label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionFacts {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calories: Option<f64>,
    pub nutrients: Vec<Nutrient>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleResponse {
    pub role: Role,
}

/// Set of package ids signaled as changed over the realtime channel.
/// Possibly stale, possibly duplicate; a hint to re-query authoritative
/// state, never a delta to apply directly.
pub type RefreshSet = HashSet<PackageId>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_tolerates_missing_fields() {
        let envelope: ApiEnvelope<RoleResponse> =
            serde_json::from_str("{}").expect("envelope");
        assert!(envelope.model.is_none());
        assert!(envelope.errors.is_none());
    }

    #[test]
    fn envelope_decodes_structured_errors() {
        let envelope: ApiEnvelope<RoleResponse> =
            serde_json::from_str(r#"{"model":null,"errors":["reason required"]}"#)
                .expect("envelope");
        assert!(envelope.model.is_none());
        assert_eq!(envelope.errors, Some(vec!["reason required".to_string()]));
    }
}
