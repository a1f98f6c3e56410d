use std::collections::BTreeMap;

use calc_core::value::OrdinalValue;
use calc_core::CalculatorValue;
use serde::{Deserialize, Serialize};

/// How `type` tags are written in a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeFormat {
    /// Variant names, `"type": "Currency"`
    #[default]
    Name,
    /// Ordinal codes, `"type": 1`
    Ordinal,
}

/// Query string of `POST /api/calculate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CalculateQuery {
    #[serde(default)]
    pub types: TypeFormat,
}

/// Body of `POST /api/calculate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub expression: String,
    #[serde(default)]
    pub context: RequestContext,
}

/// Optional per-request context. Missing settings use the daemon defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Variable name to expression text
    #[serde(default)]
    pub variables: BTreeMap<String, String>,
    pub timezone: Option<String>,
    pub ppi: Option<f64>,
    pub em_size: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateResponse {
    pub result: CalculatorValue,
    pub variables: BTreeMap<String, CalculatorValue>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
}

/// [`CalculateResponse`] with ordinal type tags.
#[derive(Debug, Serialize)]
pub struct OrdinalCalculateResponse<'a> {
    pub result: OrdinalValue<'a>,
    pub variables: BTreeMap<&'a str, OrdinalValue<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> From<&'a CalculateResponse> for OrdinalCalculateResponse<'a> {
    fn from(response: &'a CalculateResponse) -> Self {
        OrdinalCalculateResponse {
            result: response.result.as_ordinal(),
            variables: response
                .variables
                .iter()
                .map(|(name, value)| (name.as_str(), value.as_ordinal()))
                .collect(),
            error: response.error.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
