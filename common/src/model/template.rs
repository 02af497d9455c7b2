use crate::model::UnknownVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The official tax forms the office publishes and accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateType {
    AnnualReturns,
    RemittanceSchedule,
    WithholdingTax,
}

impl TemplateType {
    pub const ALL: [TemplateType; 3] = [
        TemplateType::AnnualReturns,
        TemplateType::RemittanceSchedule,
        TemplateType::WithholdingTax,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateType::AnnualReturns => "annual_returns",
            TemplateType::RemittanceSchedule => "remittance_schedule",
            TemplateType::WithholdingTax => "withholding_tax",
        }
    }
}

impl fmt::Display for TemplateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TemplateType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| UnknownVariant {
                kind: "template type",
                value: s.to_string(),
            })
    }
}

/// A downloadable tax-form template.
///
/// Templates are never removed: deleting one clears `is_active` and keeps the record
/// and its stored file so existing submissions can still be traced back to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
    pub file_url: String,
    pub file_reference: String,
    pub version: String,
    pub original_filename: Option<String>,
    pub file_extension: Option<String>,
    pub download_count: u64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Slim projection used by the template picker.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub template_type: TemplateType,
}
