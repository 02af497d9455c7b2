use crate::model::document::StoredDocument;
use crate::model::template::TemplateType;
use crate::model::UnknownVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Review state of a submission. `Pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(SubmissionStatus::Pending),
            "approved" => Ok(SubmissionStatus::Approved),
            "rejected" => Ok(SubmissionStatus::Rejected),
            other => Err(UnknownVariant {
                kind: "submission status",
                value: other.to_string(),
            }),
        }
    }
}

/// The adjudication recorded when a submission leaves `Pending`.
///
/// The three fields only ever exist together, which is why they live in one struct
/// rather than as independent optionals on [`Submission`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub reviewed_at: DateTime<Utc>,
    pub reviewed_by: String,
    pub review_comments: String,
}

/// A tax return filed by a user: the completed template plus one supporting document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub template_type: TemplateType,
    pub tax_period: String,
    pub main_file: StoredDocument,
    pub supporting_doc: StoredDocument,
    pub comments: Option<String>,
    pub status: SubmissionStatus,
    #[serde(flatten)]
    pub review: Option<Review>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Identity fields of the submitting user, attached to admin listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSummary {
    pub id: String,
    pub name: String,
    pub nstin: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionWithOwner {
    #[serde(flatten)]
    pub submission: Submission,
    /// `None` when the owning account has since been removed.
    pub owner: Option<OwnerSummary>,
}

/// Filter accepted by the admin submission listing.
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub search: Option<String>,
}
