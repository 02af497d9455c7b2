use serde::{Deserialize, Serialize};

/// Reference to a document held by the document store.
///
/// `url` is what clients download from; `reference_id` is the store-side handle that
/// identifies the object for any later replacement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredDocument {
    pub url: String,
    pub reference_id: String,
}

impl StoredDocument {
    pub fn is_complete(&self) -> bool {
        !self.url.trim().is_empty() && !self.reference_id.trim().is_empty()
    }
}
