use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;
use crate::registry::{tags, Tag};

/// Value used for every field which is absent from the file.
pub const NOT_AVAILABLE: &str = "N/A";

/// The clinical fields shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRecord {
    pub patient_name: String,
    pub patient_id: String,
    pub study_date: String,
    pub modality: String,
    pub study_description: String,
}

impl MetadataRecord {
    /// Project the clinical fields out of a data set. Never fails.
    pub fn extract(dataset: &Dataset) -> Self {
        Self {
            patient_name: or_na(tt(dataset, tags::PATIENT_NAME)),
            patient_id: or_na(tt(dataset, tags::PATIENT_ID)),
            study_date: or_na(
                tt(dataset, tags::STUDY_DATE).or_else(|| tt(dataset, tags::ACQUISITION_DATE)),
            ),
            modality: or_na(tt(dataset, tags::MODALITY)),
            study_description: or_na(tt(dataset, tags::STUDY_DESCRIPTION)),
        }
    }
}

impl Default for MetadataRecord {
    fn default() -> Self {
        Self::extract(&Dataset::new())
    }
}

/// Try to get the trimmed, non-empty string value of an element.
fn tt(dataset: &Dataset, tag: Tag) -> Option<String> {
    dataset
        .get(tag)
        .map(|e| e.text())
        .filter(|s| !s.is_empty())
}

fn or_na(value: Option<String>) -> String {
    value.unwrap_or_else(|| NOT_AVAILABLE.to_string())
}
