use aliri_braid::braid;

/// Identifies one request in the logs.
#[braid(serde)]
pub struct RequestId;

impl RequestId {
    /// A new, unique, lexicographically sortable id.
    pub fn generate() -> Self {
        Self::new(ulid::Ulid::new().to_string())
    }
}
