use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation ID for tracking one index run or search across crates
///
/// Uses UUID v4, so every operation gets a fresh id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CorrelationId(Uuid);

impl CorrelationId {
    /// Generate a new correlation ID using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID value
    pub const fn to_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for CorrelationId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl From<&str> for CorrelationId {
    fn from(id: &str) -> Self {
        Uuid::try_parse(id).map_or_else(|_| Self(Uuid::new_v4()), Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correlation_ids_are_unique() {
        assert_ne!(CorrelationId::new(), CorrelationId::new());
    }

    #[test]
    fn test_correlation_id_parses_uuid_strings() {
        let raw = "6f1c2a8e-3b7d-4c9e-8a1f-2d3e4f5a6b7c";
        let id = CorrelationId::from(raw);
        assert_eq!(id.to_string(), raw);

        // Garbage input still yields a usable id
        let fallback = CorrelationId::from("not-a-uuid");
        assert_ne!(fallback.to_string(), "not-a-uuid");
    }
}
