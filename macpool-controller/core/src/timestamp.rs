use chrono::{SecondsFormat, Utc};
use macpool_controller_k8s_api::{ObjectMeta, TRANSACTION_TIMESTAMP_ANNOTATION};
use std::fmt;

/// Opaque marker stamped into the transaction-timestamp annotation whenever
/// an allocation pass runs. Downstream consumers treat it as a traceability
/// token, not a clock.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionTimestamp(String);

impl TransactionTimestamp {
    pub fn now() -> Self {
        Self(Utc::now().to_rfc3339_opts(SecondsFormat::Nanos, true))
    }

    /// Writes the timestamp into the object's annotations, creating the map
    /// if needed.
    pub fn apply(&self, meta: &mut ObjectMeta) {
        meta.annotations
            .get_or_insert_with(Default::default)
            .insert(TRANSACTION_TIMESTAMP_ANNOTATION.to_string(), self.0.clone());
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macpool_controller_k8s_api::transaction_timestamp;

    #[test]
    fn apply_creates_the_annotations_map() {
        let mut meta = ObjectMeta::default();
        let ts = TransactionTimestamp::now();
        ts.apply(&mut meta);
        assert_eq!(transaction_timestamp(&meta), Some(ts.as_str()));
    }

    #[test]
    fn apply_overwrites_a_previous_stamp() {
        let mut meta = ObjectMeta::default();
        TransactionTimestamp("then".to_string()).apply(&mut meta);
        let ts = TransactionTimestamp::now();
        ts.apply(&mut meta);
        assert_eq!(transaction_timestamp(&meta), Some(ts.as_str()));
    }
}
