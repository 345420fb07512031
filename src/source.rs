use crate::record::ValuationRecord;
use serde_json::Value;
use std::collections::BTreeMap;

/// Supplies fully populated records by identifier.
pub trait DocumentSource: Send + Sync {
    fn lookup(&self, id: &str) -> Option<ValuationRecord>;
}

const SAMPLE_RECORD: &str = include_str!("../fixtures/sample_valuation.json");

/// Records held in memory, keyed by `id`.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: BTreeMap<String, ValuationRecord>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source holding the bundled sample valuation.
    pub fn sample() -> Result<Self, serde_json::Error> {
        Self::from_json(SAMPLE_RECORD)
    }

    /// Accepts a single record object or an array of them.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(raw)?;
        let records: Vec<ValuationRecord> = match value {
            Value::Array(_) => serde_json::from_value(value)?,
            other => vec![serde_json::from_value(other)?],
        };
        let mut source = Self::new();
        for record in records {
            source.insert(record);
        }
        Ok(source)
    }

    /// Inserts or replaces the record with the same id.
    pub fn insert(&mut self, record: ValuationRecord) {
        self.records.insert(record.id.clone(), record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl DocumentSource for InMemorySource {
    fn lookup(&self, id: &str) -> Option<ValuationRecord> {
        self.records.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_is_found_by_id() {
        let source = InMemorySource::sample().expect("sample");
        assert_eq!(source.len(), 1);
        let record = source
            .lookup("cd8cb1dd-0343-48b1-9831-183c9d31c46f")
            .expect("sample record");
        assert_eq!(record.quality_control.valuation_amount, Some(40000.0));
        assert!(source.lookup("missing").is_none());
    }

    #[test]
    fn from_json_accepts_arrays() {
        let source =
            InMemorySource::from_json(r#"[{"id": "a"}, {"id": "b"}, {"id": "a", "Status": "Closed"}]"#)
                .expect("parse");
        assert_eq!(source.len(), 2);
        let replaced = source.lookup("a").expect("a");
        assert_eq!(replaced.status.as_deref(), Some("Closed"));
    }

    #[test]
    fn from_json_rejects_scalars() {
        assert!(InMemorySource::from_json("42").is_err());
    }
}
