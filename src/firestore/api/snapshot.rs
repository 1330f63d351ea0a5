use crate::firestore::model::DocumentKey;
use crate::firestore::value::{DocumentData, FirestoreValue, MapValue};

/// State of a single document at read time. A missing document has no data.
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    data: Option<MapValue>,
}

impl DocumentSnapshot {
    pub fn new(key: DocumentKey, data: Option<MapValue>) -> Self {
        Self { key, data }
    }

    pub fn missing(key: DocumentKey) -> Self {
        Self { key, data: None }
    }

    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    pub fn data(&self) -> Option<&DocumentData> {
        self.data.as_ref().map(MapValue::fields)
    }

    /// Reads a top-level field; `None` when the document or the field is absent.
    pub fn get(&self, field: &str) -> Option<&FirestoreValue> {
        self.data.as_ref().and_then(|map| map.get(field))
    }

    pub fn id(&self) -> &str {
        self.key.id()
    }

    pub fn document_key(&self) -> &DocumentKey {
        &self.key
    }

    pub(crate) fn map_value(&self) -> Option<&MapValue> {
        self.data.as_ref()
    }

    pub fn into_data(self) -> Option<DocumentData> {
        self.data.map(MapValue::into_fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reports_existence() {
        let key = DocumentKey::from_string("cities/sf").unwrap();
        let snapshot = DocumentSnapshot::missing(key.clone());
        assert!(!snapshot.exists());
        assert!(snapshot.get("name").is_none());

        let mut data = DocumentData::new();
        data.insert("name".into(), "San Francisco".into());
        let snapshot = DocumentSnapshot::new(key, Some(MapValue::new(data)));
        assert!(snapshot.exists());
        assert_eq!(snapshot.get("name").and_then(FirestoreValue::as_str), Some("San Francisco"));
        assert_eq!(snapshot.id(), "sf");
    }
}
