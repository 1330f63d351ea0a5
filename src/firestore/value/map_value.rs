use crate::firestore::value::{DocumentData, FirestoreValue};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MapValue {
    fields: DocumentData,
}

impl MapValue {
    pub fn new(fields: DocumentData) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &DocumentData {
        &self.fields
    }

    pub fn get(&self, field: &str) -> Option<&FirestoreValue> {
        self.fields.get(field)
    }

    pub fn into_fields(self) -> DocumentData {
        self.fields
    }
}
