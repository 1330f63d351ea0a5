use std::str::FromStr;

use serde_json::{json, Map, Value as JsonValue};

use crate::firestore::api::query::{Bound, FieldFilter, FilterOperator, OrderDirection, QueryDefinition};
use crate::firestore::api::DocumentSnapshot;
use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::{DatabaseId, DocumentKey, FieldPath, Timestamp};
use crate::firestore::value::{DocumentData, FirestoreValue, MapValue, ValueKind};

use super::datastore::WriteOperation;

/// Converts between crate types and the REST JSON representation of the v1 protos.
#[derive(Clone, Debug)]
pub struct JsonProtoSerializer {
    database_id: DatabaseId,
}

impl JsonProtoSerializer {
    pub fn new(database_id: DatabaseId) -> Self {
        Self { database_id }
    }

    pub fn database_id(&self) -> &DatabaseId {
        &self.database_id
    }

    fn documents_root(&self) -> String {
        format!("{}/documents", self.database_id.resource_name())
    }

    pub fn document_name(&self, key: &DocumentKey) -> String {
        format!("{}/{}", self.documents_root(), key.path())
    }

    /// Parses `projects/{p}/databases/{d}/documents/{path}` into a key.
    pub fn decode_document_name(&self, name: &str) -> FirestoreResult<DocumentKey> {
        let prefix = format!("{}/", self.documents_root());
        let relative = name
            .strip_prefix(&prefix)
            .ok_or_else(|| invalid_argument(format!("Document name '{name}' is outside {}", self.documents_root())))?;
        DocumentKey::from_string(relative)
    }

    pub fn encode_write(&self, write: &WriteOperation) -> JsonValue {
        match write {
            WriteOperation::Set { key, data, mask } => {
                let mut entry = self.encode_update_entry(key, data);
                if let Some(mask) = mask {
                    entry.insert("updateMask".into(), encode_mask(mask));
                }
                JsonValue::Object(entry)
            }
            WriteOperation::Update { key, data, field_paths } => {
                let mut entry = self.encode_update_entry(key, data);
                entry.insert("updateMask".into(), encode_mask(field_paths));
                entry.insert("currentDocument".into(), json!({ "exists": true }));
                JsonValue::Object(entry)
            }
            WriteOperation::Delete { key } => json!({ "delete": self.document_name(key) }),
        }
    }

    pub fn encode_commit_body(&self, writes: &[WriteOperation]) -> JsonValue {
        json!({
            "writes": writes.iter().map(|write| self.encode_write(write)).collect::<Vec<_>>()
        })
    }

    fn encode_update_entry(&self, key: &DocumentKey, data: &MapValue) -> Map<String, JsonValue> {
        let mut entry = Map::new();
        entry.insert(
            "update".into(),
            json!({
                "name": self.document_name(key),
                "fields": self.encode_fields(data.fields()),
            }),
        );
        entry
    }

    pub fn encode_fields(&self, fields: &DocumentData) -> JsonValue {
        JsonValue::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), self.encode_value(value)))
                .collect(),
        )
    }

    pub fn encode_value(&self, value: &FirestoreValue) -> JsonValue {
        match value.kind() {
            ValueKind::Null => json!({ "nullValue": JsonValue::Null }),
            ValueKind::Boolean(flag) => json!({ "booleanValue": flag }),
            ValueKind::Integer(integer) => json!({ "integerValue": integer.to_string() }),
            ValueKind::Double(double) => json!({ "doubleValue": double }),
            ValueKind::Timestamp(timestamp) => json!({ "timestampValue": timestamp.to_rfc3339() }),
            ValueKind::String(text) => json!({ "stringValue": text }),
            ValueKind::Reference(path) => {
                json!({ "referenceValue": format!("{}/{}", self.documents_root(), path) })
            }
            ValueKind::Array(array) => json!({
                "arrayValue": {
                    "values": array.values().iter().map(|value| self.encode_value(value)).collect::<Vec<_>>()
                }
            }),
            ValueKind::Map(map) => json!({ "mapValue": { "fields": self.encode_fields(map.fields()) } }),
        }
    }

    /// Decodes a `Document` resource; a document without `fields` exists with no data.
    pub fn decode_document(&self, value: &JsonValue) -> FirestoreResult<DocumentSnapshot> {
        let name = value
            .get("name")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| invalid_argument("Document resource is missing its name"))?;
        let key = self.decode_document_name(name)?;
        let fields = self.decode_map_value(value)?;
        Ok(DocumentSnapshot::new(key, Some(fields)))
    }

    fn decode_map_value(&self, value: &JsonValue) -> FirestoreResult<MapValue> {
        let fields = match value.get("fields") {
            None | Some(JsonValue::Null) => return Ok(MapValue::default()),
            Some(fields) => fields
                .as_object()
                .ok_or_else(|| invalid_argument("Expected 'fields' to be an object"))?,
        };
        let mut decoded = DocumentData::new();
        for (key, value) in fields {
            decoded.insert(key.clone(), self.decode_value(value)?);
        }
        Ok(MapValue::new(decoded))
    }

    pub fn decode_value(&self, value: &JsonValue) -> FirestoreResult<FirestoreValue> {
        let object = value
            .as_object()
            .ok_or_else(|| invalid_argument("Expected Firestore value object"))?;
        let (kind, inner) = object
            .iter()
            .next()
            .ok_or_else(|| invalid_argument("Empty Firestore value object"))?;
        match kind.as_str() {
            "nullValue" => Ok(FirestoreValue::null()),
            "booleanValue" => inner
                .as_bool()
                .map(FirestoreValue::from_bool)
                .ok_or_else(|| invalid_argument("booleanValue must be bool")),
            "integerValue" => {
                let parsed = match inner {
                    JsonValue::String(text) => i64::from_str(text)
                        .map_err(|err| invalid_argument(format!("Invalid integerValue: {err}")))?,
                    JsonValue::Number(number) => number
                        .as_i64()
                        .ok_or_else(|| invalid_argument("integerValue out of range"))?,
                    _ => return Err(invalid_argument("integerValue must be a string or number")),
                };
                Ok(FirestoreValue::from_integer(parsed))
            }
            "doubleValue" => {
                let parsed = match inner {
                    JsonValue::Number(number) => number.as_f64().unwrap_or(f64::NAN),
                    JsonValue::String(text) => text
                        .parse::<f64>()
                        .map_err(|err| invalid_argument(format!("Invalid doubleValue: {err}")))?,
                    _ => return Err(invalid_argument("doubleValue must be a number or string")),
                };
                Ok(FirestoreValue::from_double(parsed))
            }
            "timestampValue" => {
                let text = inner
                    .as_str()
                    .ok_or_else(|| invalid_argument("timestampValue must be string"))?;
                Ok(FirestoreValue::from_timestamp(Timestamp::parse_rfc3339(text)?))
            }
            "stringValue" => inner
                .as_str()
                .map(FirestoreValue::from_string)
                .ok_or_else(|| invalid_argument("stringValue must be string")),
            "referenceValue" => {
                let name = inner
                    .as_str()
                    .ok_or_else(|| invalid_argument("referenceValue must be string"))?;
                let key = self.decode_document_name(name)?;
                Ok(FirestoreValue::from_reference(key.path().canonical_string()))
            }
            "arrayValue" => {
                let values = match inner.get("values").and_then(JsonValue::as_array) {
                    Some(entries) => entries
                        .iter()
                        .map(|entry| self.decode_value(entry))
                        .collect::<FirestoreResult<Vec<_>>>()?,
                    None => Vec::new(),
                };
                Ok(FirestoreValue::from_array(values))
            }
            "mapValue" => Ok(FirestoreValue::from_map(self.decode_map_value(inner)?.into_fields())),
            other => Err(invalid_argument(format!("Unsupported Firestore value type '{other}'"))),
        }
    }

    /// Relative parent path for `:runQuery`, e.g. `documents` or `documents/users/alice`.
    pub fn query_parent(&self, definition: &QueryDefinition) -> String {
        let parent = definition.collection_path().without_last();
        if parent.is_empty() {
            "documents".to_string()
        } else {
            format!("documents/{parent}")
        }
    }

    pub fn encode_run_query_body(&self, definition: &QueryDefinition) -> JsonValue {
        json!({ "structuredQuery": self.encode_structured_query(definition) })
    }

    fn encode_structured_query(&self, definition: &QueryDefinition) -> JsonValue {
        let mut structured = Map::new();
        let collection_id = definition.collection_path().last_segment().unwrap_or_default();
        structured.insert("from".into(), json!([{ "collectionId": collection_id }]));

        if !definition.filters.is_empty() {
            structured.insert("where".into(), self.encode_filters(&definition.filters));
        }
        let orders: Vec<JsonValue> = definition
            .order_by
            .iter()
            .map(|order| {
                json!({
                    "field": { "fieldPath": order.field().canonical_string() },
                    "direction": match order.direction() {
                        OrderDirection::Ascending => "ASCENDING",
                        OrderDirection::Descending => "DESCENDING",
                    },
                })
            })
            .collect();
        structured.insert("orderBy".into(), JsonValue::Array(orders));
        if let Some(limit) = definition.limit {
            structured.insert("limit".into(), json!(limit));
        }
        if let Some(start) = &definition.start_after {
            structured.insert("startAt".into(), self.encode_cursor(start));
        }
        JsonValue::Object(structured)
    }

    fn encode_filters(&self, filters: &[FieldFilter]) -> JsonValue {
        if let [single] = filters {
            return self.encode_field_filter(single);
        }
        json!({
            "compositeFilter": {
                "op": "AND",
                "filters": filters.iter().map(|filter| self.encode_field_filter(filter)).collect::<Vec<_>>(),
            }
        })
    }

    fn encode_field_filter(&self, filter: &FieldFilter) -> JsonValue {
        json!({
            "fieldFilter": {
                "field": { "fieldPath": filter.field().canonical_string() },
                "op": operator_name(filter.operator()),
                "value": self.encode_value(filter.value()),
            }
        })
    }

    fn encode_cursor(&self, bound: &Bound) -> JsonValue {
        json!({
            "values": bound.values().iter().map(|value| self.encode_value(value)).collect::<Vec<_>>(),
            "before": false,
        })
    }

    /// Decodes the streamed `:runQuery` response array, skipping progress-only entries.
    pub fn decode_run_query_response(&self, value: &JsonValue) -> FirestoreResult<Vec<DocumentSnapshot>> {
        let entries = match value {
            JsonValue::Array(entries) => entries.as_slice(),
            JsonValue::Null => &[],
            _ => return Err(invalid_argument("runQuery response must be an array")),
        };
        entries
            .iter()
            .filter_map(|entry| entry.get("document"))
            .map(|document| self.decode_document(document))
            .collect()
    }
}

fn operator_name(operator: FilterOperator) -> &'static str {
    match operator {
        FilterOperator::LessThan => "LESS_THAN",
        FilterOperator::LessThanOrEqual => "LESS_THAN_OR_EQUAL",
        FilterOperator::Equal => "EQUAL",
        FilterOperator::NotEqual => "NOT_EQUAL",
        FilterOperator::GreaterThan => "GREATER_THAN",
        FilterOperator::GreaterThanOrEqual => "GREATER_THAN_OR_EQUAL",
        FilterOperator::ArrayContains => "ARRAY_CONTAINS",
        FilterOperator::ArrayContainsAny => "ARRAY_CONTAINS_ANY",
        FilterOperator::In => "IN",
        FilterOperator::NotIn => "NOT_IN",
    }
}

fn encode_mask(fields: &[FieldPath]) -> JsonValue {
    json!({ "fieldPaths": fields.iter().map(FieldPath::canonical_string).collect::<Vec<_>>() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::firestore::api::{Firestore, FilterOperator, OrderDirection};

    fn serializer() -> JsonProtoSerializer {
        JsonProtoSerializer::new(DatabaseId::new("demo", "(default)"))
    }

    #[test]
    fn decodes_document_resource() {
        let document = json!({
            "name": "projects/demo/databases/(default)/documents/users/ada",
            "fields": {
                "name": { "stringValue": "Ada" },
                "age": { "integerValue": "36" },
                "tags": { "arrayValue": { "values": [{ "booleanValue": true }] } },
                "manager": { "referenceValue": "projects/demo/databases/(default)/documents/users/grace" },
                "address": { "mapValue": { "fields": { "city": { "stringValue": "London" } } } }
            },
            "createTime": "2024-01-01T00:00:00Z"
        });
        let snapshot = serializer().decode_document(&document).unwrap();
        assert_eq!(snapshot.id(), "ada");
        assert_eq!(snapshot.get("age"), Some(&FirestoreValue::from_integer(36)));
        assert_eq!(snapshot.get("manager"), Some(&FirestoreValue::from_reference("users/grace")));
    }

    #[test]
    fn encodes_update_write_with_precondition() {
        let key = DocumentKey::from_string("users/ada").unwrap();
        let data = MapValue::new(DocumentData::from([("age".to_string(), FirestoreValue::from(37))]));
        let write = WriteOperation::Update {
            key,
            data,
            field_paths: vec![FieldPath::from_dot_separated("age").unwrap()],
        };
        let encoded = serializer().encode_write(&write);
        assert_eq!(encoded["update"]["name"], "projects/demo/databases/(default)/documents/users/ada");
        assert_eq!(encoded["update"]["fields"]["age"], json!({ "integerValue": "37" }));
        assert_eq!(encoded["updateMask"], json!({ "fieldPaths": ["age"] }));
        assert_eq!(encoded["currentDocument"], json!({ "exists": true }));
    }

    #[test]
    fn encodes_structured_query() {
        let query = Firestore::with_database_id(DatabaseId::new("demo", "(default)"))
            .query("users/ada/posts")
            .unwrap()
            .where_field("likes", FilterOperator::GreaterThan, 10)
            .unwrap()
            .order_by("likes", OrderDirection::Descending)
            .unwrap()
            .limit(5)
            .unwrap();
        let definition = query.definition();
        let serializer = serializer();
        assert_eq!(serializer.query_parent(&definition), "documents/users/ada");
        let body = serializer.encode_run_query_body(&definition);
        let structured = &body["structuredQuery"];
        assert_eq!(structured["from"], json!([{ "collectionId": "posts" }]));
        assert_eq!(structured["where"]["fieldFilter"]["op"], "GREATER_THAN");
        assert_eq!(structured["orderBy"][1]["field"]["fieldPath"], "__name__");
        assert_eq!(structured["limit"], 5);
    }

    #[test]
    fn run_query_response_skips_read_time_entries() {
        let response = json!([
            { "readTime": "2024-01-01T00:00:00Z" },
            { "document": { "name": "projects/demo/databases/(default)/documents/users/ada" } }
        ]);
        let documents = serializer().decode_run_query_response(&response).unwrap();
        assert_eq!(documents.len(), 1);
        assert!(documents[0].exists());
    }
}
