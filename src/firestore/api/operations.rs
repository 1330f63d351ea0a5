use std::collections::HashSet;

use crate::firestore::error::{invalid_argument, FirestoreResult};
use crate::firestore::model::FieldPath;
use crate::firestore::value::{DocumentData, FirestoreValue, MapValue, ValueKind};

/// Options for `set`-style writes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SetOptions {
    /// Merge the provided fields into the existing document instead of replacing it.
    pub merge: bool,
    /// Explicit field mask; takes precedence over `merge`.
    pub merge_fields: Option<Vec<FieldPath>>,
}

impl SetOptions {
    pub fn merge_all() -> Self {
        Self {
            merge: true,
            merge_fields: None,
        }
    }

    pub fn merge_fields<I>(fields: I) -> FirestoreResult<Self>
    where
        I: IntoIterator<Item = FieldPath>,
    {
        let mut seen = HashSet::new();
        let unique: Vec<FieldPath> = fields
            .into_iter()
            .filter(|field| seen.insert(field.canonical_string()))
            .collect();
        if unique.is_empty() {
            return Err(invalid_argument("merge_fields requires at least one field path"));
        }
        Ok(Self {
            merge: false,
            merge_fields: Some(unique),
        })
    }
}

#[derive(Clone, Debug)]
pub(crate) struct EncodedSetData {
    pub map: MapValue,
    pub mask: Option<Vec<FieldPath>>,
}

#[derive(Clone, Debug)]
pub(crate) struct EncodedUpdateData {
    pub map: MapValue,
    pub field_paths: Vec<FieldPath>,
}

pub(crate) fn encode_set_data(data: DocumentData, options: &SetOptions) -> FirestoreResult<EncodedSetData> {
    let mask = if let Some(fields) = &options.merge_fields {
        let available: HashSet<String> = leaf_paths(&data, &[])
            .iter()
            .map(FieldPath::canonical_string)
            .collect();
        for field in fields {
            let name = field.canonical_string();
            let covered = available
                .iter()
                .any(|path| path == &name || path.starts_with(&format!("{name}.")));
            if !covered {
                return Err(invalid_argument(format!(
                    "Field '{name}' is in the merge mask but missing from the input data"
                )));
            }
        }
        Some(fields.clone())
    } else if options.merge {
        Some(leaf_paths(&data, &[]))
    } else {
        None
    };
    Ok(EncodedSetData {
        map: MapValue::new(data),
        mask,
    })
}

/// Top-level keys are read as dot-separated field paths, as `update` does in the store.
pub(crate) fn encode_update_data(data: DocumentData) -> FirestoreResult<EncodedUpdateData> {
    if data.is_empty() {
        return Err(invalid_argument("update requires at least one field/value pair"));
    }
    let mut map = DocumentData::new();
    let mut field_paths = Vec::with_capacity(data.len());
    for (key, value) in data {
        let path = FieldPath::from_dot_separated(&key)?;
        set_at_path(&mut map, path.segments(), value);
        field_paths.push(path);
    }
    Ok(EncodedUpdateData {
        map: MapValue::new(map),
        field_paths,
    })
}

fn leaf_paths(data: &DocumentData, parent: &[String]) -> Vec<FieldPath> {
    let mut paths = Vec::new();
    for (key, value) in data {
        let mut segments = parent.to_vec();
        segments.push(key.clone());
        match value.kind() {
            ValueKind::Map(child) if !child.fields().is_empty() => {
                paths.extend(leaf_paths(child.fields(), &segments));
            }
            _ => paths.push(FieldPath::from_segments(segments)),
        }
    }
    paths
}

/// Reads the value at `segments`, descending through nested maps.
pub(crate) fn get_at_path<'a>(data: &'a DocumentData, segments: &[String]) -> Option<&'a FirestoreValue> {
    let (first, rest) = segments.split_first()?;
    let value = data.get(first)?;
    if rest.is_empty() {
        return Some(value);
    }
    value.as_map().and_then(|map| get_at_path(map.fields(), rest))
}

/// Writes `value` at `segments`, creating or replacing intermediate maps.
pub(crate) fn set_at_path(data: &mut DocumentData, segments: &[String], value: FirestoreValue) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        data.insert(first.clone(), value);
        return;
    }
    let mut child = data
        .get(first)
        .and_then(FirestoreValue::as_map)
        .map(|map| map.fields().clone())
        .unwrap_or_default();
    set_at_path(&mut child, rest, value);
    data.insert(first.clone(), FirestoreValue::from_map(child));
}

pub(crate) fn delete_at_path(data: &mut DocumentData, segments: &[String]) {
    let Some((first, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        data.remove(first);
        return;
    }
    if let Some(map) = data.get(first).and_then(FirestoreValue::as_map) {
        let mut child = map.fields().clone();
        delete_at_path(&mut child, rest);
        data.insert(first.clone(), FirestoreValue::from_map(child));
    }
}

/// Copies every masked field from `source` into `target`; masked fields absent from `source` are removed.
pub(crate) fn apply_field_mask(target: &mut DocumentData, source: &DocumentData, mask: &[FieldPath]) {
    for field in mask {
        match get_at_path(source, field.segments()) {
            Some(value) => set_at_path(target, field.segments(), value.clone()),
            None => delete_at_path(target, field.segments()),
        }
    }
}
