use std::cmp::Ordering;

use crate::firestore::api::query::{
    document_id_value, Bound, FieldFilter, FilterOperator, OrderBy, OrderDirection,
    QueryDefinition,
};
use crate::firestore::api::DocumentSnapshot;
use crate::firestore::model::FieldPath;
use crate::firestore::value::{ArrayValue, FirestoreValue, MapValue, ValueKind};

/// Filters, orders and bounds `documents` the way the store evaluates `definition`.
pub(crate) fn apply_query_to_documents(
    documents: Vec<DocumentSnapshot>,
    definition: &QueryDefinition,
) -> Vec<DocumentSnapshot> {
    let mut filtered: Vec<DocumentSnapshot> = documents
        .into_iter()
        .filter(|snapshot| snapshot.exists())
        .filter(|snapshot| definition.matches_collection(snapshot.document_key()))
        .filter(|snapshot| has_ordered_fields(snapshot, &definition.order_by))
        .filter(|snapshot| document_satisfies_filters(snapshot, &definition.filters))
        .collect();

    filtered.sort_by(|left, right| compare_snapshots(left, right, &definition.order_by));

    if let Some(bound) = &definition.start_after {
        filtered.retain(|snapshot| is_past_bound(snapshot, bound, &definition.order_by));
    }
    if let Some(limit) = definition.limit {
        filtered.truncate(limit as usize);
    }
    filtered
}

/// Resolves a possibly nested field inside the snapshot's data.
pub(crate) fn lookup_field<'a>(
    snapshot: &'a DocumentSnapshot,
    field: &FieldPath,
) -> Option<&'a FirestoreValue> {
    let map = snapshot.map_value()?;
    find_in_map(map, field.segments())
}

fn find_in_map<'a>(map: &'a MapValue, segments: &[String]) -> Option<&'a FirestoreValue> {
    let (first, rest) = segments.split_first()?;
    let value = map.get(first)?;
    if rest.is_empty() {
        Some(value)
    } else if let ValueKind::Map(child) = value.kind() {
        find_in_map(child, rest)
    } else {
        None
    }
}

fn field_value(snapshot: &DocumentSnapshot, field: &FieldPath) -> Option<FirestoreValue> {
    if field.is_document_id() {
        return Some(document_id_value(snapshot.document_key()));
    }
    lookup_field(snapshot, field).cloned()
}

fn has_ordered_fields(snapshot: &DocumentSnapshot, order_by: &[OrderBy]) -> bool {
    order_by
        .iter()
        .all(|order| order.field().is_document_id() || lookup_field(snapshot, order.field()).is_some())
}

fn document_satisfies_filters(snapshot: &DocumentSnapshot, filters: &[FieldFilter]) -> bool {
    filters.iter().all(|filter| match field_value(snapshot, filter.field()) {
        Some(value) => evaluate_filter(filter, &value),
        None => false,
    })
}

fn evaluate_filter(filter: &FieldFilter, value: &FirestoreValue) -> bool {
    let operand = filter.value();
    match filter.operator() {
        FilterOperator::Equal => values_equal(value, operand),
        FilterOperator::NotEqual => !value.is_null() && !values_equal(value, operand),
        FilterOperator::LessThan => compare_same_type(value, operand) == Some(Ordering::Less),
        FilterOperator::LessThanOrEqual => matches!(
            compare_same_type(value, operand),
            Some(Ordering::Less | Ordering::Equal)
        ),
        FilterOperator::GreaterThan => compare_same_type(value, operand) == Some(Ordering::Greater),
        FilterOperator::GreaterThanOrEqual => matches!(
            compare_same_type(value, operand),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        FilterOperator::ArrayContains => match value.kind() {
            ValueKind::Array(array) => array_contains(array, operand),
            _ => false,
        },
        FilterOperator::ArrayContainsAny => match (value.kind(), operand.kind()) {
            (ValueKind::Array(array), ValueKind::Array(needles)) => needles
                .values()
                .iter()
                .any(|needle| array_contains(array, needle)),
            _ => false,
        },
        FilterOperator::In => match operand.kind() {
            ValueKind::Array(candidates) => candidates
                .values()
                .iter()
                .any(|candidate| values_equal(value, candidate)),
            _ => false,
        },
        FilterOperator::NotIn => match operand.kind() {
            ValueKind::Array(candidates) => {
                !value.is_null()
                    && candidates
                        .values()
                        .iter()
                        .all(|candidate| !values_equal(value, candidate))
            }
            _ => false,
        },
    }
}

fn array_contains(array: &ArrayValue, needle: &FirestoreValue) -> bool {
    array.values().iter().any(|candidate| values_equal(candidate, needle))
}

fn values_equal(left: &FirestoreValue, right: &FirestoreValue) -> bool {
    compare_same_type(left, right) == Some(Ordering::Equal)
}

fn type_rank(value: &FirestoreValue) -> u8 {
    match value.kind() {
        ValueKind::Null => 0,
        ValueKind::Boolean(_) => 1,
        ValueKind::Integer(_) | ValueKind::Double(_) => 2,
        ValueKind::Timestamp(_) => 3,
        ValueKind::String(_) => 4,
        ValueKind::Reference(_) => 5,
        ValueKind::Array(_) => 6,
        ValueKind::Map(_) => 7,
    }
}

/// Ordering within one type class; `None` across classes so filters never match.
fn compare_same_type(left: &FirestoreValue, right: &FirestoreValue) -> Option<Ordering> {
    if type_rank(left) != type_rank(right) {
        return None;
    }
    Some(compare_values(left, right))
}

/// Total order used for sorting: type rank first, then value.
fn compare_values(left: &FirestoreValue, right: &FirestoreValue) -> Ordering {
    let rank = type_rank(left).cmp(&type_rank(right));
    if rank != Ordering::Equal {
        return rank;
    }
    match (left.kind(), right.kind()) {
        (ValueKind::Boolean(a), ValueKind::Boolean(b)) => a.cmp(b),
        (ValueKind::Integer(a), ValueKind::Integer(b)) => a.cmp(b),
        (ValueKind::Integer(a), ValueKind::Double(b)) => compare_doubles(*a as f64, *b),
        (ValueKind::Double(a), ValueKind::Integer(b)) => compare_doubles(*a, *b as f64),
        (ValueKind::Double(a), ValueKind::Double(b)) => compare_doubles(*a, *b),
        (ValueKind::Timestamp(a), ValueKind::Timestamp(b)) => a.cmp(b),
        (ValueKind::String(a), ValueKind::String(b)) => a.cmp(b),
        (ValueKind::Reference(a), ValueKind::Reference(b)) => a.split('/').cmp(b.split('/')),
        (ValueKind::Array(a), ValueKind::Array(b)) => {
            for (x, y) in a.values().iter().zip(b.values()) {
                let ordering = compare_values(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.values().len().cmp(&b.values().len())
        }
        (ValueKind::Map(a), ValueKind::Map(b)) => {
            for ((ka, va), (kb, vb)) in a.fields().iter().zip(b.fields()) {
                let ordering = ka.cmp(kb).then_with(|| compare_values(va, vb));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.fields().len().cmp(&b.fields().len())
        }
        _ => Ordering::Equal,
    }
}

// NaN sorts before every other number.
fn compare_doubles(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

fn compare_snapshots(left: &DocumentSnapshot, right: &DocumentSnapshot, order_by: &[OrderBy]) -> Ordering {
    for order in order_by {
        let left_value = field_value(left, order.field()).unwrap_or_else(FirestoreValue::null);
        let right_value = field_value(right, order.field()).unwrap_or_else(FirestoreValue::null);
        let ordering = directed(compare_values(&left_value, &right_value), order.direction());
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn directed(ordering: Ordering, direction: OrderDirection) -> Ordering {
    match direction {
        OrderDirection::Ascending => ordering,
        OrderDirection::Descending => ordering.reverse(),
    }
}

fn is_past_bound(snapshot: &DocumentSnapshot, bound: &Bound, order_by: &[OrderBy]) -> bool {
    compare_snapshot_to_bound(snapshot, bound, order_by) == Ordering::Greater
}

fn compare_snapshot_to_bound(snapshot: &DocumentSnapshot, bound: &Bound, order_by: &[OrderBy]) -> Ordering {
    for (order, bound_value) in order_by.iter().zip(bound.values()) {
        let value = field_value(snapshot, order.field()).unwrap_or_else(FirestoreValue::null);
        let ordering = directed(compare_values(&value, bound_value), order.direction());
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
