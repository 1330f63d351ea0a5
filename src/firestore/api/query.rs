use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::firestore::error::{invalid_argument, FirestoreError, FirestoreResult};
use crate::firestore::model::{DocumentKey, FieldPath, IntoFieldPath, ResourcePath};
use crate::firestore::value::{FirestoreValue, ValueKind};

use super::database::Firestore;
use super::snapshot::DocumentSnapshot;

/// Relational operators understood by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    LessThan,
    LessThanOrEqual,
    Equal,
    NotEqual,
    GreaterThan,
    GreaterThanOrEqual,
    ArrayContains,
    ArrayContainsAny,
    In,
    NotIn,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::LessThan => "<",
            FilterOperator::LessThanOrEqual => "<=",
            FilterOperator::Equal => "==",
            FilterOperator::NotEqual => "!=",
            FilterOperator::GreaterThan => ">",
            FilterOperator::GreaterThanOrEqual => ">=",
            FilterOperator::ArrayContains => "array-contains",
            FilterOperator::ArrayContainsAny => "array-contains-any",
            FilterOperator::In => "in",
            FilterOperator::NotIn => "not-in",
        }
    }

    pub(crate) fn is_inequality(&self) -> bool {
        matches!(
            self,
            FilterOperator::LessThan
                | FilterOperator::LessThanOrEqual
                | FilterOperator::GreaterThan
                | FilterOperator::GreaterThanOrEqual
                | FilterOperator::NotEqual
                | FilterOperator::NotIn
        )
    }

    fn requires_array_operand(&self) -> bool {
        matches!(
            self,
            FilterOperator::ArrayContainsAny | FilterOperator::In | FilterOperator::NotIn
        )
    }
}

impl Display for FilterOperator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = FirestoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<" => Ok(FilterOperator::LessThan),
            "<=" => Ok(FilterOperator::LessThanOrEqual),
            "==" => Ok(FilterOperator::Equal),
            "!=" => Ok(FilterOperator::NotEqual),
            ">" => Ok(FilterOperator::GreaterThan),
            ">=" => Ok(FilterOperator::GreaterThanOrEqual),
            "array-contains" => Ok(FilterOperator::ArrayContains),
            "array-contains-any" => Ok(FilterOperator::ArrayContainsAny),
            "in" => Ok(FilterOperator::In),
            "not-in" => Ok(FilterOperator::NotIn),
            other => Err(invalid_argument(format!(
                "Invalid query operator '{other}'"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum OrderDirection {
    #[default]
    Ascending,
    Descending,
}

impl OrderDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderDirection::Ascending => "asc",
            OrderDirection::Descending => "desc",
        }
    }
}

impl FromStr for OrderDirection {
    type Err = FirestoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(OrderDirection::Ascending),
            "desc" | "descending" => Ok(OrderDirection::Descending),
            other => Err(invalid_argument(format!(
                "Invalid order direction '{other}', expected 'asc' or 'desc'"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
    field: FieldPath,
    operator: FilterOperator,
    value: FirestoreValue,
}

impl FieldFilter {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &FirestoreValue {
        &self.value
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    field: FieldPath,
    direction: OrderDirection,
}

impl OrderBy {
    pub fn field(&self) -> &FieldPath {
        &self.field
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }
}

/// Exclusive cursor position expressed as one value per ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct Bound {
    values: Vec<FirestoreValue>,
}

impl Bound {
    pub fn values(&self) -> &[FirestoreValue] {
        &self.values
    }
}

/// An immutable query over a single collection. Every builder method returns a new query.
#[derive(Clone, Debug)]
pub struct Query {
    firestore: Firestore,
    collection_path: ResourcePath,
    filters: Vec<FieldFilter>,
    explicit_order_by: Vec<OrderBy>,
    limit: Option<u32>,
    start_after: Option<Bound>,
}

impl Query {
    pub(crate) fn new(firestore: Firestore, collection_path: ResourcePath) -> Self {
        Self {
            firestore,
            collection_path,
            filters: Vec::new(),
            explicit_order_by: Vec::new(),
            limit: None,
            start_after: None,
        }
    }

    pub fn firestore(&self) -> &Firestore {
        &self.firestore
    }

    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub fn where_field(
        &self,
        field: impl IntoFieldPath,
        operator: FilterOperator,
        value: impl Into<FirestoreValue>,
    ) -> FirestoreResult<Self> {
        let field = field.into_field_path()?;
        let value = value.into();
        if operator.requires_array_operand() {
            match value.kind() {
                ValueKind::Array(array) if !array.values().is_empty() => {}
                _ => {
                    return Err(invalid_argument(format!(
                        "A non-empty array is required for '{operator}' filters"
                    )))
                }
            }
        }
        if operator.is_inequality() {
            if let Some(existing) = self.inequality_field() {
                if existing != &field {
                    return Err(invalid_argument(format!(
                        "Inequality filters on '{existing}' and '{field}' cannot be combined"
                    )));
                }
            }
        }
        let mut next = self.clone();
        next.filters.push(FieldFilter {
            field,
            operator,
            value,
        });
        Ok(next)
    }

    pub fn order_by(
        &self,
        field: impl IntoFieldPath,
        direction: OrderDirection,
    ) -> FirestoreResult<Self> {
        if self.start_after.is_some() {
            return Err(invalid_argument(
                "order_by() must be applied before cursor constraints",
            ));
        }
        let mut next = self.clone();
        next.explicit_order_by.push(OrderBy {
            field: field.into_field_path()?,
            direction,
        });
        Ok(next)
    }

    pub fn limit(&self, limit: u32) -> FirestoreResult<Self> {
        if limit == 0 {
            return Err(invalid_argument("Query limit must be positive"));
        }
        let mut next = self.clone();
        next.limit = Some(limit);
        Ok(next)
    }

    /// Starts the result set strictly after `snapshot` in this query's ordering.
    pub fn start_after(&self, snapshot: &DocumentSnapshot) -> FirestoreResult<Self> {
        let values = self.bound_values_from_snapshot(snapshot)?;
        let mut next = self.clone();
        next.start_after = Some(Bound { values });
        Ok(next)
    }

    pub fn filters(&self) -> &[FieldFilter] {
        &self.filters
    }

    pub fn limit_value(&self) -> Option<u32> {
        self.limit
    }

    /// The complete ordering the store applies: explicit orderings, then the
    /// inequality field when not already ordered, then the document id.
    pub fn normalized_order_by(&self) -> Vec<OrderBy> {
        let mut order_by = self.explicit_order_by.clone();
        if order_by.is_empty() {
            if let Some(field) = self.inequality_field() {
                order_by.push(OrderBy {
                    field: field.clone(),
                    direction: OrderDirection::Ascending,
                });
            }
        }
        if !order_by.iter().any(|order| order.field.is_document_id()) {
            let direction = order_by
                .last()
                .map(|order| order.direction)
                .unwrap_or_default();
            order_by.push(OrderBy {
                field: FieldPath::document_id(),
                direction,
            });
        }
        order_by
    }

    pub(crate) fn definition(&self) -> QueryDefinition {
        QueryDefinition {
            collection_path: self.collection_path.clone(),
            filters: self.filters.clone(),
            order_by: self.normalized_order_by(),
            limit: self.limit,
            start_after: self.start_after.clone(),
        }
    }

    fn inequality_field(&self) -> Option<&FieldPath> {
        self.filters
            .iter()
            .find(|filter| filter.operator.is_inequality())
            .map(|filter| &filter.field)
    }

    fn bound_values_from_snapshot(
        &self,
        snapshot: &DocumentSnapshot,
    ) -> FirestoreResult<Vec<FirestoreValue>> {
        if !snapshot.exists() {
            return Err(invalid_argument(format!(
                "Cannot use a cursor for document '{}' that does not exist",
                snapshot.document_key().path()
            )));
        }
        if snapshot.document_key().collection_path() != self.collection_path {
            return Err(invalid_argument(format!(
                "Cursor document '{}' does not belong to collection '{}'",
                snapshot.document_key().path(),
                self.collection_path
            )));
        }
        self.normalized_order_by()
            .iter()
            .map(|order| {
                if order.field.is_document_id() {
                    return Ok(document_id_value(snapshot.document_key()));
                }
                crate::firestore::query_evaluator::lookup_field(snapshot, &order.field)
                    .cloned()
                    .ok_or_else(|| {
                        invalid_argument(format!(
                            "Cursor document is missing the ordered field '{}'",
                            order.field
                        ))
                    })
            })
            .collect()
    }
}

pub(crate) fn document_id_value(key: &DocumentKey) -> FirestoreValue {
    FirestoreValue::from_reference(key.path().canonical_string())
}

/// Backend-facing form of a [`Query`] with the ordering already normalized.
#[derive(Clone, Debug, PartialEq)]
pub struct QueryDefinition {
    pub(crate) collection_path: ResourcePath,
    pub(crate) filters: Vec<FieldFilter>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<u32>,
    pub(crate) start_after: Option<Bound>,
}

impl QueryDefinition {
    pub fn collection_path(&self) -> &ResourcePath {
        &self.collection_path
    }

    pub(crate) fn matches_collection(&self, key: &DocumentKey) -> bool {
        key.collection_path() == self.collection_path
    }
}

/// Result of executing a query: a finite, already materialized list of documents.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuerySnapshot {
    documents: Vec<DocumentSnapshot>,
}

impl QuerySnapshot {
    pub fn new(documents: Vec<DocumentSnapshot>) -> Self {
        Self { documents }
    }

    pub fn documents(&self) -> &[DocumentSnapshot] {
        &self.documents
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// The final document, typically used as the next pagination cursor.
    pub fn last(&self) -> Option<&DocumentSnapshot> {
        self.documents.last()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.documents.iter().map(DocumentSnapshot::id).collect()
    }

    pub fn into_documents(self) -> Vec<DocumentSnapshot> {
        self.documents
    }
}

impl IntoIterator for QuerySnapshot {
    type Item = DocumentSnapshot;
    type IntoIter = std::vec::IntoIter<DocumentSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.documents.into_iter()
    }
}
