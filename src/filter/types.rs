use serde_json::Value;

/// One typed filter predicate against a single column.
///
/// Loose JSON values coming from query params or call sites are classified once,
/// with [`FilterValue::classify`], and the same classification drives select
/// filters and update/delete target filters alike.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Scalar equality. `Eq(Value::Null)` composes to `IS NULL`.
    Eq(Value),
    /// Membership test; an empty collection matches no rows.
    In(Vec<Value>),
    /// Case-insensitive pattern match, `%` as wildcard.
    ILike(String),
}

impl FilterValue {
    /// Classify a loose JSON value: collection → membership test, string
    /// containing a wildcard → pattern test, otherwise → equality.
    pub fn classify(value: Value) -> Self {
        match value {
            Value::Array(items) => FilterValue::In(items),
            Value::String(s) if s.contains('%') => FilterValue::ILike(s),
            other => FilterValue::Eq(other),
        }
    }
}

/// Ordered set of column predicates, combined with logical AND.
///
/// Insertion order is preserved so composed SQL is deterministic. There is no OR
/// composition here; callers needing OR issue an rpc instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filters {
    entries: Vec<(String, FilterValue)>,
}

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.entries.push((column.into(), FilterValue::Eq(value)));
        self
    }

    pub fn any_of(mut self, column: impl Into<String>, values: Vec<Value>) -> Self {
        self.entries.push((column.into(), FilterValue::In(values)));
        self
    }

    pub fn ilike(mut self, column: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.entries
            .push((column.into(), FilterValue::ILike(pattern.into())));
        self
    }

    /// Push a loose value through [`FilterValue::classify`].
    pub fn value(mut self, column: impl Into<String>, value: Value) -> Self {
        self.entries
            .push((column.into(), FilterValue::classify(value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, FilterValue)> {
        self.entries.iter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// Ordering and page window for a select.
///
/// Ordering is stable only when a column is specified; unspecified order is
/// whatever the store returns and must not be relied upon.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub order: Option<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SelectOptions {
    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    pub fn page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }
}

/// Composed SQL plus positional parameters, ready for `$n` binding.
#[derive(Debug, Clone)]
pub struct SqlQuery {
    pub sql: String,
    pub params: Vec<Value>,
}
