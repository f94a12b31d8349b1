//! Structured query criteria
//!
//! A `Criteria` is an immutable restriction set plus ordering, bound to one
//! entity type. Builder methods consume and return the value. Counting never
//! alters a criteria: `to_count_query` derives a separate `CountQuery`.

use serde_json::Value;

/// A single predicate over an entity's fields
#[derive(Debug, Clone, PartialEq)]
pub enum Restriction {
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Ge(String, Value),
    Lt(String, Value),
    Le(String, Value),
    /// SQL-style pattern with `%` and `_` wildcards
    Like(String, String),
    In(String, Vec<Value>),
    IsNull(String),
    IsNotNull(String),
    Not(Box<Restriction>),
    And(Vec<Restriction>),
    Or(Vec<Restriction>),
}

impl Restriction {
    pub fn eq(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq(name.into(), value.into())
    }

    pub fn ne(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ne(name.into(), value.into())
    }

    pub fn gt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Gt(name.into(), value.into())
    }

    pub fn ge(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Ge(name.into(), value.into())
    }

    pub fn lt(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Lt(name.into(), value.into())
    }

    pub fn le(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Le(name.into(), value.into())
    }

    pub fn like(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::Like(name.into(), pattern.into())
    }

    pub fn is_in<V: Into<Value>>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self::In(name.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn is_null(name: impl Into<String>) -> Self {
        Self::IsNull(name.into())
    }

    pub fn is_not_null(name: impl Into<String>) -> Self {
        Self::IsNotNull(name.into())
    }

    /// Equality, or IS NULL when the value is null
    pub fn eq_or_null(name: impl Into<String>, value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Null => Self::IsNull(name.into()),
            value => Self::Eq(name.into(), value),
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(restriction: Restriction) -> Self {
        Self::Not(Box::new(restriction))
    }

    pub fn and(restrictions: impl IntoIterator<Item = Restriction>) -> Self {
        Self::And(restrictions.into_iter().collect())
    }

    pub fn or(restrictions: impl IntoIterator<Item = Restriction>) -> Self {
        Self::Or(restrictions.into_iter().collect())
    }
}

/// Sort key for a structured query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub property: String,
    pub ascending: bool,
}

impl Order {
    pub fn asc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: true,
        }
    }

    pub fn desc(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            ascending: false,
        }
    }

    pub fn new(property: impl Into<String>, ascending: bool) -> Self {
        Self {
            property: property.into(),
            ascending,
        }
    }
}

/// Restrictions and ordering bound to one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    entity: &'static str,
    restrictions: Vec<Restriction>,
    orders: Vec<Order>,
}

impl Criteria {
    /// Criteria matching every row of an entity type
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            restrictions: Vec::new(),
            orders: Vec::new(),
        }
    }

    /// Add a restriction (conjunction with the existing ones)
    pub fn add(mut self, restriction: Restriction) -> Self {
        self.restrictions.push(restriction);
        self
    }

    /// Add several restrictions
    pub fn add_all(mut self, restrictions: impl IntoIterator<Item = Restriction>) -> Self {
        self.restrictions.extend(restrictions);
        self
    }

    /// Append a sort key
    pub fn add_order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub fn restrictions(&self) -> &[Restriction] {
        &self.restrictions
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Derive the count-shaped form of this criteria
    ///
    /// Ordering is dropped since it is meaningless for a row count.
    pub fn to_count_query(&self) -> CountQuery {
        CountQuery {
            entity: self.entity,
            restrictions: self.restrictions.clone(),
        }
    }
}

/// Row-count projection over a restriction set
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub entity: &'static str,
    pub restrictions: Vec<Restriction>,
}

impl CountQuery {
    /// Count every row of an entity type
    pub fn all(entity: &'static str) -> Self {
        Self {
            entity,
            restrictions: Vec::new(),
        }
    }
}
