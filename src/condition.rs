use crate::Value;

/// The predicates the collection builds to fetch associated rows. This is a
/// closed set: anything richer belongs to the query layer, not to the
/// collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `column = value`. Engines that store many-to-many membership in a key
    /// list column interpret equality on that column as membership.
    Equals { column: String, value: Value },
    /// `column IN (values)`.
    Contains { column: String, values: Vec<Value> },
}

impl Condition {
    pub fn equals(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Equals {
            column: column.into(),
            value: value.into(),
        }
    }
    pub fn contains(column: impl Into<String>, values: Vec<Value>) -> Self {
        Self::Contains {
            column: column.into(),
            values,
        }
    }
}
