//! Declarative filter trees over document fields.
//!
//! A filter is either a single comparison over one dotted field path
//! (`Condition`) or an `AND`/`OR` combinator over child filters
//! (`Compound`). Trees arrive from callers as plain JSON:
//!
//! ```json
//! { "operator": "AND", "conditions": [ ... ] }
//! { "field": "meta.chapter", "operator": "==", "value": "intro" }
//! ```
//!
//! [`FilterNode::from_value`] parses that shape once into this closed
//! representation; unrecognized operator spellings and malformed field paths
//! surface as typed errors at the boundary, and everything downstream is a
//! total match over the enums. A parsed tree is immutable and borrowed for
//! the duration of one translation call.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Unsupported filter operator: {operator}")]
    UnsupportedOperator { operator: String },

    #[error("Invalid field path: {path:?}")]
    InvalidFieldPath { path: String },

    #[error("Type mismatch for operator {operator:?}: expected {expected}")]
    TypeMismatch { operator: String, expected: String },

    #[error("Malformed filter: {reason}")]
    Malformed { reason: String }
}

/// Comparison applied at a condition leaf.
///
/// External spellings are the comparison symbols themselves (`==`, `!=`,
/// `>`, `>=`, `<`, `<=`, `in`, `not in`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ComparisonOperator {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not in")]
    Nin
}

impl ComparisonOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOperator::Eq => "==",
            ComparisonOperator::Ne => "!=",
            ComparisonOperator::Gt => ">",
            ComparisonOperator::Gte => ">=",
            ComparisonOperator::Lt => "<",
            ComparisonOperator::Lte => "<=",
            ComparisonOperator::In => "in",
            ComparisonOperator::Nin => "not in"
        }
    }

    /// Checks the arity contract: `in`/`not in` take lists, every other
    /// comparator takes a scalar.
    pub fn validate_value(&self, value: &Value) -> Result<(), FilterError> {
        let wants_list = matches!(self, ComparisonOperator::In | ComparisonOperator::Nin);
        match (wants_list, value.is_array()) {
            (true, false) => Err(FilterError::TypeMismatch {
                operator: self.as_str().to_string(),
                expected: "a list value".to_string()
            }),
            (false, true) => Err(FilterError::TypeMismatch {
                operator: self.as_str().to_string(),
                expected: "a scalar value".to_string()
            }),
            _ => Ok(())
        }
    }
}

impl std::fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ComparisonOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" => Ok(ComparisonOperator::Eq),
            "!=" => Ok(ComparisonOperator::Ne),
            ">" => Ok(ComparisonOperator::Gt),
            ">=" => Ok(ComparisonOperator::Gte),
            "<" => Ok(ComparisonOperator::Lt),
            "<=" => Ok(ComparisonOperator::Lte),
            "in" => Ok(ComparisonOperator::In),
            "not in" => Ok(ComparisonOperator::Nin),
            _ => Err(FilterError::UnsupportedOperator {
                operator: s.to_string()
            })
        }
    }
}

/// Combinator applied at a compound node. External spellings are `AND` and
/// `OR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LogicalOperator {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or
}

impl LogicalOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR"
        }
    }
}

impl std::fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LogicalOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(LogicalOperator::And),
            "OR" => Ok(LogicalOperator::Or),
            _ => Err(FilterError::UnsupportedOperator {
                operator: s.to_string()
            })
        }
    }
}

/// One node of a filter tree: a comparison leaf or an `AND`/`OR` combinator
/// over children. Children keep their original order; depth is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterNode {
    Condition {
        field: String,
        operator: ComparisonOperator,
        value: Value
    },
    Compound {
        operator: LogicalOperator,
        conditions: Vec<FilterNode>
    }
}

impl FilterNode {
    /// Parses the external JSON shape into a filter tree.
    ///
    /// A node with a `conditions` key is a compound, a node with a `field`
    /// key is a condition; anything else is malformed. Conditions are
    /// validated on the way in, so a tree obtained here is always
    /// translatable.
    pub fn from_value(value: &Value) -> Result<Self, FilterError> {
        let object = value.as_object().ok_or_else(|| FilterError::Malformed {
            reason: "filter node must be a JSON object".to_string()
        })?;

        if object.contains_key("conditions") {
            let operator = object
                .get("operator")
                .and_then(Value::as_str)
                .ok_or_else(|| FilterError::Malformed {
                    reason: "compound node is missing a string \"operator\"".to_string()
                })?
                .parse::<LogicalOperator>()?;

            let conditions = object
                .get("conditions")
                .and_then(Value::as_array)
                .ok_or_else(|| FilterError::Malformed {
                    reason: "\"conditions\" must be a list of filter nodes".to_string()
                })?
                .iter()
                .map(FilterNode::from_value)
                .collect::<Result<Vec<_>, _>>()?;

            Ok(FilterNode::Compound {
                operator,
                conditions
            })
        } else if object.contains_key("field") {
            let field = object
                .get("field")
                .and_then(Value::as_str)
                .ok_or_else(|| FilterError::Malformed {
                    reason: "condition \"field\" must be a string".to_string()
                })?
                .to_string();
            validate_field_path(&field)?;

            let operator = object
                .get("operator")
                .and_then(Value::as_str)
                .ok_or_else(|| FilterError::Malformed {
                    reason: "condition is missing a string \"operator\"".to_string()
                })?
                .parse::<ComparisonOperator>()?;

            let value = object
                .get("value")
                .cloned()
                .ok_or_else(|| FilterError::Malformed {
                    reason: "condition is missing a \"value\"".to_string()
                })?;
            operator.validate_value(&value)?;

            Ok(FilterNode::Condition {
                field,
                operator,
                value
            })
        } else {
            Err(FilterError::Malformed {
                reason: "expected a condition with \"field\" or a compound node with \"conditions\""
                    .to_string()
            })
        }
    }

    /// Re-checks every condition in the tree.
    ///
    /// Trees built through [`FilterNode::from_value`] are already valid;
    /// this exists for trees constructed directly in code.
    pub fn validate(&self) -> Result<(), FilterError> {
        match self {
            FilterNode::Condition {
                field,
                operator,
                value
            } => {
                validate_field_path(field)?;
                operator.validate_value(value)
            }
            FilterNode::Compound { conditions, .. } => {
                for condition in conditions {
                    condition.validate()?;
                }
                Ok(())
            }
        }
    }
}

/// Validates a dotted field path: non-empty, no empty segments, and no
/// `$`-prefixed segment (the native query grammar would read one as an
/// operator).
pub fn validate_field_path(path: &str) -> Result<(), FilterError> {
    if path.is_empty()
        || path
            .split('.')
            .any(|segment| segment.is_empty() || segment.starts_with('$'))
    {
        return Err(FilterError::InvalidFieldPath {
            path: path.to_string()
        });
    }
    Ok(())
}
