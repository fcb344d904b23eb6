//! Translation of [`FilterNode`] trees into native MongoDB query documents.
//!
//! Translation is a pure function over the borrowed tree: equal inputs
//! produce structurally equal queries, the input is never mutated, and no
//! state is carried across calls, so it is safe to invoke from any number of
//! tasks. The work is O(tree size) with no depth limit.
//!
//! Each operator maps to exactly one native primitive:
//!
//! | filter     | native  |
//! |------------|---------|
//! | `==`       | `$eq`   |
//! | `!=`       | `$ne`   |
//! | `>`        | `$gt`   |
//! | `>=`       | `$gte`  |
//! | `<`        | `$lt`   |
//! | `<=`       | `$lte`  |
//! | `in`       | `$in`   |
//! | `not in`   | `$nin`  |
//! | `AND`      | `$and`  |
//! | `OR`       | `$or`   |
//!
//! The server's comparison semantics are relied on, not reimplemented:
//! `$eq` never matches an absent field while `$ne`/`$nin` do, and BSON type
//! bracketing keeps `"90"` and `90` from ever comparing equal.

use model::filter::validate_field_path;
use model::{ComparisonOperator, FilterError, FilterNode, LogicalOperator};
use mongodb::bson::{Bson, Document, doc};

/// Translates a filter tree into a query document ready for `find` or a
/// `$vectorSearch` pre-filter. Ownership of the result moves to the caller.
///
/// # Empty compound nodes
///
/// MongoDB rejects `$and`/`$or` with an empty argument array, so both cases
/// are fixed policies rather than recursion artifacts: `AND []` becomes the
/// empty document and matches every document, `OR []` becomes
/// `{"_id": {"$in": []}}` and matches none (`_id` is always present and
/// never a member of the empty list).
pub fn filter_to_query(node: &FilterNode) -> Result<Document, FilterError> {
    match node {
        FilterNode::Condition {
            field,
            operator,
            value
        } => {
            validate_field_path(field)?;
            operator.validate_value(value)?;
            let value = json_to_bson(value)?;
            Ok(doc! { field.clone(): { comparison_key(*operator): value } })
        }
        FilterNode::Compound {
            operator,
            conditions
        } => {
            if conditions.is_empty() {
                return Ok(match operator {
                    LogicalOperator::And => Document::new(),
                    LogicalOperator::Or => doc! { "_id": { "$in": [] } }
                });
            }

            let children = conditions
                .iter()
                .map(filter_to_query)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(doc! { logical_key(*operator): children })
        }
    }
}

fn comparison_key(operator: ComparisonOperator) -> &'static str {
    match operator {
        ComparisonOperator::Eq => "$eq",
        ComparisonOperator::Ne => "$ne",
        ComparisonOperator::Gt => "$gt",
        ComparisonOperator::Gte => "$gte",
        ComparisonOperator::Lt => "$lt",
        ComparisonOperator::Lte => "$lte",
        ComparisonOperator::In => "$in",
        ComparisonOperator::Nin => "$nin"
    }
}

fn logical_key(operator: LogicalOperator) -> &'static str {
    match operator {
        LogicalOperator::And => "$and",
        LogicalOperator::Or => "$or"
    }
}

// JSON scalars and lists carry over losslessly; numbers stay numeric and
// strings stay strings, there is no cross-category coercion here or on the
// server.
fn json_to_bson(value: &serde_json::Value) -> Result<Bson, FilterError> {
    serde_json::from_value(value.clone()).map_err(|e| FilterError::Malformed {
        reason: format!("unrepresentable filter value: {e}")
    })
}
