use async_trait::async_trait;
use model::{
    ComparisonOperator, Document, DocumentStore, DuplicatePolicy, FilterNode, LogicalOperator,
    StoreError
};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

/// In-memory [`DocumentStore`] with the same observable semantics as the
/// Atlas adapter: id-keyed storage, the three duplicate policies, and the
/// absent-field and type-strict comparison conventions of the native query
/// layer.
///
/// Comparisons against an absent field never match `==`/`in` and always
/// match `!=`/`not in`; string and number values never compare equal across
/// categories; numbers compare numerically among themselves.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: RwLock<BTreeMap<String, Document>>
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn count_documents(&self) -> Result<usize, StoreError> {
        Ok(self.documents.read().await.len())
    }

    async fn filter_documents(
        &self,
        filters: Option<&FilterNode>
    ) -> Result<Vec<Document>, StoreError> {
        if let Some(filters) = filters {
            filters.validate()?;
        }

        let documents = self.documents.read().await;
        Ok(documents
            .values()
            .filter(|document| filters.is_none_or(|f| matches(f, document)))
            .cloned()
            .collect())
    }

    async fn write_documents(
        &self,
        documents: Vec<Document>,
        policy: DuplicatePolicy
    ) -> Result<usize, StoreError> {
        let mut store = self.documents.write().await;
        let mut written = 0usize;

        for document in documents {
            let exists = store.contains_key(&document.id);
            match policy {
                DuplicatePolicy::Fail if exists => {
                    return Err(StoreError::DuplicateDocument { id: document.id });
                }
                DuplicatePolicy::Skip if exists => {}
                _ => {
                    store.insert(document.id.clone(), document);
                    written += 1;
                }
            }
        }

        Ok(written)
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut store = self.documents.write().await;
        for id in ids {
            store.remove(id);
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "in_memory"
    }
}

fn matches(filter: &FilterNode, document: &Document) -> bool {
    match filter {
        // Empty compounds mirror the translator's fixed policy: AND of
        // nothing matches everything, OR of nothing matches nothing.
        FilterNode::Compound {
            operator: LogicalOperator::And,
            conditions
        } => conditions.iter().all(|child| matches(child, document)),
        FilterNode::Compound {
            operator: LogicalOperator::Or,
            conditions
        } => conditions.iter().any(|child| matches(child, document)),
        FilterNode::Condition {
            field,
            operator,
            value
        } => compare(*operator, lookup_path(document, field), value)
    }
}

// Resolves a dotted path against the document: top-level names address the
// document's own fields, deeper segments descend into metadata values.
// `None` means the field is absent.
fn lookup_path(document: &Document, path: &str) -> Option<Value> {
    let mut segments = path.split('.');
    let head = segments.next()?;

    let mut current = match head {
        "id" => Value::String(document.id.clone()),
        "content" => Value::String(document.content.clone()?),
        "meta" => Value::Object(
            document
                .meta
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        ),
        _ => return None
    };

    for segment in segments {
        current = current.get(segment)?.clone();
    }
    Some(current)
}

fn compare(operator: ComparisonOperator, actual: Option<Value>, expected: &Value) -> bool {
    match operator {
        ComparisonOperator::Eq => actual.is_some_and(|a| values_equal(&a, expected)),
        ComparisonOperator::Ne => actual.is_none_or(|a| !values_equal(&a, expected)),
        ComparisonOperator::Gt => ordered(actual, expected, |o| o == Ordering::Greater),
        ComparisonOperator::Gte => ordered(actual, expected, |o| o != Ordering::Less),
        ComparisonOperator::Lt => ordered(actual, expected, |o| o == Ordering::Less),
        ComparisonOperator::Lte => ordered(actual, expected, |o| o != Ordering::Greater),
        ComparisonOperator::In => actual.is_some_and(|a| {
            expected
                .as_array()
                .is_some_and(|list| list.iter().any(|candidate| values_equal(&a, candidate)))
        }),
        ComparisonOperator::Nin => actual.is_none_or(|a| {
            expected
                .as_array()
                .is_some_and(|list| !list.iter().any(|candidate| values_equal(&a, candidate)))
        })
    }
}

fn ordered(
    actual: Option<Value>,
    expected: &Value,
    accept: impl Fn(Ordering) -> bool
) -> bool {
    actual.is_some_and(|a| value_ordering(&a, expected).is_some_and(&accept))
}

// Equality within one type category only; ints and floats are the same
// category and compare numerically.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b
    }
}

// Ordering exists inside a category (numbers numerically, strings
// lexicographically); cross-category comparisons never match.
fn value_ordering(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        _ => None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc_with_meta(id: &str, key: &str, value: Value) -> Document {
        Document::new(format!("content of {id}"))
            .with_id(id)
            .with_meta(key, value)
    }

    #[test]
    fn test_lookup_descends_into_meta() {
        let document = doc_with_meta("doc-1", "chapter", json!("intro"));
        assert_eq!(
            lookup_path(&document, "meta.chapter"),
            Some(json!("intro"))
        );
        assert_eq!(lookup_path(&document, "meta.missing"), None);
        assert_eq!(lookup_path(&document, "id"), Some(json!("doc-1")));
        assert_eq!(lookup_path(&document, "unknown"), None);
    }

    #[test]
    fn test_numbers_compare_numerically_across_widths() {
        assert!(values_equal(&json!(90), &json!(90.0)));
        assert!(!values_equal(&json!(90), &json!("90")));
        assert_eq!(
            value_ordering(&json!(2), &json!(10)),
            Some(Ordering::Less)
        );
        assert_eq!(value_ordering(&json!("2"), &json!(10)), None);
    }

    #[test]
    fn test_absent_field_conventions() {
        let document = Document::new("no meta").with_id("doc-1");
        let absent = lookup_path(&document, "meta.page");

        assert!(!compare(ComparisonOperator::Eq, absent.clone(), &json!("90")));
        assert!(compare(ComparisonOperator::Ne, absent.clone(), &json!("90")));
        assert!(!compare(ComparisonOperator::Gt, absent.clone(), &json!(0)));
        assert!(!compare(
            ComparisonOperator::In,
            absent.clone(),
            &json!(["90"])
        ));
        assert!(compare(ComparisonOperator::Nin, absent, &json!(["90"])));
    }
}
