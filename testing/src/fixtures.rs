//! Document fixtures shared across test files.

use model::Document;
use serde_json::json;

/// Documents covering the metadata combinations the filter tests select
/// across: numeric `number`, string `chapter`, string-typed `page`, one
/// numeric `page` (to pin type-strict comparisons), and one document with
/// no metadata at all (to pin the absent-field conventions).
pub fn filterable_docs() -> Vec<Document> {
    vec![
        Document::new("the intro of a hundred pages")
            .with_id("doc-intro-100")
            .with_meta("number", json!(100))
            .with_meta("chapter", json!("intro")),
        Document::new("a short intro")
            .with_id("doc-intro-2")
            .with_meta("number", json!(2))
            .with_meta("chapter", json!("intro")),
        Document::new("the conclusion on page ninety")
            .with_id("doc-conclusion-90s")
            .with_meta("page", json!("90"))
            .with_meta("chapter", json!("conclusion")),
        Document::new("a conclusion with a numeric page")
            .with_id("doc-conclusion-90n")
            .with_meta("page", json!(90))
            .with_meta("chapter", json!("conclusion")),
        Document::new("an abstract about nothing")
            .with_id("doc-abstract")
            .with_meta("number", json!(-10))
            .with_meta("chapter", json!("abstract")),
        Document::new("a stray note with no metadata").with_id("doc-bare"),
    ]
}

/// Ids of `documents`, sorted, for order-independent assertions.
pub fn sorted_ids(documents: &[Document]) -> Vec<String> {
    let mut ids: Vec<String> = documents.iter().map(|d| d.id.clone()).collect();
    ids.sort();
    ids
}
