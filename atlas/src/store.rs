//! The MongoDB Atlas document store.

use crate::config::AtlasConfig;
use crate::query::filter_to_query;
use async_trait::async_trait;
use model::{Blob, Document, DocumentStore, DuplicatePolicy, FilterNode, StoreError};
use mongodb::bson::{Binary, Bson, Document as BsonDocument, doc, spec::BinarySubtype};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, Collection, IndexModel};
use std::collections::HashMap;
use tokio::sync::OnceCell;
use tracing::debug;

/// Document store backed by one MongoDB Atlas collection.
///
/// The config is held eagerly; the client is opened on the first operation,
/// validated with a `ping`, and shared by every subsequent call. Dropping
/// the store releases the handle.
pub struct AtlasDocumentStore {
    config: AtlasConfig,
    client: OnceCell<Client>
}

impl AtlasDocumentStore {
    /// Creates a store from an existing config. Performs no I/O.
    pub fn new(config: AtlasConfig) -> Self {
        Self {
            config,
            client: OnceCell::new()
        }
    }

    /// Creates a store from `MONGODB_*` environment variables. Performs no
    /// I/O.
    pub fn from_env() -> Result<Self, StoreError> {
        Ok(Self::new(AtlasConfig::from_env()?))
    }

    pub fn config(&self) -> &AtlasConfig {
        &self.config
    }

    async fn client(&self) -> Result<&Client, StoreError> {
        self.client
            .get_or_try_init(|| async {
                let options = ClientOptions::parse(&self.config.connection_string)
                    .await
                    .map_err(|e| {
                        StoreError::ConnectionFailed(format!("{}: {}", self.config.database, e))
                    })?;

                let client = Client::with_options(options).map_err(|e| {
                    StoreError::ConnectionFailed(format!("{}: {}", self.config.database, e))
                })?;

                client
                    .database(&self.config.database)
                    .run_command(doc! { "ping": 1 })
                    .await
                    .map_err(|e| {
                        StoreError::ConnectionFailed(format!("{}: {}", self.config.database, e))
                    })?;

                debug!(
                    database = %self.config.database,
                    collection = %self.config.collection,
                    "connected to MongoDB Atlas"
                );
                Ok(client)
            })
            .await
    }

    async fn collection(&self) -> Result<Collection<BsonDocument>, StoreError> {
        Ok(self
            .client()
            .await?
            .database(&self.config.database)
            .collection(&self.config.collection))
    }

    /// One-time provisioning: creates the collection if it is missing and
    /// puts a unique index on `id`, which is what turns repeated writes into
    /// duplicate-key errors. Vector and full-text indexes are created in
    /// Atlas, not here.
    pub async fn ensure_collection(&self) -> Result<(), StoreError> {
        let database = self.client().await?.database(&self.config.database);

        let names = database
            .list_collection_names()
            .await
            .map_err(|e| StoreError::Internal(format!("Failed to list collections: {e}")))?;
        if !names.iter().any(|name| name == &self.config.collection) {
            database
                .create_collection(&self.config.collection)
                .await
                .map_err(|e| StoreError::Internal(format!("Failed to create collection: {e}")))?;
        }

        let index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(IndexOptions::builder().unique(true).build())
            .build();
        self.collection()
            .await?
            .create_index(index)
            .await
            .map_err(|e| StoreError::Internal(format!("Failed to create id index: {e}")))?;

        Ok(())
    }

    /// Ranked nearest-neighbour retrieval through the Atlas `$vectorSearch`
    /// stage. `filters` runs inside the stage as a pre-filter, so the
    /// `top_k` results are drawn from the matching subset.
    pub async fn embedding_retrieval(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filters: Option<&FilterNode>
    ) -> Result<Vec<Document>, StoreError> {
        if query_embedding.is_empty() {
            return Err(StoreError::Configuration(
                "query embedding must not be empty".into()
            ));
        }

        let pipeline = vec![
            self.vector_search_stage(query_embedding, top_k, filters)?,
            self.projection_stage("vectorSearchScore"),
        ];
        let documents = self.run_pipeline(pipeline).await?;
        debug!(
            top_k,
            results = documents.len(),
            "embedding retrieval completed"
        );
        Ok(documents)
    }

    /// Keyword retrieval through the Atlas `$search` text stage over
    /// `content`. The translated filter runs as a `$match` stage after the
    /// search, before the limit.
    pub async fn full_text_retrieval(
        &self,
        query: &str,
        top_k: usize,
        filters: Option<&FilterNode>
    ) -> Result<Vec<Document>, StoreError> {
        if query.trim().is_empty() {
            return Err(StoreError::Configuration(
                "full-text query must not be empty".into()
            ));
        }

        let mut pipeline = vec![doc! {
            "$search": {
                "index": &self.config.full_text_search_index,
                "text": { "query": query, "path": "content" }
            }
        }];
        if let Some(filters) = filters {
            pipeline.push(doc! { "$match": filter_to_query(filters)? });
        }
        pipeline.push(doc! { "$limit": top_k as i64 });
        pipeline.push(self.projection_stage("searchScore"));

        let documents = self.run_pipeline(pipeline).await?;
        debug!(
            top_k,
            results = documents.len(),
            "full-text retrieval completed"
        );
        Ok(documents)
    }

    fn vector_search_stage(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        filters: Option<&FilterNode>
    ) -> Result<BsonDocument, StoreError> {
        let vector: Vec<Bson> = query_embedding
            .iter()
            .map(|f| Bson::Double(f64::from(*f)))
            .collect();

        let mut stage = doc! {
            "index": &self.config.vector_search_index,
            "path": &self.config.embedding_field,
            "queryVector": vector,
            "numCandidates": (top_k * 10) as i64,
            "limit": top_k as i64,
        };
        if let Some(filters) = filters {
            stage.insert("filter", filter_to_query(filters)?);
        }

        Ok(doc! { "$vectorSearch": stage })
    }

    fn projection_stage(&self, score_meta: &str) -> BsonDocument {
        let mut projection = doc! {
            "_id": 0,
            "id": 1,
            "content": 1,
            "blob": 1,
            "meta": 1,
            "score": { "$meta": score_meta }
        };
        projection.insert(self.config.embedding_field.as_str(), 1);
        doc! { "$project": projection }
    }

    async fn run_pipeline(
        &self,
        pipeline: Vec<BsonDocument>
    ) -> Result<Vec<Document>, StoreError> {
        let collection = self.collection().await?;
        let mut cursor = collection
            .aggregate(pipeline)
            .await
            .map_err(|e| StoreError::Internal(format!("Search failed: {e}")))?;

        let mut documents = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| StoreError::Internal(format!("Cursor failed: {e}")))?
        {
            let raw = cursor
                .deserialize_current()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            documents.push(self.bson_to_document(&raw)?);
        }

        Ok(documents)
    }

    fn document_to_bson(&self, document: &Document) -> Result<BsonDocument, StoreError> {
        let mut doc = doc! { "id": &document.id };

        if let Some(content) = &document.content {
            doc.insert("content", content.clone());
        }

        if let Some(blob) = &document.blob {
            let mut blob_doc = doc! {
                "data": Bson::Binary(Binary {
                    subtype: BinarySubtype::Generic,
                    bytes: blob.data.clone()
                }),
                "meta": map_to_bson(&blob.meta)?
            };
            if let Some(mime_type) = &blob.mime_type {
                blob_doc.insert("mime_type", mime_type.clone());
            }
            doc.insert("blob", blob_doc);
        }

        doc.insert("meta", map_to_bson(&document.meta)?);

        if let Some(embedding) = &document.embedding {
            let vector: Vec<Bson> = embedding
                .iter()
                .map(|f| Bson::Double(f64::from(*f)))
                .collect();
            doc.insert(self.config.embedding_field.as_str(), vector);
        }

        // score is a retrieval artifact and is never persisted
        Ok(doc)
    }

    fn bson_to_document(&self, doc: &BsonDocument) -> Result<Document, StoreError> {
        let id = doc
            .get_str("id")
            .map_err(|_| StoreError::Serialization("stored document is missing its id".into()))?
            .to_string();

        let content = doc.get_str("content").ok().map(str::to_string);

        let blob = match doc.get_document("blob") {
            Ok(blob_doc) => {
                let data = blob_doc
                    .get_binary_generic("data")
                    .map_err(|_| {
                        StoreError::Serialization("stored blob is missing its data bytes".into())
                    })?
                    .clone();
                let mime_type = blob_doc.get_str("mime_type").ok().map(str::to_string);
                let meta = match blob_doc.get_document("meta") {
                    Ok(meta_doc) => bson_map_to_json(meta_doc)?,
                    Err(_) => HashMap::new()
                };
                Some(Blob {
                    data,
                    mime_type,
                    meta
                })
            }
            Err(_) => None
        };

        let meta = match doc.get_document("meta") {
            Ok(meta_doc) => bson_map_to_json(meta_doc)?,
            Err(_) => HashMap::new()
        };

        let embedding = doc
            .get_array(self.config.embedding_field.as_str())
            .ok()
            .map(|values| {
                values
                    .iter()
                    .filter_map(Bson::as_f64)
                    .map(|f| f as f32)
                    .collect()
            });

        let score = doc.get_f64("score").ok();

        Ok(Document {
            id,
            content,
            blob,
            meta,
            embedding,
            score
        })
    }
}

#[async_trait]
impl DocumentStore for AtlasDocumentStore {
    async fn count_documents(&self) -> Result<usize, StoreError> {
        let count = self
            .collection()
            .await?
            .count_documents(BsonDocument::new())
            .await
            .map_err(|e| StoreError::Internal(format!("Count failed: {e}")))?;
        Ok(count as usize)
    }

    async fn filter_documents(
        &self,
        filters: Option<&FilterNode>
    ) -> Result<Vec<Document>, StoreError> {
        let query = match filters {
            Some(filters) => filter_to_query(filters)?,
            None => BsonDocument::new()
        };

        let collection = self.collection().await?;
        let mut cursor = collection
            .find(query)
            .await
            .map_err(|e| StoreError::Internal(format!("Find failed: {e}")))?;

        let mut documents = Vec::new();
        while cursor
            .advance()
            .await
            .map_err(|e| StoreError::Internal(format!("Cursor failed: {e}")))?
        {
            let raw = cursor
                .deserialize_current()
                .map_err(|e| StoreError::Serialization(e.to_string()))?;
            documents.push(self.bson_to_document(&raw)?);
        }

        Ok(documents)
    }

    async fn write_documents(
        &self,
        documents: Vec<Document>,
        policy: DuplicatePolicy
    ) -> Result<usize, StoreError> {
        let collection = self.collection().await?;
        let mut written = 0usize;

        for document in &documents {
            let doc = self.document_to_bson(document)?;
            match policy {
                DuplicatePolicy::Overwrite => {
                    collection
                        .replace_one(doc! { "id": &document.id }, doc)
                        .upsert(true)
                        .await
                        .map_err(|e| StoreError::Internal(format!("Write failed: {e}")))?;
                    written += 1;
                }
                DuplicatePolicy::Fail => match collection.insert_one(doc).await {
                    Ok(_) => written += 1,
                    Err(e) if is_duplicate_key(&e) => {
                        return Err(StoreError::DuplicateDocument {
                            id: document.id.clone()
                        });
                    }
                    Err(e) => return Err(StoreError::Internal(format!("Write failed: {e}")))
                },
                DuplicatePolicy::Skip => match collection.insert_one(doc).await {
                    Ok(_) => written += 1,
                    Err(e) if is_duplicate_key(&e) => {
                        debug!(id = %document.id, "skipping duplicate document");
                    }
                    Err(e) => return Err(StoreError::Internal(format!("Write failed: {e}")))
                }
            }
        }

        debug!(written, policy = %policy, "wrote documents");
        Ok(written)
    }

    async fn delete_documents(&self, ids: &[String]) -> Result<(), StoreError> {
        if ids.is_empty() {
            return Ok(());
        }

        self.collection()
            .await?
            .delete_many(doc! { "id": { "$in": ids.to_vec() } })
            .await
            .map_err(|e| StoreError::Internal(format!("Delete failed: {e}")))?;

        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "mongodb_atlas"
    }
}

fn map_to_bson(map: &HashMap<String, serde_json::Value>) -> Result<Bson, StoreError> {
    let value = serde_json::to_value(map)?;
    Ok(serde_json::from_value(value)?)
}

fn bson_map_to_json(doc: &BsonDocument) -> Result<HashMap<String, serde_json::Value>, StoreError> {
    match Bson::Document(doc.clone()).into_relaxed_extjson() {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        other => Err(StoreError::Serialization(format!(
            "expected a metadata map, got {other}"
        )))
    }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        error.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write_error)) if write_error.code == 11000
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store_with_embedding_field(field: &str) -> AtlasDocumentStore {
        AtlasDocumentStore::new(AtlasConfig {
            embedding_field: field.to_string(),
            ..AtlasConfig::default()
        })
    }

    #[test]
    fn test_document_bson_round_trip() {
        let store = AtlasDocumentStore::new(AtlasConfig::default());
        let document = Document::new("some text")
            .with_id("doc-1")
            .with_meta("chapter", json!("intro"))
            .with_meta("number", json!(100))
            .with_embedding(vec![0.5, 0.25]);

        let bson = store.document_to_bson(&document).unwrap();
        let back = store.bson_to_document(&bson).unwrap();
        assert_eq!(back, document);
    }

    #[test]
    fn test_blob_document_bson_round_trip() {
        let store = AtlasDocumentStore::new(AtlasConfig::default());
        let blob = Blob::new(b"test".to_vec())
            .with_mime_type("mime_type")
            .with_meta("meta_key", json!("meta_value"));
        let document = Document::from_blob(blob);

        let bson = store.document_to_bson(&document).unwrap();
        let back = store.bson_to_document(&bson).unwrap();
        assert_eq!(back, document);
    }

    #[test]
    fn test_score_is_not_persisted() {
        let store = AtlasDocumentStore::new(AtlasConfig::default());
        let mut document = Document::new("scored").with_id("doc-1");
        document.score = Some(0.9);

        let bson = store.document_to_bson(&document).unwrap();
        assert!(!bson.contains_key("score"));
    }

    #[test]
    fn test_vector_search_stage_uses_configured_index_and_field() {
        let store = store_with_embedding_field("custom_vector");
        let stage = store
            .vector_search_stage(&[0.1, 0.2, 0.3], 5, None)
            .unwrap();

        let search = stage.get_document("$vectorSearch").unwrap();
        assert_eq!(search.get_str("index").unwrap(), "vector_index");
        assert_eq!(search.get_str("path").unwrap(), "custom_vector");
        assert_eq!(search.get_i64("numCandidates").unwrap(), 50);
        assert_eq!(search.get_i64("limit").unwrap(), 5);
        assert!(!search.contains_key("filter"));
    }

    #[test]
    fn test_vector_search_stage_embeds_translated_filter() {
        let store = AtlasDocumentStore::new(AtlasConfig::default());
        let filter = FilterNode::from_value(&json!({
            "field": "meta.chapter",
            "operator": "==",
            "value": "intro"
        }))
        .unwrap();

        let stage = store
            .vector_search_stage(&[1.0, 0.0], 3, Some(&filter))
            .unwrap();
        let search = stage.get_document("$vectorSearch").unwrap();
        assert_eq!(
            search.get_document("filter").unwrap(),
            &doc! { "meta.chapter": { "$eq": "intro" } }
        );
    }

    #[test]
    fn test_projection_carries_custom_embedding_field() {
        let store = store_with_embedding_field("custom_vector");
        let stage = store.projection_stage("vectorSearchScore");

        let projection = stage.get_document("$project").unwrap();
        assert_eq!(projection.get_i32("custom_vector").unwrap(), 1);
        assert_eq!(
            projection.get_document("score").unwrap(),
            &doc! { "$meta": "vectorSearchScore" }
        );
    }

    #[tokio::test]
    async fn test_embedding_retrieval_rejects_empty_vector() {
        let store = AtlasDocumentStore::new(AtlasConfig::default());
        let err = store.embedding_retrieval(&[], 10, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_full_text_retrieval_rejects_blank_query() {
        let store = AtlasDocumentStore::new(AtlasConfig::default());
        let err = store.full_text_retrieval("   ", 10, None).await.unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    #[test]
    fn test_construction_performs_no_io() {
        // building a store against an unreachable host must succeed; only
        // the first operation connects
        let store = AtlasDocumentStore::new(AtlasConfig {
            connection_string: "mongodb://127.0.0.1:1".to_string(),
            ..AtlasConfig::default()
        });
        assert_eq!(store.config().database, "corpus");
    }

    #[test]
    fn test_store_name() {
        let store = AtlasDocumentStore::new(AtlasConfig::default());
        assert_eq!(store.store_name(), "mongodb_atlas");
    }
}
