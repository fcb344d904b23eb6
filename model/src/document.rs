use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Binary payload carried by a document in place of (or alongside) text
/// content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub data: Vec<u8>,
    pub mime_type: Option<String>,
    #[serde(default)]
    pub meta: HashMap<String, serde_json::Value>
}

impl Blob {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: None,
            meta: HashMap::new()
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }
}

/// The unit stored, filtered, and retrieved by a [`crate::DocumentStore`].
///
/// The identifier is fixed at construction: [`Document::new`] and
/// [`Document::from_blob`] derive it from the payload bytes, so equal
/// payloads get equal ids and re-ingestion is idempotent. Use
/// [`Document::with_id`] when the caller owns identity.
///
/// `score` is populated only on retrieval results and is never written to
/// the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub blob: Option<Blob>,
    #[serde(default)]
    pub meta: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
    #[serde(default)]
    pub score: Option<f64>
}

impl Document {
    /// Creates a text document with a content-addressed id.
    pub fn new(content: impl Into<String>) -> Self {
        let content = content.into();
        let id = digest_hex(content.as_bytes());
        Self {
            id,
            content: Some(content),
            blob: None,
            meta: HashMap::new(),
            embedding: None,
            score: None
        }
    }

    /// Creates a binary document with an id derived from the blob bytes.
    pub fn from_blob(blob: Blob) -> Self {
        let id = digest_hex(&blob.data);
        Self {
            id,
            content: None,
            blob: Some(blob),
            meta: HashMap::new(),
            embedding: None,
            score: None
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
