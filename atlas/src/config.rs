use model::StoreError;
use serde::{Deserialize, Serialize};

/// Connection settings for one Atlas collection.
///
/// Constructing a config performs no I/O; the store connects lazily on its
/// first operation. The vector and full-text indexes named here are
/// provisioned in Atlas ahead of time, they are not created by this
/// adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AtlasConfig {
    pub connection_string: String,
    pub database: String,
    pub collection: String,
    pub vector_search_index: String,
    pub full_text_search_index: String,
    pub embedding_field: String
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            connection_string: "mongodb://localhost:27017".to_string(),
            database: "corpus".to_string(),
            collection: "documents".to_string(),
            vector_search_index: "vector_index".to_string(),
            full_text_search_index: "full_text_index".to_string(),
            embedding_field: "embedding".to_string()
        }
    }
}

impl AtlasConfig {
    pub fn from_env() -> Result<Self, StoreError> {
        Ok(Self {
            connection_string: std::env::var("MONGODB_URI")
                .map_err(|_| StoreError::Configuration("MONGODB_URI not set".into()))?,
            database: std::env::var("MONGODB_DATABASE").unwrap_or_else(|_| "corpus".to_string()),
            collection: std::env::var("MONGODB_COLLECTION")
                .unwrap_or_else(|_| "documents".to_string()),
            vector_search_index: std::env::var("MONGODB_VECTOR_INDEX")
                .unwrap_or_else(|_| "vector_index".to_string()),
            full_text_search_index: std::env::var("MONGODB_FULL_TEXT_INDEX")
                .unwrap_or_else(|_| "full_text_index".to_string()),
            embedding_field: std::env::var("MONGODB_EMBEDDING_FIELD")
                .unwrap_or_else(|_| "embedding".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AtlasConfig::default();
        assert_eq!(config.database, "corpus");
        assert_eq!(config.collection, "documents");
        assert_eq!(config.vector_search_index, "vector_index");
        assert_eq!(config.full_text_search_index, "full_text_index");
        assert_eq!(config.embedding_field, "embedding");
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = AtlasConfig {
            connection_string: "mongodb+srv://cluster0.mongodb.net".to_string(),
            database: "corpus_test".to_string(),
            collection: "docs".to_string(),
            vector_search_index: "cosine_index".to_string(),
            full_text_search_index: "text_index".to_string(),
            embedding_field: "custom_vector".to_string()
        };

        let json = serde_json::to_string(&config).unwrap();
        let back: AtlasConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
