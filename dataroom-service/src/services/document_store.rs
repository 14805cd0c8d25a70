use async_trait::async_trait;
use dashmap::DashMap;

use super::ServiceError;
use crate::models::Document;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Documents whose `access_level` is one of `levels`, newest first.
    async fn list_by_access_levels(&self, levels: &[&str]) -> Result<Vec<Document>, ServiceError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, ServiceError>;
}

#[derive(Default)]
pub struct InMemoryDocumentStore {
    documents: DashMap<String, Document>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, document: Document) {
        self.documents.insert(document.id.clone(), document);
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn list_by_access_levels(&self, levels: &[&str]) -> Result<Vec<Document>, ServiceError> {
        let mut documents: Vec<Document> = self
            .documents
            .iter()
            .filter(|entry| levels.contains(&entry.access_level.as_str()))
            .map(|entry| entry.value().clone())
            .collect();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, ServiceError> {
        Ok(self.documents.get(id).map(|entry| entry.value().clone()))
    }
}
