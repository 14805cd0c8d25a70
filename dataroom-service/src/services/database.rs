use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::doc,
    options::{FindOptions, IndexOptions},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use super::{DocumentStore, ServiceError, UserStore};
use crate::models::{Document, User};

#[derive(Clone)]
pub struct MongoDb {
    _client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!(database = %database, "Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self {
            _client: client,
            db,
        })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for dataroom-service");

        // Not unique: accounts are created by the CMS too, and enforcing it
        // here would turn the first-login race into a hard failure.
        let email_index = IndexModel::builder()
            .keys(doc! { "email": 1 })
            .options(IndexOptions::builder().name("email_lookup".to_string()).build())
            .build();

        self.users()
            .create_index(email_index, None)
            .await
            .map_err(|e| {
                tracing::error!("Failed to create email index on users collection: {}", e);
                AppError::from(e)
            })?;
        tracing::info!("Created index on users.email");

        let access_index = IndexModel::builder()
            .keys(doc! { "access_level": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("access_level_recent".to_string())
                    .build(),
            )
            .build();

        self.documents()
            .create_index(access_index, None)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Failed to create access_level index on documents collection: {}",
                    e
                );
                AppError::from(e)
            })?;
        tracing::info!("Created index on documents.(access_level, created_at)");

        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn documents(&self) -> Collection<Document> {
        self.db.collection("documents")
    }
}

#[async_trait]
impl UserStore for MongoDb {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.users().find_one(doc! { "_id": id }, None).await?)
    }

    async fn insert(&self, user: &User) -> Result<(), ServiceError> {
        self.users().insert_one(user, None).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MongoDb {
    async fn list_by_access_levels(&self, levels: &[&str]) -> Result<Vec<Document>, ServiceError> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let levels: Vec<String> = levels.iter().map(|level| level.to_string()).collect();
        let cursor = self
            .documents()
            .find(doc! { "access_level": { "$in": levels } }, options)
            .await?;

        Ok(cursor.try_collect().await?)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Document>, ServiceError> {
        Ok(self.documents().find_one(doc! { "_id": id }, None).await?)
    }
}
