use async_trait::async_trait;
use dashmap::DashMap;

use super::ServiceError;
use crate::models::User;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Exact, case-sensitive email match.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, ServiceError>;
    async fn insert(&self, user: &User) -> Result<(), ServiceError>;
    async fn health_check(&self) -> Result<(), ServiceError>;
}

/// Returns the account for `email`, creating an externally-managed admin
/// if none exists. Existing accounts are returned untouched.
///
/// Lookup and insert are not atomic: two concurrent first logins for the
/// same email can both insert.
pub async fn find_or_provision_admin(
    store: &dyn UserStore,
    email: &str,
    name: Option<&str>,
) -> Result<User, ServiceError> {
    if let Some(existing) = store.find_by_email(email).await? {
        tracing::debug!(user_id = %existing.id, "Reusing existing account");
        return Ok(existing);
    }

    let user = User::external_admin(email.to_string(), name.map(str::to_string));
    store.insert(&user).await?;
    tracing::info!(user_id = %user.id, email = %user.email, "Provisioned admin account");
    Ok(user)
}

/// Process-local store for tests and local development.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: DashMap<String, User>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn count_by_email(&self, email: &str) -> usize {
        self.users.iter().filter(|u| u.email == email).count()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, ServiceError> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, ServiceError> {
        Ok(self.users.get(id).map(|entry| entry.value().clone()))
    }

    async fn insert(&self, user: &User) -> Result<(), ServiceError> {
        self.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(())
    }
}
