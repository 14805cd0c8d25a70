//! Services layer for the dataroom.
//!
//! Access resolution, the identity-provider client, session issuance and
//! the account/document stores.

pub mod access;
mod database;
mod document_store;
pub mod error;
pub mod oidc;
pub mod session;
mod user_store;

pub use database::MongoDb;
pub use document_store::{DocumentStore, InMemoryDocumentStore};
pub use error::ServiceError;
pub use oidc::{AuthorizationRequest, OidcClient, OidcError, TokenSet, UserInfo};
pub use session::{SessionClaims, SessionIssuer, SESSION_COOKIE, SESSION_TTL_SECONDS};
pub use user_store::{find_or_provision_admin, InMemoryUserStore, UserStore};
