mod document;
mod user;

pub use document::{AccessLevel, Document, DocumentResponse, RESTRICTED_CATEGORY};
pub use user::{AuthProvider, DataroomRole, User};
