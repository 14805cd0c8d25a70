//! Role-based access to dataroom documents.
//!
//! Two independent models live here and they do not agree about
//! `restricted`:
//!
//! - [`check_access`] ranks levels ordinally and has no `restricted` tier,
//!   so a `restricted` document ranks like `public` for signed-in users.
//! - [`accessible_categories`] enumerates browsable categories and grants
//!   `restricted` to admins only.
//!
//! Whether `restricted` sits above `admin` or is an orthogonal flag is an
//! open product question; both behaviors are kept as-is until it is settled.

use std::collections::BTreeSet;

use crate::models::{AccessLevel, DataroomRole, User, RESTRICTED_CATEGORY};

/// Whether `user` may view content tagged `required_level`.
///
/// Anonymous visitors see only `public`. Unknown level names rank as 0.
pub fn check_access(user: Option<&User>, required_level: &str) -> bool {
    let Some(user) = user else {
        return required_level == AccessLevel::Public.as_str();
    };

    let user_level = user.dataroom_role.access_level();
    let required = AccessLevel::from_str_or_public(required_level);

    user_level.ordinal() >= required.ordinal()
}

/// Document categories `user` may browse.
pub fn accessible_categories(user: Option<&User>) -> BTreeSet<&'static str> {
    let role = user.map(|u| u.dataroom_role).unwrap_or_default();

    let categories: &[&'static str] = match role {
        DataroomRole::Public => &["public"],
        DataroomRole::Investor => &["public", "investor"],
        DataroomRole::Board => &["public", "investor", "board"],
        DataroomRole::Admin => &["public", "investor", "board", "admin", RESTRICTED_CATEGORY],
    };

    categories.iter().copied().collect()
}
