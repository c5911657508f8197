//! Permission and role checks shared by page gating and UI fragment gating.

use std::collections::BTreeSet;

use crate::types::User;

/// Capabilities required for a page or UI fragment.
///
/// Permissions are "all of"; roles are "any of". An empty set is not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirement {
    permissions: BTreeSet<String>,
    roles: BTreeSet<String>,
}

impl Requirement {
    /// No capabilities; any signed-in user passes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions.extend(permissions.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles.extend(roles.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn permissions(&self) -> &BTreeSet<String> {
        &self.permissions
    }

    #[must_use]
    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.permissions.is_empty() && self.roles.is_empty()
    }

    /// Render `fragment` only when `user` satisfies this requirement.
    pub fn gate<T>(&self, user: Option<&User>, fragment: impl FnOnce() -> T) -> Option<T> {
        authorized(user, self).then(fragment)
    }
}

/// Whether `user` holds every required permission and at least one required role.
#[must_use]
pub fn authorized(user: Option<&User>, requirement: &Requirement) -> bool {
    let Some(user) = user else {
        return false;
    };

    if !requirement.permissions.is_empty()
        && !requirement
            .permissions
            .iter()
            .all(|permission| user.permissions.contains(permission))
    {
        return false;
    }

    if !requirement.roles.is_empty()
        && !requirement.roles.iter().any(|role| user.roles.contains(role))
    {
        return false;
    }

    true
}
