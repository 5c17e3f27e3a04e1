//! Ledger ownership.
//!
//! Every grant and spend belongs to exactly one of a user or an organization.
//! The [`Owner`] enum makes the invalid states (both or neither) impossible
//! to represent internally; [`Owner::resolve`] performs the boundary check on
//! the optional identifiers callers actually supply.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{OrganizationId, UserId};

/// Caller supplied zero or two owners instead of exactly one.
///
/// This is always a programming/integration error, never a data state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("exactly one of user id or organization id is required")]
pub struct InvalidOwnerError;

/// The owner of a ledger entity: a user or an organization, never both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    /// Owned by an individual user.
    User(UserId),

    /// Owned by an organization.
    Organization(OrganizationId),
}

impl Owner {
    /// Resolve an owner from the optional identifiers supplied at the API
    /// boundary.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidOwnerError`] if both or neither identifier is given.
    /// This check runs before any persistence is touched.
    pub fn resolve(
        user_id: Option<UserId>,
        organization_id: Option<OrganizationId>,
    ) -> Result<Self, InvalidOwnerError> {
        match (user_id, organization_id) {
            (Some(user), None) => Ok(Self::User(user)),
            (None, Some(org)) => Ok(Self::Organization(org)),
            _ => Err(InvalidOwnerError),
        }
    }

    /// The user id, if this owner is a user.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::User(id) => Some(id),
            Self::Organization(_) => None,
        }
    }

    /// The organization id, if this owner is an organization.
    #[must_use]
    pub const fn organization_id(&self) -> Option<&OrganizationId> {
        match self {
            Self::Organization(id) => Some(id),
            Self::User(_) => None,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Organization(id) => write!(f, "org:{id}"),
        }
    }
}
