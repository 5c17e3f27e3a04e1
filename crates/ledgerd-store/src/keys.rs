//! Key encoding utilities for `RocksDB`.
//!
//! Owner keys are a tag byte (user vs. organization) followed by the 16-byte
//! UUID, so users and organizations never collide. Owner-scoped index keys
//! append the 16-byte ULID of the grant or spend, which keeps prefix scans
//! time-ordered.

use ledgerd_core::{GrantId, Owner, SpendId};

const OWNER_TAG_USER: u8 = 0x00;
const OWNER_TAG_ORGANIZATION: u8 = 0x01;

/// Length of an encoded owner key in bytes.
pub const OWNER_KEY_LEN: usize = 17;

/// Encode an owner as a storage key prefix.
#[must_use]
pub fn owner_key(owner: &Owner) -> Vec<u8> {
    let mut key = Vec::with_capacity(OWNER_KEY_LEN);
    match owner {
        Owner::User(id) => {
            key.push(OWNER_TAG_USER);
            key.extend_from_slice(id.as_bytes());
        }
        Owner::Organization(id) => {
            key.push(OWNER_TAG_ORGANIZATION);
            key.extend_from_slice(id.as_bytes());
        }
    }
    key
}

/// Create a grant key from a grant ID.
#[must_use]
pub fn grant_key(grant_id: &GrantId) -> Vec<u8> {
    grant_id.to_bytes().to_vec()
}

/// Create a spend key from a spend ID.
#[must_use]
pub fn spend_key(spend_id: &SpendId) -> Vec<u8> {
    spend_id.to_bytes().to_vec()
}

/// Create an owner-grant index key: `owner_key (17) || grant_id (16)`.
#[must_use]
pub fn owner_grant_key(owner: &Owner, grant_id: &GrantId) -> Vec<u8> {
    let mut key = owner_key(owner);
    key.extend_from_slice(&grant_id.to_bytes());
    key
}

/// Create an owner-spend index key: `owner_key (17) || spend_id (16)`.
#[must_use]
pub fn owner_spend_key(owner: &Owner, spend_id: &SpendId) -> Vec<u8> {
    let mut key = owner_key(owner);
    key.extend_from_slice(&spend_id.to_bytes());
    key
}

/// Create an owner-source-ref index key: `owner_key (17) || source_ref`.
#[must_use]
pub fn owner_source_ref_key(owner: &Owner, source_ref: &str) -> Vec<u8> {
    let mut key = owner_key(owner);
    key.extend_from_slice(source_ref.as_bytes());
    key
}

/// Extract the grant ID from an owner-grant index key.
///
/// # Panics
///
/// Panics if the key is not exactly 33 bytes.
#[must_use]
pub fn extract_grant_id_from_owner_key(key: &[u8]) -> GrantId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[OWNER_KEY_LEN..OWNER_KEY_LEN + 16]);
    GrantId::from_bytes(bytes).expect("valid ULID bytes")
}

/// Extract the spend ID from an owner-spend index key.
///
/// # Panics
///
/// Panics if the key is not exactly 33 bytes.
#[must_use]
pub fn extract_spend_id_from_owner_key(key: &[u8]) -> SpendId {
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&key[OWNER_KEY_LEN..OWNER_KEY_LEN + 16]);
    SpendId::from_bytes(bytes).expect("valid ULID bytes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerd_core::{OrganizationId, UserId};

    #[test]
    fn owner_key_length_and_tags() {
        let user = Owner::User(UserId::generate());
        let org = Owner::Organization(OrganizationId::generate());

        let user_key = owner_key(&user);
        let org_key = owner_key(&org);

        assert_eq!(user_key.len(), OWNER_KEY_LEN);
        assert_eq!(org_key.len(), OWNER_KEY_LEN);
        assert_eq!(user_key[0], OWNER_TAG_USER);
        assert_eq!(org_key[0], OWNER_TAG_ORGANIZATION);
    }

    #[test]
    fn user_and_org_with_same_uuid_do_not_collide() {
        let uuid = uuid::Uuid::new_v4();
        let user = Owner::User(UserId::from_uuid(uuid));
        let org = Owner::Organization(OrganizationId::from_uuid(uuid));
        assert_ne!(owner_key(&user), owner_key(&org));
    }

    #[test]
    fn owner_grant_key_format() {
        let owner = Owner::User(UserId::generate());
        let grant_id = GrantId::generate();
        let key = owner_grant_key(&owner, &grant_id);

        assert_eq!(key.len(), OWNER_KEY_LEN + 16);
        assert_eq!(&key[..OWNER_KEY_LEN], owner_key(&owner).as_slice());
        assert_eq!(&key[OWNER_KEY_LEN..], grant_id.to_bytes());
    }

    #[test]
    fn extract_grant_id_roundtrip() {
        let owner = Owner::User(UserId::generate());
        let grant_id = GrantId::generate();
        let key = owner_grant_key(&owner, &grant_id);

        assert_eq!(extract_grant_id_from_owner_key(&key), grant_id);
    }

    #[test]
    fn extract_spend_id_roundtrip() {
        let owner = Owner::Organization(OrganizationId::generate());
        let spend_id = SpendId::generate();
        let key = owner_spend_key(&owner, &spend_id);

        assert_eq!(extract_spend_id_from_owner_key(&key), spend_id);
    }
}
