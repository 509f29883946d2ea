//! Persistent feedbag storage: users, buddy-list items, and profiles.
//!
//! The [`FeedbagStore`] trait is the storage contract; [`SqliteFeedbagStore`]
//! is the shipped implementation. The trait is synchronous — calls are short
//! transactions on the underlying store. Implementations are `Clone` and
//! share internal state, so one handle serves every connection worker.

mod schema;
mod sqlite;

pub use sqlite::SqliteFeedbagStore;

use thiserror::Error;

use oscar_proto::WireError;
use oscar_proto::snacs::feedbag::FeedbagItem;

/// Block relation between two screen names.
///
/// `A` and `B` are not mutually exclusive in storage; the query reports the
/// first that applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocked {
    /// Neither side blocks the other
    No,
    /// The first screen name has a deny item for the second
    A,
    /// The second screen name has a deny item for the first
    B,
}

/// Feedbag store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The named user has no row in the user table.
    #[error("user {0} does not exist")]
    UserNotFound(String),

    /// Underlying database failure.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored attribute blob failed to decode.
    #[error("stored attributes are malformed: {0}")]
    Wire(#[from] WireError),
}

/// Storage contract for users, feedbag items, and profiles. All derived
/// queries (interested users, buddies) filter both directions of the block
/// relation.
pub trait FeedbagStore: Clone + Send + Sync + 'static {
    /// Idempotent user creation.
    fn upsert_user(&self, screen_name: &str) -> Result<(), StoreError>;

    /// Inserts or replaces items by (owner, group id, item id), stamping
    /// each with the current time. One transaction for the whole batch.
    fn upsert(&self, screen_name: &str, items: &[FeedbagItem]) -> Result<(), StoreError>;

    /// Deletes the owner's items by item id. One transaction for the whole
    /// batch.
    fn delete(&self, screen_name: &str, items: &[FeedbagItem]) -> Result<(), StoreError>;

    /// Every item the owner has stored, attributes decoded.
    fn retrieve(&self, screen_name: &str) -> Result<Vec<FeedbagItem>, StoreError>;

    /// Epoch seconds of the owner's newest modification; 0 for an empty
    /// feedbag.
    fn last_modified(&self, screen_name: &str) -> Result<u32, StoreError>;

    /// Screen names holding a buddy item for `screen_name`, excluding any
    /// pair with a block in either direction.
    fn interested_users(&self, screen_name: &str) -> Result<Vec<String>, StoreError>;

    /// `screen_name`'s buddy entries, excluding any pair with a block in
    /// either direction.
    fn buddies(&self, screen_name: &str) -> Result<Vec<String>, StoreError>;

    /// Block relation between two screen names; [`Blocked::A`] wins when
    /// both apply.
    fn blocked(&self, sn1: &str, sn2: &str) -> Result<Blocked, StoreError>;

    /// The user's profile; empty string if the user exists with no profile,
    /// [`StoreError::UserNotFound`] otherwise.
    fn retrieve_profile(&self, screen_name: &str) -> Result<String, StoreError>;

    /// Inserts or replaces the user's profile.
    fn upsert_profile(&self, screen_name: &str, body: &str) -> Result<(), StoreError>;
}
