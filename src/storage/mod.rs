//! Session persistence layer.
//!
//! The session store is the only component that reads or writes these
//! entries. Every value is a string.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::error::StorageError;

/// Persisted entry names as constants.
pub mod keys {
    pub const ACCESS_TOKEN: &str = "access_token";
    pub const REFRESH_TOKEN: &str = "refresh_token";
    /// Unix seconds, decimal text
    pub const EXPIRES_AT: &str = "expires_at";
    /// JSON-encoded user snapshot
    pub const USER: &str = "user";
    /// JSON-encoded account snapshot
    pub const ACCOUNT: &str = "account";

    pub const ALL: [&str; 5] = [ACCESS_TOKEN, REFRESH_TOKEN, EXPIRES_AT, USER, ACCOUNT];
}

/// String key/value backend for the persisted session.
pub trait SessionStorage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
