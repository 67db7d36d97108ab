//! Session Management Module
//!
//! Client-side session lifecycle: persisted authentication artifacts, token
//! inspection and role derivation.
//!
//! # Modules
//!
//! - [`storage`] - Pluggable key–value backends (memory, JSON file)
//! - [`claims`] - Unverified token decoding, expiry and role normalization
//! - [`store`] - The session store over an injected backend

pub mod claims;
pub mod storage;
pub mod store;

// Re-export commonly used items for convenience
pub use claims::{decode_token, Claims, Role};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use store::SessionStore;
