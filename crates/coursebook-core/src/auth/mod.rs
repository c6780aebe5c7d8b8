//! Authentication state: who is signed in and how that survives a restart.
//!
//! - `SessionStore`: the process-wide session handle shared by the API
//!   gateway and the front end
//! - `KeyValueStore` backends: files, OS keychain, or memory
//!
//! Tokens are opaque. A session counts as authenticated while an access
//! token is held; expiry is only discovered when the backend rejects it.

pub mod session;
pub mod storage;

pub use session::{SessionData, SessionStore};
pub use storage::{FileStore, KeyValueStore, KeyringStore, MemoryStore};
