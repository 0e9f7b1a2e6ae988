//! Session persistence
//!
//! Conversations live in Redis as append-only message lists with a metadata
//! record per session. The gateway core only ever appends; editing and
//! reordering do not exist. The store is an external collaborator behind the
//! narrow [`SessionStore`] trait; the [`SessionAccumulator`] is the one
//! component that writes assistant turns, and it does so strictly after the
//! stream's terminal frame.

pub mod accumulator;
pub mod redis;
pub mod store;

#[cfg(any(test, feature = "test-utils"))]
pub mod memory;

pub use accumulator::{dedup_incoming, SessionAccumulator};
pub use redis::RedisSessionStore;
pub use store::{SessionRecord, SessionStore};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemorySessionStore;
