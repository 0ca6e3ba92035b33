//! # Capstan Storage
//!
//! Reference backends for the three storage slots and the factories a
//! bundle registers for them:
//!
//! | Slot | Type | Backend |
//! |---|---|---|
//! | blob | `in-memory` | [`InMemoryBlobStore`] |
//! | blob | `local` | [`LocalBlobStore`] |
//! | database | `in-memory` | [`InMemoryDatabase`] |
//! | cache | `in-memory` | [`InMemoryCache`] |

pub mod factories;
pub mod local;
pub mod memory;

pub use factories::{
    InMemoryCacheConfig, LocalBlobConfig, in_memory_blob_factory, in_memory_cache_factory,
    in_memory_database_factory, local_blob_factory,
};
pub use local::LocalBlobStore;
pub use memory::{InMemoryBlobStore, InMemoryCache, InMemoryDatabase};
