//! Layout persistence: fallback-to-defaults loading, backfill, and
//! digest-skipped saves over a pluggable key-value backend.

mod backend;
mod core;

pub use backend::{FileStore, KeyValueStore, MemoryStore};
pub use core::{
    LayoutStore, LoadSource, STORAGE_KEY, SaveOutcome, backfill, dedupe_instance_ids,
    materialize_defaults,
};
