//! Storage module
//! 
//! Key-value backends and the gated timer snapshot store built on them.

pub mod kv;
pub mod timer_store;

// Re-export main types
pub use kv::{FileStore, KeyValueStore, MemoryStore};
pub use timer_store::{TimerStore, TIMER_STATE_KEY};
