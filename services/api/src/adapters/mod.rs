pub mod memory_store;

pub use memory_store::{spawn_sweeper, InMemorySessionStore};
