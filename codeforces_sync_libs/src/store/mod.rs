pub mod core;
pub mod memory;
pub mod model;
pub mod postgres;

pub use self::core::{Store, StoreError};
pub use self::memory::{FailPoint, MemoryStore};
pub use self::postgres::{PgStore, MIGRATOR};
