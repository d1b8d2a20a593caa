mod error;
mod memory;
mod postgres;
mod snapshot;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use snapshot::{NotifyingStore, Snapshotter, dump, restore};
pub use store::{Store, open};
