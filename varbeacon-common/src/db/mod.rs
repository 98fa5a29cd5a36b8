//! SQLite adapters for the engine ports

pub mod audit;
pub mod clients;
pub mod init;
pub mod store;

pub use audit::SqliteAuditSink;
pub use clients::SqliteClientDirectory;
pub use init::*;
pub use store::SqliteVariantStore;
