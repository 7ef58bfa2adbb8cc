pub mod cli;
pub mod clients;
pub mod config;
pub mod handlers;
pub mod mapping;
pub mod models;
pub mod processing;
pub mod resolve;
pub mod schema;
pub mod storage;
pub mod sync;

// Convenient re-exports for tests and external callers
pub use clients::*;
pub use config::*;
pub use handlers::*;
pub use mapping::*;
pub use models::*;
pub use processing::*;
pub use resolve::*;
pub use storage::*;
pub use sync::*;
