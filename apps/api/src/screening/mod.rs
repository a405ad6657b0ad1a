//! Result cache, re-evaluation and the HR review loop around the pipeline.

pub mod handlers;
pub mod models;
pub mod pg_store;
pub mod service;
pub mod store;
pub mod stream;

pub use pg_store::PgScreeningStore;
pub use service::{ScreeningError, ScreeningService};
pub use store::{MemoryScreeningStore, ScreeningStore, StoreError};
