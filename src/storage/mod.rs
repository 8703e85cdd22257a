//! Filesystem and database primitives used by the backup layer
//!
//! Provides staged writes with guaranteed cleanup, the advisory lock on the
//! live database, page-level snapshots, and streaming zstd compression.

pub mod compression;
pub mod lock;
pub mod snapshot;
pub mod staging;

pub use compression::CompressionPipeline;
pub use lock::{LockAttempt, SourceLock};
pub use snapshot::SnapshotProducer;
pub use staging::{stage, ScratchPath, StagingScope};
