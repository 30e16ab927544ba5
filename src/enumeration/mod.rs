//! The concurrent enumeration pipeline: identity source, classifier,
//! worker pool, and result sink.

mod classifier;
mod pool;
mod sink;
mod source;

pub use classifier::classify;
pub use pool::WorkerPool;
pub use sink::ResultSink;
pub use source::{is_probeable, IdentitySource, ILLEGAL_CHARS};
