//! Multi-query: load many streams, following references between them.
//!
//! A batch names streams and, for each, content paths whose values may be
//! references to further streams. [`MultiQueryResolver`] loads the batch as a
//! frontier work queue under one deadline.

pub mod config;
pub mod error;
pub mod loader;
pub mod query;
pub mod resolver;

pub use config::QueryConfig;
pub use error::{QueryError, QueryResult};
pub use loader::StreamLoader;
pub use query::{stream_reference, MultiQuery};
pub use resolver::MultiQueryResolver;
