//! gridfeed-middleware
//!
//! The aggregator's result cache and the wrappers that layer request budgets
//! and cool-downs around connectors.

mod blacklist;
mod builder;
mod cache;
mod quota;

pub use crate::blacklist::{BlacklistMiddleware, BlacklistingMiddleware};
pub use crate::builder::ConnectorBuilder;
pub use crate::cache::{CacheStore, ResultCache, TtlStore};
pub use crate::quota::{Clock, QuotaAwareConnector, QuotaMiddleware};
