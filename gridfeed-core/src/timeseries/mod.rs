//! Time-series utilities shared by connectors and the orchestrator.
//!
//! - `normalize`: sort, de-duplicate, and restrict canonical points
//! - `resample`: aggregate sub-hourly points onto hour buckets

/// Sorting, de-duplication, and filtering of canonical points.
pub mod normalize;
/// Hourly aggregation of sub-hourly points.
pub mod resample;
