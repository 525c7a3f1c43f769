//! Memreport Coordinator - Runs a memory report over a data source

pub mod coordinator;

pub use coordinator::{needs_sampling, ReportCoordinator};
