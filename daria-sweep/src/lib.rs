//! daria-sweep library interface
//!
//! Exposes the integrity sweeper for the `daria-sweep` binary, the ingest
//! pipeline and integration tests.

pub mod sweeper;

pub use sweeper::{retain_valid, IntegritySweeper, SweepOptions, SweepReport, SweepStats};
