//! Workspace package for Capstan.
//!
//! Hosts the end-to-end tests under `tests/` and the benchmarks under
//! `benches/`. Library users depend on the `capstan` crate directly; this
//! package only re-exports it.

pub use capstan::*;
