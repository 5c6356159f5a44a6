//! Tracing initialization for Tether
//!
//! Every crate instruments itself with `tracing` (the resilience crate logs
//! through the `log` facade, which the fmt subscriber picks up). Binaries and
//! tests call one of the initializers here once at startup.

pub mod init;

pub use init::{build_env_filter, init_logging_from_config, init_simple_tracing};
