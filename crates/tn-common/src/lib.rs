//! Shared plumbing for Tenure binaries

pub mod logging;
