//! Promotion of versioned NiFi flows between environments.
//!
//! The pipeline is sequential: connect to the source environment, stage the
//! configured flows for export (precondition checks plus snapshot retrieval),
//! connect to the target environment, then sanitize and apply each staged
//! flow to the target registry and canvas.

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod migrate;
pub mod nifi;
pub mod sanitize;
