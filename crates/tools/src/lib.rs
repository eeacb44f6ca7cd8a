//! Developer tooling: read-only summaries of a running session for the
//! desktop inspector panel and the CLI.
//!
//! # Invariants
//! - Inspection never mutates the session.

mod inspector;

pub use inspector::{GroupInfo, NodeInfo, SessionInspector, SessionSummary};
