//! Natural-language query orchestration.
//!
//! This module provides:
//! - The request-scoped [`QueryContext`] handed to the synthesis gateway
//! - The [`QueryPipeline`] sequencing resolver, gateway, executor and
//!   formatter, with the total never-fails contract
//! - The scalar [`format_scalar`] result formatter

mod format;
mod pipeline;
mod types;

pub use format::format_scalar;
pub use pipeline::QueryPipeline;
pub use types::QueryContext;
