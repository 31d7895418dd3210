//! Code graph expansion
//!
//! Grows a seed set along three kinds of edges: chunk adjacency within a file,
//! shared breadcrumbs, and resolved import statements.

mod expander;
pub mod resolvers;

pub use expander::{ExpansionLimits, GraphExpander};
pub use resolvers::{common_prefix_len, ImportResolver, ImportStrategy};
