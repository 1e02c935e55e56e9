//! Graph nodes: the encoding units of a compute graph.
//!
//! Two node kinds exist. Execute nodes dispatch a shader over arbitrary
//! argument groups each inference; prepack nodes run once at setup to
//! upload and pack static data. Both expose exactly one operation,
//! `encode`, which appends commands to the graph's command buffer.

pub(crate) mod binding;
pub mod execute;
pub mod prepack;

pub use execute::{ArgGroup, ExecuteNode};
pub use prepack::PrepackNode;
