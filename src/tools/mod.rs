//! Tools module
//!
//! Operations exposed by the MCP server and the command-line utility.

pub mod analysis;
pub mod debounce;
pub mod status;
