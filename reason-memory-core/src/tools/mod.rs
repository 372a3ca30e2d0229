//! Tool surface (spec §6): validated input/output functions exposed as
//! library calls. A host binds these to whatever transport it speaks; this
//! crate does not implement a transport itself (the distilled spec places
//! the MCP JSON-RPC wire format out of scope).

pub mod host;
pub mod types;

pub use host::ToolHost;
