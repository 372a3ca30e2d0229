//! redb table definitions for the embedded storage adapter.
//!
//! Records are stored as JSON blobs keyed by their UUID's string form.
//! `redb` gives us the transactional guarantees; the value format stays
//! human-inspectable, matching the JSON dump format `backup.rs` already uses
//! on the wire between adapters.

use redb::TableDefinition;

pub const TRACES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("traces");
pub const MEMORIES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("memories");
