//! File I/O for addressing tables.
//!
//! This module provides the stores used to persist conservative addressing
//! between runs.

pub mod addressing;

pub use addressing::{
    AddressingKey, AddressingRecord, AddressingStore, JsonFileStore, MemoryStore, read_addressing,
    write_addressing,
};
