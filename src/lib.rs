//! # persist-reader
//!
//! A decoder for MicroPython "persist" object-graph snapshots (magic
//! `MP\x80\x01`). Reconstructs the persisted value graph from a flat byte
//! buffer, including back-references between records and self-referential
//! dictionaries, for diagnostic inspection and round-trip verification.
//!
//! **Note:** function and bytecode records are decoded as opaque metadata;
//! they are never turned into callable values.
pub mod persist;

// Re-export the main types for convenience
pub use persist::{
    decode, BytecodeInfo, CapabilityRegistry, DictId, EmptyRegistry, FunctionInfo, PersistError,
    SnapshotDocument, Value,
};
