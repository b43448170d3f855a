//! Core persist snapshot decoder module

pub mod cursor;
pub mod error;
pub mod registry;
pub mod value;

mod decoder;
mod extended;
mod header;

use log::info;

pub use error::{PersistError, Result};
pub use header::MAGIC;
pub use registry::{CapabilityRegistry, EmptyRegistry};
pub use value::{BytecodeInfo, DictId, FunctionInfo, SnapshotDocument, Value};

use cursor::Cursor;
use decoder::Decoder;

/// Decode one persist snapshot from a fully-materialized byte buffer.
///
/// Returns `Ok(None)` when the buffer does not start with the persist magic
/// (including an empty buffer): the input is simply not this format, and the
/// caller may try a different decoder. Every other malformed input fails
/// with a [`PersistError`] carrying the offset of the failing record.
///
/// Capability keys written for host-resident values are resolved through
/// `registry`; a key the registry does not know is a fatal
/// [`PersistError::UnresolvedCapability`].
///
/// Decoding is synchronous and single-pass; the cursor and object table are
/// owned by this one invocation, so independent buffers may be decoded
/// concurrently without shared state.
pub fn decode(
    buf: &[u8],
    registry: &dyn CapabilityRegistry,
) -> Result<Option<SnapshotDocument>> {
    let mut cursor = Cursor::new(buf);
    if !header::parse(&mut cursor)? {
        return Ok(None);
    }

    let document = Decoder::new(cursor, registry).run()?;
    info!(
        "Snapshot decoded: {} objects, {} dicts, root {}",
        document.num_objects(),
        document.num_dicts(),
        if document.root().is_some() {
            "present"
        } else {
            "absent"
        }
    );
    Ok(Some(document))
}
