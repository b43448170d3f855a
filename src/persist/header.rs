//! Snapshot header parsing (magic plus two metadata lines).

use log::debug;

use super::cursor::Cursor;
use super::error::Result;

/// Magic identifying the persist format family and major version.
pub const MAGIC: &[u8; 4] = b"MP\x80\x01";

/// Parse the snapshot header.
///
/// Header structure:
/// - 4 bytes: magic (`MP\x80\x01`)
/// - 2 text lines: free-form metadata, each terminated by `\n` within the
///   line lookahead bound (the encoder writes e.g. `micropython persist v0.1`)
///
/// Returns `Ok(false)` when the magic does not match (including a buffer
/// shorter than 4 bytes): the buffer is simply not a persist snapshot, which
/// is not an error. A metadata line that fails to terminate within the bound
/// is an error, since at that point the buffer claimed to be this format.
pub fn parse(cursor: &mut Cursor<'_>) -> Result<bool> {
    if cursor.read(4) != &MAGIC[..] {
        return Ok(false);
    }

    // Two free-form lines; content is not interpreted beyond the bound.
    let line0 = cursor.read_line()?;
    let line1 = cursor.read_line()?;
    debug!(
        "Snapshot header: {:?} / {:?}",
        String::from_utf8_lossy(line0).trim_end(),
        String::from_utf8_lossy(line1).trim_end()
    );

    Ok(true)
}
