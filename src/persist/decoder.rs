//! Per-tag record decoders and the dispatch loop.
//!
//! One dispatch cycle reads a tag byte, pre-allocates the record's object
//! table slot, decodes the body (recursing back into dispatch for nested
//! values), then finalizes the slot with the decoded value. The table is
//! keyed by the offset of each record's tag byte, which is exactly what the
//! `O`/`Q` back-reference records encode.

use std::collections::{BTreeMap, HashMap};

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, trace};

use super::cursor::Cursor;
use super::error::{PersistError, Result};
use super::extended::{self, ExtendedDecoderFn};
use super::registry::CapabilityRegistry;
use super::value::{render, DictId, SnapshotDocument, Value};

/// Number of raw bytes shown in error and trace previews.
const PREVIEW_BYTES: usize = 32;

/// Decoder state for one snapshot: the cursor, the object table, and the
/// dict arena. Owned exclusively by one decode invocation.
pub(crate) struct Decoder<'a, 'r> {
    pub(crate) cursor: Cursor<'a>,
    registry: &'r dyn CapabilityRegistry,
    extended: HashMap<&'static str, ExtendedDecoderFn>,
    objects: BTreeMap<u64, Value>,
    dicts: Vec<Vec<(Value, Value)>>,
    root: Option<Value>,
}

impl<'a, 'r> Decoder<'a, 'r> {
    pub(crate) fn new(cursor: Cursor<'a>, registry: &'r dyn CapabilityRegistry) -> Self {
        Self {
            cursor,
            registry,
            extended: extended::registry(),
            objects: BTreeMap::new(),
            dicts: Vec::new(),
            root: None,
        }
    }

    /// Run the streaming phase until the buffer is exhausted, then assemble
    /// the document.
    pub(crate) fn run(mut self) -> Result<SnapshotDocument> {
        while self.cursor.tell() < self.cursor.len() {
            self.dispatch()?;
        }
        Ok(SnapshotDocument {
            root: self.root,
            objects: self.objects,
            dicts: self.dicts,
        })
    }

    /// One dispatch cycle: read a tag, pre-allocate the table slot, decode
    /// the record body, finalize the slot.
    ///
    /// Pre-allocation is what lets a nested back-reference to `pos` resolve
    /// while the record is still being decoded. Only dicts get a usable
    /// default instance; every other tag leaves a [`Value::ForwardRef`]
    /// marker in the slot until its body finishes, and a reference taken in
    /// that window keeps the marker (see the `value` module docs).
    pub(crate) fn dispatch(&mut self) -> Result<Value> {
        let pos = self.cursor.tell();
        let tag = self.cursor.read_u8("record tag")?;

        let decoded = if tag == b'd' {
            let id = DictId(self.dicts.len());
            self.dicts.push(Vec::new());
            self.objects.insert(pos, Value::Dict(id));
            self.decode_dict(id)
        } else {
            self.objects.insert(pos, Value::ForwardRef(pos));
            self.decode_record(pos, tag)
        };

        let value = match decoded {
            Ok(value) => value,
            Err(e) => {
                debug!(
                    "#ERR {}: b\"{}\"...",
                    pos,
                    self.cursor.peek_at(pos, PREVIEW_BYTES).escape_ascii()
                );
                return Err(e);
            }
        };

        self.objects.insert(pos, value.clone());
        self.trace_record(pos, &value);
        Ok(value)
    }

    fn decode_record(&mut self, pos: u64, tag: u8) -> Result<Value> {
        match tag {
            b'b' => Ok(Value::Bytes(self.read_blob()?)),
            b's' | b'q' => self.decode_text(),
            b't' => {
                let count = self.read_count()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.dispatch()?);
                }
                Ok(Value::Tuple(items))
            }
            b'l' => {
                let count = self.read_count()?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.dispatch()?);
                }
                Ok(Value::List(items))
            }
            b'i' => Ok(Value::Int(self.read_int()?)),
            b'S' => {
                let bytes = self.cursor.read_exact(4, "small integer")?;
                Ok(Value::Int(LittleEndian::read_u32(bytes) as u64))
            }
            b'C' => self.decode_constant(pos),
            b'O' => self.resolve_reference(pos, 2),
            b'Q' => self.resolve_reference(pos, 4),
            b'U' => self.resolve_capability(pos),
            b'M' => {
                let value = self.dispatch()?;
                self.root = Some(value.clone());
                Ok(value)
            }
            b'E' => self.decode_extended(pos),
            b'X' => Err(PersistError::Unsupported { offset: pos }),
            other => Err(PersistError::UnknownTag {
                offset: pos,
                tag: (other as char).to_string(),
            }),
        }
    }

    fn decode_dict(&mut self, id: DictId) -> Result<Value> {
        let count = self.read_count()?;
        for _ in 0..count {
            let key = self.dispatch()?;
            let value = self.dispatch()?;
            self.dicts[id.0].push((key, value));
        }
        Ok(Value::Dict(id))
    }

    fn decode_text(&mut self) -> Result<Value> {
        let pos = self.cursor.tell();
        let bytes = self.read_blob()?;
        match String::from_utf8(bytes) {
            Ok(text) => Ok(Value::Str(text)),
            Err(_) => Err(PersistError::InvalidFormat {
                offset: pos,
                reason: "string payload is not valid UTF-8".to_string(),
            }),
        }
    }

    fn decode_constant(&mut self, pos: u64) -> Result<Value> {
        match self.cursor.read_u8("constant sub-tag")? {
            b'N' => Ok(Value::Null),
            b'T' => Ok(Value::Bool(true)),
            b'F' => Ok(Value::Bool(false)),
            other => Err(PersistError::InvalidConstant {
                offset: pos,
                subtag: other,
            }),
        }
    }

    /// Resolve an `O` (2-byte) or `Q` (4-byte) back-reference through the
    /// object table. A missing entry means the stream is corrupt or points
    /// forward at a record that never began decoding.
    fn resolve_reference(&mut self, pos: u64, width: usize) -> Result<Value> {
        let bytes = self.cursor.read_exact(width, "back-reference offset")?;
        let target = read_le(bytes);
        trace!("#{}: back-reference -> #{}", pos, target);
        match self.objects.get(&target) {
            Some(value) => Ok(value.clone()),
            None => Err(PersistError::UnresolvedReference {
                offset: pos,
                target,
            }),
        }
    }

    fn resolve_capability(&mut self, pos: u64) -> Result<Value> {
        let key = self.read_blob()?;
        self.registry
            .resolve(&key)
            .ok_or_else(|| PersistError::UnresolvedCapability {
                offset: pos,
                key: String::from_utf8_lossy(&key).into_owned(),
            })
    }

    /// Decode an `E` escape record: a NUL-terminated name (at most
    /// [`extended::MAX_NAME_BYTES`] long) selects one of the registered
    /// named decoders.
    fn decode_extended(&mut self, pos: u64) -> Result<Value> {
        let start = self.cursor.tell();
        let window = self.cursor.read(extended::MAX_NAME_BYTES);
        let name_len = window.iter().position(|&b| b == 0).ok_or_else(|| {
            PersistError::Truncated {
                offset: start,
                what: format!(
                    "no NUL terminator within {} bytes of extended record name",
                    extended::MAX_NAME_BYTES
                ),
            }
        })?;
        self.cursor.seek(start + name_len as u64 + 1);

        let name = std::str::from_utf8(&window[..name_len]).map_err(|_| {
            PersistError::InvalidFormat {
                offset: start,
                reason: "extended record name is not valid UTF-8".to_string(),
            }
        })?;
        let decode =
            self.extended
                .get(name)
                .copied()
                .ok_or_else(|| PersistError::UnknownTag {
                    offset: pos,
                    tag: name.to_string(),
                })?;
        decode(self)
    }

    /// Decode an `i` integer body: an ASCII width digit in `{1,2,4,8}`, then
    /// that many little-endian bytes.
    fn read_int(&mut self) -> Result<u64> {
        let pos = self.cursor.tell();
        let width = match self.cursor.read_u8("integer width selector")? {
            b'1' => 1,
            b'2' => 2,
            b'4' => 4,
            b'8' => 8,
            other => {
                return Err(PersistError::InvalidFormat {
                    offset: pos,
                    reason: format!("invalid integer width selector 0x{:02x}", other),
                })
            }
        };
        let bytes = self.cursor.read_exact(width, "integer payload")?;
        Ok(read_le(bytes))
    }

    /// Decode a length/count prefix and enforce the corrupt-stream bound: at
    /// one byte per element minimum, a count can never exceed the bytes
    /// remaining in the buffer. Violations fail here, before any element is
    /// read.
    pub(crate) fn read_count(&mut self) -> Result<usize> {
        let pos = self.cursor.tell();
        let count = self.read_int()?;
        if count > self.cursor.remaining() {
            return Err(PersistError::Truncated {
                offset: pos,
                what: format!(
                    "count {} exceeds {} remaining bytes",
                    count,
                    self.cursor.remaining()
                ),
            });
        }
        Ok(count as usize)
    }

    /// Decode a length-prefixed byte blob: an `i`-encoded length, then that
    /// many raw bytes.
    pub(crate) fn read_blob(&mut self) -> Result<Vec<u8>> {
        let count = self.read_count()?;
        Ok(self.cursor.read_exact(count, "blob payload")?.to_vec())
    }

    fn trace_record(&self, pos: u64, value: &Value) {
        if log::log_enabled!(log::Level::Trace) {
            let len = (self.cursor.tell() - pos) as usize;
            let raw = self.cursor.peek_at(pos, len.min(PREVIEW_BYTES));
            trace!(
                "#{}: b\"{}\" -> {}",
                pos,
                raw.escape_ascii(),
                render(&self.dicts, value)
            );
        }
    }
}

/// Interpret up to eight little-endian bytes as an unsigned magnitude.
fn read_le(bytes: &[u8]) -> u64 {
    LittleEndian::read_uint(bytes, bytes.len())
}
