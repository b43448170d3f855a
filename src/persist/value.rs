//! Decoded value model, the dict arena, and the snapshot document.
//!
//! Dictionaries are the one container kind the format allows to reference
//! themselves while still being filled, so they are indirected through an
//! arena owned by the document instead of being held by value. Every other
//! record that is referenced before its decoding finishes is observed as a
//! [`Value::ForwardRef`] marker; the encoder's monotonic offsets make this
//! safe in practice, and the limitation is preserved here deliberately.

use std::collections::BTreeMap;
use std::fmt::Write;

/// Index of a dictionary slot in a document's arena.
///
/// Equality on `DictId` is identity of the underlying dict: a back-reference
/// to a dict's offset yields the same id as the dict itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DictId(pub(crate) usize);

impl DictId {
    /// Position of this dict in the document's arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One decoded value from the snapshot stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    /// Integer magnitude from an `i` or `S` record (little-endian on the
    /// wire, up to eight bytes wide).
    Int(u64),
    Bytes(Vec<u8>),
    /// Text from an `s` record, or interned text from a `q` record; the two
    /// share one wire encoding and decode identically.
    Str(String),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    /// Associative container, held by arena index (see [`DictId`]).
    Dict(DictId),
    /// Function metadata from a `fun_bc` extended record. Opaque: never
    /// turned into a callable value.
    Function(Box<FunctionInfo>),
    /// Code metadata from a `bytecode` extended record. Opaque, never
    /// executed.
    Bytecode(Box<BytecodeInfo>),
    /// Marker for a record that had not finished decoding when it was
    /// dereferenced, carrying the record's offset.
    ForwardRef(u64),
}

/// Argument counts, flags, and the code-info blob of a persisted function.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub globals: Value,
    pub n_pos_args: u8,
    pub n_kwonly_args: u8,
    pub n_def_args: u8,
    pub flags: u8,
    pub code_info_size: u32,
    pub code_info: u32,
    pub extra_args: u32,
    pub code_blob: Vec<u8>,
}

/// Structural metadata of a persisted bytecode block.
#[derive(Debug, Clone, PartialEq)]
pub struct BytecodeInfo {
    pub block_name: Value,
    pub source_file: Value,
    pub arg_names: Vec<Value>,
    pub n_state: u16,
    pub n_exc_stack: u16,
    pub local_nums: Vec<u32>,
    pub lineno_info: Vec<u8>,
    pub body: Vec<u8>,
}

/// The result of one complete decode: the root value designated by the last
/// `M` record (if any), the full offset-indexed object table, and the dict
/// arena backing every [`Value::Dict`].
#[derive(Debug)]
pub struct SnapshotDocument {
    pub(crate) root: Option<Value>,
    pub(crate) objects: BTreeMap<u64, Value>,
    pub(crate) dicts: Vec<Vec<(Value, Value)>>,
}

impl SnapshotDocument {
    /// The value wrapped by the last `M` record, or `None` if the stream
    /// carried no `M` record (which is not an error).
    pub fn root(&self) -> Option<&Value> {
        self.root.as_ref()
    }

    /// Look up the decoded value whose tag byte sat at `offset`.
    pub fn object_at(&self, offset: u64) -> Option<&Value> {
        self.objects.get(&offset)
    }

    /// Iterate the object table in offset order.
    pub fn objects(&self) -> impl Iterator<Item = (u64, &Value)> {
        self.objects.iter().map(|(offset, value)| (*offset, value))
    }

    /// Number of entries in the object table.
    pub fn num_objects(&self) -> usize {
        self.objects.len()
    }

    /// Number of dict slots in the arena.
    pub fn num_dicts(&self) -> usize {
        self.dicts.len()
    }

    /// The `(key, value)` entries of the dict behind `id`, in decode order.
    pub fn dict(&self, id: DictId) -> Option<&[(Value, Value)]> {
        self.dicts.get(id.0).map(Vec::as_slice)
    }

    /// Find the value stored under `key` in the dict behind `id`.
    pub fn dict_get(&self, id: DictId, key: &Value) -> Option<&Value> {
        self.dicts
            .get(id.0)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Cycle-safe textual rendering of `value`, resolving dicts through this
    /// document's arena.
    pub fn render(&self, value: &Value) -> String {
        render(&self.dicts, value)
    }
}

/// Cycle-safe textual rendering used for traces and the CLI dump. A dict
/// already on the rendering stack prints as a `<dict #id>` placeholder
/// instead of recursing into itself.
pub(crate) fn render(dicts: &[Vec<(Value, Value)>], value: &Value) -> String {
    let mut out = String::new();
    let mut active = Vec::new();
    render_into(dicts, value, &mut active, &mut out);
    out
}

fn render_into(
    dicts: &[Vec<(Value, Value)>],
    value: &Value,
    active: &mut Vec<DictId>,
    out: &mut String,
) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Int(n) => {
            let _ = write!(out, "{}", n);
        }
        Value::Bytes(b) => {
            let _ = write!(out, "b\"{}\"", b.escape_ascii());
        }
        Value::Str(s) => {
            let _ = write!(out, "{:?}", s);
        }
        Value::Tuple(items) => render_seq(dicts, items, ('(', ')'), active, out),
        Value::List(items) => render_seq(dicts, items, ('[', ']'), active, out),
        Value::Dict(id) => {
            if active.contains(id) {
                let _ = write!(out, "<dict #{}>", id.0);
                return;
            }
            active.push(*id);
            out.push('{');
            if let Some(entries) = dicts.get(id.0) {
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    render_into(dicts, k, active, out);
                    out.push_str(": ");
                    render_into(dicts, v, active, out);
                }
            }
            out.push('}');
            active.pop();
        }
        Value::Function(f) => {
            let _ = write!(
                out,
                "<function pos_args={} flags={:#x} blob={}B>",
                f.n_pos_args,
                f.flags,
                f.code_blob.len()
            );
        }
        Value::Bytecode(b) => {
            out.push_str("<bytecode ");
            render_into(dicts, &b.block_name, active, out);
            let _ = write!(out, " body={}B>", b.body.len());
        }
        Value::ForwardRef(offset) => {
            let _ = write!(out, "<forward-ref #{}>", offset);
        }
    }
}

fn render_seq(
    dicts: &[Vec<(Value, Value)>],
    items: &[Value],
    brackets: (char, char),
    active: &mut Vec<DictId>,
    out: &mut String,
) {
    out.push(brackets.0);
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        render_into(dicts, item, active, out);
    }
    out.push(brackets.1);
}
