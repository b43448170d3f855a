//! Named extended records reached through the `E` escape tag.
//!
//! Rarely-used record kinds carry a NUL-terminated name instead of burning a
//! single-character tag. The name selects a decoder from the table built by
//! [`registry`], so adding a record kind means adding one entry there rather
//! than growing the core dispatcher.
//!
//! Both decoders here produce opaque metadata: function and bytecode records
//! are parsed byte-exactly (so the cursor lands on the next record) but are
//! never turned into callable values.

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian};

use super::decoder::Decoder;
use super::error::{PersistError, Result};
use super::value::{BytecodeInfo, FunctionInfo, Value};

/// Maximum length of an extended record name, excluding the NUL terminator.
pub(crate) const MAX_NAME_BYTES: usize = 64;

pub(crate) type ExtendedDecoderFn = for<'a, 'r> fn(&mut Decoder<'a, 'r>) -> Result<Value>;

/// Build the name → decoder table. Populated once per decode.
pub(crate) fn registry() -> HashMap<&'static str, ExtendedDecoderFn> {
    let mut map: HashMap<&'static str, ExtendedDecoderFn> = HashMap::new();
    map.insert("fun_bc", decode_function);
    map.insert("bytecode", decode_bytecode);
    map
}

/// `fun_bc`: a dispatched globals value, fixed-width argument counts and
/// flags, then a length-prefixed code-info blob.
fn decode_function(d: &mut Decoder<'_, '_>) -> Result<Value> {
    let globals = d.dispatch()?;
    let n_pos_args = d.cursor.read_u8("n_pos_args")?;
    let n_kwonly_args = d.cursor.read_u8("n_kwonly_args")?;
    let n_def_args = d.cursor.read_u8("n_def_args")?;
    let flags = d.cursor.read_u8("flags")?;
    let code_info_size = read_u32(d, "code_info_size")?;
    let code_info = read_u32(d, "code_info")?;
    let extra_args = read_u32(d, "extra_args")?;
    let code_blob = d.read_blob()?;

    Ok(Value::Function(Box::new(FunctionInfo {
        globals,
        n_pos_args,
        n_kwonly_args,
        n_def_args,
        flags,
        code_info_size,
        code_info,
        extra_args,
        code_blob,
    })))
}

/// `bytecode`: a version byte (must be ASCII `0`), dispatched block/source
/// names, counted argument names, state sizes, counted local numbers and
/// line-number info, then the length-prefixed bytecode body.
fn decode_bytecode(d: &mut Decoder<'_, '_>) -> Result<Value> {
    let pos = d.cursor.tell();
    let version = d.cursor.read_u8("bytecode version")?;
    if version != b'0' {
        return Err(PersistError::InvalidFormat {
            offset: pos,
            reason: format!("unsupported bytecode version byte 0x{:02x}", version),
        });
    }

    let block_name = d.dispatch()?;
    let source_file = d.dispatch()?;

    let num_args = d.read_count()?;
    let mut arg_names = Vec::with_capacity(num_args);
    for _ in 0..num_args {
        arg_names.push(d.dispatch()?);
    }

    let n_state = read_u16(d, "n_state")?;
    let n_exc_stack = read_u16(d, "n_exc_stack")?;

    let num_locals = d.read_count()?;
    let mut local_nums = Vec::with_capacity(num_locals);
    for _ in 0..num_locals {
        local_nums.push(read_u32(d, "local number")?);
    }

    let num_linenos = d.read_count()?;
    let lineno_info = d.cursor.read_exact(num_linenos, "line-number info")?.to_vec();

    let body = d.read_blob()?;

    Ok(Value::Bytecode(Box::new(BytecodeInfo {
        block_name,
        source_file,
        arg_names,
        n_state,
        n_exc_stack,
        local_nums,
        lineno_info,
        body,
    })))
}

fn read_u16(d: &mut Decoder<'_, '_>, what: &str) -> Result<u16> {
    Ok(LittleEndian::read_u16(d.cursor.read_exact(2, what)?))
}

fn read_u32(d: &mut Decoder<'_, '_>, what: &str) -> Result<u32> {
    Ok(LittleEndian::read_u32(d.cursor.read_exact(4, what)?))
}
