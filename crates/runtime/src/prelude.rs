//! Methods of the builtin types, and the entrypoint that registers them.
//!
//! Every builtin entry starts with the three intrinsic slots. `String` and `Array` carry their
//! method libraries after them, at the slots given by [`StringMethod`] and [`ArrayMethod`].

use std::hash::Hasher;

use enum_ordinalize::Ordinalize;
use fnv::{FnvHashMap, FnvHasher};
use kiln_util::by_ptr::AsCmpPtr;

use crate::dispatch::{VTable, VTableEntry};
use crate::error::RuntimeError;
use crate::gc::Gc;
use crate::runtime::{BuiltinTypes, Runtime};
use crate::value::{Array, Str, Val};

#[cfg(test)]
mod test;

/// `String` methods after the intrinsic slots.
#[derive(Clone, Debug, PartialEq, Eq, Copy, Ordinalize)]
#[repr(u8)]
pub enum StringMethod {
    /// `length(self) -> Int`, in bytes
    Length = 3,
    ToLower = 4,
    ToUpper = 5,
    /// `padLeft(self, width: Int, padding: String) -> String`
    PadLeft = 6,
    Trim = 7,
    /// `trimStart(self, pattern: String?) -> String`
    TrimStart = 8,
    /// `trimEnd(self, pattern: String?) -> String`
    TrimEnd = 9,
    /// `split(self, separator: String) -> Array`
    Split = 10,
    Lines = 11,
    Chars = 12,
    /// `parseInt(self, radix: Int?) -> Int | None`
    ParseInt = 13,
    /// `parseFloat(self) -> Float | None`
    ParseFloat = 14,
}

impl StringMethod {
    pub const ALL: [StringMethod; 12] = [
        StringMethod::Length,
        StringMethod::ToLower,
        StringMethod::ToUpper,
        StringMethod::PadLeft,
        StringMethod::Trim,
        StringMethod::TrimStart,
        StringMethod::TrimEnd,
        StringMethod::Split,
        StringMethod::Lines,
        StringMethod::Chars,
        StringMethod::ParseInt,
        StringMethod::ParseFloat,
    ];

    pub fn slot(self) -> usize {
        self.ordinal() as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            StringMethod::Length => "length",
            StringMethod::ToLower => "toLower",
            StringMethod::ToUpper => "toUpper",
            StringMethod::PadLeft => "padLeft",
            StringMethod::Trim => "trim",
            StringMethod::TrimStart => "trimStart",
            StringMethod::TrimEnd => "trimEnd",
            StringMethod::Split => "split",
            StringMethod::Lines => "lines",
            StringMethod::Chars => "chars",
            StringMethod::ParseInt => "parseInt",
            StringMethod::ParseFloat => "parseFloat",
        }
    }
}

/// `Array` methods after the intrinsic slots.
#[derive(Clone, Debug, PartialEq, Eq, Copy, Ordinalize)]
#[repr(u8)]
pub enum ArrayMethod {
    Length = 3,
    IsEmpty = 4,
    /// `push(self, item) -> None`
    Push = 5,
    /// `concat(self, other: Array) -> Array`
    Concat = 6,
    /// `join(self, separator: String?) -> String`
    Join = 7,
    /// `contains(self, item) -> Bool`
    Contains = 8,
    /// `dedupe(self) -> Array`, keeping the first of each group of equal items
    Dedupe = 9,
    /// `enumerate(self) -> Array` of `[item, index]` pairs
    Enumerate = 10,
}

impl ArrayMethod {
    pub const ALL: [ArrayMethod; 8] = [
        ArrayMethod::Length,
        ArrayMethod::IsEmpty,
        ArrayMethod::Push,
        ArrayMethod::Concat,
        ArrayMethod::Join,
        ArrayMethod::Contains,
        ArrayMethod::Dedupe,
        ArrayMethod::Enumerate,
    ];

    pub fn slot(self) -> usize {
        self.ordinal() as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            ArrayMethod::Length => "length",
            ArrayMethod::IsEmpty => "isEmpty",
            ArrayMethod::Push => "push",
            ArrayMethod::Concat => "concat",
            ArrayMethod::Join => "join",
            ArrayMethod::Contains => "contains",
            ArrayMethod::Dedupe => "dedupe",
            ArrayMethod::Enumerate => "enumerate",
        }
    }
}

/// Register the method sets of the builtin types.
pub fn entrypoint(vtable: &mut VTable, types: &BuiltinTypes) -> Result<(), RuntimeError> {
    vtable.register(
        types.none,
        VTableEntry::new(
            "None",
            vec![
                method!("toString", none_to_string, 1, 1),
                method!("eq", none_eq, 2, 2),
                method!("hash", none_hash, 1, 1),
            ],
        ),
    )?;
    vtable.register(
        types.int,
        VTableEntry::new(
            "Int",
            vec![
                method!("toString", int_to_string, 1, 1),
                method!("eq", int_eq, 2, 2),
                method!("hash", int_hash, 1, 1),
            ],
        ),
    )?;
    vtable.register(
        types.float,
        VTableEntry::new(
            "Float",
            vec![
                method!("toString", float_to_string, 1, 1),
                method!("eq", float_eq, 2, 2),
                method!("hash", float_hash, 1, 1),
            ],
        ),
    )?;
    vtable.register(
        types.bool,
        VTableEntry::new(
            "Bool",
            vec![
                method!("toString", bool_to_string, 1, 1),
                method!("eq", bool_eq, 2, 2),
                method!("hash", bool_hash, 1, 1),
            ],
        ),
    )?;
    // Slot order must follow `StringMethod`.
    vtable.register(
        types.string,
        VTableEntry::new(
            "String",
            vec![
                method!("toString", string_to_string, 1, 1),
                method!("eq", string_eq, 2, 2),
                method!("hash", string_hash, 1, 1),
                method!("length", string_length, 1, 1),
                method!("toLower", string_to_lower, 1, 1),
                method!("toUpper", string_to_upper, 1, 1),
                method!("padLeft", string_pad_left, 3, 3),
                method!("trim", string_trim, 1, 1),
                method!("trimStart", string_trim_start, 1, 2),
                method!("trimEnd", string_trim_end, 1, 2),
                method!("split", string_split, 2, 2),
                method!("lines", string_lines, 1, 1),
                method!("chars", string_chars, 1, 1),
                method!("parseInt", string_parse_int, 1, 2),
                method!("parseFloat", string_parse_float, 1, 1),
            ],
        ),
    )?;
    // Slot order must follow `ArrayMethod`.
    vtable.register(
        types.array,
        VTableEntry::new(
            "Array",
            vec![
                method!("toString", array_to_string, 1, 1),
                method!("eq", array_eq, 2, 2),
                method!("hash", array_hash, 1, 1),
                method!("length", array_length, 1, 1),
                method!("isEmpty", array_is_empty, 1, 1),
                method!("push", array_push, 2, 2),
                method!("concat", array_concat, 2, 2),
                method!("join", array_join, 1, 2),
                method!("contains", array_contains, 2, 2),
                method!("dedupe", array_dedupe, 1, 1),
                method!("enumerate", array_enumerate, 1, 1),
            ],
        ),
    )?;
    Ok(())
}

// ====== Receivers and arguments ======

fn receiver_error(expected: &'static str, found: &Val) -> RuntimeError {
    RuntimeError::Receiver {
        expected,
        found: found.type_id(),
    }
}

fn int_receiver(v: &Val) -> Result<i64, RuntimeError> {
    v.as_int().ok_or_else(|| receiver_error("Int", v))
}

fn float_receiver(v: &Val) -> Result<f64, RuntimeError> {
    v.as_float().ok_or_else(|| receiver_error("Float", v))
}

fn bool_receiver(v: &Val) -> Result<bool, RuntimeError> {
    v.as_bool().ok_or_else(|| receiver_error("Bool", v))
}

fn string_receiver(v: &Val) -> Result<&Gc<Str>, RuntimeError> {
    v.as_string().ok_or_else(|| receiver_error("String", v))
}

fn array_receiver(v: &Val) -> Result<&Gc<Array>, RuntimeError> {
    v.as_array().ok_or_else(|| receiver_error("Array", v))
}

fn none_receiver(v: &Val) -> Result<(), RuntimeError> {
    if v.is_none() {
        Ok(())
    } else {
        Err(receiver_error("None", v))
    }
}

fn argument_error(args: &[Val], index: usize, expected: &'static str) -> RuntimeError {
    RuntimeError::Argument {
        index,
        expected,
        found: args[index].type_id(),
    }
}

fn int_arg(args: &[Val], index: usize) -> Result<i64, RuntimeError> {
    args[index]
        .as_int()
        .ok_or_else(|| argument_error(args, index, "Int"))
}

fn string_arg(args: &[Val], index: usize) -> Result<&Gc<Str>, RuntimeError> {
    args[index]
        .as_string()
        .ok_or_else(|| argument_error(args, index, "String"))
}

fn array_arg(args: &[Val], index: usize) -> Result<&Gc<Array>, RuntimeError> {
    args[index]
        .as_array()
        .ok_or_else(|| argument_error(args, index, "Array"))
}

/// An optional argument. Absent and `None` both count as not given.
fn optional_arg(args: &[Val], index: usize) -> Option<&Val> {
    args.get(index).filter(|v| !v.is_none())
}

fn optional_string_arg(args: &[Val], index: usize) -> Result<Option<&Gc<Str>>, RuntimeError> {
    optional_arg(args, index)
        .map(|_| string_arg(args, index))
        .transpose()
}

fn optional_int_arg(args: &[Val], index: usize) -> Result<Option<i64>, RuntimeError> {
    optional_arg(args, index)
        .map(|_| int_arg(args, index))
        .transpose()
}

// ====== toString ======

fn none_to_string(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    none_receiver(&args[0])?;
    Ok(rt.literal_none().into())
}

fn int_to_string(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let v = int_receiver(&args[0])?;
    Ok(rt.make_string(v.to_string()).into())
}

fn float_to_string(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let v = float_receiver(&args[0])?;
    Ok(rt.make_string(format_float(v)).into())
}

fn bool_to_string(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let v = bool_receiver(&args[0])?;
    Ok(rt.literal_bool(v).into())
}

fn string_to_string(_rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    string_receiver(&args[0])?;
    Ok(args[0].clone())
}

fn array_to_string(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    Ok(rt.render_array(array)?.into())
}

/// Render a float with six fractional digits, then drop trailing zeros, and the decimal point
/// too if nothing is left after it.
///
/// `3.0` renders as `3`, `3.25` as `3.25`, `-0.5` as `-0.5`. The sign survives rounding, so
/// `-0.0` and `-1e-9` both render as `-0`.
pub(crate) fn format_float(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let mut s = format!("{:.6}", v);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.').len();
    s.truncate(trimmed);
    s
}

// ====== eq ======

fn none_eq(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    none_receiver(&args[0])?;
    Ok(rt.make_bool(args[1].is_none()))
}

fn int_eq(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let a = int_receiver(&args[0])?;
    Ok(rt.make_bool(args[1].as_int() == Some(a)))
}

fn float_eq(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let a = float_receiver(&args[0])?;
    Ok(rt.make_bool(args[1].as_float() == Some(a)))
}

fn bool_eq(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let a = bool_receiver(&args[0])?;
    Ok(rt.make_bool(args[1].as_bool() == Some(a)))
}

fn string_eq(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let a = string_receiver(&args[0])?;
    let eq = match args[1].as_string() {
        Some(b) => **a == **b,
        None => false,
    };
    Ok(rt.make_bool(eq))
}

/// Element-wise comparison. A pair of arrays that is already being compared further up the
/// stack counts as equal, so self-containing arrays terminate.
fn array_eq(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let a = array_receiver(&args[0])?;
    let b = match args[1].as_array() {
        Some(b) => b,
        None => return Ok(rt.make_bool(false)),
    };

    let eq = rt.guard_eq(a, b, || -> Result<bool, RuntimeError> {
        let (a, b) = (a.to_vec(), b.to_vec());
        if a.len() != b.len() {
            return Ok(false);
        }
        for (x, y) in a.iter().zip(&b) {
            if !rt.call_eq(x, y)? {
                return Ok(false);
            }
        }
        Ok(true)
    });
    let eq = match eq {
        Some(eq) => eq?,
        None => true,
    };
    Ok(rt.make_bool(eq))
}

// ====== hash ======

// Tags keep e.g. `0`, `false` and `None` apart.
const TAG_NONE: u8 = 0;
const TAG_INT: u8 = 1;
const TAG_FLOAT: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_STRING: u8 = 4;
const TAG_ARRAY: u8 = 5;
const TAG_IDENTITY: u8 = 6;
const TAG_CYCLE: u8 = 7;

fn hash_bytes(tag: u8, bytes: &[u8]) -> i64 {
    let mut hasher = FnvHasher::default();
    hasher.write_u8(tag);
    hasher.write(bytes);
    hasher.finish() as i64
}

fn none_hash(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    none_receiver(&args[0])?;
    Ok(rt.make_int(hash_bytes(TAG_NONE, &[])))
}

fn int_hash(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let v = int_receiver(&args[0])?;
    Ok(rt.make_int(hash_bytes(TAG_INT, &v.to_le_bytes())))
}

fn float_hash(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let v = float_receiver(&args[0])?;
    // -0.0 == 0.0, so they must hash alike
    let v = if v == 0.0 { 0.0 } else { v };
    Ok(rt.make_int(hash_bytes(TAG_FLOAT, &v.to_bits().to_le_bytes())))
}

fn bool_hash(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let v = bool_receiver(&args[0])?;
    Ok(rt.make_int(hash_bytes(TAG_BOOL, &[v as u8])))
}

fn string_hash(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    Ok(rt.make_int(hash_bytes(TAG_STRING, s.as_bytes())))
}

/// Combines the element hashes in order. An array that is already being hashed further up the
/// stack contributes a fixed value instead of recursing.
fn array_hash(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    let hash = rt.guard_hash(array, || -> Result<i64, RuntimeError> {
        let mut hasher = FnvHasher::default();
        hasher.write_u8(TAG_ARRAY);
        for item in &array.to_vec() {
            hasher.write_i64(rt.call_hash(item)?);
        }
        Ok(hasher.finish() as i64)
    });
    let hash = match hash {
        Some(hash) => hash?,
        None => hash_bytes(TAG_CYCLE, &[]),
    };
    Ok(rt.make_int(hash))
}

/// Hash of the value's address, for types that have no `hash` method.
pub(crate) fn identity_hash(value: &Val) -> i64 {
    let addr = value.as_cmp_ptr() as usize;
    hash_bytes(TAG_IDENTITY, &addr.to_le_bytes())
}

// ====== String methods ======
//
// Length is in bytes, like indexing. The text transformations work on the UTF-8 view of the
// bytes, with invalid sequences replaced.

fn strings(rt: &Runtime, items: impl IntoIterator<Item = impl Into<bytes::Bytes>>) -> Val {
    rt.make_array(items.into_iter().map(|s| Val::from(rt.make_string(s))))
        .into()
}

fn string_length(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    Ok(rt.make_int(s.len() as i64))
}

fn string_to_lower(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    Ok(rt.make_string(s.as_str_lossy().to_lowercase()).into())
}

fn string_to_upper(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    Ok(rt.make_string(s.as_str_lossy().to_uppercase()).into())
}

/// Prepend whole copies of `padding` while the result stays within `width` bytes.
fn string_pad_left(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    let width = int_arg(args, 1)?;
    let padding = string_arg(args, 2)?;

    if width <= 0 || s.len() >= width as usize || padding.is_empty() {
        return Ok(args[0].clone());
    }
    let repeats = (width as usize - s.len()) / padding.len();
    let mut buf = padding.as_bytes().repeat(repeats);
    buf.extend_from_slice(s.as_bytes());
    Ok(rt.make_string(buf).into())
}

fn string_trim(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    Ok(rt.make_string(s.as_str_lossy().trim().to_owned()).into())
}

/// Without a pattern, trims whitespace; with one, trims repeated occurrences of it.
fn string_trim_start(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    let text = s.as_str_lossy();
    let trimmed = match optional_string_arg(args, 1)? {
        Some(pattern) => text.trim_start_matches(&*pattern.as_str_lossy()),
        None => text.trim_start(),
    };
    Ok(rt.make_string(trimmed.to_owned()).into())
}

fn string_trim_end(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    let text = s.as_str_lossy();
    let trimmed = match optional_string_arg(args, 1)? {
        Some(pattern) => text.trim_end_matches(&*pattern.as_str_lossy()),
        None => text.trim_end(),
    };
    Ok(rt.make_string(trimmed.to_owned()).into())
}

/// An empty separator splits into characters.
fn string_split(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    let separator = string_arg(args, 1)?.as_str_lossy();
    let text = s.as_str_lossy();
    if separator.is_empty() {
        return Ok(strings(rt, text.chars().map(String::from)));
    }
    Ok(strings(rt, text.split(&*separator).map(str::to_owned)))
}

fn string_lines(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    Ok(strings(rt, s.as_str_lossy().lines().map(str::to_owned)))
}

fn string_chars(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    Ok(strings(rt, s.as_str_lossy().chars().map(String::from)))
}

/// Returns `None` if the text is not a number in `radix` (default 10), or if the radix is
/// outside `2..=36`.
fn string_parse_int(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    let radix = optional_int_arg(args, 1)?.unwrap_or(10);
    if !(2..=36).contains(&radix) {
        return Ok(rt.make_none());
    }
    match i64::from_str_radix(&s.as_str_lossy(), radix as u32) {
        Ok(v) => Ok(rt.make_int(v)),
        Err(_) => Ok(rt.make_none()),
    }
}

fn string_parse_float(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let s = string_receiver(&args[0])?;
    match s.as_str_lossy().parse::<f64>() {
        Ok(v) => Ok(rt.make_float(v)),
        Err(_) => Ok(rt.make_none()),
    }
}

// ====== Array methods ======

fn array_length(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    Ok(rt.make_int(array.len() as i64))
}

fn array_is_empty(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    Ok(rt.make_bool(array.is_empty()))
}

fn array_push(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    array.push(rt, args[1].clone());
    Ok(rt.make_none())
}

fn array_concat(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    let other = array_arg(args, 1)?;
    Ok(rt
        .make_array(array.to_vec().into_iter().chain(other.to_vec()))
        .into())
}

/// Each item goes through its `toString` slot. A missing separator joins with nothing.
fn array_join(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    let separator = optional_string_arg(args, 1)?;
    let reprs = array
        .to_vec()
        .iter()
        .map(|item| rt.call_to_string(item))
        .collect::<Result<Vec<_>, _>>()?;

    let mut buf = Vec::new();
    for (i, repr) in reprs.iter().enumerate() {
        match separator {
            Some(sep) if i > 0 => buf.extend_from_slice(sep.as_bytes()),
            _ => {}
        }
        buf.extend_from_slice(repr.as_bytes());
    }
    Ok(rt.make_string(buf).into())
}

fn array_contains(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    for item in &array.to_vec() {
        if rt.call_eq(item, &args[1])? {
            return Ok(rt.make_bool(true));
        }
    }
    Ok(rt.make_bool(false))
}

/// Items are bucketed by `hash` and compared with `eq` inside a bucket.
fn array_dedupe(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    let mut seen: FnvHashMap<i64, Vec<Val>> = FnvHashMap::default();
    let mut kept = vec![];
    for item in array.to_vec() {
        let bucket = seen.entry(rt.call_hash(&item)?).or_default();
        let mut duplicate = false;
        for other in bucket.iter() {
            if rt.call_eq(other, &item)? {
                duplicate = true;
                break;
            }
        }
        if !duplicate {
            bucket.push(item.clone());
            kept.push(item);
        }
    }
    Ok(rt.make_array(kept).into())
}

fn array_enumerate(rt: &Runtime, args: &[Val]) -> Result<Val, RuntimeError> {
    let array = array_receiver(&args[0])?;
    let pairs = array
        .to_vec()
        .into_iter()
        .enumerate()
        .map(|(i, item)| Val::from(rt.make_array([item, rt.make_int(i as i64)])));
    Ok(rt.make_array(pairs).into())
}
