//! Generic record layout codec
//!
//! Every structured payload in the protocol (live packets and offline-built
//! asset records alike) follows one layout:
//!
//! ```text
//! nullable bitfield   ceil(optional_count / 8) bytes, one bit per optional
//!                     field in schema order (fixed and variable alike)
//! fixed block         required and optional-fixed fields in schema order;
//!                     absent optional-fixed slots are zero-filled, never
//!                     omitted
//! offset table        one i32 LE slot per variable field; -1 means absent,
//!                     otherwise a byte offset into the variable block
//! variable block      the bytes of present variable fields, schema order
//! ```
//!
//! Schemas are declarative static tables consumed by this one engine; field
//! order is the wire contract and must never be reordered. Numeric fields are
//! little-endian, booleans one byte (0/1), enumerations one byte equal to
//! their ordinal.

use super::varint::{
    decode_varint, decode_varstring, encode_varint, encode_varstring, VarintError, VarstringError,
};
use std::fmt;

// =============================================================================
// Schema Definitions
// =============================================================================

/// Fixed-size field representation
#[derive(Debug, Clone, Copy)]
pub enum FixedKind {
    /// One byte, 0 or 1
    Bool,
    U8,
    /// One byte equal to the declared ordinal
    Enum,
    U16,
    I32,
    I64,
    F32,
    F64,
    /// Inline nested record; the nested schema must have no variable fields
    /// so its size stays static
    Record(&'static Schema),
}

impl FixedKind {
    /// Encoded size in bytes
    pub fn size(&self) -> usize {
        match self {
            Self::Bool | Self::U8 | Self::Enum => 1,
            Self::U16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
            Self::Record(schema) => schema.fixed_size(),
        }
    }
}

/// Element type for arrays in the variable block
///
/// Array entries are written contiguously after a varint count; they never
/// get their own offset-table slots, only the containing field does.
#[derive(Debug, Clone, Copy)]
pub enum ElemKind {
    Fixed(FixedKind),
    /// Full nested encoding per entry
    Record(&'static Schema),
    Str,
}

/// Variable-length field representation
#[derive(Debug, Clone, Copy)]
pub enum VarKind {
    /// Varstring holding UTF-8 text
    Str,
    /// Varstring holding raw bytes
    Bytes,
    /// Nested record, written in full at the field's offset
    Record(&'static Schema),
    /// `varint(count)` followed by `count` contiguous entries
    Array(&'static ElemKind),
    /// Tagged union: `varint(type_id)` followed by the concrete record
    Union(&'static UnionDef),
}

/// Field classification within a record
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Always present, no bitfield bit
    Required(FixedKind),
    /// Occupies its slot unconditionally; the bitfield bit decides whether
    /// the slot's contents are meaningful
    OptionalFixed(FixedKind),
    /// One bitfield bit and one offset-table slot
    Variable(VarKind),
}

/// A single field in a schema
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

/// Schema-level precondition run before encoding
///
/// Rejects illegal field combinations before any bytes are produced.
pub type ValidateFn = fn(&RecordValue) -> Result<(), RecordError>;

/// An ordered field list; the order is the wire contract
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [FieldDef],
    pub validate: Option<ValidateFn>,
}

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [FieldDef]) -> Self {
        Self {
            name,
            fields,
            validate: None,
        }
    }

    pub const fn with_validator(
        name: &'static str,
        fields: &'static [FieldDef],
        validate: ValidateFn,
    ) -> Self {
        Self {
            name,
            fields,
            validate: Some(validate),
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Fields that own a bitfield bit (optional-fixed and variable)
    pub fn optional_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| !matches!(f.kind, FieldKind::Required(_)))
            .count()
    }

    /// Fields that own an offset-table slot
    pub fn variable_count(&self) -> usize {
        self.fields
            .iter()
            .filter(|f| matches!(f.kind, FieldKind::Variable(_)))
            .count()
    }

    pub fn bitfield_len(&self) -> usize {
        (self.optional_count() + 7) / 8
    }

    /// Total size of the fixed block, independent of which optional-fixed
    /// fields are present
    pub fn fixed_block_len(&self) -> usize {
        self.fields
            .iter()
            .map(|f| match f.kind {
                FieldKind::Required(kind) | FieldKind::OptionalFixed(kind) => kind.size(),
                FieldKind::Variable(_) => 0,
            })
            .sum()
    }

    /// Static size of everything before the variable block
    pub fn fixed_size(&self) -> usize {
        self.bitfield_len() + self.fixed_block_len() + 4 * self.variable_count()
    }
}

/// Tagged-union dispatch table: varint discriminant to concrete schema
#[derive(Debug)]
pub struct UnionDef {
    pub name: &'static str,
    pub variants: &'static [(i32, &'static Schema)],
}

impl UnionDef {
    pub const fn new(name: &'static str, variants: &'static [(i32, &'static Schema)]) -> Self {
        Self { name, variants }
    }

    pub fn schema_for(&self, type_id: i32) -> Option<&'static Schema> {
        self.variants
            .iter()
            .find(|(id, _)| *id == type_id)
            .map(|(_, schema)| *schema)
    }
}

// =============================================================================
// Values
// =============================================================================

/// A field value; must match the field's declared kind
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    U8(u8),
    Enum(u8),
    U16(u16),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bytes(Vec<u8>),
    Record(RecordValue),
    Array(Vec<Value>),
    Union { type_id: i32, value: Box<RecordValue> },
}

/// A field-value assignment for one schema
///
/// Slots are ordered exactly like the schema's fields; `None` means absent.
#[derive(Debug, Clone)]
pub struct RecordValue {
    schema: &'static Schema,
    slots: Vec<Option<Value>>,
}

impl PartialEq for RecordValue {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.slots == other.slots
    }
}

impl RecordValue {
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            slots: vec![None; schema.fields.len()],
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Set a field by name
    pub fn set(&mut self, name: &str, value: Value) -> Result<&mut Self, RecordError> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| RecordError::UnknownField {
                schema: self.schema.name,
                field: name.to_string(),
            })?;
        self.slots[index] = Some(value);
        Ok(self)
    }

    /// Mark a field absent by name
    pub fn unset(&mut self, name: &str) -> Result<&mut Self, RecordError> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| RecordError::UnknownField {
                schema: self.schema.name,
                field: name.to_string(),
            })?;
        self.slots[index] = None;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.schema
            .index_of(name)
            .and_then(|i| self.slots[i].as_ref())
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    /// Not enough bytes yet; a streaming caller may buffer more and retry
    Truncated { schema: &'static str },
    /// A required field has no value
    MissingRequired {
        schema: &'static str,
        field: &'static str,
    },
    /// A value does not match the field's declared kind
    TypeMismatch {
        schema: &'static str,
        field: &'static str,
    },
    /// A nested record value was built against a different schema
    SchemaMismatch {
        expected: &'static str,
        found: &'static str,
    },
    /// An inline nested record's schema has variable fields
    NestedNotFixed {
        schema: &'static str,
        field: &'static str,
    },
    /// An offset-table slot points outside the variable block
    BadOffset {
        schema: &'static str,
        field: &'static str,
        offset: i32,
    },
    /// A union discriminant has no registered schema
    UnknownTag { union: &'static str, type_id: i32 },
    /// A field name not present in the schema
    UnknownField { schema: &'static str, field: String },
    /// Schema-level precondition rejected the value before encoding
    Validation {
        schema: &'static str,
        reason: String,
    },
    /// The bytes cannot be a record of this schema
    Corrupt {
        schema: &'static str,
        detail: &'static str,
    },
}

impl RecordError {
    /// True for the "need more data" class, as opposed to invalid data
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Truncated { .. })
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { schema } => write!(f, "{}: record truncated, need more bytes", schema),
            Self::MissingRequired { schema, field } => {
                write!(f, "{}: required field '{}' is missing", schema, field)
            }
            Self::TypeMismatch { schema, field } => {
                write!(f, "{}: value for '{}' has the wrong type", schema, field)
            }
            Self::SchemaMismatch { expected, found } => {
                write!(f, "nested record built for '{}', expected '{}'", found, expected)
            }
            Self::NestedNotFixed { schema, field } => write!(
                f,
                "{}: inline record '{}' must have a fixed-size schema",
                schema, field
            ),
            Self::BadOffset {
                schema,
                field,
                offset,
            } => write!(
                f,
                "{}: offset {} for '{}' is outside the variable block",
                schema, offset, field
            ),
            Self::UnknownTag { union, type_id } => {
                write!(f, "{}: unknown union discriminant {}", union, type_id)
            }
            Self::UnknownField { schema, field } => {
                write!(f, "{}: no field named '{}'", schema, field)
            }
            Self::Validation { schema, reason } => {
                write!(f, "{}: validation failed: {}", schema, reason)
            }
            Self::Corrupt { schema, detail } => write!(f, "{}: corrupt record: {}", schema, detail),
        }
    }
}

impl std::error::Error for RecordError {}

fn map_varint(schema: &'static Schema, e: VarintError) -> RecordError {
    match e {
        VarintError::Incomplete => RecordError::Truncated {
            schema: schema.name,
        },
        VarintError::TooLong => RecordError::Corrupt {
            schema: schema.name,
            detail: "malformed varint",
        },
    }
}

fn map_varstring(schema: &'static Schema, e: VarstringError) -> RecordError {
    match e {
        VarstringError::Incomplete | VarstringError::Truncated { .. } => RecordError::Truncated {
            schema: schema.name,
        },
        VarstringError::NegativeLength(_) | VarstringError::BadPrefix => RecordError::Corrupt {
            schema: schema.name,
            detail: "malformed varstring",
        },
    }
}

fn ensure_fixed(
    schema: &'static Schema,
    field: &FieldDef,
    nested: &'static Schema,
) -> Result<(), RecordError> {
    if nested.variable_count() > 0 {
        return Err(RecordError::NestedNotFixed {
            schema: schema.name,
            field: field.name,
        });
    }
    Ok(())
}

fn ensure_schema(expected: &'static Schema, value: &RecordValue) -> Result<(), RecordError> {
    if !std::ptr::eq(expected, value.schema) {
        return Err(RecordError::SchemaMismatch {
            expected: expected.name,
            found: value.schema.name,
        });
    }
    Ok(())
}

// =============================================================================
// Encode
// =============================================================================

/// Encode a record into its exact wire bytes
///
/// The schema's validator, if any, runs first; on failure no bytes are
/// produced.
pub fn encode(value: &RecordValue) -> Result<Vec<u8>, RecordError> {
    let mut out = Vec::with_capacity(value.schema.fixed_size());
    encode_into(value, &mut out)?;
    Ok(out)
}

fn encode_into(value: &RecordValue, out: &mut Vec<u8>) -> Result<(), RecordError> {
    let schema = value.schema;
    if let Some(validate) = schema.validate {
        validate(value)?;
    }

    // Nullable bitfield, one bit per optional field in schema order.
    let bitfield_start = out.len();
    out.resize(bitfield_start + schema.bitfield_len(), 0);
    let mut bit = 0usize;
    for (i, field) in schema.fields.iter().enumerate() {
        match field.kind {
            FieldKind::Required(_) => {}
            FieldKind::OptionalFixed(_) | FieldKind::Variable(_) => {
                if value.slots[i].is_some() {
                    out[bitfield_start + bit / 8] |= 1 << (bit % 8);
                }
                bit += 1;
            }
        }
    }

    // Fixed block. Absent optional-fixed fields still occupy their slots,
    // zero-filled.
    for (i, field) in schema.fields.iter().enumerate() {
        match field.kind {
            FieldKind::Required(kind) => {
                let v = value.slots[i]
                    .as_ref()
                    .ok_or(RecordError::MissingRequired {
                        schema: schema.name,
                        field: field.name,
                    })?;
                encode_fixed(schema, field, kind, v, out)?;
            }
            FieldKind::OptionalFixed(kind) => match &value.slots[i] {
                Some(v) => encode_fixed(schema, field, kind, v, out)?,
                None => {
                    let size = kind.size();
                    out.resize(out.len() + size, 0);
                }
            },
            FieldKind::Variable(_) => {}
        }
    }

    // Offset table, all slots initialized to the -1 absent sentinel.
    let table_start = out.len();
    for _ in 0..schema.variable_count() {
        out.extend_from_slice(&(-1i32).to_le_bytes());
    }

    // Variable block. Offsets are relative to the block start; 0 is a valid
    // first-field offset.
    let var_start = out.len();
    let mut slot = 0usize;
    for (i, field) in schema.fields.iter().enumerate() {
        if let FieldKind::Variable(kind) = field.kind {
            if let Some(v) = &value.slots[i] {
                let offset = (out.len() - var_start) as i32;
                let cell = table_start + slot * 4;
                out[cell..cell + 4].copy_from_slice(&offset.to_le_bytes());
                encode_variable(schema, field, kind, v, out)?;
            }
            slot += 1;
        }
    }

    Ok(())
}

fn encode_fixed(
    schema: &'static Schema,
    field: &FieldDef,
    kind: FixedKind,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), RecordError> {
    match (kind, value) {
        (FixedKind::Bool, Value::Bool(b)) => out.push(u8::from(*b)),
        (FixedKind::U8, Value::U8(v)) => out.push(*v),
        (FixedKind::Enum, Value::Enum(v)) => out.push(*v),
        (FixedKind::U16, Value::U16(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FixedKind::I32, Value::I32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FixedKind::I64, Value::I64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FixedKind::F32, Value::F32(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FixedKind::F64, Value::F64(v)) => out.extend_from_slice(&v.to_le_bytes()),
        (FixedKind::Record(nested), Value::Record(rv)) => {
            ensure_fixed(schema, field, nested)?;
            ensure_schema(nested, rv)?;
            encode_into(rv, out)?;
        }
        _ => {
            return Err(RecordError::TypeMismatch {
                schema: schema.name,
                field: field.name,
            })
        }
    }
    Ok(())
}

fn encode_variable(
    schema: &'static Schema,
    field: &FieldDef,
    kind: VarKind,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), RecordError> {
    match (kind, value) {
        (VarKind::Str, Value::Str(s)) => encode_varstring(s.as_bytes(), out),
        (VarKind::Bytes, Value::Bytes(b)) => encode_varstring(b, out),
        (VarKind::Record(nested), Value::Record(rv)) => {
            ensure_schema(nested, rv)?;
            encode_into(rv, out)?;
        }
        (VarKind::Array(elem), Value::Array(items)) => {
            encode_varint(items.len() as i32, out);
            for item in items {
                encode_elem(schema, field, elem, item, out)?;
            }
        }
        (VarKind::Union(def), Value::Union { type_id, value: rv }) => {
            let concrete = def.schema_for(*type_id).ok_or(RecordError::UnknownTag {
                union: def.name,
                type_id: *type_id,
            })?;
            ensure_schema(concrete, rv)?;
            encode_varint(*type_id, out);
            encode_into(rv, out)?;
        }
        _ => {
            return Err(RecordError::TypeMismatch {
                schema: schema.name,
                field: field.name,
            })
        }
    }
    Ok(())
}

fn encode_elem(
    schema: &'static Schema,
    field: &FieldDef,
    elem: &ElemKind,
    value: &Value,
    out: &mut Vec<u8>,
) -> Result<(), RecordError> {
    match (elem, value) {
        (ElemKind::Fixed(kind), v) => encode_fixed(schema, field, *kind, v, out),
        (ElemKind::Record(nested), Value::Record(rv)) => {
            ensure_schema(nested, rv)?;
            encode_into(rv, out)
        }
        (ElemKind::Str, Value::Str(s)) => {
            encode_varstring(s.as_bytes(), out);
            Ok(())
        }
        _ => Err(RecordError::TypeMismatch {
            schema: schema.name,
            field: field.name,
        }),
    }
}

// =============================================================================
// Decode
// =============================================================================

/// Decode a record of the given schema from the front of `buf`
///
/// Trailing bytes beyond the record are ignored; nested decoding tracks its
/// own consumption. Truncation is reported distinctly from corruption so
/// streaming callers can keep buffering.
pub fn decode(schema: &'static Schema, buf: &[u8]) -> Result<RecordValue, RecordError> {
    let (value, _consumed) = decode_from(schema, buf)?;
    Ok(value)
}

fn decode_from(
    schema: &'static Schema,
    buf: &[u8],
) -> Result<(RecordValue, usize), RecordError> {
    let bitfield_len = schema.bitfield_len();
    let fixed_len = schema.fixed_block_len();
    let var_count = schema.variable_count();
    let static_len = bitfield_len + fixed_len + 4 * var_count;

    if buf.len() < static_len {
        return Err(RecordError::Truncated {
            schema: schema.name,
        });
    }

    let bitfield = &buf[..bitfield_len];
    let table = &buf[bitfield_len + fixed_len..static_len];
    let var_block = &buf[static_len..];

    let mut value = RecordValue::new(schema);
    let mut pos = bitfield_len;
    let mut bit = 0usize;
    let mut slot = 0usize;
    let mut var_end = 0usize;

    for (i, field) in schema.fields.iter().enumerate() {
        match field.kind {
            FieldKind::Required(kind) => {
                let size = kind.size();
                let v = decode_fixed(schema, field, kind, &buf[pos..pos + size])?;
                value.slots[i] = Some(v);
                pos += size;
            }
            FieldKind::OptionalFixed(kind) => {
                let present = bitfield[bit / 8] & (1 << (bit % 8)) != 0;
                bit += 1;
                let size = kind.size();
                // The slot is always there; the bit decides whether its
                // bytes are honored.
                if present {
                    let v = decode_fixed(schema, field, kind, &buf[pos..pos + size])?;
                    value.slots[i] = Some(v);
                }
                pos += size;
            }
            FieldKind::Variable(kind) => {
                let present = bitfield[bit / 8] & (1 << (bit % 8)) != 0;
                bit += 1;
                let cell = slot * 4;
                let offset = i32::from_le_bytes([
                    table[cell],
                    table[cell + 1],
                    table[cell + 2],
                    table[cell + 3],
                ]);
                slot += 1;

                if offset == -1 {
                    if present {
                        return Err(RecordError::Corrupt {
                            schema: schema.name,
                            detail: "presence bit set but offset is -1",
                        });
                    }
                    continue;
                }
                if !present {
                    return Err(RecordError::Corrupt {
                        schema: schema.name,
                        detail: "offset written for a field marked absent",
                    });
                }
                if offset < 0 || offset as usize > var_block.len() {
                    return Err(RecordError::BadOffset {
                        schema: schema.name,
                        field: field.name,
                        offset,
                    });
                }

                let start = offset as usize;
                let (v, used) = decode_variable(schema, field, kind, &var_block[start..])?;
                value.slots[i] = Some(v);
                var_end = var_end.max(start + used);
            }
        }
    }

    Ok((value, static_len + var_end))
}

fn decode_fixed(
    schema: &'static Schema,
    field: &FieldDef,
    kind: FixedKind,
    chunk: &[u8],
) -> Result<Value, RecordError> {
    let v = match kind {
        FixedKind::Bool => match chunk[0] {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            _ => {
                return Err(RecordError::Corrupt {
                    schema: schema.name,
                    detail: "boolean byte is neither 0 nor 1",
                })
            }
        },
        FixedKind::U8 => Value::U8(chunk[0]),
        FixedKind::Enum => Value::Enum(chunk[0]),
        FixedKind::U16 => Value::U16(u16::from_le_bytes([chunk[0], chunk[1]])),
        FixedKind::I32 => Value::I32(i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
        FixedKind::F32 => Value::F32(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]])),
        FixedKind::I64 => Value::I64(i64::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ])),
        FixedKind::F64 => Value::F64(f64::from_le_bytes([
            chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
        ])),
        FixedKind::Record(nested) => {
            ensure_fixed(schema, field, nested)?;
            let (rv, _) = decode_from(nested, chunk)?;
            Value::Record(rv)
        }
    };
    Ok(v)
}

fn decode_variable(
    schema: &'static Schema,
    field: &FieldDef,
    kind: VarKind,
    buf: &[u8],
) -> Result<(Value, usize), RecordError> {
    match kind {
        VarKind::Str => {
            let (bytes, used) = decode_varstring(buf).map_err(|e| map_varstring(schema, e))?;
            let s = std::str::from_utf8(bytes).map_err(|_| RecordError::Corrupt {
                schema: schema.name,
                detail: "invalid utf-8 in string field",
            })?;
            Ok((Value::Str(s.to_string()), used))
        }
        VarKind::Bytes => {
            let (bytes, used) = decode_varstring(buf).map_err(|e| map_varstring(schema, e))?;
            Ok((Value::Bytes(bytes.to_vec()), used))
        }
        VarKind::Record(nested) => {
            let (rv, used) = decode_from(nested, buf)?;
            Ok((Value::Record(rv), used))
        }
        VarKind::Array(elem) => {
            let (count, prefix) = decode_varint(buf).map_err(|e| map_varint(schema, e))?;
            if count < 0 {
                return Err(RecordError::Corrupt {
                    schema: schema.name,
                    detail: "negative array count",
                });
            }
            let mut items = Vec::with_capacity((count as usize).min(1024));
            let mut used = prefix;
            for _ in 0..count {
                let (v, n) = decode_elem(schema, field, elem, &buf[used..])?;
                items.push(v);
                used += n;
            }
            Ok((Value::Array(items), used))
        }
        VarKind::Union(def) => {
            let (type_id, prefix) = decode_varint(buf).map_err(|e| map_varint(schema, e))?;
            let concrete = def.schema_for(type_id).ok_or(RecordError::UnknownTag {
                union: def.name,
                type_id,
            })?;
            let (rv, used) = decode_from(concrete, &buf[prefix..])?;
            Ok((
                Value::Union {
                    type_id,
                    value: Box::new(rv),
                },
                prefix + used,
            ))
        }
    }
}

fn decode_elem(
    schema: &'static Schema,
    field: &FieldDef,
    elem: &ElemKind,
    buf: &[u8],
) -> Result<(Value, usize), RecordError> {
    match elem {
        ElemKind::Fixed(kind) => {
            let size = kind.size();
            if buf.len() < size {
                return Err(RecordError::Truncated {
                    schema: schema.name,
                });
            }
            let v = decode_fixed(schema, field, *kind, &buf[..size])?;
            Ok((v, size))
        }
        ElemKind::Record(nested) => {
            let (rv, used) = decode_from(nested, buf)?;
            Ok((Value::Record(rv), used))
        }
        ElemKind::Str => {
            let (bytes, used) = decode_varstring(buf).map_err(|e| map_varstring(schema, e))?;
            let s = std::str::from_utf8(bytes).map_err(|_| RecordError::Corrupt {
                schema: schema.name,
                detail: "invalid utf-8 in string element",
            })?;
            Ok((Value::Str(s.to_string()), used))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
