//! Strict decoding of wire records into typed rows, and encoding back

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::ToSql;
use serde_json::Value;

use super::schema::{ColumnKind, ColumnSpec, TableSchema};
use crate::error::DecodeError;
use crate::models::{fields, SyncMeta, SyncRecord, SyncStatus};
use crate::util::{normalize_text_option, parse_timestamp};

/// A typed business value
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    Json(Value),
}

impl ColumnValue {
    fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Text(text) => Value::String(text.clone()),
            Self::Integer(number) => Value::from(*number),
            Self::Real(number) => Value::from(*number),
            Self::Bool(flag) => Value::Bool(*flag),
            Self::Json(value) => value.clone(),
        }
    }
}

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(SqlValue::Null),
            Self::Text(text) => ToSqlOutput::Borrowed(ValueRef::Text(text.as_bytes())),
            Self::Integer(number) => ToSqlOutput::Owned(SqlValue::Integer(*number)),
            Self::Real(number) => ToSqlOutput::Owned(SqlValue::Real(*number)),
            Self::Bool(flag) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*flag))),
            Self::Json(value) => ToSqlOutput::Owned(SqlValue::Text(value.to_string())),
        })
    }
}

/// A record decoded against its table schema.
///
/// `values` is parallel to `TableSchema::columns`; `None` marks a field the upload did not
/// carry, which an update leaves untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedRecord {
    pub meta: SyncMeta,
    pub values: Vec<Option<ColumnValue>>,
}

/// Decode a wire record. Business fields outside the schema are ignored.
pub fn decode(schema: &TableSchema, record: &SyncRecord) -> Result<TypedRecord, DecodeError> {
    let id = match record.get(fields::ID) {
        None | Some(Value::Null) => return Err(DecodeError::MissingField(fields::ID)),
        Some(Value::String(id)) => {
            normalize_text_option(Some(id.clone())).ok_or(DecodeError::MissingField(fields::ID))?
        }
        Some(_) => {
            return Err(DecodeError::InvalidField {
                field: fields::ID,
                expected: "a non-empty string",
            })
        }
    };

    let deleted = match record.get(fields::DELETED) {
        None | Some(Value::Null) => false,
        Some(value) => decode_bool(value).ok_or(DecodeError::InvalidField {
            field: fields::DELETED,
            expected: ColumnKind::Bool.expected(),
        })?,
    };

    let device_id = match record.get(fields::DEVICE_ID) {
        None | Some(Value::Null) => None,
        Some(Value::String(device)) => normalize_text_option(Some(device.clone())),
        Some(_) => {
            return Err(DecodeError::InvalidField {
                field: fields::DEVICE_ID,
                expected: ColumnKind::Text.expected(),
            })
        }
    };

    let sync_status = match record.get(fields::SYNC_STATUS) {
        None | Some(Value::Null) => None,
        Some(Value::String(status)) => {
            Some(status.parse::<SyncStatus>().map_err(|_| DecodeError::InvalidField {
                field: fields::SYNC_STATUS,
                expected: "'pending' or 'synced'",
            })?)
        }
        Some(_) => {
            return Err(DecodeError::InvalidField {
                field: fields::SYNC_STATUS,
                expected: "'pending' or 'synced'",
            })
        }
    };

    let meta = SyncMeta {
        id,
        created_at: decode_timestamp(record, fields::CREATED_AT)?,
        updated_at: decode_timestamp(record, fields::UPDATED_AT)?,
        device_id,
        sync_status,
        synced_at: decode_timestamp(record, fields::SYNCED_AT)?,
        deleted,
    };

    let values = schema
        .columns
        .iter()
        .map(|spec| decode_column(spec, record.get(spec.field), deleted))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(TypedRecord { meta, values })
}

/// Encode a typed record for the wire. Timestamps are emitted as epoch milliseconds.
pub fn encode(schema: &TableSchema, record: &TypedRecord) -> SyncRecord {
    let meta = &record.meta;
    let mut out = SyncRecord::new()
        .with(fields::ID, meta.id.clone())
        .with(fields::CREATED_AT, meta.created_at)
        .with(fields::UPDATED_AT, meta.updated_at)
        .with(fields::DEVICE_ID, meta.device_id.clone())
        .with(fields::SYNC_STATUS, meta.sync_status.map(SyncStatus::as_str))
        .with(fields::SYNCED_AT, meta.synced_at)
        .with(fields::DELETED, meta.deleted);

    for (spec, value) in schema.columns.iter().zip(&record.values) {
        let json = value.as_ref().map_or(Value::Null, ColumnValue::to_json);
        out.insert(spec.field, json);
    }
    out
}

fn decode_timestamp(record: &SyncRecord, field: &'static str) -> Result<Option<i64>, DecodeError> {
    record
        .get(field)
        .map_or(Ok(None), parse_timestamp)
        .map_err(|_| DecodeError::InvalidField {
            field,
            expected: ColumnKind::Timestamp.expected(),
        })
}

fn decode_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(number) => match number.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn decode_column(
    spec: &ColumnSpec,
    value: Option<&Value>,
    tombstone: bool,
) -> Result<Option<ColumnValue>, DecodeError> {
    let invalid = || DecodeError::InvalidField {
        field: spec.field,
        expected: spec.kind.expected(),
    };

    let value = match value {
        None if spec.required && !tombstone => return Err(DecodeError::MissingField(spec.field)),
        None => return Ok(None),
        Some(Value::Null) if spec.required && !tombstone => {
            return Err(DecodeError::MissingField(spec.field))
        }
        Some(Value::Null) => return Ok(Some(ColumnValue::Null)),
        Some(value) => value,
    };

    let decoded = match spec.kind {
        ColumnKind::Text => ColumnValue::Text(value.as_str().ok_or_else(invalid)?.to_string()),
        ColumnKind::Integer => {
            let number = value.as_i64().or_else(|| {
                value
                    .as_f64()
                    .filter(|float| float.is_finite() && float.fract() == 0.0)
                    .map(|float| float as i64)
            });
            ColumnValue::Integer(number.ok_or_else(invalid)?)
        }
        ColumnKind::Real => ColumnValue::Real(value.as_f64().ok_or_else(invalid)?),
        ColumnKind::Bool => ColumnValue::Bool(decode_bool(value).ok_or_else(invalid)?),
        ColumnKind::Timestamp => match parse_timestamp(value).map_err(|_| invalid())? {
            Some(millis) => ColumnValue::Integer(millis),
            None => ColumnValue::Null,
        },
        ColumnKind::Json => ColumnValue::Json(value.clone()),
    };

    Ok(Some(decoded))
}

/// Read a business column from a row at `index`.
pub fn read_column(
    row: &rusqlite::Row<'_>,
    index: usize,
    kind: ColumnKind,
) -> rusqlite::Result<ColumnValue> {
    let value = match kind {
        ColumnKind::Text => row.get::<_, Option<String>>(index)?.map(ColumnValue::Text),
        ColumnKind::Integer | ColumnKind::Timestamp => {
            row.get::<_, Option<i64>>(index)?.map(ColumnValue::Integer)
        }
        ColumnKind::Real => row.get::<_, Option<f64>>(index)?.map(ColumnValue::Real),
        ColumnKind::Bool => row
            .get::<_, Option<i64>>(index)?
            .map(|flag| ColumnValue::Bool(flag != 0)),
        ColumnKind::Json => match row.get::<_, Option<String>>(index)? {
            Some(text) => Some(ColumnValue::Json(serde_json::from_str(&text).map_err(
                |error| {
                    rusqlite::Error::FromSqlConversionFailure(
                        index,
                        rusqlite::types::Type::Text,
                        Box::new(error),
                    )
                },
            )?)),
            None => None,
        },
    };
    Ok(value.unwrap_or(ColumnValue::Null))
}
