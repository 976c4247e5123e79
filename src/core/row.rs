//! Purpose: Define the row shape and insert-time field injection.
//! Exports: `Row`, `prepare_insert`, `shallow_merge`, `row_id`.
//! Role: Shared row handling for the store and the query builder.
//! Invariants: Every stored row is a JSON object carrying `id` and `created_at`.
//! Invariants: Caller-supplied `id`/`created_at` values are preserved verbatim.

use serde_json::{Map, Value};

use crate::core::error::{Error, ErrorKind};

/// A stored row: an object-shaped JSON value. Fields beyond `id` and
/// `created_at` are entirely caller-defined; no schema is enforced.
pub type Row = Map<String, Value>;

const ID_FIELD: &str = "id";
const CREATED_AT_FIELD: &str = "created_at";
const ID_BYTES: usize = 16;

/// Turn a caller-supplied value into a storable row, generating `id` and
/// `created_at` when the caller left them out.
pub fn prepare_insert(value: Value, table: &str) -> Result<Row, Error> {
    let Value::Object(mut row) = value else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("insert rows must be JSON objects")
            .with_table(table)
            .with_hint("Pass an object like json!({\"name\": \"A\"}), not a scalar or array."));
    };
    if !row.contains_key(ID_FIELD) {
        row.insert(ID_FIELD.to_string(), Value::String(gen_row_id()?));
    }
    if !row.contains_key(CREATED_AT_FIELD) {
        row.insert(CREATED_AT_FIELD.to_string(), Value::String(now_rfc3339()?));
    }
    Ok(row)
}

/// Merge `patch` into `row`, replacing top-level fields only.
pub fn shallow_merge(row: &mut Row, patch: &Row) {
    for (key, value) in patch {
        row.insert(key.clone(), value.clone());
    }
}

pub fn row_id(row: &Row) -> Option<&Value> {
    row.get(ID_FIELD)
}

fn gen_row_id() -> Result<String, Error> {
    let mut bytes = [0u8; ID_BYTES];
    getrandom::fill(&mut bytes).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message(format!("failed to gather entropy for row id: {err}"))
    })?;
    Ok(hex_encode(&bytes))
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(nibble_hex(byte >> 4));
        out.push(nibble_hex(byte & 0x0f));
    }
    out
}

fn nibble_hex(nibble: u8) -> char {
    char::from_digit(nibble as u32, 16).unwrap_or('0')
}

fn now_rfc3339() -> Result<String, Error> {
    use time::format_description::well_known::Rfc3339;
    time::OffsetDateTime::now_utc().format(&Rfc3339).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("timestamp format failed")
            .with_source(err)
    })
}
