//! Binary primitives of the record body.
//!
//! `int` and `long` are zig-zag varints, `string` is a zig-zag `long`
//! length followed by UTF-8 bytes, `double` is eight little-endian bytes.

use bytes::{Buf, BufMut};
use chrono::{DateTime, TimeZone, Utc};

use super::schema::{FieldType, Value};
use crate::{Error, Result};

/// A 64-bit varint never needs more than ten 7-bit groups.
const MAX_VARINT_LEN: usize = 10;

pub fn put_long<B: BufMut>(buf: &mut B, value: i64) {
    let mut n = ((value << 1) ^ (value >> 63)) as u64;
    while n >= 0x80 {
        buf.put_u8((n as u8 & 0x7f) | 0x80);
        n >>= 7;
    }
    buf.put_u8(n as u8);
}

pub fn put_int<B: BufMut>(buf: &mut B, value: i32) {
    put_long(buf, i64::from(value));
}

pub fn put_string<B: BufMut>(buf: &mut B, value: &str) {
    put_long(buf, value.len() as i64);
    buf.put_slice(value.as_bytes());
}

pub fn put_double<B: BufMut>(buf: &mut B, value: f64) {
    buf.put_f64_le(value);
}

pub fn put_timestamp_millis<B: BufMut>(buf: &mut B, value: &DateTime<Utc>) {
    put_long(buf, value.timestamp_millis());
}

pub fn put_value<B: BufMut>(buf: &mut B, value: &Value) {
    match value {
        Value::Int(v) => put_int(buf, *v),
        Value::Long(v) => put_long(buf, *v),
        Value::Double(v) => put_double(buf, *v),
        Value::String(v) => put_string(buf, v),
        Value::TimestampMillis(v) => put_timestamp_millis(buf, v),
    }
}

pub fn get_long<B: Buf>(cursor: &mut B) -> Result<i64> {
    let mut n: u64 = 0;
    for i in 0..MAX_VARINT_LEN {
        if !cursor.has_remaining() {
            return Err(Error::malformed("truncated varint"));
        }
        let byte = cursor.get_u8();
        // The tenth byte holds only bit 63
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(Error::malformed("varint overflows 64 bits"));
        }
        n |= u64::from(byte & 0x7f) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(((n >> 1) as i64) ^ -((n & 1) as i64));
        }
    }
    Err(Error::malformed("varint longer than 10 bytes"))
}

pub fn get_int<B: Buf>(cursor: &mut B) -> Result<i32> {
    let value = get_long(cursor)?;
    i32::try_from(value).map_err(|_| Error::malformed(format!("int out of range: {}", value)))
}

pub fn get_string<B: Buf>(cursor: &mut B) -> Result<String> {
    let len = get_long(cursor)?;
    let len = usize::try_from(len)
        .map_err(|_| Error::malformed(format!("negative string length: {}", len)))?;
    if cursor.remaining() < len {
        return Err(Error::malformed(format!(
            "string of {} bytes with only {} remaining",
            len,
            cursor.remaining()
        )));
    }

    let mut raw = vec![0u8; len];
    cursor.copy_to_slice(&mut raw);
    String::from_utf8(raw).map_err(|e| Error::malformed(format!("invalid UTF-8: {}", e)))
}

pub fn get_double<B: Buf>(cursor: &mut B) -> Result<f64> {
    if cursor.remaining() < 8 {
        return Err(Error::malformed("truncated double"));
    }
    Ok(cursor.get_f64_le())
}

pub fn get_timestamp_millis<B: Buf>(cursor: &mut B) -> Result<DateTime<Utc>> {
    let millis = get_long(cursor)?;
    Utc.timestamp_millis_opt(millis)
        .single()
        .ok_or_else(|| Error::malformed(format!("timestamp out of range: {}", millis)))
}

pub fn get_value<B: Buf>(cursor: &mut B, field_type: FieldType) -> Result<Value> {
    Ok(match field_type {
        FieldType::Int => Value::Int(get_int(cursor)?),
        FieldType::Long => Value::Long(get_long(cursor)?),
        FieldType::Double => Value::Double(get_double(cursor)?),
        FieldType::String => Value::String(get_string(cursor)?),
        FieldType::TimestampMillis => Value::TimestampMillis(get_timestamp_millis(cursor)?),
    })
}
