use encoding_rs::WINDOWS_1252;
use nom::combinator::{flat_map, map};
use nom::{bytes, number, IResult, Parser};

use crate::error::GpParseError;

/// Result of every parser in the crate: the remaining input is the read cursor.
pub type GpResult<'a, O> = IResult<&'a [u8], O, GpParseError>;

/// Parse signed byte
pub fn parse_i8(i: &[u8]) -> GpResult<'_, i8> {
    number::complete::le_i8(i)
}

/// Parse unsigned byte
pub fn parse_u8(i: &[u8]) -> GpResult<'_, u8> {
    number::complete::le_u8(i)
}

/// Parse signed 32
pub fn parse_int(i: &[u8]) -> GpResult<'_, i32> {
    number::complete::le_i32(i)
}

/// Parse bool
pub fn parse_bool(i: &[u8]) -> GpResult<'_, bool> {
    map(number::complete::le_u8, |b| b == 1).parse(i)
}

/// Skip `n` bytes, failing if fewer are left.
pub fn skip(i: &[u8], n: usize) -> Result<&[u8], nom::Err<GpParseError>> {
    log::debug!("skip: {n}");
    let (rest, _) = bytes::complete::take(n)(i)?;
    Ok(rest)
}

/// Materialize properly encoded String
fn make_string(i: &[u8]) -> String {
    let (cow, encoding_used, had_errors) = WINDOWS_1252.decode(i);
    if had_errors {
        log::debug!("Error parsing string with {encoding_used:?}");
        match std::str::from_utf8(i) {
            Ok(s) => s.to_string(),
            Err(e) => {
                log::debug!("Error UTF-8 string parsing:{e}");
                String::new()
            }
        }
    } else {
        cow.to_string()
    }
}

/// Parse string of length `len`.
fn parse_string(len: usize) -> impl FnMut(&[u8]) -> GpResult<'_, String> {
    parse_string_field(len, len)
}

/// Parse string field of length `string_len` with total size to consume `field_size`
fn parse_string_field(
    field_size: usize,
    string_len: usize,
) -> impl FnMut(&[u8]) -> GpResult<'_, String> {
    move |i: &[u8]| {
        log::debug!("Parsing string field: field_size={field_size}, string_len={string_len}");

        // Read exactly the field size
        let (rest, field) = bytes::complete::take(field_size)(i)?;

        log::debug!("Raw field raw={field:02X?}");

        // Decode only the meaningful string bytes
        let string = make_string(&field[..std::cmp::min(string_len, field_size)]);

        Ok((rest, string))
    }
}

/// Size of string encoded as Int.
/// [i32 string_len][string_len bytes]
pub fn parse_int_sized_string(i: &[u8]) -> GpResult<'_, String> {
    let (rest, len) = parse_int(i)?;
    let Ok(len) = usize::try_from(len) else {
        return Err(GpParseError::invalid(i, format!("negative string length {len}")));
    };
    parse_string(len)(rest)
}

/// String announced by a length byte `L` inside a field of `size` bytes.
///
/// `max(size, L)` bytes are consumed but only `min(size, L)` are decoded.
/// A `size` of 0 means there is no fixed field: exactly `L` bytes are read.
pub fn parse_byte_size_string(size: usize) -> impl FnMut(&[u8]) -> GpResult<'_, String> {
    move |i: &[u8]| {
        let (i, length) = parse_u8(i)?;
        let length = usize::from(length);
        log::debug!("Parsing byte sized string of length {length} for String size {size}");
        let field_size = size.max(length);
        let string_len = if size == 0 { length } else { length.min(size) };
        parse_string_field(field_size, string_len)(i)
    }
}

/// Size of string encoded as Int, but the size is encoded as a byte.
/// [i32 field_len][u8 string_len][field_len - 1 bytes]
pub fn parse_int_byte_sized_string(i: &[u8]) -> GpResult<'_, String> {
    let (rest, len) = parse_int(i)?;
    if len < 0 {
        return Err(GpParseError::invalid(i, format!("negative string length {len}")));
    }
    let field_size = usize::try_from(len - 1).unwrap_or_default();
    log::debug!("Parsing int byte sized string int_len={len}");
    parse_byte_size_string(field_size)(rest)
}

/// Four reserved bytes followed by a byte sized string.
pub fn parse_skipped_int_byte_string(i: &[u8]) -> GpResult<'_, String> {
    flat_map(bytes::complete::take(4usize), |_| parse_byte_size_string(0)).parse(i)
}
