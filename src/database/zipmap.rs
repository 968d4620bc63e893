//! Zipmap: устаревшая компактная кодировка небольших хешей.
//!
//! ```text
//! <zmlen> <len>key<len><free>value[free bytes] ... <0xFF>
//! ```
//!
//! Длина занимает один байт, если она не больше 253; байт 254 означает, что
//! далее следует 4-байтовая длина (LE). Байт 255 завершает zipmap.

use rdb_error::{ContainerKind, RdbError};

use super::BlobReader;

const ZIPMAP_BIGLEN: u8 = 254;
const ZIPMAP_END: u8 = 255;

/// Разбирает zipmap-блоб в список пар (поле, значение).
pub fn decode_zipmap(blob: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>, RdbError> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }

    let mut r = BlobReader::new(blob, ContainerKind::Zipmap);
    let zmlen = r.u8("zmlen")?;
    let declared = (zmlen < ZIPMAP_BIGLEN).then_some(zmlen as usize);
    let mut pairs = Vec::with_capacity(declared.unwrap_or(0));

    loop {
        let field_len = match read_len(&mut r, "field length")? {
            Some(len) => len,
            None => break,
        };
        let field = r.take(field_len, "field")?.to_vec();

        let value_at = r.pos();
        let value_len = read_len(&mut r, "value length")?
            .ok_or_else(|| r.error_at("terminator in place of value length", value_at))?;
        let free = r.u8("free byte")? as usize;
        let value = r.take(value_len, "value")?.to_vec();
        r.take(free, "free space")?;

        pairs.push((field, value));
    }

    if !r.is_empty() {
        return Err(r.error(format!("{} trailing bytes after terminator", r.remaining())));
    }
    if let Some(expected) = declared {
        if expected != pairs.len() {
            return Err(r.error_at(
                format!("zmlen is {expected}, found {} entries", pairs.len()),
                0,
            ));
        }
    }
    Ok(pairs)
}

/// Читает длину; `None` означает терминатор.
fn read_len(
    r: &mut BlobReader<'_>,
    what: &str,
) -> Result<Option<usize>, RdbError> {
    if r.is_empty() {
        return Err(r.error("missing terminator"));
    }
    match r.u8(what)? {
        ZIPMAP_END => Ok(None),
        ZIPMAP_BIGLEN => Ok(Some(u32::from_le_bytes(r.array::<4>(what)?) as usize)),
        len => Ok(Some(len as usize)),
    }
}
