//! Ziplist: компактная кодировка списков, sorted set и хешей.
//!
//! ```text
//! <zlbytes u32><zltail u32><zllen u16> <entry> ... <0xFF>
//! entry = <prevlen> <encoding> <payload>
//! ```
//!
//! Все многобайтовые числа в заголовке и целочисленных записях хранятся в
//! little-endian, длины строк в заголовке записи — в big-endian.

use std::fmt;

use rdb_error::{ContainerKind, RdbError};

use super::BlobReader;

const HEADER_LEN: usize = 10;
const ZIPLIST_END: u8 = 0xFF;
const PREVLEN_BIG: u8 = 254;
const UNKNOWN_COUNT: u16 = u16::MAX;

const STR_6BIT: u8 = 0b00;
const STR_14BIT: u8 = 0b01;
const STR_32BIT: u8 = 0b10;
const STR_32BIT_HEADER: u8 = 0x80;

const INT_16: u8 = 0xC0;
const INT_32: u8 = 0xD0;
const INT_64: u8 = 0xE0;
const INT_24: u8 = 0xF0;
const INT_8: u8 = 0xFE;
const IMM_MIN: u8 = 0xF1;
const IMM_MAX: u8 = 0xFD;

/// Одна запись ziplist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZiplistEntry {
    Bytes(Vec<u8>),
    Int(i64),
}

impl ZiplistEntry {
    /// Представление записи так, как его видит слушатель: целые числа
    /// раскрываются в десятичный текст.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Bytes(b) => b,
            Self::Int(i) => i.to_string().into_bytes(),
        }
    }

    /// Числовое значение записи, если оно есть.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Bytes(b) => crate::engine::rdb::string::parse_double(b),
        }
    }
}

impl fmt::Display for ZiplistEntry {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Self::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
            Self::Int(i) => write!(f, "{i}"),
        }
    }
}

/// Разбирает ziplist-блоб и сверяет его со своим заголовком.
pub fn decode_ziplist(blob: &[u8]) -> Result<Vec<ZiplistEntry>, RdbError> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }

    let mut r = BlobReader::new(blob, ContainerKind::Ziplist);
    let zlbytes = u32::from_le_bytes(r.array::<4>("zlbytes")?) as usize;
    let zltail = u32::from_le_bytes(r.array::<4>("zltail")?) as usize;
    let zllen = u16::from_le_bytes(r.array::<2>("zllen")?);

    if zlbytes != blob.len() {
        return Err(r.error_at(
            format!("zlbytes is {zlbytes}, blob has {} bytes", blob.len()),
            0,
        ));
    }

    let capacity = if zllen == UNKNOWN_COUNT { 0 } else { zllen as usize };
    let mut entries = Vec::with_capacity(capacity);
    let mut last_entry_at = HEADER_LEN;
    let mut prev_len = 0;

    loop {
        match r.peek() {
            None => return Err(r.error("missing terminator")),
            Some(ZIPLIST_END) => {
                r.u8("terminator")?;
                break;
            }
            Some(_) => {
                let start = r.pos();
                entries.push(read_entry(&mut r, prev_len)?);
                prev_len = r.pos() - start;
                last_entry_at = start;
            }
        }
    }

    if !r.is_empty() {
        return Err(r.error(format!("{} trailing bytes after terminator", r.remaining())));
    }
    if zltail != last_entry_at {
        return Err(r.error_at(
            format!("zltail is {zltail}, last entry starts at {last_entry_at}"),
            4,
        ));
    }
    if zllen != UNKNOWN_COUNT && zllen as usize != entries.len() {
        return Err(r.error_at(
            format!("zllen is {zllen}, found {} entries", entries.len()),
            8,
        ));
    }
    Ok(entries)
}

/// `prev_len` — полная длина предыдущей записи (0 для первой).
fn read_entry(
    r: &mut BlobReader<'_>,
    prev_len: usize,
) -> Result<ZiplistEntry, RdbError> {
    let start = r.pos();
    let prevlen = match r.u8("prevlen")? {
        PREVLEN_BIG => u32::from_le_bytes(r.array::<4>("extended prevlen")?) as usize,
        short => short as usize,
    };
    if prevlen != prev_len {
        return Err(r.error_at(
            format!("prevlen is {prevlen}, previous entry has {prev_len} bytes"),
            start,
        ));
    }

    let header_at = r.pos();
    let header = r.u8("entry header")?;
    let entry = match header >> 6 {
        STR_6BIT => {
            let len = (header & 0x3F) as usize;
            ZiplistEntry::Bytes(r.take(len, "string entry")?.to_vec())
        }
        STR_14BIT => {
            let next = r.u8("14-bit string length")?;
            let len = (((header & 0x3F) as usize) << 8) | next as usize;
            ZiplistEntry::Bytes(r.take(len, "string entry")?.to_vec())
        }
        STR_32BIT if header == STR_32BIT_HEADER => {
            let len = u32::from_be_bytes(r.array::<4>("32-bit string length")?) as usize;
            ZiplistEntry::Bytes(r.take(len, "string entry")?.to_vec())
        }
        STR_32BIT => {
            return Err(r.error_at(
                format!("unknown entry encoding 0x{header:02X}"),
                header_at,
            ))
        }
        _ => ZiplistEntry::Int(read_int(r, header, header_at)?),
    };
    Ok(entry)
}

fn read_int(
    r: &mut BlobReader<'_>,
    header: u8,
    header_at: usize,
) -> Result<i64, RdbError> {
    let value = match header {
        INT_16 => i16::from_le_bytes(r.array::<2>("16-bit integer")?) as i64,
        INT_32 => i32::from_le_bytes(r.array::<4>("32-bit integer")?) as i64,
        INT_64 => i64::from_le_bytes(r.array::<8>("64-bit integer")?),
        INT_24 => {
            let [a, b, c] = r.array::<3>("24-bit integer")?;
            // Сдвиг в старшие байты i32 и обратно сохраняет знак.
            (i32::from_le_bytes([0, a, b, c]) >> 8) as i64
        }
        INT_8 => r.u8("8-bit integer")? as i8 as i64,
        IMM_MIN..=IMM_MAX => ((header & 0x0F) - 1) as i64,
        _ => {
            return Err(r.error_at(
                format!("unknown entry encoding 0x{header:02X}"),
                header_at,
            ))
        }
    };
    Ok(value)
}
