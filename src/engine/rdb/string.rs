//! Декодер строк снапшота.
//!
//! Строка хранится в одной из трёх форм: сырые байты с длиной, целое число
//! (i8/i16/i32), которое раскрывается в десятичный текст, или LZF-блок.

use std::io::Read;

use rdb_error::{RdbError, RdbResult};

use super::{
    cursor::ByteCursor,
    length::{read_length, read_length_with_encoding, Length, Special},
    lzf,
};

/// Маркеры особых значений в текстовой кодировке double.
const DOUBLE_NAN: u8 = 253;
const DOUBLE_POS_INF: u8 = 254;
const DOUBLE_NEG_INF: u8 = 255;

/// Читает строку в любой из поддерживаемых кодировок.
pub fn read_string<R: Read>(cursor: &mut ByteCursor<R>) -> RdbResult<Vec<u8>> {
    match read_length_with_encoding(cursor)? {
        Length::Plain(len) => cursor.read_bytes(len as u64, "string payload"),
        Length::Special(Special::Int8) => {
            Ok(cursor.read_i8("8-bit integer")?.to_string().into_bytes())
        }
        Length::Special(Special::Int16) => {
            Ok(cursor.read_i16_le("16-bit integer")?.to_string().into_bytes())
        }
        Length::Special(Special::Int32) => {
            Ok(cursor.read_i32_le("32-bit integer")?.to_string().into_bytes())
        }
        Length::Special(Special::Lzf) => read_lzf_string(cursor),
    }
}

/// Пропускает строку, не распаковывая её содержимое.
pub fn skip_string<R: Read>(cursor: &mut ByteCursor<R>) -> RdbResult<()> {
    match read_length_with_encoding(cursor)? {
        Length::Plain(len) => cursor.skip(len as u64, "string payload"),
        Length::Special(Special::Int8) => cursor.skip(1, "8-bit integer"),
        Length::Special(Special::Int16) => cursor.skip(2, "16-bit integer"),
        Length::Special(Special::Int32) => cursor.skip(4, "32-bit integer"),
        Length::Special(Special::Lzf) => {
            let compressed = read_length(cursor)?;
            read_length(cursor)?;
            cursor.skip(compressed as u64, "compressed payload")
        }
    }
}

fn read_lzf_string<R: Read>(cursor: &mut ByteCursor<R>) -> RdbResult<Vec<u8>> {
    let compressed_len = read_length(cursor)?;
    let expected_len = read_length(cursor)?;
    if expected_len as u64 > cursor.max_string_len() {
        return Err(RdbError::MalformedLength {
            reason: format!(
                "uncompressed length {expected_len} exceeds limit {}",
                cursor.max_string_len()
            ),
            offset: Some(cursor.offset()),
            key: None,
        }
        .into());
    }

    let start = cursor.offset();
    let compressed = cursor.read_bytes(compressed_len as u64, "compressed payload")?;
    lzf::decompress(&compressed, expected_len as usize).map_err(|e| e.rebase(start).into())
}

/// Читает double в текстовой кодировке: однобайтовая длина и ASCII-запись.
///
/// Длины 253, 254 и 255 обозначают NaN, +inf и -inf соответственно.
pub fn read_double<R: Read>(cursor: &mut ByteCursor<R>) -> RdbResult<f64> {
    let start = cursor.offset();
    let len = cursor.read_u8("double length")?;
    match len {
        DOUBLE_NAN => Ok(f64::NAN),
        DOUBLE_POS_INF => Ok(f64::INFINITY),
        DOUBLE_NEG_INF => Ok(f64::NEG_INFINITY),
        _ => {
            let text = cursor.read_bytes(len as u64, "double text")?;
            parse_double(&text).ok_or_else(|| {
                RdbError::MalformedLength {
                    reason: format!(
                        "invalid double text '{}'",
                        String::from_utf8_lossy(&text)
                    ),
                    offset: Some(start),
                    key: None,
                }
                .into()
            })
        }
    }
}

/// Читает double в бинарной кодировке (8 байт IEEE-754 LE).
pub fn read_binary_double<R: Read>(cursor: &mut ByteCursor<R>) -> RdbResult<f64> {
    cursor.read_f64_le("binary double")
}

/// Разбирает текстовую запись числа, включая формы `inf`/`-inf`/`nan`.
pub fn parse_double(text: &[u8]) -> Option<f64> {
    let s = std::str::from_utf8(text).ok()?.trim();
    match s {
        "inf" | "+inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => s.parse::<f64>().ok(),
    }
}
