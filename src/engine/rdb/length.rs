//! Кодек длин и специальных кодировок строк.
//!
//! Первый байт определяет форму по двум старшим битам:
//!
//! | биты | значение                                         |
//! |------|--------------------------------------------------|
//! | `00` | 6-битная длина                                   |
//! | `01` | 14-битная длина (6 бит + следующий байт, BE)     |
//! | `10` | 32-битная длина в следующих 4 байтах (BE)        |
//! | `11` | специальная кодировка, селектор в младших 6 битах |

use std::io::Read;

use rdb_error::{RdbError, RdbResult};

use super::cursor::ByteCursor;

const LEN_6BIT: u8 = 0;
const LEN_14BIT: u8 = 1;
const LEN_32BIT: u8 = 2;

/// Специальные кодировки строк (форма `11`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Special {
    Int8,
    Int16,
    Int32,
    Lzf,
}

/// Результат чтения длины.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Length {
    Plain(u32),
    Special(Special),
}

impl Special {
    fn from_selector(selector: u8) -> Option<Self> {
        match selector {
            0 => Some(Self::Int8),
            1 => Some(Self::Int16),
            2 => Some(Self::Int32),
            3 => Some(Self::Lzf),
            _ => None,
        }
    }
}

/// Читает длину вместе с признаком специальной кодировки.
pub fn read_length_with_encoding<R: Read>(cursor: &mut ByteCursor<R>) -> RdbResult<Length> {
    let start = cursor.offset();
    let first = cursor.read_u8("length prefix")?;
    match first >> 6 {
        LEN_6BIT => Ok(Length::Plain((first & 0x3F) as u32)),
        LEN_14BIT => {
            let next = cursor.read_u8("14-bit length")?;
            Ok(Length::Plain((((first & 0x3F) as u32) << 8) | next as u32))
        }
        LEN_32BIT => Ok(Length::Plain(cursor.read_u32_be("32-bit length")?)),
        _ => {
            let selector = first & 0x3F;
            Special::from_selector(selector)
                .map(Length::Special)
                .ok_or_else(|| {
                    RdbError::MalformedLength {
                        reason: format!("unknown special encoding {selector}"),
                        offset: Some(start),
                        key: None,
                    }
                    .into()
                })
        }
    }
}

/// Читает обычную длину; специальная форма здесь недопустима.
pub fn read_length<R: Read>(cursor: &mut ByteCursor<R>) -> RdbResult<u32> {
    let start = cursor.offset();
    match read_length_with_encoding(cursor)? {
        Length::Plain(len) => Ok(len),
        Length::Special(special) => Err(RdbError::MalformedLength {
            reason: format!("expected a plain length, found special encoding {special:?}"),
            offset: Some(start),
            key: None,
        }
        .into()),
    }
}
