//! Опкоды и теги типов значений RDB-снапшота.
//!
//! Каждая запись верхнего уровня начинается с одного байта: это либо опкод
//! (выбор базы, срок жизни, конец файла...), либо тег типа значения, за
//! которым следуют ключ и само значение.

use std::{fmt, str::FromStr};

use num_enum::TryFromPrimitive;
use thiserror::Error;

/// «Магическое» начало файла: ASCII-буквы «REDIS».
pub const RDB_MAGIC: &[u8; 5] = b"REDIS";
/// Длина десятичной версии после сигнатуры.
pub const VERSION_DIGITS: usize = 4;
/// Минимальная поддерживаемая версия формата.
pub const MIN_VERSION: u32 = 1;
/// Максимальная поддерживаемая версия формата.
pub const MAX_VERSION: u32 = 9;
/// Начиная с этой версии после `EOF` записывается 8-байтовая контрольная сумма.
pub const CHECKSUM_MIN_VERSION: u32 = 5;
/// Размер контрольной суммы в хвосте файла.
pub const CHECKSUM_LEN: usize = 8;

/// Опкоды верхнего уровня.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    /// Вспомогательное поле (пара строк), игнорируется
    Aux = 0xFA,
    /// Подсказка о размере базы
    ResizeDb = 0xFB,
    /// Срок жизни следующего ключа в миллисекундах (u64 LE)
    ExpireTimeMs = 0xFC,
    /// Срок жизни следующего ключа в секундах (u32 LE)
    ExpireTime = 0xFD,
    /// Выбор базы данных
    SelectDb = 0xFE,
    /// Конец файла
    Eof = 0xFF,
}

/// Теги типов значений.
///
/// Теги 6–8 использовались старыми версиями сервера и в снапшотах не
/// встречаются; как и всё, что старше 14, они считаются неизвестными.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum ValueType {
    String = 0,
    List = 1,
    Set = 2,
    SortedSet = 3,
    Hash = 4,
    /// Sorted set с бинарными (f64 LE) score
    SortedSet2 = 5,
    HashZipmap = 9,
    ListZiplist = 10,
    SetIntset = 11,
    SortedSetZiplist = 12,
    HashZiplist = 13,
    /// Список из цепочки ziplist-блобов
    ListQuicklist = 14,
}

/// Логический вид значения, не зависящий от кодировки на диске.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    List,
    Set,
    SortedSet,
    Hash,
}

/// Ошибка разбора имени типа значения.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown value type '{0}' (expected one of: string, list, set, sortedset, hash)")]
pub struct UnknownValueKind(pub String);

impl ValueType {
    /// Логический вид значения.
    pub fn kind(self) -> ValueKind {
        match self {
            Self::String => ValueKind::String,
            Self::List | Self::ListZiplist | Self::ListQuicklist => ValueKind::List,
            Self::Set | Self::SetIntset => ValueKind::Set,
            Self::SortedSet | Self::SortedSet2 | Self::SortedSetZiplist => ValueKind::SortedSet,
            Self::Hash | Self::HashZipmap | Self::HashZiplist => ValueKind::Hash,
        }
    }
}

impl ValueKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::List => "list",
            Self::Set => "set",
            Self::SortedSet => "sortedset",
            Self::Hash => "hash",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueKind {
    type Err = UnknownValueKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" => Ok(Self::String),
            "list" => Ok(Self::List),
            "set" => Ok(Self::Set),
            "sortedset" | "zset" => Ok(Self::SortedSet),
            "hash" => Ok(Self::Hash),
            _ => Err(UnknownValueKind(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что байты опкодов и тегов не пересекаются, а
    /// зарезервированные теги не распознаются.
    #[test]
    fn test_opcode_and_type_ranges() {
        for byte in 0u8..=255 {
            let is_op = Opcode::try_from(byte).is_ok();
            let is_type = ValueType::try_from(byte).is_ok();
            assert!(!(is_op && is_type), "byte 0x{byte:02X} is ambiguous");
        }
        for reserved in [6u8, 7, 8, 15, 0xF9] {
            assert!(ValueType::try_from(reserved).is_err());
            assert!(Opcode::try_from(reserved).is_err());
        }
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ValueType::HashZipmap.kind(), ValueKind::Hash);
        assert_eq!(ValueType::ListQuicklist.kind(), ValueKind::List);
        assert_eq!(ValueType::SortedSet2.kind(), ValueKind::SortedSet);
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("Hash".parse::<ValueKind>(), Ok(ValueKind::Hash));
        assert_eq!("zset".parse::<ValueKind>(), Ok(ValueKind::SortedSet));
        let err = "stream".parse::<ValueKind>().unwrap_err();
        assert!(err.to_string().contains("stream"));
    }
}
