use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Числовые коды ошибок декодера.
///
/// Старшая цифра задаёт группу: 1xxx — вызов API, 2xxx — входные данные,
/// 5xxx — повреждённое содержимое снапшота, 6xxx — ввод-вывод, 8xxx — формат
/// потока.
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // 1xxx
    Internal = 1003,
    InvalidArgs = 1004,
    InvalidOperation = 1005,
    Cancelled = 1006,

    // 2xxx
    NotFound = 2000,
    InvalidPattern = 2002,

    // 5xxx
    CorruptedData = 5002,
    CompressionFailed = 5005,

    // 6xxx
    Io = 6000,
    PermissionDenied = 6001,
    UnexpectedEof = 6007,

    // 8xxx
    UnknownOpcode = 8001,
    UnsupportedVersion = 8002,
    InvalidLength = 8007,
}

/// Уровень, с которым стоит логировать ошибку данного кода.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Остановка по просьбе слушателя ожидаема и идёт в `Debug`, ошибки
    /// настроек в `Info`, повреждённый снапшот в `Error`, остальное в `Warn`.
    pub fn log_level(self) -> LogLevel {
        match self {
            Self::Cancelled => LogLevel::Debug,
            Self::InvalidArgs | Self::InvalidPattern | Self::InvalidOperation => LogLevel::Info,
            Self::Internal | Self::CorruptedData | Self::CompressionFailed => LogLevel::Error,
            _ => LogLevel::Warn,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
