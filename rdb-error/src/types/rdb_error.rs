use std::any::Any;

use crate::{ErrorExt, StatusCode};

/// Ошибка декодирования RDB-снапшота с контекстом для диагностики.
///
/// Любая из них фатальна для текущего прохода: сбитое смещение делает
/// недостоверным каждое последующее чтение.
#[derive(Debug, Clone)]
pub enum RdbError {
    /// Неверная сигнатура или версия в заголовке
    FormatError {
        reason: String,
        offset: Option<u64>,
    },

    /// Неизвестный опкод или тег типа значения
    UnknownOpcode {
        opcode: u8,
        offset: Option<u64>,
        key: Option<String>,
    },

    /// Недопустимая кодировка длины
    MalformedLength {
        reason: String,
        offset: Option<u64>,
        key: Option<String>,
    },

    /// Ошибка распаковки LZF
    CompressionError {
        reason: String,
        offset: Option<u64>,
        key: Option<String>,
        compressed_len: Option<u64>,
        expected_len: Option<u64>,
    },

    /// Компактный контейнер не согласован со своим заголовком
    MalformedContainer {
        container: ContainerKind,
        reason: String,
        offset: Option<u64>,
        key: Option<String>,
    },

    /// Поток закончился посреди структуры
    TruncatedInput {
        context: String,
        offset: Option<u64>,
        key: Option<String>,
        expected_bytes: Option<u64>,
        got_bytes: Option<u64>,
    },

    /// Слушатель попросил остановить разбор
    ListenerAborted {
        reason: String,
        offset: Option<u64>,
        key: Option<String>,
    },
}

/// Вид ошибки без полей, для сопоставления с образцом.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RdbErrorKind {
    FormatError,
    UnknownOpcode,
    MalformedLength,
    CompressionError,
    MalformedContainer,
    TruncatedInput,
    ListenerAborted,
}

/// Тип компактного контейнера для контекста ошибки.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Zipmap,
    Ziplist,
    Intset,
}

impl RdbError {
    /// Сокращённый конструктор для [`RdbError::MalformedContainer`].
    pub fn container(
        container: ContainerKind,
        reason: impl Into<String>,
        offset: u64,
    ) -> Self {
        Self::MalformedContainer {
            container,
            reason: reason.into(),
            offset: Some(offset),
            key: None,
        }
    }

    /// Возвращает вид ошибки.
    pub fn kind(&self) -> RdbErrorKind {
        match self {
            Self::FormatError { .. } => RdbErrorKind::FormatError,
            Self::UnknownOpcode { .. } => RdbErrorKind::UnknownOpcode,
            Self::MalformedLength { .. } => RdbErrorKind::MalformedLength,
            Self::CompressionError { .. } => RdbErrorKind::CompressionError,
            Self::MalformedContainer { .. } => RdbErrorKind::MalformedContainer,
            Self::TruncatedInput { .. } => RdbErrorKind::TruncatedInput,
            Self::ListenerAborted { .. } => RdbErrorKind::ListenerAborted,
        }
    }

    /// Смещение в байтах, на котором обнаружена ошибка.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::FormatError { offset, .. }
            | Self::UnknownOpcode { offset, .. }
            | Self::MalformedLength { offset, .. }
            | Self::CompressionError { offset, .. }
            | Self::MalformedContainer { offset, .. }
            | Self::TruncatedInput { offset, .. }
            | Self::ListenerAborted { offset, .. } => *offset,
        }
    }

    /// Ключ, при разборе которого произошла ошибка.
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::FormatError { .. } => None,
            Self::UnknownOpcode { key, .. }
            | Self::MalformedLength { key, .. }
            | Self::CompressionError { key, .. }
            | Self::MalformedContainer { key, .. }
            | Self::TruncatedInput { key, .. }
            | Self::ListenerAborted { key, .. } => key.as_deref(),
        }
    }

    fn offset_mut(&mut self) -> &mut Option<u64> {
        match self {
            Self::FormatError { offset, .. }
            | Self::UnknownOpcode { offset, .. }
            | Self::MalformedLength { offset, .. }
            | Self::CompressionError { offset, .. }
            | Self::MalformedContainer { offset, .. }
            | Self::TruncatedInput { offset, .. }
            | Self::ListenerAborted { offset, .. } => offset,
        }
    }

    /// Переводит смещение внутри блоба в абсолютное смещение в файле.
    ///
    /// Если смещение не было задано, используется `base`.
    pub fn rebase(
        mut self,
        base: u64,
    ) -> Self {
        let slot = self.offset_mut();
        *slot = Some(base + slot.unwrap_or(0));
        self
    }

    /// Добавляет контекст ключа к ошибке.
    pub fn with_key(
        mut self,
        key: impl Into<String>,
    ) -> Self {
        let k = Some(key.into());
        match &mut self {
            Self::FormatError { .. } => {}
            Self::UnknownOpcode { key: ref mut k2, .. }
            | Self::MalformedLength { key: ref mut k2, .. }
            | Self::CompressionError { key: ref mut k2, .. }
            | Self::MalformedContainer { key: ref mut k2, .. }
            | Self::TruncatedInput { key: ref mut k2, .. }
            | Self::ListenerAborted { key: ref mut k2, .. } => {
                *k2 = k;
            }
        }
        self
    }

    /// Подсказка для пользователя, что делать с файлом.
    pub fn recovery_hint(&self) -> Option<&'static str> {
        match self {
            Self::FormatError { .. } => Some("Check that the file is an RDB snapshot"),
            Self::UnknownOpcode { .. } => {
                Some("Snapshot may come from a newer server or be corrupted")
            }
            Self::TruncatedInput { .. } => Some("File may be truncated. Check file integrity"),
            Self::CompressionError { .. } | Self::MalformedContainer { .. } => {
                Some("File may be corrupted. Try using a backup")
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for RdbError {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::FormatError { reason, offset } => {
                write!(f, "Invalid snapshot header: {reason}")?;
                write_context(f, *offset, None)
            }
            Self::UnknownOpcode {
                opcode,
                offset,
                key,
            } => {
                write!(f, "Unknown opcode 0x{opcode:02X}")?;
                write_context(f, *offset, key.as_deref())
            }
            Self::MalformedLength {
                reason,
                offset,
                key,
            } => {
                write!(f, "Malformed length: {reason}")?;
                write_context(f, *offset, key.as_deref())
            }
            Self::CompressionError {
                reason,
                offset,
                key,
                compressed_len,
                expected_len,
            } => {
                write!(f, "Decompression error: {reason}")?;
                if let (Some(clen), Some(ulen)) = (compressed_len, expected_len) {
                    write!(f, " (compressed {clen} bytes, expected {ulen})")?;
                }
                write_context(f, *offset, key.as_deref())
            }
            Self::MalformedContainer {
                container,
                reason,
                offset,
                key,
            } => {
                write!(f, "Malformed {container}: {reason}")?;
                write_context(f, *offset, key.as_deref())
            }
            Self::TruncatedInput {
                context,
                offset,
                key,
                expected_bytes,
                got_bytes,
            } => {
                write!(f, "Truncated input: {context}")?;
                if let (Some(exp), Some(got)) = (expected_bytes, got_bytes) {
                    write!(f, " (expected {exp} bytes, got {got})")?;
                }
                write_context(f, *offset, key.as_deref())
            }
            Self::ListenerAborted {
                reason,
                offset,
                key,
            } => {
                write!(f, "Listener aborted parsing: {reason}")?;
                write_context(f, *offset, key.as_deref())
            }
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            Self::Zipmap => write!(f, "zipmap"),
            Self::Ziplist => write!(f, "ziplist"),
            Self::Intset => write!(f, "intset"),
        }
    }
}

/// Вспомогательная функция для форматирования контекста (offset, key).
fn write_context(
    f: &mut std::fmt::Formatter<'_>,
    offset: Option<u64>,
    key: Option<&str>,
) -> std::fmt::Result {
    let mut parts = Vec::new();
    if let Some(o) = offset {
        parts.push(format!("offset: 0x{o:X}"));
    }
    if let Some(k) = key {
        parts.push(format!("key: {k}"));
    }
    if !parts.is_empty() {
        write!(f, " [{}]", parts.join(", "))?;
    }
    Ok(())
}

impl std::error::Error for RdbError {}

impl ErrorExt for RdbError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::FormatError { .. } => StatusCode::UnsupportedVersion,
            Self::UnknownOpcode { .. } => StatusCode::UnknownOpcode,
            Self::MalformedLength { .. } => StatusCode::InvalidLength,
            Self::CompressionError { .. } => StatusCode::CompressionFailed,
            Self::MalformedContainer { .. } => StatusCode::CorruptedData,
            Self::TruncatedInput { .. } => StatusCode::UnexpectedEof,
            Self::ListenerAborted { .. } => StatusCode::Cancelled,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
