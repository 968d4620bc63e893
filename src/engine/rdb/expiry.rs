use std::fmt;

use chrono::{DateTime, Utc};

/// Абсолютный срок жизни ключа в миллисекундах от Unix-эпохи.
///
/// Снапшот хранит срок либо в секундах (4 байта), либо в миллисекундах
/// (8 байт); обе формы приводятся к миллисекундам.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExpiryTime {
    millis: u64,
}

impl ExpiryTime {
    pub fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    pub fn from_secs(secs: u32) -> Self {
        Self {
            millis: secs as u64 * 1000,
        }
    }

    pub fn as_millis(&self) -> u64 {
        self.millis
    }

    /// Момент истечения как `DateTime<Utc>`; `None`, если он вне диапазона
    /// chrono.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.millis)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }
}

impl fmt::Display for ExpiryTime {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self.to_datetime() {
            Some(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
            None => write!(f, "{}ms", self.millis),
        }
    }
}
