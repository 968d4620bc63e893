use std::{env, fmt, str::FromStr};

use rdb_error::{ensure, RdbResult, StatusCode};
use serde::{Deserialize, Serialize};

/// Допустимые уровни логирования.
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Формат вывода событий в консоль.
#[derive(Debug, Default, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Одна строка на событие.
    #[default]
    Compact,
    /// Многострочный человекочитаемый вывод.
    Pretty,
    /// JSON, по объекту на строку.
    Json,
}

/// Настройки логирования.
///
/// Поля можно переопределить переменными окружения `RDB_LOG_LEVEL`,
/// `RDB_LOG_FORMAT` и `RDB_LOG_ANSI`; `RUST_LOG`, если задан, заменяет
/// директиву фильтра целиком.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub with_target: bool,
    pub with_line_numbers: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl LoggingConfig {
    /// Директива `EnvFilter` для событий этого крейта.
    pub fn build_filter_directive(&self) -> String {
        format!("rdb_stream={}", self.level.to_lowercase())
    }

    /// Проверяет уровень логирования.
    pub fn validate(&self) -> RdbResult<()> {
        let level = self.level.to_lowercase();
        ensure!(
            LEVELS.contains(&level.as_str()),
            StatusCode::InvalidArgs,
            "unknown log level '{}'",
            self.level
        );
        Ok(())
    }

    /// Применяет переопределения из окружения. Нераспознанные значения
    /// игнорируются.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(level) = env::var("RDB_LOG_LEVEL") {
            self.level = level;
        }
        if let Some(format) = env::var("RDB_LOG_FORMAT")
            .ok()
            .and_then(|f| f.parse().ok())
        {
            self.format = format;
        }
        if let Some(ansi) = env::var("RDB_LOG_ANSI")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.with_ansi = ansi;
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_ansi: true,
            with_target: true,
            with_line_numbers: false,
        }
    }
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let name = match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}
