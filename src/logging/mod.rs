//! Логирование на базе `tracing`.
//!
//! Библиотека только порождает события; подписчика устанавливает приложение.
//! [`init_logging`] собирает стандартного подписчика для утилит и тестов.

pub mod config;
mod filters;
mod formatter;

pub use config::{LogFormat, LoggingConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Устанавливает глобального подписчика, пишущего в stderr.
///
/// # Аргументы
///
/// * `config` - настройки; переменные окружения `RDB_LOG_*` применяются
///   поверх них.
///
/// # Возвращает
///
/// Ошибку, если конфигурация некорректна или подписчик уже установлен.
pub fn init_logging(mut config: LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.apply_env_overrides();
    config.validate()?;

    let env_filter = filters::build_filter_from_config(&config);
    let layer = formatter::build_formatter(&config, std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_format = %config.format,
        "Logging system initialized"
    );

    Ok(())
}
