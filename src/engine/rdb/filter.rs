//! Фильтр записей: по номеру базы, шаблону ключа и виду значения.
//!
//! Записи, не прошедшие фильтр, пропускаются без декодирования, а базы вне
//! фильтра не порождают событий `begin_database`/`end_database`.

use std::collections::HashSet;

use globset::{Glob, GlobSet, GlobSetBuilder};
use rdb_error::{ErrorExt, StatusCode};
use thiserror::Error;

use super::tags::{UnknownValueKind, ValueKind};
use crate::config::FilterSettings;

/// Ошибка построения фильтра.
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("invalid key pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error(transparent)]
    UnknownKind(#[from] UnknownValueKind),
}

impl ErrorExt for FilterError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidPattern { .. } => StatusCode::InvalidPattern,
            Self::UnknownKind(_) => StatusCode::InvalidArgs,
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Набор условий отбора. Пустое условие пропускает всё.
#[derive(Debug, Clone, Default)]
pub struct ParseFilter {
    databases: Option<HashSet<u64>>,
    keys: Option<GlobSet>,
    kinds: Option<HashSet<ValueKind>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl ParseFilter {
    /// Фильтр, который пропускает всё.
    pub fn new() -> Self {
        Self::default()
    }

    /// Оставляет только перечисленные базы.
    pub fn databases<I>(
        mut self,
        dbs: I,
    ) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        self.databases = Some(dbs.into_iter().collect());
        self
    }

    /// Оставляет только перечисленные виды значений.
    pub fn kinds<I>(
        mut self,
        kinds: I,
    ) -> Self
    where
        I: IntoIterator<Item = ValueKind>,
    {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    /// Оставляет только ключи, совпадающие хотя бы с одним glob-шаблоном.
    pub fn key_patterns<I, S>(
        mut self,
        patterns: I,
    ) -> Result<Self, FilterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|source| FilterError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
            builder.add(glob);
        }
        let set = builder.build().map_err(|source| FilterError::InvalidPattern {
            pattern: "<set>".to_string(),
            source,
        })?;
        self.keys = Some(set);
        Ok(self)
    }

    /// Строит фильтр из настроек; пустые списки означают «без ограничения».
    pub fn from_settings(settings: &FilterSettings) -> Result<Self, FilterError> {
        let mut filter = Self::new();
        if !settings.databases.is_empty() {
            filter = filter.databases(settings.databases.iter().copied());
        }
        if !settings.keys.is_empty() {
            filter = filter.key_patterns(&settings.keys)?;
        }
        if !settings.types.is_empty() {
            let kinds = settings
                .types
                .iter()
                .map(|t| t.parse::<ValueKind>())
                .collect::<Result<Vec<_>, _>>()?;
            filter = filter.kinds(kinds);
        }
        Ok(filter)
    }

    /// Пропускает ли фильтр всё подряд.
    pub fn is_pass_all(&self) -> bool {
        self.databases.is_none() && self.keys.is_none() && self.kinds.is_none()
    }

    pub fn matches_database(
        &self,
        index: u64,
    ) -> bool {
        self.databases
            .as_ref()
            .map_or(true, |dbs| dbs.contains(&index))
    }

    /// Ключи сравниваются как UTF-8 с заменой невалидных байт.
    pub fn matches_key(
        &self,
        key: &[u8],
    ) -> bool {
        self.keys
            .as_ref()
            .map_or(true, |set| set.is_match(String::from_utf8_lossy(key).as_ref()))
    }

    pub fn matches_kind(
        &self,
        kind: ValueKind,
    ) -> bool {
        self.kinds.as_ref().map_or(true, |kinds| kinds.contains(&kind))
    }

    /// Проходит ли запись фильтр целиком (база проверяется отдельно).
    pub fn matches_entry(
        &self,
        key: &[u8],
        kind: ValueKind,
    ) -> bool {
        self.matches_kind(kind) && self.matches_key(key)
    }
}
