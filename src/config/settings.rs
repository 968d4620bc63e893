use std::path::Path;

use ::config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use rdb_error::{ensure, RdbResult, StatusCode};
use serde::{Deserialize, Serialize};

use crate::engine::rdb::cursor::{DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_STRING_LEN};

/// Префикс переменных окружения по умолчанию.
pub const ENV_PREFIX: &str = "RDB";

/// Настройки парсера снапшотов.
///
/// Значения берутся из умолчаний, затем (опционально) из файла, затем из
/// переменных окружения вида `RDB_BUFFER_CAPACITY` или
/// `RDB_FILTER__DATABASES=0,3`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserSettings {
    /// Размер буфера чтения в байтах
    pub buffer_capacity: usize,
    /// Максимальная длина одной строки в байтах
    pub max_string_len: u64,
    pub filter: FilterSettings,
}

/// Условия отбора записей. Пустой список означает «без ограничения».
///
/// Списки принимаются и одиночным значением: `RDB_FILTER__DATABASES=3`
/// приходит из окружения числом, а `0,3` уже списком.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    #[serde(deserialize_with = "list::parsed")]
    pub databases: Vec<u64>,
    /// Glob-шаблоны ключей
    #[serde(deserialize_with = "list::strings")]
    pub keys: Vec<String>,
    /// Виды значений: string, list, set, sortedset, hash
    #[serde(deserialize_with = "list::strings")]
    pub types: Vec<String>,
}

impl Default for ParserSettings {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            max_string_len: DEFAULT_MAX_STRING_LEN,
            filter: FilterSettings::default(),
        }
    }
}

impl ParserSettings {
    /// Загружает настройки из умолчаний и окружения с префиксом `RDB_`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_prefix(ENV_PREFIX)
    }

    pub fn load_with_prefix(prefix: &str) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(environment(prefix))
            .build()?
            .try_deserialize()
    }

    /// Загружает настройки из файла (формат по расширению), поверх которого
    /// применяется окружение.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        defaults()?
            .add_source(File::from(path.as_ref()))
            .add_source(environment(ENV_PREFIX))
            .build()?
            .try_deserialize()
    }

    /// Проверяет согласованность значений.
    pub fn validate(&self) -> RdbResult<()> {
        ensure!(
            self.buffer_capacity > 0,
            StatusCode::InvalidArgs,
            "buffer_capacity must be positive"
        );
        ensure!(
            self.max_string_len > 0,
            StatusCode::InvalidArgs,
            "max_string_len must be positive"
        );
        Ok(())
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("buffer_capacity", DEFAULT_BUFFER_CAPACITY as i64)?
        .set_default("max_string_len", DEFAULT_MAX_STRING_LEN as i64)
}

fn environment(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("filter.databases")
        .with_list_parse_key("filter.keys")
        .with_list_parse_key("filter.types")
}

/// Десериализация списков, пришедших из файла или окружения.
mod list {
    use std::{fmt, str::FromStr};

    use serde::de::{self, Deserialize, Deserializer, SeqAccess, Visitor};

    struct Item(String);

    struct ItemVisitor;

    struct ListVisitor;

    impl<'de> Deserialize<'de> for Item {
        fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
            d.deserialize_any(ItemVisitor).map(Item)
        }
    }

    impl<'de> Visitor<'de> for ItemVisitor {
        type Value = String;

        fn expecting(
            &self,
            f: &mut fmt::Formatter,
        ) -> fmt::Result {
            f.write_str("a string, number or boolean")
        }

        fn visit_str<E: de::Error>(
            self,
            v: &str,
        ) -> Result<String, E> {
            Ok(v.trim().to_string())
        }

        fn visit_i64<E: de::Error>(
            self,
            v: i64,
        ) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_u64<E: de::Error>(
            self,
            v: u64,
        ) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_f64<E: de::Error>(
            self,
            v: f64,
        ) -> Result<String, E> {
            Ok(v.to_string())
        }

        fn visit_bool<E: de::Error>(
            self,
            v: bool,
        ) -> Result<String, E> {
            Ok(v.to_string())
        }
    }

    impl<'de> Visitor<'de> for ListVisitor {
        type Value = Vec<String>;

        fn expecting(
            &self,
            f: &mut fmt::Formatter,
        ) -> fmt::Result {
            f.write_str("a list or a single value")
        }

        fn visit_seq<A: SeqAccess<'de>>(
            self,
            mut seq: A,
        ) -> Result<Vec<String>, A::Error> {
            let mut out = Vec::new();
            while let Some(Item(item)) = seq.next_element()? {
                out.push(item);
            }
            Ok(out)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Vec<String>, E> {
            Ok(Vec::new())
        }

        fn visit_str<E: de::Error>(
            self,
            v: &str,
        ) -> Result<Vec<String>, E> {
            ItemVisitor.visit_str(v).map(|s| vec![s])
        }

        fn visit_i64<E: de::Error>(
            self,
            v: i64,
        ) -> Result<Vec<String>, E> {
            ItemVisitor.visit_i64(v).map(|s| vec![s])
        }

        fn visit_u64<E: de::Error>(
            self,
            v: u64,
        ) -> Result<Vec<String>, E> {
            ItemVisitor.visit_u64(v).map(|s| vec![s])
        }

        fn visit_f64<E: de::Error>(
            self,
            v: f64,
        ) -> Result<Vec<String>, E> {
            ItemVisitor.visit_f64(v).map(|s| vec![s])
        }

        fn visit_bool<E: de::Error>(
            self,
            v: bool,
        ) -> Result<Vec<String>, E> {
            ItemVisitor.visit_bool(v).map(|s| vec![s])
        }
    }

    pub fn strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
        d.deserialize_any(ListVisitor)
    }

    pub fn parsed<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: FromStr,
        T::Err: fmt::Display,
    {
        strings(d)?
            .into_iter()
            .map(|item| {
                item.parse::<T>()
                    .map_err(|e| de::Error::custom(format!("invalid list item '{item}': {e}")))
            })
            .collect()
    }
}
