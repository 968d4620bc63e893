//! Потоковый парсер RDB-снапшотов.
//!
//! Читает файл за один проход и передаёт его содержимое слушателю в виде
//! событий, держа в памяти не больше одной записи.
//!
//! # Фазы
//!
//! ```text
//! Header ──► TopLevel ──► Done
//!              ▲   │
//!              └───┘  (опкод или запись)
//! ```
//!
//! Между записями сохраняется только [`ParserState`]: текущая база и срок
//! жизни, ожидающий следующего ключа.

use std::{fs::File, io::Read, path::Path};

use rdb_error::{ensure, LogLevel, RdbError, RdbResult, ResultExt, StackError, StatusCode};
use tracing::{debug, error, info, trace, warn};

use super::{
    cursor::ByteCursor,
    expiry::ExpiryTime,
    filter::ParseFilter,
    length::read_length,
    listener::RdbListener,
    string::read_string,
    tags::{
        Opcode, ValueType, CHECKSUM_LEN, CHECKSUM_MIN_VERSION, MAX_VERSION, MIN_VERSION,
        RDB_MAGIC, VERSION_DIGITS,
    },
    value::{decode_value, skip_value, DecodedValue, Value},
};
use crate::config::ParserSettings;

/// Статистика одного прохода.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseStats {
    /// Кол-во прочитанных байт
    pub bytes_read: u64,
    /// Версия формата из заголовка
    pub version: Option<u32>,
    /// Кол-во встреченных секций баз (включая отфильтрованные)
    pub databases: u64,
    /// Кол-во ключей, переданных слушателю
    pub keys_parsed: u64,
    /// Кол-во ключей, пропущенных фильтром
    pub keys_skipped: u64,
    /// Кол-во переданных ключей со сроком жизни
    pub expiring_keys: u64,
    /// Контрольная сумма из хвоста файла (не проверяется)
    pub checksum: Option<[u8; CHECKSUM_LEN]>,
}

/// Состояние, переносимое между записями верхнего уровня.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParserState {
    pub current_database: Option<u64>,
    pub pending_expiry: Option<ExpiryTime>,
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Header,
    TopLevel { version: u32, state: ParserState },
    Done,
}

/// Однопроходный парсер снапшота поверх любого `Read`.
///
/// Экземпляр используется один раз: повторный вызов [`RdbParser::parse`]
/// завершается ошибкой `InvalidOperation`.
pub struct RdbParser<R: Read> {
    cursor: ByteCursor<R>,
    filter: ParseFilter,
    stats: ParseStats,
    consumed: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl<R: Read> RdbParser<R> {
    /// Создаёт парсер с настройками по умолчанию и без фильтра.
    pub fn new(reader: R) -> Self {
        Self {
            cursor: ByteCursor::new(reader),
            filter: ParseFilter::default(),
            stats: ParseStats::default(),
            consumed: false,
        }
    }

    /// Создаёт парсер из настроек: размер буфера, лимит строки и фильтр.
    pub fn with_settings(
        reader: R,
        settings: &ParserSettings,
    ) -> RdbResult<Self> {
        settings.validate()?;
        let filter = ParseFilter::from_settings(&settings.filter)
            .context("Invalid filter settings")?;
        Ok(Self {
            cursor: ByteCursor::with_limits(
                reader,
                settings.buffer_capacity,
                settings.max_string_len,
            ),
            filter,
            stats: ParseStats::default(),
            consumed: false,
        })
    }

    /// Заменяет фильтр.
    pub fn with_filter(
        mut self,
        filter: ParseFilter,
    ) -> Self {
        self.filter = filter;
        self
    }

    /// Возвращает статистику (заполняется по ходу разбора).
    pub fn stats(&self) -> &ParseStats {
        &self.stats
    }

    /// Потребляет парсер и возвращает исходный reader.
    pub fn into_inner(self) -> R {
        self.cursor.into_inner()
    }

    /// Разбирает снапшот, вызывая методы слушателя по мере чтения.
    ///
    /// # Возвращает
    ///
    /// Статистику прохода. Любая ошибка фатальна; события, уже переданные
    /// слушателю, остаются в силе.
    pub fn parse<L: RdbListener>(
        &mut self,
        listener: &mut L,
    ) -> RdbResult<ParseStats> {
        ensure!(
            !self.consumed,
            StatusCode::InvalidOperation,
            "Parser has already consumed its input"
        );
        self.consumed = true;

        let result = self.run(listener);
        self.stats.bytes_read = self.cursor.offset();

        match &result {
            Ok(()) => info!(
                "Snapshot parsed: {} keys emitted, {} skipped, {} databases, {} bytes",
                self.stats.keys_parsed,
                self.stats.keys_skipped,
                self.stats.databases,
                self.stats.bytes_read
            ),
            Err(e) => log_failure(e, self.stats.bytes_read),
        }
        result.map(|()| self.stats.clone())
    }

    fn run<L: RdbListener>(
        &mut self,
        listener: &mut L,
    ) -> RdbResult<()> {
        if !self.filter.is_pass_all() {
            debug!("Entry filter enabled: {:?}", self.filter);
        }

        let mut phase = Phase::Header;
        loop {
            phase = match phase {
                Phase::Header => {
                    let version = self.read_header()?;
                    self.stats.version = Some(version);
                    debug!("Snapshot format version {}", version);
                    notify(self.cursor.offset(), None, listener.begin(version))?;
                    Phase::TopLevel {
                        version,
                        state: ParserState::default(),
                    }
                }
                Phase::TopLevel { version, state } => self.step(version, state, listener)?,
                Phase::Done => return Ok(()),
            };
        }
    }

    fn read_header(&mut self) -> RdbResult<u32> {
        let magic = self.cursor.read_up_to(RDB_MAGIC.len() as u64)?;
        ensure!(
            magic.as_slice() == RDB_MAGIC,
            RdbError::FormatError {
                reason: format!("bad magic {:?}", String::from_utf8_lossy(&magic)),
                offset: Some(0),
            }
        );

        let digits = self.cursor.read_up_to(VERSION_DIGITS as u64)?;
        let version = std::str::from_utf8(&digits)
            .ok()
            .filter(|s| s.len() == VERSION_DIGITS && s.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|s| s.parse::<u32>().ok())
            .ok_or_else(|| RdbError::FormatError {
                reason: format!("bad version {:?}", String::from_utf8_lossy(&digits)),
                offset: Some(RDB_MAGIC.len() as u64),
            })?;

        ensure!(
            (MIN_VERSION..=MAX_VERSION).contains(&version),
            RdbError::FormatError {
                reason: format!("unsupported version {version}"),
                offset: Some(RDB_MAGIC.len() as u64),
            }
        );
        Ok(version)
    }

    /// Обрабатывает один опкод или одну запись верхнего уровня.
    fn step<L: RdbListener>(
        &mut self,
        version: u32,
        mut state: ParserState,
        listener: &mut L,
    ) -> RdbResult<Phase> {
        let offset = self.cursor.offset();
        let byte = self
            .cursor
            .try_read_u8()?
            .ok_or_else(|| RdbError::TruncatedInput {
                context: "expected opcode or EOF marker".to_string(),
                offset: Some(offset),
                key: None,
                expected_bytes: Some(1),
                got_bytes: Some(0),
            })?;

        if let Ok(opcode) = Opcode::try_from(byte) {
            match opcode {
                Opcode::Eof => {
                    self.finish(version, state, listener)?;
                    return Ok(Phase::Done);
                }
                Opcode::SelectDb => {
                    let index = read_length(&mut self.cursor).context("Reading database index")?;
                    state = self.switch_database(state, index as u64, listener)?;
                }
                Opcode::ResizeDb => {
                    let db_size = read_length(&mut self.cursor)? as u64;
                    let expires_size = read_length(&mut self.cursor)? as u64;
                    trace!("Resize hint: {} keys, {} expires", db_size, expires_size);
                    if let Some(db) = state.current_database {
                        if self.filter.matches_database(db) {
                            notify(
                                offset,
                                None,
                                listener.resize_database(db, db_size, expires_size),
                            )?;
                        }
                    }
                }
                Opcode::ExpireTimeMs => {
                    let millis = self.cursor.read_u64_le("expiry in milliseconds")?;
                    state.pending_expiry = Some(ExpiryTime::from_millis(millis));
                }
                Opcode::ExpireTime => {
                    let secs = self.cursor.read_u32_le("expiry in seconds")?;
                    state.pending_expiry = Some(ExpiryTime::from_secs(secs));
                }
                Opcode::Aux => {
                    let key = read_string(&mut self.cursor).context("Reading aux field")?;
                    let value = read_string(&mut self.cursor).context("Reading aux field")?;
                    debug!(
                        "Aux field {} = {}",
                        String::from_utf8_lossy(&key),
                        String::from_utf8_lossy(&value)
                    );
                }
            }
            return Ok(Phase::TopLevel { version, state });
        }

        let value_type = ValueType::try_from(byte).map_err(|_| RdbError::UnknownOpcode {
            opcode: byte,
            offset: Some(offset),
            key: None,
        })?;
        let state = self.read_entry(value_type, state, offset, listener)?;
        Ok(Phase::TopLevel { version, state })
    }

    fn read_entry<L: RdbListener>(
        &mut self,
        value_type: ValueType,
        mut state: ParserState,
        offset: u64,
        listener: &mut L,
    ) -> RdbResult<ParserState> {
        let db = match state.current_database {
            Some(db) => db,
            None => {
                state = self.switch_database(state, 0, listener)?;
                0
            }
        };
        let expiry = state.pending_expiry.take();

        let key = read_string(&mut self.cursor).context("Reading key")?;
        let kind = value_type.kind();

        if !self.filter.matches_database(db) || !self.filter.matches_entry(&key, kind) {
            skip_value(&mut self.cursor, value_type).map_err(|e| with_key(e, &key))?;
            self.stats.keys_skipped += 1;
            trace!("Skipped {} key {}", kind, String::from_utf8_lossy(&key));
            return Ok(state);
        }

        let decoded = decode_value(&mut self.cursor, value_type).map_err(|e| with_key(e, &key))?;
        trace!(
            "Decoded {} key {} from {:?} ({} elements)",
            decoded.value.kind(),
            String::from_utf8_lossy(&key),
            value_type,
            decoded.declared_len
        );
        emit(offset, &key, decoded, expiry, listener)?;

        self.stats.keys_parsed += 1;
        if expiry.is_some() {
            self.stats.expiring_keys += 1;
        }
        Ok(state)
    }

    fn switch_database<L: RdbListener>(
        &mut self,
        state: ParserState,
        index: u64,
        listener: &mut L,
    ) -> RdbResult<ParserState> {
        let state = self.close_database(state, listener)?;
        self.stats.databases += 1;
        debug!("Selecting database {}", index);
        if self.filter.matches_database(index) {
            notify(self.cursor.offset(), None, listener.begin_database(index))?;
        }
        Ok(ParserState {
            current_database: Some(index),
            ..state
        })
    }

    fn close_database<L: RdbListener>(
        &mut self,
        state: ParserState,
        listener: &mut L,
    ) -> RdbResult<ParserState> {
        if let Some(db) = state.current_database {
            if self.filter.matches_database(db) {
                notify(self.cursor.offset(), None, listener.end_database(db))?;
            }
        }
        Ok(ParserState {
            current_database: None,
            ..state
        })
    }

    fn finish<L: RdbListener>(
        &mut self,
        version: u32,
        state: ParserState,
        listener: &mut L,
    ) -> RdbResult<()> {
        self.close_database(state, listener)?;

        if version >= CHECKSUM_MIN_VERSION {
            let offset = self.cursor.offset();
            let tail = self.cursor.read_up_to(CHECKSUM_LEN as u64)?;
            match tail.len() {
                0 => debug!("Snapshot has no checksum"),
                CHECKSUM_LEN => {
                    let mut checksum = [0u8; CHECKSUM_LEN];
                    checksum.copy_from_slice(&tail);
                    self.stats.checksum = Some(checksum);
                }
                got => {
                    return Err(RdbError::TruncatedInput {
                        context: "reading checksum".to_string(),
                        offset: Some(offset),
                        key: None,
                        expected_bytes: Some(CHECKSUM_LEN as u64),
                        got_bytes: Some(got as u64),
                    }
                    .into())
                }
            }
        }

        notify(self.cursor.offset(), None, listener.end())
    }
}

/// Разбирает файл снапшота с настройками по умолчанию.
pub fn parse_file<P, L>(
    path: P,
    listener: &mut L,
) -> RdbResult<ParseStats>
where
    P: AsRef<Path>,
    L: RdbListener,
{
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Opening {}", path.display()))?;
    RdbParser::new(file).parse(listener)
}

/// Передаёт слушателю одну декодированную запись.
fn emit<L: RdbListener>(
    offset: u64,
    key: &[u8],
    decoded: DecodedValue,
    expiry: Option<ExpiryTime>,
    listener: &mut L,
) -> RdbResult<()> {
    let DecodedValue {
        value,
        declared_len,
    } = decoded;
    let k = Some(key);

    match value {
        Value::Scalar(v) => notify(offset, k, listener.set_scalar(key, &v, expiry)),
        Value::Hash(pairs) => {
            notify(offset, k, listener.begin_hash(key, declared_len, expiry))?;
            for (field, value) in &pairs {
                notify(offset, k, listener.hash_field(key, field, value))?;
            }
            notify(offset, k, listener.end_hash(key))
        }
        Value::Set(members) => {
            notify(offset, k, listener.begin_set(key, declared_len, expiry))?;
            for member in &members {
                notify(offset, k, listener.set_member(key, member))?;
            }
            notify(offset, k, listener.end_set(key))
        }
        Value::List(items) => {
            notify(offset, k, listener.begin_list(key, declared_len, expiry))?;
            for item in &items {
                notify(offset, k, listener.list_item(key, item))?;
            }
            notify(offset, k, listener.end_list(key))
        }
        Value::SortedSet(members) => {
            notify(offset, k, listener.begin_sorted_set(key, declared_len, expiry))?;
            for (member, score) in &members {
                notify(offset, k, listener.sorted_set_member(key, member, *score))?;
            }
            notify(offset, k, listener.end_sorted_set(key))
        }
    }
}

/// Превращает ошибку слушателя в `ListenerAborted` со смещением записи.
fn notify(
    offset: u64,
    key: Option<&[u8]>,
    result: RdbResult<()>,
) -> RdbResult<()> {
    result.map_err(|err| {
        let key = key.map(|k| String::from_utf8_lossy(k).into_owned());
        warn!(
            "Listener aborted parsing at byte {} (key: {:?}): {}",
            offset, key, err
        );
        if let Some(RdbError::ListenerAborted { .. }) = err.downcast_ref::<RdbError>() {
            return err;
        }
        StackError::new(RdbError::ListenerAborted {
            reason: err.to_string(),
            offset: Some(offset),
            key,
        })
    })
}

/// Пишет причину остановки с уровнем, который задаёт код ошибки.
fn log_failure(
    err: &StackError,
    bytes_read: u64,
) {
    let hint = err
        .downcast_ref::<RdbError>()
        .and_then(RdbError::recovery_hint)
        .unwrap_or("");
    match err.log_level() {
        LogLevel::Debug => debug!("Snapshot parsing stopped at byte {}: {}", bytes_read, err),
        LogLevel::Info => info!("Snapshot parsing rejected: {}", err),
        LogLevel::Warn => warn!("Snapshot parsing failed at byte {}: {} {}", bytes_read, err, hint),
        LogLevel::Error => error!("Corrupted snapshot at byte {}: {} {}", bytes_read, err, hint),
    }
}

/// Прикрепляет ключ к ошибке декодирования значения.
fn with_key(
    err: StackError,
    key: &[u8],
) -> StackError {
    let name = String::from_utf8_lossy(key).into_owned();
    let err = match err.downcast_ref::<RdbError>() {
        Some(rdb) if rdb.key().is_none() => StackError::new(rdb.clone().with_key(name.clone())),
        _ => err,
    };
    err.context(format!("Decoding value of key '{name}'"))
}
