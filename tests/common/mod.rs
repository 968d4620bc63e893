//! Общие помощники интеграционных тестов: сборка снапшотов в памяти и
//! слушатели, записывающие события.

#![allow(dead_code)]

use std::collections::BTreeMap;

use rdb_stream::{
    engine::rdb::lzf, ExpiryTime, RdbListener, RdbResult, StatusCode, Value, ValueKind,
};

////////////////////////////////////////////////////////////////////////////////
// Кодирование
////////////////////////////////////////////////////////////////////////////////

pub const TAG_STRING: u8 = 0;
pub const TAG_LIST: u8 = 1;
pub const TAG_SET: u8 = 2;
pub const TAG_ZSET: u8 = 3;
pub const TAG_HASH: u8 = 4;
pub const TAG_ZSET_2: u8 = 5;
pub const TAG_HASH_ZIPMAP: u8 = 9;
pub const TAG_LIST_ZIPLIST: u8 = 10;
pub const TAG_SET_INTSET: u8 = 11;
pub const TAG_ZSET_ZIPLIST: u8 = 12;
pub const TAG_HASH_ZIPLIST: u8 = 13;
pub const TAG_LIST_QUICKLIST: u8 = 14;

/// Кодирует длину в самой короткой форме.
pub fn enc_len(len: u32) -> Vec<u8> {
    if len < 1 << 6 {
        vec![len as u8]
    } else if len < 1 << 14 {
        vec![0x40 | (len >> 8) as u8, len as u8]
    } else {
        let mut out = vec![0x80];
        out.extend_from_slice(&len.to_be_bytes());
        out
    }
}

/// Строка с явной длиной.
pub fn enc_str(s: &[u8]) -> Vec<u8> {
    let mut out = enc_len(s.len() as u32);
    out.extend_from_slice(s);
    out
}

/// Строка в целочисленной кодировке; ширина выбирается по значению.
pub fn enc_int(value: i32) -> Vec<u8> {
    if let Ok(v) = i8::try_from(value) {
        vec![0xC0, v as u8]
    } else if let Ok(v) = i16::try_from(value) {
        let mut out = vec![0xC1];
        out.extend_from_slice(&v.to_le_bytes());
        out
    } else {
        let mut out = vec![0xC2];
        out.extend_from_slice(&value.to_le_bytes());
        out
    }
}

/// Строка в LZF-кодировке.
pub fn enc_lzf(raw: &[u8]) -> Vec<u8> {
    let compressed = lzf::compress(raw);
    let mut out = vec![0xC3];
    out.extend(enc_len(compressed.len() as u32));
    out.extend(enc_len(raw.len() as u32));
    out.extend(compressed);
    out
}

/// Double в текстовой кодировке.
pub fn enc_double(text: &str) -> Vec<u8> {
    let mut out = vec![text.len() as u8];
    out.extend_from_slice(text.as_bytes());
    out
}

pub fn zipmap_blob(pairs: &[(&[u8], &[u8])]) -> Vec<u8> {
    let mut out = vec![pairs.len().min(254) as u8];
    for (field, value) in pairs {
        out.extend(zipmap_len(field.len()));
        out.extend_from_slice(field);
        out.extend(zipmap_len(value.len()));
        out.push(0);
        out.extend_from_slice(value);
    }
    out.push(0xFF);
    out
}

fn zipmap_len(len: usize) -> Vec<u8> {
    if len < 254 {
        vec![len as u8]
    } else {
        let mut out = vec![254];
        out.extend_from_slice(&(len as u32).to_le_bytes());
        out
    }
}

/// Запись ziplist до кодирования.
#[derive(Debug, Clone)]
pub enum Zl {
    Str(Vec<u8>),
    Int(i64),
}

impl Zl {
    pub fn s(s: &str) -> Self {
        Self::Str(s.as_bytes().to_vec())
    }
}

pub fn ziplist_blob(entries: &[Zl]) -> Vec<u8> {
    let mut body = Vec::new();
    let mut prev_len = 0usize;
    let mut tail = 10usize;

    for entry in entries {
        tail = 10 + body.len();
        let mut raw = Vec::new();
        if prev_len < 254 {
            raw.push(prev_len as u8);
        } else {
            raw.push(254);
            raw.extend_from_slice(&(prev_len as u32).to_le_bytes());
        }
        match entry {
            Zl::Str(s) => {
                let len = s.len();
                if len < 1 << 6 {
                    raw.push(len as u8);
                } else if len < 1 << 14 {
                    raw.push(0x40 | (len >> 8) as u8);
                    raw.push(len as u8);
                } else {
                    raw.push(0x80);
                    raw.extend_from_slice(&(len as u32).to_be_bytes());
                }
                raw.extend_from_slice(s);
            }
            Zl::Int(i) => raw.extend(ziplist_int(*i)),
        }
        prev_len = raw.len();
        body.extend(raw);
    }

    let mut out = Vec::new();
    out.extend_from_slice(&((10 + body.len() + 1) as u32).to_le_bytes());
    out.extend_from_slice(&(tail as u32).to_le_bytes());
    out.extend_from_slice(&(entries.len().min(u16::MAX as usize) as u16).to_le_bytes());
    out.extend(body);
    out.push(0xFF);
    out
}

fn ziplist_int(i: i64) -> Vec<u8> {
    if (0..=12).contains(&i) {
        return vec![0xF1 + i as u8];
    }
    if let Ok(v) = i8::try_from(i) {
        return vec![0xFE, v as u8];
    }
    if let Ok(v) = i16::try_from(i) {
        let mut out = vec![0xC0];
        out.extend_from_slice(&v.to_le_bytes());
        return out;
    }
    if (-(1 << 23)..(1 << 23)).contains(&i) {
        let bytes = (i as i32).to_le_bytes();
        return vec![0xF0, bytes[0], bytes[1], bytes[2]];
    }
    if let Ok(v) = i32::try_from(i) {
        let mut out = vec![0xD0];
        out.extend_from_slice(&v.to_le_bytes());
        return out;
    }
    let mut out = vec![0xE0];
    out.extend_from_slice(&i.to_le_bytes());
    out
}

/// Intset с заданной шириной элемента (2, 4 или 8 байт).
pub fn intset_blob(
    width: u32,
    values: &[i64],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&width.to_le_bytes());
    out.extend_from_slice(&(values.len() as u32).to_le_bytes());
    for v in values {
        match width {
            2 => out.extend_from_slice(&(*v as i16).to_le_bytes()),
            4 => out.extend_from_slice(&(*v as i32).to_le_bytes()),
            _ => out.extend_from_slice(&v.to_le_bytes()),
        }
    }
    out
}

////////////////////////////////////////////////////////////////////////////////
// Сборщик снапшота
////////////////////////////////////////////////////////////////////////////////

/// Собирает снапшот по частям.
pub struct DumpBuilder {
    buf: Vec<u8>,
}

impl DumpBuilder {
    pub fn new(version: u32) -> Self {
        Self {
            buf: format!("REDIS{version:04}").into_bytes(),
        }
    }

    pub fn select_db(
        mut self,
        index: u32,
    ) -> Self {
        self.buf.push(0xFE);
        self.buf.extend(enc_len(index));
        self
    }

    pub fn resize_db(
        mut self,
        db_size: u32,
        expires_size: u32,
    ) -> Self {
        self.buf.push(0xFB);
        self.buf.extend(enc_len(db_size));
        self.buf.extend(enc_len(expires_size));
        self
    }

    pub fn aux(
        mut self,
        key: &str,
        value: &str,
    ) -> Self {
        self.buf.push(0xFA);
        self.buf.extend(enc_str(key.as_bytes()));
        self.buf.extend(enc_str(value.as_bytes()));
        self
    }

    pub fn expire_ms(
        mut self,
        millis: u64,
    ) -> Self {
        self.buf.push(0xFC);
        self.buf.extend_from_slice(&millis.to_le_bytes());
        self
    }

    pub fn expire_secs(
        mut self,
        secs: u32,
    ) -> Self {
        self.buf.push(0xFD);
        self.buf.extend_from_slice(&secs.to_le_bytes());
        self
    }

    /// Запись с ключом в обычной строковой кодировке.
    pub fn entry(
        self,
        tag: u8,
        key: &str,
        payload: &[u8],
    ) -> Self {
        self.entry_raw_key(tag, &enc_str(key.as_bytes()), payload)
    }

    /// Запись с уже закодированным ключом.
    pub fn entry_raw_key(
        mut self,
        tag: u8,
        encoded_key: &[u8],
        payload: &[u8],
    ) -> Self {
        self.buf.push(tag);
        self.buf.extend_from_slice(encoded_key);
        self.buf.extend_from_slice(payload);
        self
    }

    pub fn string(
        self,
        key: &str,
        value: &str,
    ) -> Self {
        self.entry(TAG_STRING, key, &enc_str(value.as_bytes()))
    }

    pub fn raw(
        mut self,
        bytes: &[u8],
    ) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn eof(mut self) -> Self {
        self.buf.push(0xFF);
        self
    }

    pub fn checksum(
        mut self,
        sum: [u8; 8],
    ) -> Self {
        self.buf.extend_from_slice(&sum);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.buf
    }
}

/// Полезная нагрузка несжатой коллекции строк.
pub fn string_seq(items: &[&str]) -> Vec<u8> {
    let mut out = enc_len(items.len() as u32);
    for item in items {
        out.extend(enc_str(item.as_bytes()));
    }
    out
}

/// Блоб, обёрнутый в строку.
pub fn blob(bytes: &[u8]) -> Vec<u8> {
    enc_str(bytes)
}

////////////////////////////////////////////////////////////////////////////////
// Слушатели
////////////////////////////////////////////////////////////////////////////////

fn text(b: &[u8]) -> String {
    String::from_utf8_lossy(b).into_owned()
}

/// Событие разбора в удобной для сравнения форме.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Begin(u32),
    End,
    BeginDb(u64),
    EndDb(u64),
    Resize(u64, u64, u64),
    Scalar(String, String, Option<u64>),
    BeginHash(String, u64, Option<u64>),
    HashField(String, String, String),
    EndHash(String),
    BeginSet(String, u64, Option<u64>),
    SetMember(String, String),
    EndSet(String),
    BeginList(String, u64, Option<u64>),
    ListItem(String, String),
    EndList(String),
    BeginZset(String, u64, Option<u64>),
    ZsetMember(String, String, f64),
    EndZset(String),
}

/// Записывает все события; может прервать разбор на событии с номером
/// `fail_at`.
#[derive(Debug, Default)]
pub struct RecordingListener {
    pub events: Vec<Event>,
    pub fail_at: Option<usize>,
}

impl RecordingListener {
    pub fn failing_at(index: usize) -> Self {
        Self {
            events: Vec::new(),
            fail_at: Some(index),
        }
    }

    fn push(
        &mut self,
        event: Event,
    ) -> RdbResult<()> {
        if self.fail_at == Some(self.events.len()) {
            rdb_error::bail!(StatusCode::Cancelled, "stop requested at {:?}", event);
        }
        self.events.push(event);
        Ok(())
    }
}

impl RdbListener for RecordingListener {
    fn begin(
        &mut self,
        version: u32,
    ) -> RdbResult<()> {
        self.push(Event::Begin(version))
    }

    fn end(&mut self) -> RdbResult<()> {
        self.push(Event::End)
    }

    fn begin_database(
        &mut self,
        index: u64,
    ) -> RdbResult<()> {
        self.push(Event::BeginDb(index))
    }

    fn end_database(
        &mut self,
        index: u64,
    ) -> RdbResult<()> {
        self.push(Event::EndDb(index))
    }

    fn resize_database(
        &mut self,
        index: u64,
        db_size: u64,
        expires_size: u64,
    ) -> RdbResult<()> {
        self.push(Event::Resize(index, db_size, expires_size))
    }

    fn set_scalar(
        &mut self,
        key: &[u8],
        value: &[u8],
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        self.push(Event::Scalar(text(key), text(value), expiry.map(|e| e.as_millis())))
    }

    fn begin_hash(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        self.push(Event::BeginHash(text(key), declared_len, expiry.map(|e| e.as_millis())))
    }

    fn hash_field(
        &mut self,
        key: &[u8],
        field: &[u8],
        value: &[u8],
    ) -> RdbResult<()> {
        self.push(Event::HashField(text(key), text(field), text(value)))
    }

    fn end_hash(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        self.push(Event::EndHash(text(key)))
    }

    fn begin_set(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        self.push(Event::BeginSet(text(key), declared_len, expiry.map(|e| e.as_millis())))
    }

    fn set_member(
        &mut self,
        key: &[u8],
        member: &[u8],
    ) -> RdbResult<()> {
        self.push(Event::SetMember(text(key), text(member)))
    }

    fn end_set(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        self.push(Event::EndSet(text(key)))
    }

    fn begin_list(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        self.push(Event::BeginList(text(key), declared_len, expiry.map(|e| e.as_millis())))
    }

    fn list_item(
        &mut self,
        key: &[u8],
        item: &[u8],
    ) -> RdbResult<()> {
        self.push(Event::ListItem(text(key), text(item)))
    }

    fn end_list(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        self.push(Event::EndList(text(key)))
    }

    fn begin_sorted_set(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        self.push(Event::BeginZset(text(key), declared_len, expiry.map(|e| e.as_millis())))
    }

    fn sorted_set_member(
        &mut self,
        key: &[u8],
        member: &[u8],
        score: f64,
    ) -> RdbResult<()> {
        self.push(Event::ZsetMember(text(key), text(member), score))
    }

    fn end_sorted_set(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        self.push(Event::EndZset(text(key)))
    }
}

/// Сохранённая запись: значение и срок жизни.
#[derive(Debug, Clone, PartialEq)]
pub struct Stored {
    pub value: Value,
    pub expiry: Option<u64>,
}

struct Open {
    key: Vec<u8>,
    declared_len: u64,
    value: Value,
    expiry: Option<u64>,
}

/// Собирает значения в память и проверяет баланс событий: вложенность
/// begin/end, совпадение ключей и число элементов.
#[derive(Default)]
pub struct MemoryListener {
    pub databases: BTreeMap<u64, BTreeMap<Vec<u8>, Stored>>,
    pub version: Option<u32>,
    pub ended: bool,
    current_db: Option<u64>,
    open: Option<Open>,
}

impl MemoryListener {
    pub fn get(
        &self,
        db: u64,
        key: &str,
    ) -> Option<&Stored> {
        self.databases.get(&db)?.get(key.as_bytes())
    }

    pub fn key_count(&self) -> usize {
        self.databases.values().map(BTreeMap::len).sum()
    }

    fn open(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
        value: Value,
    ) -> RdbResult<()> {
        assert!(self.open.is_none(), "nested collection at key {}", text(key));
        assert!(self.current_db.is_some(), "collection outside of a database");
        self.open = Some(Open {
            key: key.to_vec(),
            declared_len,
            value,
            expiry: expiry.map(|e| e.as_millis()),
        });
        Ok(())
    }

    fn element(
        &mut self,
        key: &[u8],
        kind: ValueKind,
        push: impl FnOnce(&mut Value),
    ) -> RdbResult<()> {
        let open = self.open.as_mut().expect("element outside of a collection");
        assert_eq!(open.key, key, "element for a different key");
        assert_eq!(open.value.kind(), kind, "element of a different kind");
        push(&mut open.value);
        Ok(())
    }

    fn close(
        &mut self,
        key: &[u8],
        kind: ValueKind,
    ) -> RdbResult<()> {
        let open = self.open.take().expect("end without begin");
        assert_eq!(open.key, key, "end for a different key");
        assert_eq!(open.value.kind(), kind, "end of a different kind");
        assert_eq!(
            open.value.len() as u64,
            open.declared_len,
            "element count differs from declared length for key {}",
            text(key)
        );
        self.store(open.key, open.value, open.expiry);
        Ok(())
    }

    fn store(
        &mut self,
        key: Vec<u8>,
        value: Value,
        expiry: Option<u64>,
    ) {
        let db = self.current_db.expect("key outside of a database");
        let name = text(&key);
        let previous = self
            .databases
            .entry(db)
            .or_default()
            .insert(key, Stored { value, expiry });
        assert!(previous.is_none(), "key {name} reported twice in database {db}");
    }
}

impl RdbListener for MemoryListener {
    fn begin(
        &mut self,
        version: u32,
    ) -> RdbResult<()> {
        assert!(self.version.is_none(), "begin called twice");
        self.version = Some(version);
        Ok(())
    }

    fn end(&mut self) -> RdbResult<()> {
        assert!(self.current_db.is_none(), "end inside a database");
        assert!(self.open.is_none(), "end inside a collection");
        self.ended = true;
        Ok(())
    }

    fn begin_database(
        &mut self,
        index: u64,
    ) -> RdbResult<()> {
        assert!(self.current_db.is_none(), "databases are not balanced");
        self.current_db = Some(index);
        self.databases.entry(index).or_default();
        Ok(())
    }

    fn end_database(
        &mut self,
        index: u64,
    ) -> RdbResult<()> {
        assert_eq!(self.current_db.take(), Some(index));
        Ok(())
    }

    fn set_scalar(
        &mut self,
        key: &[u8],
        value: &[u8],
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        assert!(self.open.is_none(), "scalar inside a collection");
        self.store(
            key.to_vec(),
            Value::Scalar(value.to_vec()),
            expiry.map(|e| e.as_millis()),
        );
        Ok(())
    }

    fn begin_hash(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        self.open(key, declared_len, expiry, Value::Hash(Vec::new()))
    }

    fn hash_field(
        &mut self,
        key: &[u8],
        field: &[u8],
        value: &[u8],
    ) -> RdbResult<()> {
        self.element(key, ValueKind::Hash, |v| {
            if let Value::Hash(pairs) = v {
                pairs.push((field.to_vec(), value.to_vec()));
            }
        })
    }

    fn end_hash(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        self.close(key, ValueKind::Hash)
    }

    fn begin_set(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        self.open(key, declared_len, expiry, Value::Set(Vec::new()))
    }

    fn set_member(
        &mut self,
        key: &[u8],
        member: &[u8],
    ) -> RdbResult<()> {
        self.element(key, ValueKind::Set, |v| {
            if let Value::Set(members) = v {
                members.push(member.to_vec());
            }
        })
    }

    fn end_set(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        self.close(key, ValueKind::Set)
    }

    fn begin_list(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        self.open(key, declared_len, expiry, Value::List(Vec::new()))
    }

    fn list_item(
        &mut self,
        key: &[u8],
        item: &[u8],
    ) -> RdbResult<()> {
        self.element(key, ValueKind::List, |v| {
            if let Value::List(items) = v {
                items.push(item.to_vec());
            }
        })
    }

    fn end_list(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        self.close(key, ValueKind::List)
    }

    fn begin_sorted_set(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        self.open(key, declared_len, expiry, Value::SortedSet(Vec::new()))
    }

    fn sorted_set_member(
        &mut self,
        key: &[u8],
        member: &[u8],
        score: f64,
    ) -> RdbResult<()> {
        self.element(key, ValueKind::SortedSet, |v| {
            if let Value::SortedSet(members) = v {
                members.push((member.to_vec(), score));
            }
        })
    }

    fn end_sorted_set(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        self.close(key, ValueKind::SortedSet)
    }
}
