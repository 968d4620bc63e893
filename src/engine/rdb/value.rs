//! Декодер значений по тегу типа.
//!
//! Значение читается целиком (одна запись за раз) и возвращается в
//! нейтральном к кодировке виде вместе с объявленным числом элементов.

use std::io::Read;

use rdb_error::{ContainerKind, RdbError, RdbResult, StackError};

use super::{
    cursor::ByteCursor,
    length::read_length,
    string::{read_binary_double, read_double, read_string, skip_string},
    tags::{ValueKind, ValueType},
};
use crate::database::{decode_intset, decode_ziplist, decode_zipmap, ZiplistEntry};

/// Верхняя граница предварительного резервирования под элементы.
const PREALLOC_LIMIT: usize = 4096;

/// Значение ключа, не зависящее от кодировки на диске.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Vec<u8>),
    Hash(Vec<(Vec<u8>, Vec<u8>)>),
    Set(Vec<Vec<u8>>),
    List(Vec<Vec<u8>>),
    SortedSet(Vec<(Vec<u8>, f64)>),
}

/// Результат декодирования: значение и объявленное число элементов.
///
/// Для обычных кодировок `declared_len` — это счётчик из потока, для
/// компактных — число элементов (или пар), найденных в блобе.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedValue {
    pub value: Value,
    pub declared_len: u64,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Scalar(_) => ValueKind::String,
            Self::Hash(_) => ValueKind::Hash,
            Self::Set(_) => ValueKind::Set,
            Self::List(_) => ValueKind::List,
            Self::SortedSet(_) => ValueKind::SortedSet,
        }
    }

    /// Число элементов (для скаляра — 1).
    pub fn len(&self) -> usize {
        match self {
            Self::Scalar(_) => 1,
            Self::Hash(v) => v.len(),
            Self::Set(v) | Self::List(v) => v.len(),
            Self::SortedSet(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DecodedValue {
    fn counted(value: Value) -> Self {
        let declared_len = value.len() as u64;
        Self {
            value,
            declared_len,
        }
    }
}

/// Читает значение указанного типа.
///
/// # Аргументы
///
/// * `cursor` — курсор, стоящий сразу после ключа.
/// * `value_type` — тег типа, прочитанный перед ключом.
pub fn decode_value<R: Read>(
    cursor: &mut ByteCursor<R>,
    value_type: ValueType,
) -> RdbResult<DecodedValue> {
    let decoded = match value_type {
        ValueType::String => DecodedValue {
            value: Value::Scalar(read_string(cursor)?),
            declared_len: 1,
        },
        ValueType::List => {
            let (count, items) = read_string_seq(cursor)?;
            DecodedValue {
                value: Value::List(items),
                declared_len: count,
            }
        }
        ValueType::Set => {
            let (count, items) = read_string_seq(cursor)?;
            DecodedValue {
                value: Value::Set(items),
                declared_len: count,
            }
        }
        ValueType::Hash => {
            let count = read_length(cursor)? as u64;
            let mut pairs = Vec::with_capacity(prealloc(count));
            for _ in 0..count {
                let field = read_string(cursor)?;
                let value = read_string(cursor)?;
                pairs.push((field, value));
            }
            DecodedValue {
                value: Value::Hash(pairs),
                declared_len: count,
            }
        }
        ValueType::SortedSet | ValueType::SortedSet2 => {
            let binary = value_type == ValueType::SortedSet2;
            let count = read_length(cursor)? as u64;
            let mut members = Vec::with_capacity(prealloc(count));
            for _ in 0..count {
                let member = read_string(cursor)?;
                let score = if binary {
                    read_binary_double(cursor)?
                } else {
                    read_double(cursor)?
                };
                members.push((member, score));
            }
            DecodedValue {
                value: Value::SortedSet(members),
                declared_len: count,
            }
        }
        ValueType::HashZipmap => {
            let (start, blob) = read_blob(cursor)?;
            let pairs = decode_zipmap(&blob).map_err(|e| at_blob(e, start))?;
            DecodedValue::counted(Value::Hash(pairs))
        }
        ValueType::ListZiplist => {
            let (start, blob) = read_blob(cursor)?;
            let entries = decode_ziplist(&blob).map_err(|e| at_blob(e, start))?;
            DecodedValue::counted(Value::List(
                entries.into_iter().map(ZiplistEntry::into_bytes).collect(),
            ))
        }
        ValueType::SetIntset => {
            let (start, blob) = read_blob(cursor)?;
            let ints = decode_intset(&blob).map_err(|e| at_blob(e, start))?;
            DecodedValue::counted(Value::Set(
                ints.into_iter()
                    .map(|i| i.to_string().into_bytes())
                    .collect(),
            ))
        }
        ValueType::SortedSetZiplist => {
            let (start, blob) = read_blob(cursor)?;
            let entries = decode_ziplist(&blob).map_err(|e| at_blob(e, start))?;
            let members = pair_up(entries, start, |member, score| {
                let score = score.to_f64().ok_or("score is not a number")?;
                Ok((member.into_bytes(), score))
            })?;
            DecodedValue::counted(Value::SortedSet(members))
        }
        ValueType::HashZiplist => {
            let (start, blob) = read_blob(cursor)?;
            let entries = decode_ziplist(&blob).map_err(|e| at_blob(e, start))?;
            let pairs = pair_up(entries, start, |field, value| {
                Ok((field.into_bytes(), value.into_bytes()))
            })?;
            DecodedValue::counted(Value::Hash(pairs))
        }
        ValueType::ListQuicklist => {
            let nodes = read_length(cursor)?;
            let mut items = Vec::new();
            for _ in 0..nodes {
                let (start, blob) = read_blob(cursor)?;
                let entries = decode_ziplist(&blob).map_err(|e| at_blob(e, start))?;
                items.extend(entries.into_iter().map(ZiplistEntry::into_bytes));
            }
            DecodedValue::counted(Value::List(items))
        }
    };
    Ok(decoded)
}

/// Пропускает значение, не материализуя его.
pub fn skip_value<R: Read>(
    cursor: &mut ByteCursor<R>,
    value_type: ValueType,
) -> RdbResult<()> {
    match value_type {
        ValueType::String
        | ValueType::HashZipmap
        | ValueType::ListZiplist
        | ValueType::SetIntset
        | ValueType::SortedSetZiplist
        | ValueType::HashZiplist => skip_string(cursor),
        ValueType::List | ValueType::Set | ValueType::ListQuicklist => {
            let count = read_length(cursor)?;
            for _ in 0..count {
                skip_string(cursor)?;
            }
            Ok(())
        }
        ValueType::Hash => {
            let count = read_length(cursor)? as u64;
            for _ in 0..count * 2 {
                skip_string(cursor)?;
            }
            Ok(())
        }
        ValueType::SortedSet => {
            let count = read_length(cursor)?;
            for _ in 0..count {
                skip_string(cursor)?;
                let len = cursor.read_u8("double length")?;
                if len < 253 {
                    cursor.skip(len as u64, "double text")?;
                }
            }
            Ok(())
        }
        ValueType::SortedSet2 => {
            let count = read_length(cursor)?;
            for _ in 0..count {
                skip_string(cursor)?;
                cursor.skip(8, "binary double")?;
            }
            Ok(())
        }
    }
}

fn prealloc(count: u64) -> usize {
    count.min(PREALLOC_LIMIT as u64) as usize
}

fn read_string_seq<R: Read>(cursor: &mut ByteCursor<R>) -> RdbResult<(u64, Vec<Vec<u8>>)> {
    let count = read_length(cursor)? as u64;
    let mut items = Vec::with_capacity(prealloc(count));
    for _ in 0..count {
        items.push(read_string(cursor)?);
    }
    Ok((count, items))
}

/// Читает блоб компактного контейнера вместе со смещением его начала.
fn read_blob<R: Read>(cursor: &mut ByteCursor<R>) -> RdbResult<(u64, Vec<u8>)> {
    let start = cursor.offset();
    let blob = read_string(cursor)?;
    Ok((start, blob))
}

fn at_blob(
    err: RdbError,
    start: u64,
) -> StackError {
    err.rebase(start).into()
}

/// Разбивает записи ziplist на пары (чётная, нечётная).
fn pair_up<T, F>(
    entries: Vec<ZiplistEntry>,
    start: u64,
    mut make: F,
) -> RdbResult<Vec<T>>
where
    F: FnMut(ZiplistEntry, ZiplistEntry) -> Result<T, &'static str>,
{
    if entries.len() % 2 != 0 {
        return Err(at_blob(
            RdbError::container(
                ContainerKind::Ziplist,
                format!("odd number of entries ({}) for a paired value", entries.len()),
                0,
            ),
            start,
        ));
    }

    let mut out = Vec::with_capacity(entries.len() / 2);
    let mut iter = entries.into_iter();
    while let (Some(a), Some(b)) = (iter.next(), iter.next()) {
        let pair = make(a, b).map_err(|reason| {
            at_blob(RdbError::container(ContainerKind::Ziplist, reason, 0), start)
        })?;
        out.push(pair);
    }
    Ok(out)
}
