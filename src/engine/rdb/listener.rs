//! Контракт слушателя событий разбора.
//!
//! Парсер вызывает методы [`RdbListener`] строго в порядке данных в файле:
//!
//! ```text
//! begin(version)
//!   begin_database(0)
//!     resize_database(0, ..)           (если есть подсказка)
//!     set_scalar(key, value, expiry)
//!     begin_hash(key, n, expiry)
//!       hash_field(key, field, value)  x n
//!     end_hash(key)
//!   end_database(0)
//! end()
//! ```
//!
//! Пары begin/end всегда сбалансированы, а между ними происходит ровно
//! `declared_len` вызовов для элементов. Ключи и значения заимствуются только
//! на время вызова.
//!
//! Ошибка из любого метода немедленно останавливает разбор; парсер вернёт
//! `RdbError::ListenerAborted` с сообщением слушателя и смещением в файле.

use rdb_error::RdbResult;

use super::expiry::ExpiryTime;

/// Получатель событий разбора снапшота.
///
/// Все методы по умолчанию ничего не делают, поэтому реализация может
/// переопределить только интересующие её события.
#[allow(unused_variables)]
pub trait RdbListener {
    /// Начало файла; `version` — версия формата из заголовка.
    fn begin(
        &mut self,
        version: u32,
    ) -> RdbResult<()> {
        Ok(())
    }

    /// Конец файла. После него вызовов больше не будет.
    fn end(&mut self) -> RdbResult<()> {
        Ok(())
    }

    fn begin_database(
        &mut self,
        index: u64,
    ) -> RdbResult<()> {
        Ok(())
    }

    fn end_database(
        &mut self,
        index: u64,
    ) -> RdbResult<()> {
        Ok(())
    }

    /// Подсказка о размере базы. Парсер её не проверяет.
    fn resize_database(
        &mut self,
        index: u64,
        db_size: u64,
        expires_size: u64,
    ) -> RdbResult<()> {
        Ok(())
    }

    /// Строковое значение целиком.
    fn set_scalar(
        &mut self,
        key: &[u8],
        value: &[u8],
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        Ok(())
    }

    fn begin_hash(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        Ok(())
    }

    fn hash_field(
        &mut self,
        key: &[u8],
        field: &[u8],
        value: &[u8],
    ) -> RdbResult<()> {
        Ok(())
    }

    fn end_hash(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        Ok(())
    }

    fn begin_set(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        Ok(())
    }

    fn set_member(
        &mut self,
        key: &[u8],
        member: &[u8],
    ) -> RdbResult<()> {
        Ok(())
    }

    fn end_set(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        Ok(())
    }

    fn begin_list(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        Ok(())
    }

    fn list_item(
        &mut self,
        key: &[u8],
        item: &[u8],
    ) -> RdbResult<()> {
        Ok(())
    }

    fn end_list(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        Ok(())
    }

    fn begin_sorted_set(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        Ok(())
    }

    fn sorted_set_member(
        &mut self,
        key: &[u8],
        member: &[u8],
        score: f64,
    ) -> RdbResult<()> {
        Ok(())
    }

    fn end_sorted_set(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        Ok(())
    }
}

/// Слушатель, который ничего не делает. Полезен для проверки целостности
/// файла и сбора [`ParseStats`](super::ParseStats).
#[derive(Debug, Default, Clone, Copy)]
pub struct NullListener;

impl RdbListener for NullListener {}

impl<L: RdbListener + ?Sized> RdbListener for &mut L {
    fn begin(
        &mut self,
        version: u32,
    ) -> RdbResult<()> {
        (**self).begin(version)
    }

    fn end(&mut self) -> RdbResult<()> {
        (**self).end()
    }

    fn begin_database(
        &mut self,
        index: u64,
    ) -> RdbResult<()> {
        (**self).begin_database(index)
    }

    fn end_database(
        &mut self,
        index: u64,
    ) -> RdbResult<()> {
        (**self).end_database(index)
    }

    fn resize_database(
        &mut self,
        index: u64,
        db_size: u64,
        expires_size: u64,
    ) -> RdbResult<()> {
        (**self).resize_database(index, db_size, expires_size)
    }

    fn set_scalar(
        &mut self,
        key: &[u8],
        value: &[u8],
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        (**self).set_scalar(key, value, expiry)
    }

    fn begin_hash(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        (**self).begin_hash(key, declared_len, expiry)
    }

    fn hash_field(
        &mut self,
        key: &[u8],
        field: &[u8],
        value: &[u8],
    ) -> RdbResult<()> {
        (**self).hash_field(key, field, value)
    }

    fn end_hash(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        (**self).end_hash(key)
    }

    fn begin_set(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        (**self).begin_set(key, declared_len, expiry)
    }

    fn set_member(
        &mut self,
        key: &[u8],
        member: &[u8],
    ) -> RdbResult<()> {
        (**self).set_member(key, member)
    }

    fn end_set(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        (**self).end_set(key)
    }

    fn begin_list(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        (**self).begin_list(key, declared_len, expiry)
    }

    fn list_item(
        &mut self,
        key: &[u8],
        item: &[u8],
    ) -> RdbResult<()> {
        (**self).list_item(key, item)
    }

    fn end_list(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        (**self).end_list(key)
    }

    fn begin_sorted_set(
        &mut self,
        key: &[u8],
        declared_len: u64,
        expiry: Option<ExpiryTime>,
    ) -> RdbResult<()> {
        (**self).begin_sorted_set(key, declared_len, expiry)
    }

    fn sorted_set_member(
        &mut self,
        key: &[u8],
        member: &[u8],
        score: f64,
    ) -> RdbResult<()> {
        (**self).sorted_set_member(key, member, score)
    }

    fn end_sorted_set(
        &mut self,
        key: &[u8],
    ) -> RdbResult<()> {
        (**self).end_sorted_set(key)
    }
}
