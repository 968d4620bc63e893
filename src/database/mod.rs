//! Декодеры компактных контейнеров: zipmap, ziplist и intset.
//!
//! Каждый принимает один блоб целиком и возвращает упорядоченный список
//! элементов. Смещения в ошибках отсчитываются от начала блоба; вызывающий
//! код переводит их в абсолютные через [`RdbError::rebase`].

pub mod intset;
pub mod ziplist;
pub mod zipmap;

pub use intset::*;
pub use ziplist::*;
pub use zipmap::*;

use rdb_error::{ContainerKind, RdbError};

/// Курсор по срезу байт одного контейнера.
///
/// Любой выход за границу блоба превращается в `MalformedContainer` нужного
/// вида.
pub(crate) struct BlobReader<'a> {
    data: &'a [u8],
    pos: usize,
    kind: ContainerKind,
}

impl<'a> BlobReader<'a> {
    pub(crate) fn new(
        data: &'a [u8],
        kind: ContainerKind,
    ) -> Self {
        Self { data, pos: 0, kind }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Ошибка контейнера на текущей позиции.
    pub(crate) fn error(
        &self,
        reason: impl Into<String>,
    ) -> RdbError {
        self.error_at(reason, self.pos)
    }

    pub(crate) fn error_at(
        &self,
        reason: impl Into<String>,
        pos: usize,
    ) -> RdbError {
        RdbError::container(self.kind, reason, pos as u64)
    }

    pub(crate) fn take(
        &mut self,
        len: usize,
        what: &str,
    ) -> Result<&'a [u8], RdbError> {
        if len > self.remaining() {
            return Err(self.error(format!(
                "{what} needs {len} bytes, {} left",
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(
        &mut self,
        what: &str,
    ) -> Result<[u8; N], RdbError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N, what)?);
        Ok(buf)
    }

    pub(crate) fn u8(
        &mut self,
        what: &str,
    ) -> Result<u8, RdbError> {
        Ok(self.array::<1>(what)?[0])
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }
}
