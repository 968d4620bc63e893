//! Последовательный курсор по входному потоку снапшота.
//!
//! Единственная точка ввода-вывода декодера: все чтения идут через него, а
//! он ведёт счётчик смещения, который попадает в каждую ошибку.

use std::io::{self, BufReader, Read};

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use rdb_error::{RdbError, RdbResult};

/// Размер буфера чтения по умолчанию.
pub const DEFAULT_BUFFER_CAPACITY: usize = 64 * 1024;
/// Максимальная длина одной строки по умолчанию (512 МБ).
pub const DEFAULT_MAX_STRING_LEN: u64 = 512 * 1024 * 1024;

/// Буферизованный reader с учётом позиции.
pub struct ByteCursor<R: Read> {
    reader: BufReader<R>,
    offset: u64,
    max_string_len: u64,
}

impl<R: Read> ByteCursor<R> {
    /// Создаёт курсор с настройками по умолчанию.
    pub fn new(reader: R) -> Self {
        Self::with_limits(reader, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_STRING_LEN)
    }

    /// Создаёт курсор с явным размером буфера и лимитом длины строки.
    pub fn with_limits(
        reader: R,
        buffer_capacity: usize,
        max_string_len: u64,
    ) -> Self {
        Self {
            reader: BufReader::with_capacity(buffer_capacity.max(1), reader),
            offset: 0,
            max_string_len,
        }
    }

    /// Текущее смещение от начала потока.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Лимит длины одной строки.
    pub fn max_string_len(&self) -> u64 {
        self.max_string_len
    }

    /// Потребляет курсор и возвращает исходный reader.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }

    /// Читает один байт; `None` означает чистый конец потока.
    pub fn try_read_u8(&mut self) -> RdbResult<Option<u8>> {
        let mut buf = [0u8; 1];
        loop {
            match self.reader.read(&mut buf) {
                Ok(0) => return Ok(None),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(Some(buf[0]));
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Читает ровно `N` байт.
    pub fn read_array<const N: usize>(
        &mut self,
        context: &str,
    ) -> RdbResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.fill(&mut buf, context)?;
        Ok(buf)
    }

    pub fn read_u8(
        &mut self,
        context: &str,
    ) -> RdbResult<u8> {
        Ok(self.read_array::<1>(context)?[0])
    }

    pub fn read_u32_be(
        &mut self,
        context: &str,
    ) -> RdbResult<u32> {
        Ok(BigEndian::read_u32(&self.read_array::<4>(context)?))
    }

    pub fn read_u32_le(
        &mut self,
        context: &str,
    ) -> RdbResult<u32> {
        Ok(LittleEndian::read_u32(&self.read_array::<4>(context)?))
    }

    pub fn read_u64_le(
        &mut self,
        context: &str,
    ) -> RdbResult<u64> {
        Ok(LittleEndian::read_u64(&self.read_array::<8>(context)?))
    }

    pub fn read_i8(
        &mut self,
        context: &str,
    ) -> RdbResult<i8> {
        Ok(self.read_u8(context)? as i8)
    }

    pub fn read_i16_le(
        &mut self,
        context: &str,
    ) -> RdbResult<i16> {
        Ok(LittleEndian::read_i16(&self.read_array::<2>(context)?))
    }

    pub fn read_i32_le(
        &mut self,
        context: &str,
    ) -> RdbResult<i32> {
        Ok(LittleEndian::read_i32(&self.read_array::<4>(context)?))
    }

    pub fn read_f64_le(
        &mut self,
        context: &str,
    ) -> RdbResult<f64> {
        Ok(LittleEndian::read_f64(&self.read_array::<8>(context)?))
    }

    /// Читает `len` байт в новый буфер.
    ///
    /// Длины больше `max_string_len` отвергаются до выделения памяти.
    pub fn read_bytes(
        &mut self,
        len: u64,
        context: &str,
    ) -> RdbResult<Vec<u8>> {
        self.check_len(len, context)?;
        let start = self.offset;
        let mut buf = Vec::new();
        let got = (&mut self.reader).take(len).read_to_end(&mut buf)? as u64;
        self.offset += got;
        if got < len {
            return Err(truncated(context, start, len, got).into());
        }
        Ok(buf)
    }

    /// Пропускает `len` байт без сохранения.
    pub fn skip(
        &mut self,
        len: u64,
        context: &str,
    ) -> RdbResult<()> {
        let start = self.offset;
        let got = io::copy(&mut (&mut self.reader).take(len), &mut io::sink())?;
        self.offset += got;
        if got < len {
            return Err(truncated(context, start, len, got).into());
        }
        Ok(())
    }

    /// Читает не более `max` байт (меньше — только у конца потока).
    pub fn read_up_to(
        &mut self,
        max: u64,
    ) -> RdbResult<Vec<u8>> {
        let mut buf = Vec::new();
        let got = (&mut self.reader).take(max).read_to_end(&mut buf)? as u64;
        self.offset += got;
        Ok(buf)
    }

    fn check_len(
        &self,
        len: u64,
        context: &str,
    ) -> RdbResult<()> {
        if len > self.max_string_len {
            return Err(RdbError::MalformedLength {
                reason: format!(
                    "{context}: length {len} exceeds limit {}",
                    self.max_string_len
                ),
                offset: Some(self.offset),
                key: None,
            }
            .into());
        }
        Ok(())
    }

    fn fill(
        &mut self,
        buf: &mut [u8],
        context: &str,
    ) -> RdbResult<()> {
        let start = self.offset;
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.offset += filled as u64;
        if filled < buf.len() {
            return Err(truncated(context, start, buf.len() as u64, filled as u64).into());
        }
        Ok(())
    }
}

fn truncated(
    context: &str,
    offset: u64,
    expected: u64,
    got: u64,
) -> RdbError {
    RdbError::TruncatedInput {
        context: context.to_string(),
        offset: Some(offset),
        key: None,
        expected_bytes: Some(expected),
        got_bytes: Some(got),
    }
}
