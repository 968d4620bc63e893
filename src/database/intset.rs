//! Intset: отсортированное множество целых чисел фиксированной ширины.
//!
//! ```text
//! <encoding u32 LE> <length u32 LE> <value> ...
//! ```
//!
//! Ширина элемента равна `encoding` байтам (2, 4 или 8), значения знаковые,
//! little-endian.

use rdb_error::{ContainerKind, RdbError};

use super::BlobReader;

const HEADER_LEN: usize = 8;

/// Ширина элементов intset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Int16,
    Int32,
    Int64,
}

impl Encoding {
    fn from_width(width: u32) -> Option<Self> {
        match width {
            2 => Some(Self::Int16),
            4 => Some(Self::Int32),
            8 => Some(Self::Int64),
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int32 => 4,
            Self::Int64 => 8,
        }
    }

    fn read(
        self,
        r: &mut BlobReader<'_>,
    ) -> Result<i64, RdbError> {
        Ok(match self {
            Self::Int16 => i16::from_le_bytes(r.array::<2>("intset element")?) as i64,
            Self::Int32 => i32::from_le_bytes(r.array::<4>("intset element")?) as i64,
            Self::Int64 => i64::from_le_bytes(r.array::<8>("intset element")?),
        })
    }
}

/// Разбирает intset-блоб. Порядок элементов не перепроверяется.
pub fn decode_intset(blob: &[u8]) -> Result<Vec<i64>, RdbError> {
    if blob.is_empty() {
        return Ok(Vec::new());
    }

    let mut r = BlobReader::new(blob, ContainerKind::Intset);
    let width = u32::from_le_bytes(r.array::<4>("encoding")?);
    let encoding = Encoding::from_width(width)
        .ok_or_else(|| r.error_at(format!("unsupported element width {width}"), 0))?;
    let count = u32::from_le_bytes(r.array::<4>("length")?) as usize;

    let expected = count
        .checked_mul(encoding.width())
        .and_then(|body| body.checked_add(HEADER_LEN));
    if expected != Some(blob.len()) {
        return Err(r.error_at(
            format!(
                "{count} elements of {} bytes do not fit a {}-byte blob",
                encoding.width(),
                blob.len()
            ),
            4,
        ));
    }

    (0..count).map(|_| encoding.read(&mut r)).collect()
}

#[cfg(test)]
mod tests {
    use rdb_error::RdbErrorKind;

    use super::*;

    fn intset(
        width: u32,
        values: &[i64],
    ) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&width.to_le_bytes());
        out.extend_from_slice(&(values.len() as u32).to_le_bytes());
        for v in values {
            out.extend_from_slice(&v.to_le_bytes()[..width as usize]);
        }
        out
    }

    /// Тест проверяет все три ширины, включая отрицательные значения.
    #[test]
    fn test_decode_widths() {
        assert_eq!(
            decode_intset(&intset(2, &[-3, 0, 0x7FFF])).unwrap(),
            vec![-3, 0, 0x7FFF]
        );
        assert_eq!(
            decode_intset(&intset(4, &[-70000, 70000])).unwrap(),
            vec![-70000, 70000]
        );
        assert_eq!(
            decode_intset(&intset(8, &[i64::MIN, i64::MAX])).unwrap(),
            vec![i64::MIN, i64::MAX]
        );
    }

    #[test]
    fn test_empty() {
        assert!(decode_intset(&[]).unwrap().is_empty());
        assert!(decode_intset(&intset(4, &[])).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_intsets() {
        let mut short = intset(4, &[1, 2]);
        short.pop();
        let mut long = intset(2, &[1]);
        long.push(0);

        for blob in [intset(3, &[1]), short, long, vec![2, 0, 0]] {
            let err = decode_intset(&blob).unwrap_err();
            assert_eq!(err.kind(), RdbErrorKind::MalformedContainer, "blob {blob:?}");
        }
    }
}
