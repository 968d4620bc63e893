//! Блочный LZF-кодек для сжатых строк снапшота.
//!
//! Поток состоит из управляющих байтов. Байт `< 32` означает серию из
//! `ctrl + 1` литералов, остальные кодируют обратную ссылку на уже
//! распакованные данные: длина в трёх старших битах (7 означает «добавить
//! следующий байт») плюс 2, расстояние в младших 5 битах и следующем байте.

use rdb_error::RdbError;

/// Максимальная длина серии литералов.
const MAX_LITERAL_RUN: usize = 32;
/// Максимальное расстояние обратной ссылки (13 бит).
const MAX_OFFSET: usize = (1 << 13) - 1;
/// Максимальная длина совпадения: 7 + 255 + 2.
const MAX_MATCH: usize = 264;
const MIN_MATCH: usize = 3;
const HASH_BITS: u32 = 14;
/// Больше этого коэффициента вход расшириться не может.
const MAX_EXPANSION: usize = MAX_MATCH / 2;

/// Распаковывает LZF-блок.
///
/// # Аргументы
///
/// * `input` — сжатые байты.
/// * `expected_len` — заявленная длина распакованных данных.
///
/// # Возвращает
///
/// Распакованные данные ровно `expected_len` байт. Смещение в ошибке
/// отсчитывается от начала `input`.
pub fn decompress(
    input: &[u8],
    expected_len: usize,
) -> Result<Vec<u8>, RdbError> {
    let fail = |reason: &str, at: usize| RdbError::CompressionError {
        reason: reason.to_string(),
        offset: Some(at as u64),
        key: None,
        compressed_len: Some(input.len() as u64),
        expected_len: Some(expected_len as u64),
    };

    let mut out = Vec::with_capacity(expected_len.min(input.len().saturating_mul(MAX_EXPANSION)));
    let mut pos = 0;

    while pos < input.len() {
        let ctrl_at = pos;
        let ctrl = input[pos] as usize;
        pos += 1;

        if ctrl < MAX_LITERAL_RUN {
            let run = ctrl + 1;
            if pos + run > input.len() {
                return Err(fail("literal run past end of input", ctrl_at));
            }
            if out.len() + run > expected_len {
                return Err(fail("output overrun", ctrl_at));
            }
            out.extend_from_slice(&input[pos..pos + run]);
            pos += run;
            continue;
        }

        let mut len = ctrl >> 5;
        if len == 7 {
            let extra = *input
                .get(pos)
                .ok_or_else(|| fail("truncated back-reference", ctrl_at))?;
            len += extra as usize;
            pos += 1;
        }
        len += 2;

        let low = *input
            .get(pos)
            .ok_or_else(|| fail("truncated back-reference", ctrl_at))?;
        pos += 1;

        let distance = ((ctrl & 0x1F) << 8) + low as usize + 1;
        if distance > out.len() {
            return Err(fail("back-reference before output start", ctrl_at));
        }
        if out.len() + len > expected_len {
            return Err(fail("output overrun", ctrl_at));
        }

        // Источник может перекрываться с приёмником, копируем побайтно.
        let start = out.len() - distance;
        for i in 0..len {
            let byte = out[start + i];
            out.push(byte);
        }
    }

    if out.len() != expected_len {
        return Err(fail(
            &format!("decompressed {} bytes", out.len()),
            input.len(),
        ));
    }
    Ok(out)
}

/// Сжимает данные в LZF-формат, понятный [`decompress`].
///
/// Жадный поиск совпадений по хешу трёх байт. Используется для построения
/// тестовых снапшотов.
pub fn compress(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() + input.len() / MAX_LITERAL_RUN + 1);
    let mut table = vec![usize::MAX; 1 << HASH_BITS];
    let mut literal_start = 0;
    let mut pos = 0;

    while pos + MIN_MATCH <= input.len() {
        let slot = hash(&input[pos..pos + MIN_MATCH]);
        let candidate = table[slot];
        table[slot] = pos;

        let usable = candidate != usize::MAX
            && pos - candidate - 1 <= MAX_OFFSET
            && input[candidate..candidate + MIN_MATCH] == input[pos..pos + MIN_MATCH];
        if !usable {
            pos += 1;
            continue;
        }

        let limit = (input.len() - pos).min(MAX_MATCH);
        let mut len = MIN_MATCH;
        while len < limit && input[candidate + len] == input[pos + len] {
            len += 1;
        }

        push_literals(&mut out, &input[literal_start..pos]);

        let offset = pos - candidate - 1;
        let encoded = len - 2;
        if encoded < 7 {
            out.push(((encoded as u8) << 5) | (offset >> 8) as u8);
        } else {
            out.push((7 << 5) | (offset >> 8) as u8);
            out.push((encoded - 7) as u8);
        }
        out.push((offset & 0xFF) as u8);

        pos += len;
        literal_start = pos;
    }

    push_literals(&mut out, &input[literal_start..]);
    out
}

fn push_literals(
    out: &mut Vec<u8>,
    literals: &[u8],
) {
    for chunk in literals.chunks(MAX_LITERAL_RUN) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
}

fn hash(bytes: &[u8]) -> usize {
    let v = ((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32;
    (v.wrapping_mul(2654435761) >> (32 - HASH_BITS)) as usize
}
