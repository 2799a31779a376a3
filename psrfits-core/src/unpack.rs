//! Распаковка сырых данных строки SUBINT в одно значение на байт.
//!
//! Раскладка 8-битных данных — `[nsblk, npol, nchan]`, канал меняется
//! быстрее всего. Для 1 бита байты образуют массив `[nsblk/8, npol, nchan]`,
//! а биты идут вдоль оси времени. Для 2 и 4 бит значения упакованы подряд
//! в порядке каналов. Везде первым идёт старший бит.

/// Размерности одной строки.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowDims {
    pub nsblk: usize,
    pub npol: usize,
    pub nchan: usize,
}

/// Распакованные значения строки, индекс `(isamp * npol + ipol) * nchan + ichan`.
#[derive(Debug, Clone, Copy)]
pub enum RowSamples<'a> {
    /// Одно значение на байт (исходно 1, 2, 4 или 8 бит)
    Bytes(&'a [u8]),
    /// 16-битные отсчёты
    Int16(&'a [i16]),
}

impl RowDims {
    pub fn values(&self) -> usize {
        self.nsblk * self.npol * self.nchan
    }

    #[inline]
    pub fn index(
        &self,
        isamp: usize,
        ipol: usize,
    ) -> usize {
        (isamp * self.npol + ipol) * self.nchan
    }
}

impl RowSamples<'_> {
    /// Значение с индексом `idx`; `signed` выбирает трактовку байта как `i8`.
    #[inline]
    pub fn value(
        &self,
        idx: usize,
        signed: bool,
    ) -> f64 {
        match self {
            RowSamples::Bytes(b) if signed => f64::from(b[idx] as i8),
            RowSamples::Bytes(b) => f64::from(b[idx]),
            RowSamples::Int16(v) => f64::from(v[idx]),
        }
    }
}

/// Распаковывает биты, старший бит первым.
///
/// ```
/// use psrfits_core::unpack::unpack_bits;
/// assert_eq!(unpack_bits(&[0b1011_0000]), vec![1, 0, 1, 1, 0, 0, 0, 0]);
/// ```
pub fn unpack_bits(packed: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(packed.len() * 8);
    unpack_msb_first(packed, 1, packed.len() * 8, &mut out);
    out
}

/// Распаковывает `count` полей по `nbits` бит (1, 2 или 4), старшие первыми.
pub fn unpack_msb_first(
    packed: &[u8],
    nbits: u32,
    count: usize,
    out: &mut Vec<u8>,
) {
    let per_byte = (8 / nbits) as usize;
    let mask = ((1u16 << nbits) - 1) as u8;

    out.clear();
    out.reserve(count);

    'bytes: for &byte in packed {
        for k in 0..per_byte {
            if out.len() == count {
                break 'bytes;
            }
            let shift = 8 - nbits as usize * (k + 1);
            out.push((byte >> shift) & mask);
        }
    }
}

/// 1-битные данные: биты каждого байта `[s8, ipol, ichan]` — это выборки
/// `s8*8 .. s8*8+8` одного канала.
pub fn unpack_1bit_samples(
    packed: &[u8],
    dims: RowDims,
    out: &mut Vec<u8>,
) {
    let RowDims { nsblk, npol, nchan } = dims;
    let lane = npol * nchan;

    out.clear();
    out.resize(dims.values(), 0);

    for (i, &byte) in packed.iter().enumerate() {
        let s8 = i / lane;
        let within = i % lane;

        for k in 0..8 {
            let isamp = s8 * 8 + k;
            if isamp >= nsblk {
                break;
            }
            out[isamp * lane + within] = (byte >> (7 - k)) & 1;
        }
    }
}
