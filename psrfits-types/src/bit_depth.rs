use serde::{Deserialize, Serialize};

use crate::{DecodeError, DecodeResult};

/// Разрядность сырых выборок (поле NBITS таблицы SUBINT).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum BitDepth {
    /// 1 бит, упаковка вдоль оси времени (старший бит первый)
    One = 1,
    /// 2 бита, упаковка вдоль оси каналов
    Two = 2,
    /// 4 бита, упаковка вдоль оси каналов
    Four = 4,
    /// 8 бит, одна выборка на байт
    Eight = 8,
    /// 16 бит, little-endian `i16`
    Sixteen = 16,
}

impl BitDepth {
    pub fn from_nbits(nbits: u32) -> DecodeResult<Self> {
        match nbits {
            1 => Ok(BitDepth::One),
            2 => Ok(BitDepth::Two),
            4 => Ok(BitDepth::Four),
            8 => Ok(BitDepth::Eight),
            16 => Ok(BitDepth::Sixteen),
            other => Err(DecodeError::UnsupportedBitDepth(other)),
        }
    }

    pub fn bits(&self) -> u32 {
        *self as u32
    }

    /// Несколько выборок в одном байте.
    pub fn is_packed(&self) -> bool {
        matches!(self, BitDepth::One | BitDepth::Two | BitDepth::Four)
    }

    /// Ожидаемый размер упакованных данных одной строки в байтах.
    pub fn row_bytes(
        &self,
        nsblk: usize,
        npol: usize,
        nchan: usize,
    ) -> usize {
        match self {
            BitDepth::One => nsblk.div_ceil(8) * npol * nchan,
            BitDepth::Two | BitDepth::Four => {
                (nsblk * npol * nchan * self.bits() as usize).div_ceil(8)
            }
            BitDepth::Eight => nsblk * npol * nchan,
            BitDepth::Sixteen => nsblk * npol * nchan * 2,
        }
    }
}

impl std::fmt::Display for BitDepth {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}
