use serde::{Deserialize, Serialize};

/// Подстрока POL_TYPE, означающая две автокорреляции (AABB, AABBCRCI...).
pub const AUTO_CORRELATION_MARKER: &str = "AABB";

/// Какие поляризации хранятся беззнаковыми.
///
/// Первые [`PolScheme::unsigned_count`] поляризаций — мощности (беззнаковые),
/// остальные — кросс-произведения со знаком.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PolScheme {
    /// Две беззнаковые автокорреляции, затем знаковые кросс-члены
    UnsignedPair,
    /// Одна беззнаковая поляризация (полная интенсивность)
    SingleUnsigned,
}

impl PolScheme {
    pub fn from_pol_type(pol_type: &str) -> Self {
        if pol_type.contains(AUTO_CORRELATION_MARKER) {
            PolScheme::UnsignedPair
        } else {
            PolScheme::SingleUnsigned
        }
    }

    pub fn unsigned_count(&self) -> usize {
        match self {
            PolScheme::UnsignedPair => 2,
            PolScheme::SingleUnsigned => 1,
        }
    }

    pub fn is_signed(
        &self,
        ipol: usize,
    ) -> bool {
        ipol >= self.unsigned_count()
    }
}
