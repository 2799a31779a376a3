use serde::{Deserialize, Serialize};

use crate::PolScheme;

/// Значение OBS_MODE, при котором файл содержит поисковые данные.
pub const SEARCH_MODE: &str = "SEARCH";

/// Основной заголовок PSRFITS файла (primary HDU).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileHeader {
    /// Имя источника или скана (SRC_NAME)
    pub source_name: String,
    /// Прямое восхождение, hh:mm:ss.ssss
    pub ra: String,
    /// Склонение, -dd:mm:ss.sss
    pub dec: String,
    /// Режим наблюдения (OBS_MODE), проверяется только при декодировании
    pub obs_mode: Option<String>,
}

/// Заголовок таблицы SUBINT.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubintHeader {
    /// Количество строк в таблице (NAXIS2)
    pub nrows: usize,
    /// Бит на выборку (NBITS); проверяется при декодировании
    pub nbits: u32,
    /// Количество частотных каналов (NCHAN)
    pub nchan: usize,
    /// Количество поляризаций (NPOL)
    pub npol: usize,
    /// Идентификатор поляризаций (POL_TYPE)
    pub pol_type: String,
    /// Выборок в одной строке (NSBLK)
    pub nsblk: usize,
    /// Время на выборку, секунды (TBIN)
    pub tbin: f64,
    /// Знаковость поляризаций, вычисляется из POL_TYPE
    pub pol_scheme: PolScheme,
}

impl FileHeader {
    /// `true`, если OBS_MODE присутствует и равен SEARCH.
    pub fn is_search_mode(&self) -> bool {
        self.obs_mode
            .as_deref()
            .is_some_and(|m| m.trim() == SEARCH_MODE)
    }
}

impl SubintHeader {
    /// Длительность одной строки в секундах.
    pub fn row_duration(&self) -> f64 {
        self.tbin * self.nsblk as f64
    }

    /// Общее количество выборок во всём файле.
    pub fn total_samples(&self) -> usize {
        self.nrows * self.nsblk
    }
}
