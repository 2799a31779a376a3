use std::path::{Path, PathBuf};

use psrfits_types::DecodeRequest;

/// Формат выгрузки результата.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Только заголовки, без декодирования
    Header,
    /// Сырые little-endian `f32` и JSON-описание рядом
    Raw,
    /// Один JSON файл с данными и осями
    Json,
}

/// Полная конфигурация запуска.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// Входной PSRFITS файл
    pub input: PathBuf,
    /// Базовое имя выходных файлов (расширение подставляется по формату)
    pub output: PathBuf,
    pub format: OutputFormat,
    /// Параметры декодирования
    pub request: DecodeRequest,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl OutputFormat {
    /// Нужно ли декодировать строки для этого формата.
    pub fn needs_decode(&self) -> bool {
        !matches!(self, OutputFormat::Header)
    }
}

impl DumpConfig {
    /// Файл с данными: `<output>.f32` или `<output>.json`.
    pub fn data_path(&self) -> PathBuf {
        match self.format {
            OutputFormat::Raw => self.output.with_extension("f32"),
            OutputFormat::Header | OutputFormat::Json => self.output.with_extension("json"),
        }
    }

    /// JSON-описание рядом с сырыми данными.
    pub fn sidecar_path(&self) -> PathBuf {
        self.output.with_extension("json")
    }

    pub fn input(&self) -> &Path {
        &self.input
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для OutputFormat, DumpConfig
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for OutputFormat {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            OutputFormat::Header => write!(f, "header"),
            OutputFormat::Raw => write!(f, "raw"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "header" | "hdr" | "info" => Ok(OutputFormat::Header),
            "raw" | "f32" | "bin" => Ok(OutputFormat::Raw),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: '{s}'. Use: header, raw, json")),
        }
    }
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("observation.sf"),
            output: PathBuf::from("decoded"),
            format: OutputFormat::Raw,
            request: DecodeRequest::all_rows(),
        }
    }
}

/// Парсит диапазон строк `START[:END]`.
///
/// `END` включительно и может быть отрицательным (`-1` — последняя строка).
/// Без `END` берётся одна строка.
///
/// # Примеры
/// ```
/// use psrfits_dump::config::parse_row_range;
/// assert_eq!(parse_row_range("0:-1").unwrap(), (0, Some(-1)));
/// assert_eq!(parse_row_range("5").unwrap(), (5, None));
/// assert_eq!(parse_row_range("2:10").unwrap(), (2, Some(10)));
/// ```
pub fn parse_row_range(s: &str) -> Result<(usize, Option<i64>), String> {
    let s = s.trim();

    let (start, end) = match s.split_once(':') {
        Some((a, b)) => (a.trim(), Some(b.trim())),
        None => (s, None),
    };

    let start = if start.is_empty() {
        0
    } else {
        start
            .parse::<usize>()
            .map_err(|e| format!("Invalid start row '{start}': {e}"))?
    };

    let end = match end {
        None => None,
        // "3:" — до конца файла
        Some("") => Some(-1),
        Some(v) => Some(
            v.parse::<i64>()
                .map_err(|e| format!("Invalid end row '{v}': {e}"))?,
        ),
    };

    Ok((start, end))
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
