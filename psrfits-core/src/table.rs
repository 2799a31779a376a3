//! Интерфейс читателя таблиц, через который декодер видит файл.
//!
//! Декодер не знает о формате контейнера: ему нужны только заголовки
//! таблиц по имени и содержимое ячеек по `(таблица, колонка, строка)`.
//! [`crate::fits_reader::FitsReader`] реализует этот интерфейс поверх cfitsio,
//! [`MemoryTable`] — поверх данных в памяти.

use std::collections::BTreeMap;

use byteorder::{ByteOrder, LittleEndian};
use psrfits_types::{TableError, TableResult};

/// Имя основного HDU.
pub const PRIMARY: &str = "PRIMARY";

/// Имя таблицы субинтеграций.
pub const SUBINT: &str = "SUBINT";

/// Колонки таблицы SUBINT, которые читает декодер.
pub const COL_DATA: &str = "DATA";
pub const COL_DAT_FREQ: &str = "DAT_FREQ";
pub const COL_DAT_SCL: &str = "DAT_SCL";
pub const COL_DAT_OFFS: &str = "DAT_OFFS";
pub const COL_OFFS_SUB: &str = "OFFS_SUB";
pub const COL_TSUBINT: &str = "TSUBINT";

/// Значение поля заголовка.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// Заголовок таблицы: ключ → значение.
pub type HeaderMap = BTreeMap<String, HeaderValue>;

/// Источник заголовков и ячеек таблиц.
///
/// Вызовы синхронные и блокирующие; строки адресуются произвольно.
pub trait TableReader {
    /// Заголовок таблицы `table`.
    fn read_header(
        &mut self,
        table: &str,
    ) -> TableResult<HeaderMap>;

    /// Сырые байты ячейки в `buf` (буфер переиспользуется между строками).
    fn read_cell_into(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
        buf: &mut Vec<u8>,
    ) -> TableResult<()>;

    /// Числовая ячейка, приведённая к `f64`.
    fn read_cell_f64(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<Vec<f64>>;

    /// Ячейка 16-битных отсчётов в `out`.
    ///
    /// Колонки целого типа читаются как значения; байтовая ячейка
    /// трактуется как little-endian `i16`, по два байта на отсчёт.
    fn read_cell_i16(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
        out: &mut Vec<i16>,
    ) -> TableResult<()> {
        let raw = self.read_cell_bytes(table, column, row)?;
        le_i16_from_bytes(&raw, out)
    }

    fn read_cell_bytes(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.read_cell_into(table, column, row, &mut buf)?;
        Ok(buf)
    }

    /// Первый элемент числовой ячейки (для скалярных колонок).
    fn read_scalar_f64(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<f64> {
        self.read_cell_f64(table, column, row)?
            .first()
            .copied()
            .ok_or_else(|| TableError::malformed(format!("{table}.{column}[{row}] is empty")))
    }
}

impl<T: TableReader + ?Sized> TableReader for Box<T> {
    fn read_header(
        &mut self,
        table: &str,
    ) -> TableResult<HeaderMap> {
        (**self).read_header(table)
    }

    fn read_cell_into(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
        buf: &mut Vec<u8>,
    ) -> TableResult<()> {
        (**self).read_cell_into(table, column, row, buf)
    }

    fn read_cell_i16(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
        out: &mut Vec<i16>,
    ) -> TableResult<()> {
        (**self).read_cell_i16(table, column, row, out)
    }

    fn read_cell_f64(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<Vec<f64>> {
        (**self).read_cell_f64(table, column, row)
    }

    fn read_scalar_f64(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<f64> {
        (**self).read_scalar_f64(table, column, row)
    }
}

/// Байты ячейки как little-endian `i16`.
pub(crate) fn le_i16_from_bytes(
    raw: &[u8],
    out: &mut Vec<i16>,
) -> TableResult<()> {
    if raw.len() % 2 != 0 {
        return Err(TableError::malformed(format!(
            "{} bytes cannot hold 16-bit samples",
            raw.len()
        )));
    }
    out.clear();
    out.resize(raw.len() / 2, 0);
    LittleEndian::read_i16_into(raw, out);
    Ok(())
}

/// Ячейка таблицы в памяти.
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryCell {
    Bytes(Vec<u8>),
    Int16(Vec<i16>),
    Floats(Vec<f64>),
}

#[derive(Debug, Clone, Default)]
struct MemoryHdu {
    header: HeaderMap,
    columns: BTreeMap<String, Vec<MemoryCell>>,
}

/// Набор таблиц в памяти: тесты, бенчмарки, синтетические данные.
///
/// Считает обращения к ячейкам, чтобы можно было проверить, что
/// валидация запроса не читает строки.
#[derive(Debug, Clone, Default)]
pub struct MemoryTable {
    hdus: BTreeMap<String, MemoryHdu>,
    cell_reads: usize,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_header<V: Into<HeaderValue>>(
        &mut self,
        table: &str,
        key: &str,
        value: V,
    ) -> &mut Self {
        self.hdus
            .entry(table.to_string())
            .or_default()
            .header
            .insert(key.to_string(), value.into());
        self
    }

    pub fn remove_header(
        &mut self,
        table: &str,
        key: &str,
    ) -> &mut Self {
        if let Some(hdu) = self.hdus.get_mut(table) {
            hdu.header.remove(key);
        }
        self
    }

    /// Колонка сырых байтов, по ячейке на строку.
    pub fn set_bytes_column(
        &mut self,
        table: &str,
        column: &str,
        rows: Vec<Vec<u8>>,
    ) -> &mut Self {
        self.set_column(table, column, rows.into_iter().map(MemoryCell::Bytes).collect())
    }

    /// Колонка 16-битных целых (как `I` в FITS).
    pub fn set_i16_column(
        &mut self,
        table: &str,
        column: &str,
        rows: Vec<Vec<i16>>,
    ) -> &mut Self {
        self.set_column(table, column, rows.into_iter().map(MemoryCell::Int16).collect())
    }

    /// Числовая колонка, по ячейке на строку.
    pub fn set_f64_column(
        &mut self,
        table: &str,
        column: &str,
        rows: Vec<Vec<f64>>,
    ) -> &mut Self {
        self.set_column(table, column, rows.into_iter().map(MemoryCell::Floats).collect())
    }

    pub fn set_column(
        &mut self,
        table: &str,
        column: &str,
        cells: Vec<MemoryCell>,
    ) -> &mut Self {
        self.hdus
            .entry(table.to_string())
            .or_default()
            .columns
            .insert(column.to_string(), cells);
        self
    }

    /// Количество прочитанных ячеек с момента создания.
    pub fn cell_reads(&self) -> usize {
        self.cell_reads
    }

    fn cell(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<&MemoryCell> {
        self.cell_reads += 1;

        let hdu = self
            .hdus
            .get(table)
            .ok_or_else(|| TableError::MissingTable(table.to_string()))?;
        let cells = hdu
            .columns
            .get(column)
            .ok_or_else(|| TableError::missing_column(table, column))?;

        cells.get(row).ok_or(TableError::RowOutOfRange {
            row,
            nrows: cells.len(),
        })
    }
}

impl TableReader for MemoryTable {
    fn read_header(
        &mut self,
        table: &str,
    ) -> TableResult<HeaderMap> {
        self.hdus
            .get(table)
            .map(|hdu| hdu.header.clone())
            .ok_or_else(|| TableError::MissingTable(table.to_string()))
    }

    fn read_cell_into(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
        buf: &mut Vec<u8>,
    ) -> TableResult<()> {
        match self.cell(table, column, row)? {
            MemoryCell::Bytes(bytes) => {
                buf.clear();
                buf.extend_from_slice(bytes);
                Ok(())
            }
            MemoryCell::Int16(_) | MemoryCell::Floats(_) => Err(TableError::unsupported(
                format!("raw read of numeric column {table}.{column}"),
            )),
        }
    }

    fn read_cell_i16(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
        out: &mut Vec<i16>,
    ) -> TableResult<()> {
        match self.cell(table, column, row)? {
            MemoryCell::Int16(values) => {
                out.clear();
                out.extend_from_slice(values);
                Ok(())
            }
            MemoryCell::Bytes(bytes) => le_i16_from_bytes(bytes, out),
            MemoryCell::Floats(_) => Err(TableError::unsupported(format!(
                "16-bit read of float column {table}.{column}"
            ))),
        }
    }

    fn read_cell_f64(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<Vec<f64>> {
        match self.cell(table, column, row)? {
            MemoryCell::Floats(values) => Ok(values.clone()),
            MemoryCell::Int16(values) => Ok(values.iter().map(|&v| f64::from(v)).collect()),
            MemoryCell::Bytes(bytes) => Ok(bytes.iter().map(|&b| f64::from(b)).collect()),
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Приведение типов значений заголовка
////////////////////////////////////////////////////////////////////////////////

impl HeaderValue {
    /// Строковое представление (как `str(...)` для любых значений).
    pub fn to_text(&self) -> String {
        match self {
            HeaderValue::Str(s) => s.clone(),
            HeaderValue::Int(v) => v.to_string(),
            HeaderValue::Float(v) => v.to_string(),
            HeaderValue::Bool(true) => "T".to_string(),
            HeaderValue::Bool(false) => "F".to_string(),
        }
    }

    /// Целое значение; вещественные допускаются только без дробной части.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(v) => Some(*v),
            HeaderValue::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            HeaderValue::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Int(v) => Some(*v as f64),
            HeaderValue::Float(v) => Some(*v),
            HeaderValue::Str(s) => s.trim().parse().ok(),
            HeaderValue::Bool(_) => None,
        }
    }
}

impl std::fmt::Display for HeaderValue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            HeaderValue::Str(s) => write!(f, "'{s}'"),
            other => write!(f, "{}", other.to_text()),
        }
    }
}

impl From<&str> for HeaderValue {
    fn from(v: &str) -> Self {
        HeaderValue::Str(v.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(v: String) -> Self {
        HeaderValue::Str(v)
    }
}

impl From<i64> for HeaderValue {
    fn from(v: i64) -> Self {
        HeaderValue::Int(v)
    }
}

impl From<f64> for HeaderValue {
    fn from(v: f64) -> Self {
        HeaderValue::Float(v)
    }
}

impl From<bool> for HeaderValue {
    fn from(v: bool) -> Self {
        HeaderValue::Bool(v)
    }
}
