//! Читатель таблиц поверх cfitsio (крейт `fitsio`).
//!
//! Заголовок читается карточка за карточкой, тип значения определяет
//! cfitsio. Числовые ячейки читаются с приведением к нужному типу и с
//! учётом TSCALn/TZEROn; байтовые колонки (`B`) отдаются как есть.

use std::{
    collections::BTreeMap,
    ffi::{CStr, CString},
    os::raw::{c_char, c_int},
    path::Path,
};

use fitsio::{
    errors::check_status,
    hdu::{FitsHdu, HduInfo},
    tables::{ColumnDataType, ConcreteColumnDescription},
    FitsFile,
};
use log::debug;
use psrfits_types::{TableError, TableResult};

use crate::table::{le_i16_from_bytes, HeaderMap, HeaderValue, TableReader, PRIMARY};

/// Размер буфера под имя, значение и комментарий карточки (с запасом).
const CARD_LEN: usize = 81;

#[derive(Debug, Clone)]
struct TableLayout {
    nrows: usize,
    columns: Vec<ConcreteColumnDescription>,
}

/// Колонка, найденная в таблице: номер для cfitsio (с 1) и число элементов.
#[derive(Debug, Clone, Copy)]
struct ColumnRef {
    number: c_int,
    repeat: usize,
    is_bytes: bool,
}

/// FITS файл, открытый через cfitsio.
pub struct FitsReader {
    fits: FitsFile,
    layouts: BTreeMap<String, TableLayout>,
}

impl FitsReader {
    pub fn open<P: AsRef<Path>>(path: P) -> TableResult<Self> {
        let path = path.as_ref();
        debug!("Opening FITS file {path:?}");

        let fits = FitsFile::open(path).map_err(fits_error)?;
        Ok(Self {
            fits,
            layouts: BTreeMap::new(),
        })
    }

    /// Делает таблицу `table` текущим HDU.
    fn hdu(
        &mut self,
        table: &str,
    ) -> TableResult<FitsHdu> {
        let hdu = if table.eq_ignore_ascii_case(PRIMARY) {
            self.fits.primary_hdu()
        } else {
            self.fits.hdu(table)
        };
        hdu.map_err(|_| TableError::MissingTable(table.to_string()))
    }

    fn layout(
        &mut self,
        table: &str,
    ) -> TableResult<&TableLayout> {
        if !self.layouts.contains_key(table) {
            let layout = match self.hdu(table)?.info {
                HduInfo::TableInfo {
                    column_descriptions,
                    num_rows,
                } => TableLayout {
                    nrows: num_rows,
                    columns: column_descriptions,
                },
                _ => {
                    return Err(TableError::unsupported(format!(
                        "{table} is not a binary table"
                    )))
                }
            };
            debug!(
                "{table}: {} rows, {} columns",
                layout.nrows,
                layout.columns.len()
            );
            self.layouts.insert(table.to_string(), layout);
        }

        self.layouts
            .get(table)
            .ok_or_else(|| TableError::MissingTable(table.to_string()))
    }

    /// Находит колонку, проверяет строку и делает таблицу текущим HDU.
    fn locate(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<ColumnRef> {
        let layout = self.layout(table)?;
        if row >= layout.nrows {
            return Err(TableError::RowOutOfRange {
                row,
                nrows: layout.nrows,
            });
        }

        let (idx, desc) = layout
            .columns
            .iter()
            .enumerate()
            .find(|(_, c)| c.name.trim().eq_ignore_ascii_case(column))
            .ok_or_else(|| TableError::missing_column(table, column))?;
        let col = ColumnRef {
            number: c_int::try_from(idx + 1)
                .map_err(|_| TableError::malformed(format!("{table} has too many columns")))?,
            repeat: desc.data_type.repeat,
            is_bytes: matches!(desc.data_type.typ, ColumnDataType::Byte),
        };

        self.hdu(table)?;
        Ok(col)
    }

    /// Имя и текст значения `n`-й карточки (с 1); `None` для карточек без значения.
    fn card(
        &mut self,
        n: c_int,
    ) -> TableResult<Option<(String, String)>> {
        let mut name = [0 as c_char; CARD_LEN];
        let mut value = [0 as c_char; CARD_LEN];
        let mut comment = [0 as c_char; CARD_LEN];
        let mut status = 0;

        // SAFETY: буферы не короче FLEN_KEYWORD/FLEN_VALUE/FLEN_COMMENT
        unsafe {
            fitsio_sys::ffgkyn(
                self.fits.as_raw(),
                n,
                name.as_mut_ptr(),
                value.as_mut_ptr(),
                comment.as_mut_ptr(),
                &mut status,
            );
        }
        check_status(status).map_err(fits_error)?;

        // SAFETY: cfitsio завершает строки нулём
        let name = unsafe { CStr::from_ptr(name.as_ptr()) }.to_string_lossy();
        let value = unsafe { CStr::from_ptr(value.as_ptr()) }.to_string_lossy();

        if name.trim().is_empty() || value.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some((name.trim().to_string(), value.trim().to_string())))
    }

    fn read_i16_values(
        &mut self,
        col: ColumnRef,
        row: usize,
        out: &mut Vec<i16>,
    ) -> TableResult<()> {
        out.clear();
        out.resize(col.repeat, 0);
        let mut status = 0;

        // SAFETY: `out` вмещает `repeat` элементов
        unsafe {
            fitsio_sys::ffgcvi(
                self.fits.as_raw(),
                col.number,
                row as i64 + 1,
                1,
                out.len() as i64,
                0,
                out.as_mut_ptr(),
                &mut 0,
                &mut status,
            );
        }
        check_status(status).map_err(fits_error)
    }
}

impl TableReader for FitsReader {
    fn read_header(
        &mut self,
        table: &str,
    ) -> TableResult<HeaderMap> {
        let hdu = self.hdu(table)?;

        let mut nkeys: c_int = 0;
        let mut status = 0;
        // SAFETY: указатели на локальные переменные
        unsafe {
            fitsio_sys::ffghsp(self.fits.as_raw(), &mut nkeys, &mut 0, &mut status);
        }
        check_status(status).map_err(fits_error)?;

        let mut header = HeaderMap::new();
        for n in 1..=nkeys {
            let Some((key, raw)) = self.card(n)? else {
                continue;
            };

            let fits = &mut self.fits;
            let value = match value_kind(&raw)? {
                b'C' => HeaderValue::Str(hdu.read_key(fits, &key).map_err(fits_error)?),
                b'I' => HeaderValue::Int(hdu.read_key(fits, &key).map_err(fits_error)?),
                b'F' => HeaderValue::Float(hdu.read_key(fits, &key).map_err(fits_error)?),
                b'L' => HeaderValue::Bool(raw == "T"),
                // комплексные значения декодеру не нужны
                _ => continue,
            };
            header.insert(key, value);
        }

        debug!("{table}: {} header keys", header.len());
        Ok(header)
    }

    fn read_cell_into(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
        buf: &mut Vec<u8>,
    ) -> TableResult<()> {
        let col = self.locate(table, column, row)?;
        if !col.is_bytes {
            return Err(TableError::unsupported(format!(
                "raw read of non-byte column {table}.{column}"
            )));
        }

        buf.clear();
        buf.resize(col.repeat, 0);
        let mut status = 0;

        // SAFETY: `buf` вмещает `repeat` байт
        unsafe {
            fitsio_sys::ffgcvb(
                self.fits.as_raw(),
                col.number,
                row as i64 + 1,
                1,
                buf.len() as i64,
                0,
                buf.as_mut_ptr(),
                &mut 0,
                &mut status,
            );
        }
        check_status(status).map_err(fits_error)
    }

    fn read_cell_i16(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
        out: &mut Vec<i16>,
    ) -> TableResult<()> {
        let col = self.locate(table, column, row)?;
        if !col.is_bytes {
            return self.read_i16_values(col, row, out);
        }

        let mut raw = Vec::with_capacity(col.repeat);
        self.read_cell_into(table, column, row, &mut raw)?;
        le_i16_from_bytes(&raw, out)
    }

    fn read_cell_f64(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<Vec<f64>> {
        let col = self.locate(table, column, row)?;
        let mut out = vec![0.0; col.repeat];
        let mut status = 0;

        // SAFETY: `out` вмещает `repeat` элементов
        unsafe {
            fitsio_sys::ffgcvd(
                self.fits.as_raw(),
                col.number,
                row as i64 + 1,
                1,
                out.len() as i64,
                0.0,
                out.as_mut_ptr(),
                &mut 0,
                &mut status,
            );
        }
        check_status(status).map_err(fits_error)?;
        Ok(out)
    }

    fn read_scalar_f64(
        &mut self,
        table: &str,
        column: &str,
        row: usize,
    ) -> TableResult<f64> {
        self.locate(table, column, row)?;
        let hdu = self.hdu(table)?;
        hdu.read_cell_value::<f64>(&mut self.fits, column, row)
            .map_err(fits_error)
    }
}

/// Тип значения карточки по cfitsio: `C`, `L`, `I`, `F` или `X`.
fn value_kind(raw: &str) -> TableResult<u8> {
    let text = CString::new(raw).map_err(|e| TableError::malformed(e.to_string()))?;
    let mut kind: c_char = 0;
    let mut status = 0;

    // SAFETY: `text` завершена нулём, `kind` — один символ
    unsafe {
        fitsio_sys::ffdtyp(text.as_ptr(), &mut kind, &mut status);
    }
    check_status(status).map_err(fits_error)?;
    Ok(kind as u8)
}

fn fits_error(e: fitsio::errors::Error) -> TableError {
    TableError::fits(e.to_string())
}
