use psrfits_types::{FileHeader, FormatError, FormatResult, PolScheme, SubintHeader};

use crate::table::{HeaderMap, HeaderValue, TableReader, PRIMARY, SUBINT};

/// Построение заголовка из пар ключ/значение таблицы.
pub trait FromHeaderMap: Sized {
    /// Таблица, из которой читается заголовок.
    const TABLE: &'static str;

    fn from_header_map(map: &HeaderMap) -> FormatResult<Self>;
}

impl FromHeaderMap for FileHeader {
    const TABLE: &'static str = PRIMARY;

    fn from_header_map(map: &HeaderMap) -> FormatResult<Self> {
        Ok(FileHeader {
            source_name: required(map, Self::TABLE, "SRC_NAME")?.to_text(),
            ra: required(map, Self::TABLE, "RA")?.to_text(),
            dec: required(map, Self::TABLE, "DEC")?.to_text(),
            // OBS_MODE проверяется лениво, при первом декодировании
            obs_mode: map.get("OBS_MODE").map(HeaderValue::to_text),
        })
    }
}

impl FromHeaderMap for SubintHeader {
    const TABLE: &'static str = SUBINT;

    fn from_header_map(map: &HeaderMap) -> FormatResult<Self> {
        let pol_type = required(map, Self::TABLE, "POL_TYPE")?.to_text();
        let nbits = u32::try_from(required_int(map, Self::TABLE, "NBITS")?).map_err(|_| {
            FormatError::BadFieldType {
                key: "NBITS".into(),
                expected: "bit count",
                found: format!("{:?}", map.get("NBITS")),
            }
        })?;

        Ok(SubintHeader {
            nrows: required_usize(map, Self::TABLE, "NAXIS2")?,
            nbits,
            nchan: required_usize(map, Self::TABLE, "NCHAN")?,
            npol: required_usize(map, Self::TABLE, "NPOL")?,
            nsblk: required_usize(map, Self::TABLE, "NSBLK")?,
            tbin: required_f64(map, Self::TABLE, "TBIN")?,
            pol_scheme: PolScheme::from_pol_type(&pol_type),
            pol_type,
        })
    }
}

/// Читает оба заголовка через читатель таблиц.
pub fn read_headers<R: TableReader>(reader: &mut R) -> FormatResult<(FileHeader, SubintHeader)> {
    let primary = reader.read_header(FileHeader::TABLE)?;
    let subint = reader.read_header(SubintHeader::TABLE)?;

    Ok((
        FileHeader::from_header_map(&primary)?,
        SubintHeader::from_header_map(&subint)?,
    ))
}

fn required<'a>(
    map: &'a HeaderMap,
    table: &str,
    key: &str,
) -> FormatResult<&'a HeaderValue> {
    map.get(key)
        .ok_or_else(|| FormatError::missing_field(table, key))
}

fn required_int(
    map: &HeaderMap,
    table: &str,
    key: &str,
) -> FormatResult<i64> {
    let value = required(map, table, key)?;
    value.as_i64().ok_or_else(|| FormatError::BadFieldType {
        key: key.to_string(),
        expected: "integer",
        found: value.to_string(),
    })
}

fn required_usize(
    map: &HeaderMap,
    table: &str,
    key: &str,
) -> FormatResult<usize> {
    let v = required_int(map, table, key)?;
    usize::try_from(v).map_err(|_| FormatError::BadFieldType {
        key: key.to_string(),
        expected: "non-negative integer",
        found: v.to_string(),
    })
}

fn required_f64(
    map: &HeaderMap,
    table: &str,
    key: &str,
) -> FormatResult<f64> {
    let value = required(map, table, key)?;
    value.as_f64().ok_or_else(|| FormatError::BadFieldType {
        key: key.to_string(),
        expected: "float",
        found: value.to_string(),
    })
}
