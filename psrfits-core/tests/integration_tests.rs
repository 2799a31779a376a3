use std::io::Write;

use psrfits_core::{
    FitsReader, HeaderValue, SubintDecoder, TableReader, COL_DATA, COL_DAT_FREQ, COL_DAT_SCL,
    PRIMARY, SUBINT,
};
use psrfits_types::{DecodeError, DecodeRequest, FormatError, PolScheme, TableError};
use tempfile::NamedTempFile;

// ===========================================================================
// Helpers: сборка PSRFITS файла в памяти
// ===========================================================================

const FITS_BLOCK_SIZE: usize = 2880;

/// Параметры синтетического наблюдения.
struct Synth {
    obs_mode: &'static str,
    pol_type: &'static str,
    nbits: usize,
    nsblk: usize,
    npol: usize,
    nchan: usize,
    tbin: f64,
    scale: f32,
    offset: f32,
    /// Код типа колонки DATA: `B` или `I` (big-endian `i16`)
    data_code: char,
    /// TSCAL4 для колонки DAT_SCL
    scl_tscal: Option<f64>,
}

impl Default for Synth {
    fn default() -> Self {
        Synth {
            obs_mode: "SEARCH",
            pol_type: "AA+BB",
            nbits: 8,
            nsblk: 8,
            npol: 1,
            nchan: 4,
            tbin: 1e-3,
            scale: 1.0,
            offset: 0.0,
            data_code: 'B',
            scl_tscal: None,
        }
    }
}

fn num_card(
    key: &str,
    value: impl std::fmt::Display,
) -> String {
    format!("{key:<8}= {value:>20}")
}

fn str_card(
    key: &str,
    value: &str,
) -> String {
    format!("{key:<8}= '{value:<8}'")
}

/// Карточки и `END`, дополненные пробелами до границы блока.
fn header_block(cards: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    for card in cards.iter().map(String::as_str).chain(["END"]) {
        let mut c = format!("{card:<80}").into_bytes();
        c.truncate(80);
        out.extend(c);
    }
    out.resize(out.len().div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE, b' ');
    out
}

/// Детерминированный PSRFITS файл: строки `rows` в колонке DATA.
fn build_psrfits(
    s: &Synth,
    rows: &[Vec<u8>],
) -> Vec<u8> {
    let row_bytes = rows.first().map_or(0, Vec::len);
    let data_repeat = if s.data_code == 'I' { row_bytes / 2 } else { row_bytes };
    let nvals = s.npol * s.nchan;
    let row_width = 8 + 8 + 8 * s.nchan + 4 * nvals * 2 + row_bytes;

    let mut raw = header_block(&[
        num_card("SIMPLE", "T"),
        num_card("BITPIX", 8),
        num_card("NAXIS", 0),
        str_card("SRC_NAME", "J0000+00"),
        str_card("RA", "00:00:00.0"),
        str_card("DEC", "+00:00:00.0"),
        str_card("OBS_MODE", s.obs_mode),
    ]);

    let mut cards = vec![
        str_card("XTENSION", "BINTABLE"),
        num_card("BITPIX", 8),
        num_card("NAXIS", 2),
        num_card("NAXIS1", row_width),
        num_card("NAXIS2", rows.len()),
        num_card("PCOUNT", 0),
        num_card("GCOUNT", 1),
        num_card("TFIELDS", 6),
        str_card("TTYPE1", "TSUBINT"),
        str_card("TFORM1", "1D"),
        str_card("TTYPE2", "OFFS_SUB"),
        str_card("TFORM2", "1D"),
        str_card("TTYPE3", "DAT_FREQ"),
        str_card("TFORM3", &format!("{}D", s.nchan)),
        str_card("TTYPE4", "DAT_SCL"),
        str_card("TFORM4", &format!("{nvals}E")),
        str_card("TTYPE5", "DAT_OFFS"),
        str_card("TFORM5", &format!("{nvals}E")),
        str_card("TTYPE6", "DATA"),
        str_card("TFORM6", &format!("{data_repeat}{}", s.data_code)),
        str_card("EXTNAME", "SUBINT"),
        str_card("POL_TYPE", s.pol_type),
        num_card("NPOL", s.npol),
        num_card("TBIN", format!("{:E}", s.tbin)),
        num_card("NBITS", s.nbits),
        num_card("NCHAN", s.nchan),
        num_card("NSBLK", s.nsblk),
    ];
    if let Some(tscal) = s.scl_tscal {
        cards.push(num_card("TSCAL4", format!("{tscal:E}")));
    }
    raw.extend(header_block(&cards));

    let tsubint = s.nsblk as f64 * s.tbin;
    let mut data = Vec::new();

    for (irow, row) in rows.iter().enumerate() {
        data.extend_from_slice(&tsubint.to_be_bytes());
        data.extend_from_slice(&((irow as f64 + 0.5) * tsubint).to_be_bytes());
        for ichan in 0..s.nchan {
            data.extend_from_slice(&(1400.0 + ichan as f64).to_be_bytes());
        }
        for _ in 0..nvals {
            data.extend_from_slice(&s.scale.to_be_bytes());
        }
        for _ in 0..nvals {
            data.extend_from_slice(&s.offset.to_be_bytes());
        }
        data.extend_from_slice(row);
    }

    data.resize(data.len().div_ceil(FITS_BLOCK_SIZE) * FITS_BLOCK_SIZE, 0);
    raw.extend(data);
    raw
}

fn write_temp(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

/// Пилообразные 8-битные строки.
fn ramp_rows(
    s: &Synth,
    nrows: usize,
) -> Vec<Vec<u8>> {
    let n = s.nsblk * s.npol * s.nchan;
    (0..nrows)
        .map(|r| (0..n).map(|i| ((i + r * 3) % 200) as u8).collect())
        .collect()
}

// ===========================================================================
// Заголовки
// ===========================================================================

#[test]
fn test_open_reads_headers() {
    let s = Synth {
        pol_type: "AABBCRCI",
        npol: 4,
        ..Synth::default()
    };
    let file = write_temp(&build_psrfits(&s, &ramp_rows(&s, 3)));

    let dec = SubintDecoder::open(file.path()).unwrap();
    let fh = dec.file_header();
    let sh = dec.subint_header();

    assert_eq!(fh.source_name, "J0000+00");
    assert_eq!(fh.ra, "00:00:00.0");
    assert!(fh.is_search_mode());

    assert_eq!(sh.nrows, 3);
    assert_eq!(sh.nbits, 8);
    assert_eq!(sh.nchan, 4);
    assert_eq!(sh.npol, 4);
    assert_eq!(sh.nsblk, 8);
    assert!((sh.tbin - 1e-3).abs() < 1e-15);
    assert_eq!(sh.pol_scheme, PolScheme::UnsignedPair);
}

#[test]
fn test_open_rejects_non_fits() {
    let file = write_temp(&vec![b'x'; FITS_BLOCK_SIZE]);

    assert!(matches!(
        SubintDecoder::open(file.path()),
        Err(FormatError::Table(_))
    ));
}

#[test]
fn test_non_search_mode_fails_only_on_decode() {
    let s = Synth {
        obs_mode: "PSR",
        ..Synth::default()
    };
    let file = write_temp(&build_psrfits(&s, &ramp_rows(&s, 1)));

    let mut dec = SubintDecoder::open(file.path()).unwrap();
    let err = dec.decode(&DecodeRequest::new(0)).unwrap_err();

    assert!(matches!(
        err,
        DecodeError::Format(FormatError::ObsMode { .. })
    ));
}

#[test]
fn test_reader_header_value_types() {
    let s = Synth::default();
    let file = write_temp(&build_psrfits(&s, &ramp_rows(&s, 2)));
    let mut fits = FitsReader::open(file.path()).unwrap();

    let primary = fits.read_header(PRIMARY).unwrap();
    assert_eq!(primary.get("SIMPLE"), Some(&HeaderValue::Bool(true)));
    assert_eq!(primary.get("NAXIS"), Some(&HeaderValue::Int(0)));
    assert_eq!(
        primary.get("OBS_MODE"),
        Some(&HeaderValue::Str("SEARCH".into()))
    );

    let subint = fits.read_header(SUBINT).unwrap();
    assert_eq!(subint.get("NAXIS2"), Some(&HeaderValue::Int(2)));
    assert_eq!(subint.get("TBIN"), Some(&HeaderValue::Float(1e-3)));
    assert_eq!(subint.get("TFORM6"), Some(&HeaderValue::Str("32B".into())));

    assert!(matches!(
        fits.read_header("HISTORY"),
        Err(TableError::MissingTable(_))
    ));
}

#[test]
fn test_reader_cell_errors() {
    let s = Synth::default();
    let file = write_temp(&build_psrfits(&s, &ramp_rows(&s, 2)));
    let mut fits = FitsReader::open(file.path()).unwrap();

    assert_eq!(fits.read_cell_bytes(SUBINT, COL_DATA, 1).unwrap().len(), 32);
    assert!(matches!(
        fits.read_cell_bytes(SUBINT, COL_DATA, 2),
        Err(TableError::RowOutOfRange { row: 2, nrows: 2 })
    ));
    assert!(matches!(
        fits.read_cell_f64(SUBINT, "PERIOD", 0),
        Err(TableError::MissingColumn { .. })
    ));
    assert!(matches!(
        fits.read_cell_bytes(SUBINT, COL_DAT_FREQ, 0),
        Err(TableError::Unsupported(_))
    ));
}

#[test]
fn test_reader_applies_column_scaling() {
    let s = Synth {
        scale: 2.0,
        scl_tscal: Some(0.25),
        ..Synth::default()
    };
    let file = write_temp(&build_psrfits(&s, &ramp_rows(&s, 1)));
    let mut fits = FitsReader::open(file.path()).unwrap();

    assert_eq!(
        fits.read_cell_f64(SUBINT, COL_DAT_SCL, 0).unwrap(),
        vec![0.5; 4]
    );
}

// ===========================================================================
// Декодирование
// ===========================================================================

#[test]
fn test_decode_all_rows_matches_payload() {
    let s = Synth::default();
    let rows = ramp_rows(&s, 3);
    let file = write_temp(&build_psrfits(&s, &rows));

    let mut dec = SubintDecoder::open(file.path()).unwrap();
    let block = dec.decode(&DecodeRequest::all_rows()).unwrap();

    assert_eq!(block.shape(), &[24, 1, 4]);

    let flat: Vec<f32> = rows.concat().into_iter().map(f32::from).collect();
    assert_eq!(block.data.iter().copied().collect::<Vec<_>>(), flat);
}

#[test]
fn test_decode_with_scales_and_axes() {
    let s = Synth {
        scale: 2.0,
        offset: -1.0,
        ..Synth::default()
    };
    let rows = ramp_rows(&s, 2);
    let file = write_temp(&build_psrfits(&s, &rows));

    let mut dec = SubintDecoder::open(file.path()).unwrap();
    let req = DecodeRequest::new(0)
        .end_row(-1)
        .time_downsample(4)
        .freq_downsample(2)
        .apply_scales(true)
        .with_axes(true);
    let block = dec.decode(&req).unwrap();

    assert_eq!(block.shape(), &[4, 1, 2]);

    // Первая выходная выборка: выборки 0..4, каналы 0..2 первой строки
    let row0 = &rows[0];
    let mean: f64 = (0..4)
        .flat_map(|t| (0..2).map(move |c| t * 4 + c))
        .map(|i| f64::from(row0[i]) * 2.0 - 1.0)
        .sum::<f64>()
        / 8.0;
    assert!((f64::from(block.data[[0, 0, 0]]) - mean).abs() < 1e-4);

    let times = block.times.as_ref().unwrap();
    let expected = [0.002, 0.006, 0.010, 0.014];
    for (t, e) in times.iter().zip(expected) {
        assert!((t - e).abs() < 1e-12, "{t} != {e}");
    }

    assert_eq!(block.freqs.as_deref(), Some(&[1400.5, 1402.5][..]));
}

#[test]
fn test_decode_one_bit_rows() {
    let s = Synth {
        nbits: 1,
        nsblk: 16,
        nchan: 2,
        ..Synth::default()
    };
    // [2, 1, 2] байт: канал 0 — все единицы, канал 1 — чередование
    let rows = vec![vec![0xFF, 0xAA, 0xFF, 0xAA]];
    let file = write_temp(&build_psrfits(&s, &rows));

    let mut dec = SubintDecoder::open(file.path()).unwrap();
    let block = dec
        .decode(&DecodeRequest::new(0).time_downsample(2).squeeze(true))
        .unwrap();

    assert_eq!(block.shape(), &[8, 2]);
    for t in 0..8 {
        assert_eq!(block.data[[t, 0]], 1.0);
        assert_eq!(block.data[[t, 1]], 0.5);
    }
}

#[test]
fn test_decode_two_bit_rows() {
    let s = Synth {
        nbits: 2,
        nsblk: 2,
        nchan: 4,
        ..Synth::default()
    };
    let rows = vec![vec![0b00_01_10_11, 0b11_10_01_00]];
    let file = write_temp(&build_psrfits(&s, &rows));

    let mut dec = SubintDecoder::open(file.path()).unwrap();
    let block = dec
        .decode(&DecodeRequest::new(0).squeeze(true).transpose(true))
        .unwrap();

    // После squeeze [time, chan], после transpose [chan, time]
    assert_eq!(block.shape(), &[4, 2]);
    assert_eq!(block.data[[0, 0]], 0.0);
    assert_eq!(block.data[[3, 0]], 3.0);
    assert_eq!(block.data[[0, 1]], 3.0);
    assert_eq!(block.data[[3, 1]], 0.0);
}

#[test]
fn test_decode_sixteen_bit_integer_column() {
    let s = Synth {
        nbits: 16,
        nsblk: 1,
        nchan: 2,
        data_code: 'I',
        ..Synth::default()
    };
    // TFORM6 = '2I': значения хранятся big-endian
    let rows = vec![[1i16.to_be_bytes(), (-2i16).to_be_bytes()].concat()];
    let file = write_temp(&build_psrfits(&s, &rows));

    let mut dec = SubintDecoder::open(file.path()).unwrap();
    let block = dec.decode(&DecodeRequest::new(0)).unwrap();

    assert_eq!(block.shape(), &[1, 1, 2]);
    assert_eq!(block.data.iter().copied().collect::<Vec<_>>(), vec![1.0, -2.0]);
}

#[test]
fn test_decode_sixteen_bit_byte_column() {
    let s = Synth {
        nbits: 16,
        nsblk: 1,
        nchan: 2,
        ..Synth::default()
    };
    // Колонка `B`: байты строки как little-endian `i16`
    let rows = vec![[(-300i16).to_le_bytes(), 1200i16.to_le_bytes()].concat()];
    let file = write_temp(&build_psrfits(&s, &rows));

    let mut dec = SubintDecoder::open(file.path()).unwrap();
    let block = dec.decode(&DecodeRequest::new(0)).unwrap();

    assert_eq!(block.data.iter().copied().collect::<Vec<_>>(), vec![-300.0, 1200.0]);
}

#[test]
fn test_decode_reuses_session() {
    let s = Synth::default();
    let file = write_temp(&build_psrfits(&s, &ramp_rows(&s, 4)));

    let mut dec = SubintDecoder::open(file.path()).unwrap();

    let last = dec.decode(&DecodeRequest::new(3)).unwrap();
    let range = dec.decode(&DecodeRequest::new(2).end_row(3)).unwrap();

    assert_eq!(range.shape(), &[16, 1, 4]);
    assert_eq!(
        last.data.iter().collect::<Vec<_>>(),
        range.data.iter().skip(32).collect::<Vec<_>>()
    );

    assert!(matches!(
        dec.decode(&DecodeRequest::new(4)),
        Err(DecodeError::InvalidRowRange { .. })
    ));
}

#[test]
fn test_truncated_data_reports_row() {
    let s = Synth::default();
    let mut raw = build_psrfits(&s, &ramp_rows(&s, 2));
    // Отрезаем область данных целиком
    raw.truncate(2 * FITS_BLOCK_SIZE);
    let file = write_temp(&raw);

    let mut dec = SubintDecoder::open(file.path()).unwrap();
    assert_eq!(dec.subint_header().nrows, 2);

    let err = dec.decode(&DecodeRequest::new(0)).unwrap_err();
    assert!(matches!(err, DecodeError::RowReadFailure { row: 0, .. }));
}

#[test]
fn test_frequencies_from_file() {
    let s = Synth::default();
    let file = write_temp(&build_psrfits(&s, &ramp_rows(&s, 1)));

    let mut dec = SubintDecoder::open(file.path()).unwrap();
    assert_eq!(
        dec.frequencies(0).unwrap(),
        vec![1400.0, 1401.0, 1402.0, 1403.0]
    );

    let mut fits = dec.into_inner();
    assert_eq!(fits.read_scalar_f64("SUBINT", "TSUBINT", 0).unwrap(), 8e-3);
}
