//! Декодер строк SUBINT поискового PSRFITS.
//!
//! Строки читаются строго по возрастанию, без перекрытия чтения и счёта.
//! Для каждой строки: масштабы/смещения (по запросу), опорное время строки
//! (по запросу), сырые данные → распаковка → усреднение по времени →
//! `scale`/`offset` → усреднение по частоте → запись в выходной массив.

use std::path::Path;

use log::{debug, info, warn};
use ndarray::{s, Array3, ArrayD, Axis};
use psrfits_types::{
    BitDepth, DecodeError, DecodeRequest, DecodeResult, FileHeader, FormatError, FormatResult,
    SampleAxis, SubintHeader, TableError,
};

use crate::{
    decimate::{apply_scale_offset, group_mean, mean_over_time},
    fits_reader::FitsReader,
    header::read_headers,
    table::{
        TableReader, COL_DATA, COL_DAT_FREQ, COL_DAT_OFFS, COL_DAT_SCL, COL_OFFS_SUB, COL_TSUBINT,
        SUBINT,
    },
    unpack::{unpack_1bit_samples, unpack_msb_first, RowDims, RowSamples},
};

/// Декодер поверх FITS файла на диске.
pub type FitsDecoder = SubintDecoder<FitsReader>;

/// Сессия декодирования одного файла.
///
/// Владеет читателем таблиц и разобранными заголовками. `decode` принимает
/// `&mut self`: один экземпляр нельзя использовать из нескольких потоков
/// одновременно, для параллельной работы нужен отдельный экземпляр на файл.
pub struct SubintDecoder<R: TableReader> {
    reader: R,
    file_header: FileHeader,
    subint_header: SubintHeader,
}

/// Нормализованный и проверенный запрос.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodePlan {
    pub start_row: usize,
    /// Последняя строка включительно, после разрешения отрицательных индексов
    pub end_row: usize,
    pub time_downsample: usize,
    pub freq_downsample: usize,
    pub bit_depth: BitDepth,
    /// Выборок на строку после прореживания
    pub nsblk_ds: usize,
    /// Каналов после прореживания
    pub nchan_ds: usize,
    /// Шаг по времени после прореживания, секунды
    pub tbin_ds: f64,
}

/// Результат декодирования.
#[derive(Debug, Clone)]
pub struct DecodedBlock {
    /// `[time, pol, chan]`, с учётом `squeeze` и `transpose`
    pub data: ArrayD<f32>,
    /// Абсолютное время середины каждой выходной выборки, секунды
    pub times: Option<Vec<f64>>,
    /// Частоты выходных каналов (DAT_FREQ первой строки)
    pub freqs: Option<Vec<f64>>,
}

/// Буферы строки. Живут в пределах одного вызова `decode`.
#[derive(Debug, Default)]
struct RowScratch {
    raw: Vec<u8>,
    wide: Vec<i16>,
    unpacked: Vec<u8>,
    spectrum: Vec<f64>,
    grouped: Vec<f64>,
}

impl DecodePlan {
    /// Проверяет запрос до любого чтения строк.
    pub fn new(
        file: &FileHeader,
        sub: &SubintHeader,
        req: &DecodeRequest,
    ) -> DecodeResult<Self> {
        if !file.is_search_mode() {
            return Err(FormatError::ObsMode {
                found: file.obs_mode.clone().unwrap_or_default(),
            }
            .into());
        }

        let mut time_ds = req.time_downsample.max(1);
        if time_ds > sub.nsblk {
            warn!("Time downsample {time_ds} exceeds NSBLK={}, clamping", sub.nsblk);
            time_ds = sub.nsblk;
        }

        // 0 — один канал на всю полосу
        let mut freq_ds = if req.freq_downsample == 0 {
            sub.nchan
        } else {
            req.freq_downsample
        };
        if freq_ds > sub.nchan {
            warn!("Frequency downsample {freq_ds} exceeds NCHAN={}, clamping", sub.nchan);
            freq_ds = sub.nchan;
        }

        let (start_row, end_row) = resolve_rows(req, sub.nrows)?;

        if time_ds == 0 || sub.nsblk % time_ds != 0 {
            return Err(DecodeError::BadDownsample {
                axis: SampleAxis::Time,
                factor: time_ds,
                size: sub.nsblk,
            });
        }

        if freq_ds == 0 || sub.nchan % freq_ds != 0 {
            return Err(DecodeError::BadDownsample {
                axis: SampleAxis::Frequency,
                factor: freq_ds,
                size: sub.nchan,
            });
        }

        let bit_depth = BitDepth::from_nbits(sub.nbits)?;

        Ok(DecodePlan {
            start_row,
            end_row,
            time_downsample: time_ds,
            freq_downsample: freq_ds,
            bit_depth,
            nsblk_ds: sub.nsblk / time_ds,
            nchan_ds: sub.nchan / freq_ds,
            tbin_ds: sub.tbin * time_ds as f64,
        })
    }

    pub fn rows(&self) -> usize {
        self.end_row
            .checked_sub(self.start_row)
            .map_or(0, |d| d + 1)
    }

    /// Форма результата до `squeeze`/`transpose`: `(time, pol, chan)`.
    pub fn output_shape(
        &self,
        npol: usize,
    ) -> (usize, usize, usize) {
        (self.rows() * self.nsblk_ds, npol, self.nchan_ds)
    }
}

/// `end_row`: `None` — одна строка, отрицательный — от конца файла.
fn resolve_rows(
    req: &DecodeRequest,
    nrows: usize,
) -> DecodeResult<(usize, usize)> {
    let total = i64::try_from(nrows).unwrap_or(i64::MAX);
    let Ok(start) = i64::try_from(req.start_row) else {
        return Err(DecodeError::InvalidRowRange {
            start: i64::MAX,
            end: req.end_row.unwrap_or(i64::MAX),
            nrows,
        });
    };
    let mut end = req.end_row.unwrap_or(start);

    if end < 0 {
        end = end.saturating_add(total);
    }

    if end < 0 || start > end || end >= total {
        return Err(DecodeError::InvalidRowRange { start, end, nrows });
    }

    Ok((req.start_row, end as usize))
}

impl FitsDecoder {
    /// Открывает PSRFITS файл и разбирает заголовки.
    ///
    /// OBS_MODE здесь не проверяется, только при декодировании.
    pub fn open<P: AsRef<Path>>(path: P) -> FormatResult<Self> {
        let fits = FitsReader::open(path)?;
        Self::from_reader(fits)
    }
}

impl<R: TableReader> SubintDecoder<R> {
    pub fn from_reader(mut reader: R) -> FormatResult<Self> {
        let (file_header, subint_header) = read_headers(&mut reader)?;

        debug!(
            "SUBINT: {} rows, NBITS={}, NCHAN={}, NPOL={}, NSBLK={}, TBIN={}",
            subint_header.nrows,
            subint_header.nbits,
            subint_header.nchan,
            subint_header.npol,
            subint_header.nsblk,
            subint_header.tbin,
        );

        Ok(Self {
            reader,
            file_header,
            subint_header,
        })
    }

    pub fn file_header(&self) -> &FileHeader {
        &self.file_header
    }

    pub fn subint_header(&self) -> &SubintHeader {
        &self.subint_header
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Проверяет запрос без чтения данных.
    pub fn plan(
        &self,
        req: &DecodeRequest,
    ) -> DecodeResult<DecodePlan> {
        DecodePlan::new(&self.file_header, &self.subint_header, req)
    }

    /// Частоты каналов строки `row` (DAT_FREQ) без декодирования данных.
    pub fn frequencies(
        &mut self,
        row: usize,
    ) -> DecodeResult<Vec<f64>> {
        self.reader
            .read_cell_f64(SUBINT, COL_DAT_FREQ, row)
            .map_err(|e| DecodeError::row_read(row, e))
    }

    /// Декодирует строки `[start_row, end_row]` в плотный массив.
    pub fn decode(
        &mut self,
        req: &DecodeRequest,
    ) -> DecodeResult<DecodedBlock> {
        let plan = self.plan(req)?;
        let sub = &self.subint_header;
        let dims = RowDims {
            nsblk: sub.nsblk,
            npol: sub.npol,
            nchan: sub.nchan,
        };
        let scheme = sub.pol_scheme;
        let nrows = plan.rows();

        let (ntime, npol, nchan_ds) = plan.output_shape(dims.npol);
        let mut result = Array3::<f32>::zeros((ntime, npol, nchan_ds));
        let mut times = req.with_axes.then(|| vec![0.0f64; ntime]);

        // Частоты считаются одинаковыми для всех строк
        let freqs = if req.with_axes {
            Some(self.decimated_freqs(plan.start_row, dims.nchan, plan.freq_downsample)?)
        } else {
            None
        };

        let mut scratch = RowScratch {
            spectrum: vec![0.0; dims.nchan],
            grouped: vec![0.0; plan.nchan_ds],
            ..RowScratch::default()
        };

        for irow in 0..nrows {
            let row = plan.start_row + irow;
            debug!("Reading subint {row}");

            let calib = if req.apply_scales {
                Some(self.read_calibration(row, dims)?)
            } else {
                None
            };

            let t0_row = if req.with_axes {
                let offs_sub = self.read_scalar(row, COL_OFFS_SUB)?;
                let tsubint = self.read_scalar(row, COL_TSUBINT)?;
                offs_sub - tsubint / 2.0
            } else {
                0.0
            };

            let RowScratch {
                raw,
                wide,
                unpacked,
                spectrum,
                grouped,
            } = &mut scratch;

            let samples = if plan.bit_depth == BitDepth::Sixteen {
                self.reader
                    .read_cell_i16(SUBINT, COL_DATA, row, wide)
                    .map_err(|e| DecodeError::row_read(row, e))?;
                if wide.len() != dims.values() {
                    return Err(DecodeError::PayloadSize {
                        row,
                        expected: 2 * dims.values(),
                        found: 2 * wide.len(),
                    });
                }
                RowSamples::Int16(&wide[..])
            } else {
                self.reader
                    .read_cell_into(SUBINT, COL_DATA, row, raw)
                    .map_err(|e| DecodeError::row_read(row, e))?;
                expand_row(plan.bit_depth, dims, row, raw, unpacked)?
            };

            for isamp in 0..plan.nsblk_ds {
                let out_t = irow * plan.nsblk_ds + isamp;

                if let Some(times) = times.as_mut() {
                    times[out_t] = t0_row + (isamp as f64 + 0.5) * plan.tbin_ds;
                }

                for ipol in 0..dims.npol {
                    mean_over_time(
                        &samples,
                        dims,
                        isamp * plan.time_downsample,
                        plan.time_downsample,
                        ipol,
                        scheme.is_signed(ipol),
                        spectrum,
                    );

                    if let Some((scales, offsets)) = calib.as_ref() {
                        let lane = ipol * dims.nchan..(ipol + 1) * dims.nchan;
                        apply_scale_offset(spectrum, &scales[lane.clone()], &offsets[lane]);
                    }

                    let values: &[f64] = if plan.freq_downsample == 1 {
                        &spectrum[..]
                    } else {
                        group_mean(spectrum, plan.freq_downsample, grouped);
                        &grouped[..]
                    };

                    let mut lane = result.slice_mut(s![out_t, ipol, ..]);
                    for (dst, &v) in lane.iter_mut().zip(values) {
                        *dst = v as f32;
                    }
                }
            }
        }

        info!(
            "Decoded rows {}..={} into {:?} (time x{}, freq x{})",
            plan.start_row,
            plan.end_row,
            result.shape(),
            plan.time_downsample,
            plan.freq_downsample,
        );

        let mut data = result.into_dyn();
        if req.squeeze {
            data = squeeze(data);
        }
        if req.transpose {
            data = data.reversed_axes();
        }

        Ok(DecodedBlock {
            data,
            times,
            freqs,
        })
    }

    fn read_scalar(
        &mut self,
        row: usize,
        column: &str,
    ) -> DecodeResult<f64> {
        self.reader
            .read_scalar_f64(SUBINT, column, row)
            .map_err(|e| DecodeError::row_read(row, e))
    }

    /// `(DAT_SCL, DAT_OFFS)` строки, каждый длиной `npol * nchan`.
    fn read_calibration(
        &mut self,
        row: usize,
        dims: RowDims,
    ) -> DecodeResult<(Vec<f64>, Vec<f64>)> {
        let expected = dims.npol * dims.nchan;
        let mut read = |column: &str| -> DecodeResult<Vec<f64>> {
            let v = self
                .reader
                .read_cell_f64(SUBINT, column, row)
                .map_err(|e| DecodeError::row_read(row, e))?;

            if v.len() < expected {
                return Err(DecodeError::row_read(
                    row,
                    TableError::malformed(format!(
                        "{column} has {} values, expected {expected}",
                        v.len()
                    )),
                ));
            }
            Ok(v)
        };

        let scales = read(COL_DAT_SCL)?;
        let offsets = read(COL_DAT_OFFS)?;

        Ok((scales, offsets))
    }

    fn decimated_freqs(
        &mut self,
        row: usize,
        nchan: usize,
        factor: usize,
    ) -> DecodeResult<Vec<f64>> {
        let freqs = self.frequencies(row)?;

        if freqs.len() < nchan {
            return Err(DecodeError::row_read(
                row,
                TableError::malformed(format!(
                    "{COL_DAT_FREQ} has {} values, expected {nchan}",
                    freqs.len()
                )),
            ));
        }

        let mut out = vec![0.0; nchan / factor];
        group_mean(&freqs[..nchan], factor, &mut out);
        Ok(out)
    }
}

/// Приводит сырые байты строки (1-8 бит) к виду «одно значение на элемент».
///
/// Подбайтовые данные, уже записанные по значению на байт, принимаются
/// без распаковки.
fn expand_row<'a>(
    depth: BitDepth,
    dims: RowDims,
    row: usize,
    raw: &'a [u8],
    unpacked: &'a mut Vec<u8>,
) -> DecodeResult<RowSamples<'a>> {
    let n = dims.values();
    let packed_len = depth.row_bytes(dims.nsblk, dims.npol, dims.nchan);

    match depth {
        BitDepth::Eight if raw.len() == n => Ok(RowSamples::Bytes(raw)),
        d if d.is_packed() && raw.len() == n => Ok(RowSamples::Bytes(raw)),
        BitDepth::One if raw.len() == packed_len => {
            unpack_1bit_samples(raw, dims, unpacked);
            Ok(RowSamples::Bytes(unpacked))
        }
        BitDepth::Two | BitDepth::Four if raw.len() == packed_len => {
            unpack_msb_first(raw, depth.bits(), n, unpacked);
            Ok(RowSamples::Bytes(unpacked))
        }
        _ => Err(DecodeError::PayloadSize {
            row,
            expected: packed_len,
            found: raw.len(),
        }),
    }
}

/// Удаляет оси длины 1.
fn squeeze(mut data: ArrayD<f32>) -> ArrayD<f32> {
    for ax in (0..data.ndim()).rev() {
        if data.len_of(Axis(ax)) == 1 {
            data = data.index_axis_move(Axis(ax), 0);
        }
    }
    data
}

impl DecodedBlock {
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// `(data, times, freqs)`.
    pub fn into_parts(self) -> (ArrayD<f32>, Option<Vec<f64>>, Option<Vec<f64>>) {
        (self.data, self.times, self.freqs)
    }
}
