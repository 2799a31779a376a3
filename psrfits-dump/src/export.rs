//! Выгрузка декодированного блока на диск.
//!
//! `raw`: `<out>.f32` с little-endian `f32` в логическом порядке осей и
//! `<out>.json` с формой, заголовками и осями. `json`: всё в одном файле.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;
use ndarray::ArrayD;
use psrfits_core::{DecodePlan, DecodedBlock};
use psrfits_types::{FileHeader, SubintHeader};
use serde::Serialize;

use crate::{
    config::{DumpConfig, OutputFormat},
    error::DumpResult,
};

/// Описание выгрузки (JSON).
#[derive(Debug, Serialize)]
pub struct Manifest<'a> {
    pub source: &'a Path,
    pub file_header: &'a FileHeader,
    pub subint_header: &'a SubintHeader,
    pub start_row: usize,
    pub end_row: usize,
    pub time_downsample: usize,
    pub freq_downsample: usize,
    pub scaled: bool,
    /// Форма после squeeze/transpose
    pub shape: Vec<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub times: Option<&'a [f64]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freqs: Option<&'a [f64]>,
    /// Данные в логическом порядке (только для формата `json`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<f32>>,
}

/// Что и куда записано.
#[derive(Debug, Clone, Default)]
pub struct ExportReport {
    pub files: Vec<PathBuf>,
    pub bytes_written: u64,
}

impl<'a> Manifest<'a> {
    pub fn new(
        cfg: &'a DumpConfig,
        file_header: &'a FileHeader,
        subint_header: &'a SubintHeader,
        plan: &DecodePlan,
        block: &'a DecodedBlock,
    ) -> Self {
        Manifest {
            source: cfg.input(),
            file_header,
            subint_header,
            start_row: plan.start_row,
            end_row: plan.end_row,
            time_downsample: plan.time_downsample,
            freq_downsample: plan.freq_downsample,
            scaled: cfg.request.apply_scales,
            shape: block.shape().to_vec(),
            times: block.times.as_deref(),
            freqs: block.freqs.as_deref(),
            data: None,
        }
    }
}

/// Записывает массив как little-endian `f32`. Возвращает число байт.
pub fn write_raw_f32<W: Write>(
    writer: &mut W,
    data: &ArrayD<f32>,
) -> std::io::Result<u64> {
    for &v in data.iter() {
        writer.write_f32::<LittleEndian>(v)?;
    }
    Ok(data.len() as u64 * 4)
}

/// Выгружает блок в формате из конфигурации.
pub fn export_block(
    cfg: &DumpConfig,
    mut manifest: Manifest<'_>,
    data: &ArrayD<f32>,
) -> DumpResult<ExportReport> {
    let mut report = ExportReport::default();

    match cfg.format {
        OutputFormat::Header => {}
        OutputFormat::Raw => {
            let path = cfg.data_path();
            let mut w = BufWriter::new(File::create(&path)?);
            report.bytes_written += write_raw_f32(&mut w, data)?;
            w.flush()?;
            debug!("Wrote {} bytes to {path:?}", report.bytes_written);
            report.files.push(path);

            let sidecar = cfg.sidecar_path();
            report.bytes_written += write_json(&sidecar, &manifest)?;
            report.files.push(sidecar);
        }
        OutputFormat::Json => {
            manifest.data = Some(data.iter().copied().collect());

            let path = cfg.data_path();
            report.bytes_written += write_json(&path, &manifest)?;
            report.files.push(path);
        }
    }

    Ok(report)
}

fn write_json<T: Serialize>(
    path: &Path,
    value: &T,
) -> DumpResult<u64> {
    let bytes = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, &bytes)?;
    debug!("Wrote {} bytes to {path:?}", bytes.len());
    Ok(bytes.len() as u64)
}
