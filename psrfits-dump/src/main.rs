use std::{path::PathBuf, time::Instant};

use clap::Parser;
use log::{error, info, warn};
use psrfits_core::SubintDecoder;
use psrfits_dump::{
    export_block, parse_row_range, DumpConfig, DumpError, DumpResult, DumpSummary, Manifest,
    OutputFormat,
};
use psrfits_types::DecodeRequest;

#[derive(Parser, Debug)]
#[command(
    name = "psrfits-dump",
    version = env!("CARGO_PKG_VERSION"),
    about = "Decode search-mode PSRFITS subintegrations to a dense array",
    long_about = None,
)]
struct Cli {
    /// Входной PSRFITS файл
    input: PathBuf,
    /// Базовое имя выходных файлов
    #[arg(short, long, default_value = "decoded")]
    output: PathBuf,
    /// Строки START[:END], END включительно, -1 — последняя
    #[arg(short, long, default_value = "0:-1")]
    rows: String,
    /// Прореживание по времени (0 = без прореживания)
    #[arg(short = 't', long, default_value = "1")]
    time_downsample: usize,
    /// Прореживание по частоте (0 = вся полоса в один канал)
    #[arg(short = 'f', long, default_value = "1")]
    freq_downsample: usize,
    /// Применить DAT_SCL / DAT_OFFS
    #[arg(long)]
    scale: bool,
    /// Не сохранять оси времени и частоты
    #[arg(long)]
    no_axes: bool,
    /// Удалить оси длины 1
    #[arg(long)]
    squeeze: bool,
    /// Развернуть порядок осей
    #[arg(long)]
    transpose: bool,
    /// Формат выгрузки: header, raw, json
    #[arg(long, default_value = "raw")]
    format: String,
    /// Тихий режим (только ошибки)
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
    /// Подробный вывод (каждая строка)
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> DumpResult<DumpConfig> {
        let format: OutputFormat = self
            .format
            .parse()
            .map_err(|e| DumpError::argument("format", e))?;
        let (start_row, end_row) =
            parse_row_range(&self.rows).map_err(|e| DumpError::argument("rows", e))?;

        let mut request = DecodeRequest::new(start_row)
            .time_downsample(self.time_downsample)
            .freq_downsample(self.freq_downsample)
            .apply_scales(self.scale)
            .with_axes(!self.no_axes)
            .squeeze(self.squeeze)
            .transpose(self.transpose);
        request.end_row = end_row;

        Ok(DumpConfig {
            input: self.input,
            output: self.output,
            format,
            request,
        })
    }
}

fn run(cfg: &DumpConfig) -> DumpResult<()> {
    let started = Instant::now();
    let mut decoder = SubintDecoder::open(&cfg.input)?;

    let fh = decoder.file_header().clone();
    let sh = decoder.subint_header().clone();

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  File          : {:?}", cfg.input);
    info!("  Source        : {}", fh.source_name);
    info!("  RA / DEC      : {} / {}", fh.ra, fh.dec);
    info!("  Obs mode      : {}", fh.obs_mode.as_deref().unwrap_or("<missing>"));
    info!("  Rows          : {} x {:.3}s", sh.nrows, sh.row_duration());
    info!("  Bits          : {}", sh.nbits);
    info!("  Channels      : {}", sh.nchan);
    info!("  Pols          : {} ({})", sh.npol, sh.pol_type.trim());
    info!("  NSBLK / TBIN  : {} / {:.3e}s", sh.nsblk, sh.tbin);
    info!("  Samples       : {}", sh.total_samples());
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    if !cfg.format.needs_decode() {
        return Ok(());
    }

    let plan = decoder.plan(&cfg.request)?;
    let (ntime, npol, nchan) = plan.output_shape(sh.npol);
    info!(
        "Decoding rows {}..={} -> [{ntime}, {npol}, {nchan}]",
        plan.start_row, plan.end_row
    );

    let block = decoder.decode(&cfg.request)?;
    let manifest = Manifest::new(cfg, &fh, &sh, &plan, &block);
    let report = export_block(cfg, manifest, &block.data)?;

    let summary = DumpSummary::new(&started, &plan, block.data.len(), report.bytes_written);
    info!("\n{summary}");

    if report.files.is_empty() {
        warn!("Nothing was written");
    }
    for path in &report.files {
        info!("✓ Written: {path:?}");
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet {
        log::LevelFilter::Error
    } else if cli.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::new()
        .filter_level(level)
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let config = match cli.into_config() {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(&config) {
        error!("{e}");
        std::process::exit(1);
    }
}
