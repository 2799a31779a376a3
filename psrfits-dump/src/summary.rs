use std::time::Instant;

use psrfits_core::DecodePlan;

/// Итог одного запуска для вывода в конце.
#[derive(Debug, Clone, Default)]
pub struct DumpSummary {
    pub duration_secs: f64,
    pub rows_decoded: usize,
    /// Количество значений в выходном массиве
    pub values: usize,
    /// Длительность декодированного участка наблюдения, секунды
    pub span_secs: f64,
    pub bytes_written: u64,
    pub rows_per_sec: f64,
}

impl DumpSummary {
    pub fn new(
        started: &Instant,
        plan: &DecodePlan,
        values: usize,
        bytes_written: u64,
    ) -> Self {
        let secs = started.elapsed().as_secs_f64();
        let rows = plan.rows();

        DumpSummary {
            duration_secs: secs,
            rows_decoded: rows,
            values,
            span_secs: (rows * plan.nsblk_ds) as f64 * plan.tbin_ds,
            bytes_written,
            rows_per_sec: if secs < 1e-9 { 0.0 } else { rows as f64 / secs },
        }
    }
}

impl std::fmt::Display for DumpSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration      : {:.2}s", self.duration_secs)?;
        writeln!(f, "  Rows decoded  : {}", self.rows_decoded)?;
        writeln!(f, "  Values        : {}", self.values)?;
        writeln!(f, "  Time span     : {:.3}s", self.span_secs)?;
        writeln!(
            f,
            "  Bytes written : {:.1} MB",
            self.bytes_written as f64 / 1e6
        )?;
        writeln!(f, "  Throughput    : {:.1} rows/s", self.rows_per_sec)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}
