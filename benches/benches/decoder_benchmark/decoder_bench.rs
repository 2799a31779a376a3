//! Декодирование строк SUBINT из таблицы в памяти.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use psrfits_core::{
    unpack::unpack_bits, MemoryTable, SubintDecoder, COL_DATA, COL_DAT_FREQ, COL_DAT_OFFS,
    COL_DAT_SCL, COL_OFFS_SUB, COL_TSUBINT, PRIMARY, SUBINT,
};
use psrfits_types::{BitDepth, DecodeRequest};
use rand::{rngs::SmallRng, Rng, SeedableRng};

const NROWS: usize = 4;
const NSBLK: usize = 1024;
const NPOL: usize = 2;
const NCHAN: usize = 256;
const TBIN: f64 = 6.4e-5;

/// Синтетическое наблюдение со случайными данными (фиксированный seed).
fn synthetic_table(depth: BitDepth) -> MemoryTable {
    let mut rng = SmallRng::seed_from_u64(0x5EED);
    let row_bytes = depth.row_bytes(NSBLK, NPOL, NCHAN);

    let rows: Vec<Vec<u8>> = (0..NROWS)
        .map(|_| {
            let mut row = vec![0u8; row_bytes];
            rng.fill(&mut row[..]);
            row
        })
        .collect();

    let nvals = NPOL * NCHAN;
    let tsub = NSBLK as f64 * TBIN;
    let mut t = MemoryTable::new();

    t.set_header(PRIMARY, "SRC_NAME", "BENCH")
        .set_header(PRIMARY, "RA", "00:00:00")
        .set_header(PRIMARY, "DEC", "+00:00:00")
        .set_header(PRIMARY, "OBS_MODE", "SEARCH")
        .set_header(SUBINT, "NAXIS2", NROWS as i64)
        .set_header(SUBINT, "POL_TYPE", "AABB")
        .set_header(SUBINT, "NPOL", NPOL as i64)
        .set_header(SUBINT, "TBIN", TBIN)
        .set_header(SUBINT, "NBITS", i64::from(depth.bits()))
        .set_header(SUBINT, "NCHAN", NCHAN as i64)
        .set_header(SUBINT, "NSBLK", NSBLK as i64)
        .set_bytes_column(SUBINT, COL_DATA, rows)
        .set_f64_column(SUBINT, COL_DAT_SCL, vec![vec![1.5; nvals]; NROWS])
        .set_f64_column(SUBINT, COL_DAT_OFFS, vec![vec![-0.5; nvals]; NROWS])
        .set_f64_column(
            SUBINT,
            COL_DAT_FREQ,
            vec![(0..NCHAN).map(|c| 1200.0 + c as f64 * 0.5).collect(); NROWS],
        )
        .set_f64_column(
            SUBINT,
            COL_OFFS_SUB,
            (0..NROWS).map(|r| vec![(r as f64 + 0.5) * tsub]).collect(),
        )
        .set_f64_column(SUBINT, COL_TSUBINT, vec![vec![tsub]; NROWS]);
    t
}

fn bench_bit_depths(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_all_rows");
    group.throughput(Throughput::Elements((NROWS * NSBLK * NPOL * NCHAN) as u64));

    for depth in [BitDepth::One, BitDepth::Two, BitDepth::Four, BitDepth::Eight] {
        let mut decoder = SubintDecoder::from_reader(synthetic_table(depth))
            .expect("synthetic headers are complete");
        let req = DecodeRequest::all_rows();

        group.bench_with_input(BenchmarkId::from_parameter(depth), &req, |b, req| {
            b.iter(|| black_box(decoder.decode(req).expect("decode")))
        });
    }

    group.finish();
}

fn bench_downsample(c: &mut Criterion) {
    let mut decoder = SubintDecoder::from_reader(synthetic_table(BitDepth::Eight))
        .expect("synthetic headers are complete");
    let mut group = c.benchmark_group("decode_downsample");

    for (tds, fds) in [(1, 1), (8, 1), (1, 16), (16, 16)] {
        let req = DecodeRequest::all_rows()
            .time_downsample(tds)
            .freq_downsample(fds)
            .apply_scales(true)
            .with_axes(true);

        group.bench_with_input(
            BenchmarkId::new("t_f", format!("{tds}x{fds}")),
            &req,
            |b, req| b.iter(|| black_box(decoder.decode(req).expect("decode"))),
        );
    }

    group.finish();
}

fn bench_unpack_bits(c: &mut Criterion) {
    let mut rng = SmallRng::seed_from_u64(7);
    let mut packed = vec![0u8; NSBLK * NPOL * NCHAN / 8];
    rng.fill(&mut packed[..]);

    c.bench_function("unpack_bits_64k", |b| {
        b.iter(|| black_box(unpack_bits(black_box(&packed))))
    });
}

criterion_group!(benches, bench_bit_depths, bench_downsample, bench_unpack_bits);
criterion_main!(benches);
