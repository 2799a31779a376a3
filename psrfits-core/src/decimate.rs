use crate::unpack::{RowDims, RowSamples};

/// Среднее `factor` подряд идущих выборок, начиная с `first_sample`,
/// для поляризации `ipol`. Результат — спектр длины `nchan` в `out`.
pub fn mean_over_time(
    samples: &RowSamples<'_>,
    dims: RowDims,
    first_sample: usize,
    factor: usize,
    ipol: usize,
    signed: bool,
    out: &mut [f64],
) {
    out.fill(0.0);

    for isamp in first_sample..first_sample + factor {
        let base = dims.index(isamp, ipol);
        for (ichan, acc) in out.iter_mut().enumerate() {
            *acc += samples.value(base + ichan, signed);
        }
    }

    let n = factor as f64;
    out.iter_mut().for_each(|v| *v /= n);
}

/// `v * scale + offset`, именно в таком порядке.
pub fn apply_scale_offset(
    spectrum: &mut [f64],
    scales: &[f64],
    offsets: &[f64],
) {
    for ((v, &s), &o) in spectrum.iter_mut().zip(scales).zip(offsets) {
        *v = *v * s + o;
    }
}

/// Среднее по группам из `factor` соседних элементов.
///
/// `input.len()` должен делиться на `factor`.
pub fn group_mean(
    input: &[f64],
    factor: usize,
    out: &mut [f64],
) {
    let n = factor as f64;

    for (dst, group) in out.iter_mut().zip(input.chunks_exact(factor)) {
        *dst = group.iter().sum::<f64>() / n;
    }
}
