pub mod astigmatism;
pub mod baseline;
pub mod defocus;
pub mod envelope;
pub mod residual;
pub mod water_ring;

/// Neighbourhood half-width (bins) used when looking for local extrema in a
/// profile of `n` bins.
pub(crate) fn kernel_half_width(n: usize, min: usize) -> usize {
    (n / 100).max(min)
}

/// Index and value of the smallest element within `k` bins of `center`.
pub(crate) fn window_min(values: &[f64], center: usize, k: usize) -> Option<(usize, f64)> {
    window(values, center, k).min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Index and value of the largest element within `k` bins of `center`.
pub(crate) fn window_max(values: &[f64], center: usize, k: usize) -> Option<(usize, f64)> {
    window(values, center, k).max_by(|a, b| a.1.total_cmp(&b.1))
}

fn window(values: &[f64], center: usize, k: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
    let lo = center.saturating_sub(k).min(values.len());
    let hi = (center + k + 1).min(values.len());
    values[lo..hi]
        .iter()
        .enumerate()
        .map(move |(j, &v)| (lo + j, v))
}
