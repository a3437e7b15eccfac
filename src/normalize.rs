//
// normalize.rs
// Medprep-rs
//
// Rescales raw pixel intensities into the numeric range selected by the normalization mode.
//
// Thales Matheus Mendonça Santos - November 2025

use ndarray::Array2;

use crate::config::NormalizationMode;

/// Rescale `array` in place according to `mode`.
///
/// Constant images never produce non-finite values: min-max modes treat the
/// degenerate ratio as 0 (so `minmax01` yields 0 and `minmax11` yields -1) and
/// `zscore` yields 0.
pub fn normalize(array: &mut Array2<f64>, mode: NormalizationMode) {
    match mode {
        NormalizationMode::MinMax01 => rescale_min_max(array, 0.0, 1.0),
        NormalizationMode::MinMax11 => rescale_min_max(array, -1.0, 1.0),
        NormalizationMode::ZScore => standardize(array),
        NormalizationMode::Raw => {}
    }
}

fn rescale_min_max(array: &mut Array2<f64>, low: f64, high: f64) {
    let min = array.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = array.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    let span = max - min;

    if !span.is_finite() || span <= 0.0 {
        array.fill(low);
        return;
    }

    let scale = high - low;
    array.mapv_inplace(|v| low + scale * ((v - min) / span));
}

fn standardize(array: &mut Array2<f64>) {
    let mean = match array.mean() {
        Some(mean) => mean,
        None => return,
    };
    // Population standard deviation (no degrees-of-freedom correction).
    let std = array.std(0.0);

    if std == 0.0 || !std.is_finite() {
        array.fill(0.0);
        return;
    }

    array.mapv_inplace(|v| (v - mean) / std);
}

/// Minimum and maximum of a normalized array, used by diagnostics and tests.
pub fn value_range(array: &Array2<f64>) -> (f64, f64) {
    let min = array.iter().fold(f64::INFINITY, |a, &b| a.min(b));
    let max = array.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
    (min, max)
}
