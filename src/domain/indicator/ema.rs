//! Exponential Moving Average.
//!
//! k = 2/(n+1), seed with the first value, then EMA[i] = X[i]*k + EMA[i-1]*(1-k).
//! No warm-up: defined from index 0. When EMA[i-1] is NaN the recurrence
//! re-seeds from X[i], so a leading NaN run in X does not poison the rest.

pub fn ema(x: &[f64], n: usize) -> Vec<f64> {
    let mut values = Vec::with_capacity(x.len());
    if n == 0 {
        values.resize(x.len(), f64::NAN);
        return values;
    }

    let k = 2.0 / (n as f64 + 1.0);
    let mut prev = f64::NAN;

    for &v in x {
        let current = if prev.is_nan() {
            v
        } else {
            v * k + prev * (1.0 - k)
        };
        values.push(current);
        prev = current;
    }

    values
}
