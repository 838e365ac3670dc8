//! Simple moving average.
//!
//! MA(X,n)[i] = mean(X[i-n+1..=i]). Warmup: first (n-1) values are NaN.

pub fn ma(x: &[f64], n: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; x.len()];
    if n == 0 {
        return values;
    }

    for i in (n - 1)..x.len() {
        let window = &x[i + 1 - n..=i];
        values[i] = window.iter().sum::<f64>() / n as f64;
    }

    values
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ma_warmup_is_nan() {
        let values = ma(&[10.0, 11.0, 12.0, 13.0], 3);
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert!(!values[2].is_nan());
        assert!(!values[3].is_nan());
    }

    #[test]
    fn ma_window_mean() {
        let values = ma(&[10.0, 11.0, 12.0], 2);
        assert!(values[0].is_nan());
        assert_relative_eq!(values[1], 10.5);
        assert_relative_eq!(values[2], 11.5);
    }

    #[test]
    fn ma_period_1_is_identity() {
        let x = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(ma(&x, 1), x.to_vec());
    }

    #[test]
    fn ma_window_longer_than_series() {
        let values = ma(&[1.0, 2.0], 5);
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn ma_nan_input_poisons_window() {
        let values = ma(&[f64::NAN, 2.0, 4.0], 2);
        assert!(values[1].is_nan());
        assert_relative_eq!(values[2], 3.0);
    }

    #[test]
    fn ma_empty() {
        assert!(ma(&[], 3).is_empty());
    }
}
