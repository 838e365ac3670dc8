//! HHV / LLV: highest and lowest value over the last `n` bars.
//!
//! The window is [max(0, i-n+1), i], clipped at the start of the series, so
//! there is no warm-up. NaN elements are skipped; a window holding nothing but
//! NaN yields NaN.

pub fn hhv(x: &[f64], n: usize) -> Vec<f64> {
    window_fold(x, n, f64::max)
}

pub fn llv(x: &[f64], n: usize) -> Vec<f64> {
    window_fold(x, n, f64::min)
}

fn window_fold(x: &[f64], n: usize, pick: fn(f64, f64) -> f64) -> Vec<f64> {
    let n = n.max(1);
    (0..x.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(n);
            // f64::max / f64::min return the non-NaN operand, so seeding with NaN
            // leaves NaN only when the whole window is NaN
            x[start..=i].iter().fold(f64::NAN, |acc, &v| pick(acc, v))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hhv_clipped_window() {
        let values = hhv(&[3.0, 1.0, 4.0, 1.0, 5.0, 2.0], 3);
        assert_eq!(values, vec![3.0, 3.0, 4.0, 4.0, 5.0, 5.0]);
    }

    #[test]
    fn llv_clipped_window() {
        let values = llv(&[3.0, 1.0, 4.0, 1.0, 5.0, 2.0], 3);
        assert_eq!(values, vec![3.0, 1.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn window_of_one_is_identity() {
        let x = vec![2.0, 7.0, 1.0];
        assert_eq!(hhv(&x, 1), x);
        assert_eq!(llv(&x, 1), x);
    }

    #[test]
    fn nan_elements_are_skipped() {
        let values = hhv(&[f64::NAN, 2.0, f64::NAN, 1.0], 2);
        assert!(values[0].is_nan());
        assert_eq!(values[1], 2.0);
        assert_eq!(values[2], 2.0);
        assert_eq!(values[3], 1.0);
    }

    #[test]
    fn all_nan_window_is_nan() {
        let values = llv(&[f64::NAN, f64::NAN, 4.0], 2);
        assert!(values[0].is_nan());
        assert!(values[1].is_nan());
        assert_eq!(values[2], 4.0);
    }

    #[test]
    fn empty_input() {
        assert!(hhv(&[], 5).is_empty());
        assert!(llv(&[], 5).is_empty());
    }
}
