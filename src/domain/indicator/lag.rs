//! REF: the value `n` bars ago.
//!
//! REF(X,n)[i] = X[i-n]; NaN for i < n.

pub fn lag(x: &[f64], n: usize) -> Vec<f64> {
    let mut values = vec![f64::NAN; x.len()];
    for i in n..x.len() {
        values[i] = x[i - n];
    }
    values
}
