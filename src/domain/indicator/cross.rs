//! CROSS(A,B): A crosses above B on this bar.
//!
//! false at index 0; otherwise `A[i] > B[i] && A[i-1] <= B[i-1]`. Any
//! comparison with a NaN operand is false.

pub fn cross(a: &[f64], b: &[f64]) -> Vec<bool> {
    let len = a.len().min(b.len());
    let mut values = vec![false; len];
    for i in 1..len {
        values[i] = a[i] > b[i] && a[i - 1] <= b[i - 1];
    }
    values
}
