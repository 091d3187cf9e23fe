//! spectral-norm: power method on the infinite matrix `A`, two lanes at a
//! time. Row indices are derived from a sourced stride and one lane reads an
//! operand through a sourced array index, so every matrix entry is tainted.

use crate::error::TaintError;
use crate::host::{HostStore, Tracked};

pub type Pair = [Tracked<f64>; 2];

fn splat(v: Tracked<f64>) -> Pair {
    [v, v]
}

/// Entries `A(i, j)` for both lanes.
pub fn a(store: &mut HostStore, i: &Pair, j: &Pair) -> Pair {
    let lane = Tracked::index(i, store.source_value(1usize)).unwrap_or_default();
    let s0 = i[0] + j[0];
    let v0 = (s0 * (i[0] + j[0] + 1.0)) / 2.0 + i[0] + 1.0;
    let s1 = i[1] + j[1];
    let v1 = (s1 * (lane + j[1] + 1.0)) / 2.0 + i[1] + 1.0;
    [v0, v1]
}

/// `out = A v`, or `out = A' v` when `transpose` is set.
fn mult(store: &mut HostStore, v: &[Pair], out: &mut [Pair], transpose: bool) {
    for (i, slot) in out.iter_mut().enumerate() {
        let idx = store.source_value(2.0) * i as f64;
        let (i0, i1) = (splat(idx), splat(idx + 1.0));
        let zero = Tracked::new(0.0);
        let (mut sum0, mut sum1) = ([zero; 2], [zero; 2]);
        for (j, x) in v.iter().enumerate() {
            let j = [Tracked::new(2.0 * j as f64), Tracked::new(2.0 * j as f64 + 1.0)];
            let (a0, a1) = if transpose {
                (a(store, &j, &i0), a(store, &j, &i1))
            } else {
                (a(store, &i0, &j), a(store, &i1, &j))
            };
            sum0[0] += x[0] / a0[0];
            sum0[1] += x[1] / a0[1];
            sum1[0] += x[0] / a1[0];
            sum1[1] += x[1] / a1[1];
        }
        *slot = [sum0[0] + sum0[1], sum1[0] + sum1[1]];
    }
}

fn mult_at_av(store: &mut HostStore, v: &[Pair], out: &mut [Pair], tmp: &mut [Pair]) {
    mult(store, v, tmp, false);
    mult(store, tmp, out, true);
}

fn dot(a: &[Pair], b: &[Pair]) -> Tracked<f64> {
    let mut sum = [Tracked::new(0.0); 2];
    for (x, y) in a.iter().zip(b) {
        sum[0] += x[0] * y[0];
        sum[1] += x[1] * y[1];
    }
    sum[0] + sum[1]
}

/// Spectral norm of the `n` by `n` truncation of `A`; `n` is taken down to
/// the nearest even number.
pub fn spectral_norm(store: &mut HostStore, n: usize) -> Tracked<f64> {
    let lanes = n / 2;
    let mut u = vec![splat(Tracked::new(1.0)); lanes];
    let mut v = vec![splat(Tracked::new(0.0)); lanes];
    let mut tmp = vec![splat(Tracked::new(0.0)); lanes];
    for _ in 0..10 {
        mult_at_av(store, &u, &mut v, &mut tmp);
        mult_at_av(store, &v, &mut u, &mut tmp);
    }
    (dot(&u, &v) / dot(&v, &v)).map(f64::sqrt)
}

pub fn benchmark(store: &mut HostStore, n: i32) -> Result<f64, TaintError> {
    let answer = spectral_norm(store, n.max(0) as usize);
    store.assert_is_tainted(&answer)?;
    Ok(store.sanitize(answer).into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_follow_the_closed_form() {
        let mut store = HostStore::new();
        let i = [Tracked::new(0.0), Tracked::new(1.0)];
        let j = [Tracked::new(2.0), Tracked::new(3.0)];
        let [v0, v1] = a(&mut store, &i, &j);
        // A(i, j) = (i + j)(i + j + 1) / 2 + i + 1
        assert_eq!(*v0.value(), 4.0);
        assert_eq!(*v1.value(), 12.0);
        assert!(!store.is_tainted(&v0));
        assert!(store.is_tainted(&v1));
    }

    #[test]
    fn small_matrix_norm() {
        let mut store = HostStore::new();
        let answer = benchmark(&mut store, 10).unwrap();
        assert!((answer - 1.2718440192507245).abs() < 1e-12);
    }
}
