//! Dense symmetric eigen-decomposition for the projected problem.
//!
//! The Lanczos driver projects the implicit operator onto its Krylov basis;
//! after a thick restart that projection is arrowhead-plus-tridiagonal, not
//! tridiagonal, so a general symmetric solver is needed. Cyclic Jacobi is
//! exact enough and unconditionally stable at the `m ≤ ncv` sizes involved.

const MAX_SWEEPS: usize = 64;

/// Eigen-decomposition of the dense symmetric matrix `a` (row-major,
/// `m × m`; only the stored values are read, symmetry is assumed).
///
/// Returns eigenvalues in ascending order and eigenvectors column-major
/// (`vecs[j*m + i]` is component `i` of the eigenvector for `vals[j]`).
pub fn symmetric_eig(a: &[f64], m: usize) -> (Vec<f64>, Vec<f64>) {
    debug_assert_eq!(a.len(), m * m);
    if m == 0 {
        return (Vec::new(), Vec::new());
    }

    let mut w = a.to_vec();
    // Accumulated rotations, row-major: v[i*m + j] is entry (i, j).
    let mut v = vec![0.0f64; m * m];
    for i in 0..m {
        v[i * m + i] = 1.0;
    }

    for _ in 0..MAX_SWEEPS {
        let off: f64 = (0..m)
            .flat_map(|p| ((p + 1)..m).map(move |q| (p, q)))
            .map(|(p, q)| w[p * m + q] * w[p * m + q])
            .sum();
        let norm: f64 = w.iter().map(|x| x * x).sum();
        if off <= f64::EPSILON * f64::EPSILON * norm.max(f64::MIN_POSITIVE) {
            break;
        }

        for p in 0..m {
            for q in (p + 1)..m {
                let apq = w[p * m + q];
                if apq == 0.0 {
                    continue;
                }
                let app = w[p * m + p];
                let aqq = w[q * m + q];
                let theta = (aqq - app) / (2.0 * apq);
                let t = if theta >= 0.0 {
                    1.0 / (theta + (1.0 + theta * theta).sqrt())
                } else {
                    -1.0 / (-theta + (1.0 + theta * theta).sqrt())
                };
                let c = 1.0 / (1.0 + t * t).sqrt();
                let s = t * c;

                // Rotate rows/columns p and q of W.
                for k in 0..m {
                    let wkp = w[k * m + p];
                    let wkq = w[k * m + q];
                    w[k * m + p] = c * wkp - s * wkq;
                    w[k * m + q] = s * wkp + c * wkq;
                }
                for k in 0..m {
                    let wpk = w[p * m + k];
                    let wqk = w[q * m + k];
                    w[p * m + k] = c * wpk - s * wqk;
                    w[q * m + k] = s * wpk + c * wqk;
                }
                // Accumulate into V.
                for k in 0..m {
                    let vkp = v[k * m + p];
                    let vkq = v[k * m + q];
                    v[k * m + p] = c * vkp - s * vkq;
                    v[k * m + q] = s * vkp + c * vkq;
                }
            }
        }
    }

    // Sort ascending by eigenvalue, carrying eigenvector columns along.
    let mut order: Vec<usize> = (0..m).collect();
    order.sort_by(|&i, &j| {
        w[i * m + i]
            .partial_cmp(&w[j * m + j])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let vals: Vec<f64> = order.iter().map(|&i| w[i * m + i]).collect();
    let mut vecs = vec![0.0f64; m * m];
    for (col, &src) in order.iter().enumerate() {
        for i in 0..m {
            vecs[col * m + i] = v[i * m + src];
        }
    }
    (vals, vecs)
}
