//! Eigen-decomposition of the symmetrically normalized adjacency matrix.
//!
//! The normalized matrix `D^{-1/2} A D^{-1/2}` is never formed. Its
//! matrix-vector product is assembled around the operator's fast apply
//! inside a reverse-communication loop: the Krylov solver hands out a
//! vector, the loop scales it by `1/√deg`, runs the plan, scales and
//! corrects the result, and hands the product back. A `+1` spectral shift
//! keeps the wanted eigenvalues largest in magnitude; it is undone before
//! returning.

use ndarray::Array2;
use num_complex::Complex64;
use tracing::debug;

use fastadj_lanczos::{LanczosStep, SymmetricLanczos};

use crate::error::AdjacencyError;
use crate::operator::AdjacencyOperator;

/// Restart budget used when [`EigsConfig::maxiter`] is zero.
pub const DEFAULT_MAXITER: usize = 300;

/// Tuning for [`AdjacencyOperator::normalized_eigs`]. Zero fields select
/// the documented defaults.
#[derive(Debug, Clone)]
pub struct EigsConfig {
    /// Relative residual tolerance; `0` selects the solver default.
    pub tol: f64,
    /// Restart budget; `0` selects [`DEFAULT_MAXITER`].
    pub maxiter: usize,
    /// Krylov subspace dimension; `0` derives `min(n, max(2·nev + 1, 20))`.
    pub ncv: usize,
    pub return_eigenvectors: bool,
}

impl Default for EigsConfig {
    fn default() -> Self {
        Self { tol: 0.0, maxiter: 0, ncv: 0, return_eigenvectors: true }
    }
}

/// Eigenvalues ascending; eigenvectors, when requested, as the columns of
/// an `n × nev` array in matching order.
#[derive(Debug, Clone)]
pub struct EigsResult {
    pub eigenvalues: Vec<f64>,
    pub eigenvectors: Option<Array2<f64>>,
}

impl AdjacencyOperator {
    /// The `nev` largest-magnitude eigenpairs of `D^{-1/2} A D^{-1/2}`,
    /// where `deg = A·1` with the current diagonal.
    ///
    /// Requires bound points and `1 ≤ nev < n`. The plan's weight buffer is
    /// clobbered as working storage; callers reload weights before any
    /// subsequent direct use of the plan (the operator's own `apply` always
    /// does).
    pub fn normalized_eigs(
        &mut self,
        nev: usize,
        config: &EigsConfig,
    ) -> Result<EigsResult, AdjacencyError> {
        let n = self.num_points();
        if n == 0 {
            return Err(AdjacencyError::PointsNotSet { op: "normalized_eigs" });
        }
        if nev == 0 || nev >= n {
            return Err(AdjacencyError::InvalidNev { nev, n });
        }
        let ncv = if config.ncv > 0 { config.ncv } else { derive_ncv(nev, n) };
        let maxiter = if config.maxiter > 0 { config.maxiter } else { DEFAULT_MAXITER };

        let inv_sqrt = self.inverse_sqrt_degrees()?;

        let mut solver = SymmetricLanczos::new(n, nev, ncv, config.tol, maxiter)
            .map_err(|e| AdjacencyError::Eigensolver { phase: "setup", code: e.code() })?;
        self.drive(&mut solver, &inv_sqrt, 1.0)?;

        let (mut eigenvalues, flat) = solver
            .extract(config.return_eigenvectors)
            .map_err(|e| AdjacencyError::Eigensolver { phase: "extraction", code: e.code() })?;
        // Undo the +1 shift applied inside the product.
        for v in &mut eigenvalues {
            *v -= 1.0;
        }

        let eigenvectors = flat.map(|cols| {
            let mut out = Array2::zeros((n, nev));
            for c in 0..nev {
                for i in 0..n {
                    out[[i, c]] = cols[c * n + i];
                }
            }
            out
        });

        Ok(EigsResult { eigenvalues, eigenvectors })
    }

    /// 2-norm of the symmetrically normalized Laplacian
    /// `I − D^{-1/2} A D^{-1/2}`, its largest eigenvalue.
    pub fn normalized_laplacian_norm(&mut self, tol: f64) -> Result<f64, AdjacencyError> {
        let n = self.num_points();
        if n == 0 {
            return Err(AdjacencyError::PointsNotSet { op: "normalized_laplacian_norm" });
        }
        if n < 2 {
            return Err(AdjacencyError::InvalidNev { nev: 1, n });
        }

        let inv_sqrt = self.inverse_sqrt_degrees()?;
        let mut solver = SymmetricLanczos::new(n, 1, derive_ncv(1, n), tol, DEFAULT_MAXITER)
            .map_err(|e| AdjacencyError::Eigensolver { phase: "setup", code: e.code() })?;
        self.drive(&mut solver, &inv_sqrt, -1.0)?;

        let (eigenvalues, _) = solver
            .extract(false)
            .map_err(|e| AdjacencyError::Eigensolver { phase: "extraction", code: e.code() })?;
        // The Laplacian is positive semidefinite; abs only absorbs rounding.
        Ok(eigenvalues[0].abs())
    }

    /// `1/√deg_i` with `deg = A·1` under the current diagonal.
    fn inverse_sqrt_degrees(&mut self) -> Result<Vec<f64>, AdjacencyError> {
        let n = self.num_points();
        let degrees = self.apply(&vec![1.0; n], false)?;
        Ok(degrees.iter().map(|&d| 1.0 / d.sqrt()).collect())
    }

    /// Run the solver to completion against `v ↦ v + sign·D^{-1/2} A
    /// D^{-1/2} v`, with `sign = 1` for the shifted adjacency and `-1` for
    /// the Laplacian.
    fn drive(
        &mut self,
        solver: &mut SymmetricLanczos,
        inv_sqrt: &[f64],
        sign: f64,
    ) -> Result<(), AdjacencyError> {
        let n = self.num_points();
        loop {
            match solver.step() {
                Ok(LanczosStep::Apply { input, output }) => {
                    let scaled: Vec<f64> = (0..n)
                        .map(|i| inv_sqrt[i] * solver.workd()[input + i])
                        .collect();

                    let buf = self.plan_mut().weights_mut()?;
                    for (slot, &w) in buf.iter_mut().zip(scaled.iter()) {
                        *slot = Complex64::new(w, 0.0);
                    }
                    self.plan_mut().transform()?;

                    let kernel = self.kernel();
                    let diagonal = self.diagonal();
                    let results = self.plan_mut().results()?;
                    let product: Vec<f64> = (0..n)
                        .map(|i| {
                            let aw = results[i].re
                                + kernel.diagonal_correction(diagonal, scaled[i]);
                            solver.workd()[input + i] + sign * inv_sqrt[i] * aw
                        })
                        .collect();

                    solver.workd_mut()[output..output + n].copy_from_slice(&product);
                }
                Ok(LanczosStep::Converged { restarts, products }) => {
                    debug!(restarts, products, sign, "normalized product loop finished");
                    return Ok(());
                }
                Err(e) => {
                    return Err(AdjacencyError::Eigensolver {
                        phase: "iteration",
                        code: e.code(),
                    });
                }
            }
        }
    }
}

fn derive_ncv(nev: usize, n: usize) -> usize {
    n.min((2 * nev + 1).max(20))
}
