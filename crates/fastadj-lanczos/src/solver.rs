//! Reverse-communication thick-restart Lanczos iteration.
//!
//! The solver never sees the operator. Each [`SymmetricLanczos::step`]
//! either requests one operator application — read the vector at
//! `workd[input..input+n]`, write the product at `workd[output..output+n]`,
//! call `step` again — or reports convergence. This is the ARPACK
//! `dsaupd`/`dseupd` protocol shape (request code plus buffer offsets),
//! expressed as an enum instead of an `ido` integer.
//!
//! ## Interior algorithm
//!
//! Lanczos with full reorthogonalization builds an orthonormal basis `V`
//! and the projected symmetric matrix `T = Vᵀ A V`. When the basis reaches
//! `ncv` columns, the Ritz pairs of `T` are examined; the `nev` of largest
//! magnitude are the wanted set ("LM" mode — callers shift their operator
//! so the wanted eigenvalues dominate). If their residual estimates
//! `β·|y_m|` pass the tolerance, the iteration ends; otherwise the wanted
//! Ritz vectors are locked as the first `nev` basis columns (thick
//! restart) and the basis is re-expanded. Exhausting `max_restarts` ends
//! the iteration with the best pairs available, matching ARPACK's
//! non-negative "maxiter taken" status; only genuine failures are errors.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::debug;

use crate::dense::symmetric_eig;

/// Convergence tolerance used when the caller passes `tol <= 0`.
///
/// Pinned explicitly rather than left solver-defined: residual estimates
/// must satisfy `β·|y_m| ≤ DEFAULT_TOL · |θ|`.
pub const DEFAULT_TOL: f64 = 1e-10;

/// Relative threshold below which a residual norm counts as an invariant
/// subspace (Lanczos breakdown).
const BREAKDOWN_TOL: f64 = 1e-13;

#[derive(Debug, Error)]
pub enum LanczosError {
    #[error("problem dimension must be positive")]
    InvalidDimension,

    #[error("nev must satisfy 0 < nev < n (nev={nev}, n={n})")]
    InvalidNev { nev: usize, n: usize },

    #[error("ncv must satisfy nev < ncv <= n (ncv={ncv}, nev={nev}, n={n})")]
    InvalidNcv { ncv: usize, nev: usize, n: usize },

    #[error("failed to extend the Krylov basis with an orthogonal vector")]
    Breakdown,

    #[error("eigenpair extraction requested before the iteration finished")]
    NotConverged,
}

impl LanczosError {
    /// Stable signed status code; negative values are failures.
    pub fn code(&self) -> i32 {
        match self {
            LanczosError::InvalidDimension => -1,
            LanczosError::InvalidNev { .. } => -2,
            LanczosError::InvalidNcv { .. } => -3,
            LanczosError::Breakdown => -9,
            LanczosError::NotConverged => -12,
        }
    }
}

/// One protocol transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanczosStep {
    /// Apply the operator: read `workd[input..input+n]`, write the product
    /// to `workd[output..output+n]`, then call `step` again.
    Apply { input: usize, output: usize },
    /// The iteration is finished; eigenpairs can be extracted.
    /// `restarts` counts completed thick restarts, `products` the
    /// operator applications consumed in total.
    Converged { restarts: usize, products: usize },
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Start,
    /// The caller owes us the product for basis column `column`.
    AwaitingProduct { column: usize },
    Done,
}

/// Reverse-communication symmetric Lanczos solver for the `nev`
/// largest-magnitude eigenpairs of an implicit operator.
#[derive(Debug)]
pub struct SymmetricLanczos {
    n: usize,
    nev: usize,
    ncv: usize,
    tol: f64,
    max_restarts: usize,

    /// Exchange buffer: input vector at `0..n`, product at `n..2n`.
    workd: Vec<f64>,
    /// Orthonormal basis, column `j` at `j*n..(j+1)*n`.
    basis: Vec<f64>,
    /// Projected symmetric matrix `T = Vᵀ A V`, row-major `ncv × ncv`.
    proj: Vec<f64>,

    phase: Phase,
    restarts: usize,
    products: usize,
    rng: StdRng,

    // Populated when the iteration concludes.
    eigvals: Vec<f64>,
    /// Basis coefficients of the selected Ritz vectors, column-major
    /// `basis_size × nev`.
    coeffs: Vec<f64>,
    basis_size: usize,
    nconv: usize,
}

impl SymmetricLanczos {
    /// `tol <= 0` selects [`DEFAULT_TOL`]. `max_restarts` bounds the number
    /// of thick restarts; `0` means a single Krylov cycle.
    pub fn new(
        n: usize,
        nev: usize,
        ncv: usize,
        tol: f64,
        max_restarts: usize,
    ) -> Result<Self, LanczosError> {
        if n == 0 {
            return Err(LanczosError::InvalidDimension);
        }
        if nev == 0 || nev >= n {
            return Err(LanczosError::InvalidNev { nev, n });
        }
        if ncv <= nev || ncv > n {
            return Err(LanczosError::InvalidNcv { ncv, nev, n });
        }

        Ok(Self {
            n,
            nev,
            ncv,
            tol: if tol > 0.0 { tol } else { DEFAULT_TOL },
            max_restarts,
            workd: vec![0.0; 2 * n],
            basis: vec![0.0; ncv * n],
            proj: vec![0.0; ncv * ncv],
            phase: Phase::Start,
            restarts: 0,
            products: 0,
            rng: StdRng::seed_from_u64(0x5eed),
            eigvals: Vec::new(),
            coeffs: Vec::new(),
            basis_size: 0,
            nconv: 0,
        })
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn nev(&self) -> usize {
        self.nev
    }

    pub fn ncv(&self) -> usize {
        self.ncv
    }

    /// Number of operator applications performed so far.
    pub fn products(&self) -> usize {
        self.products
    }

    /// Number of thick restarts performed so far.
    pub fn restarts(&self) -> usize {
        self.restarts
    }

    /// Wanted Ritz pairs whose residual estimate passed the tolerance at
    /// the end of the iteration.
    pub fn nconv(&self) -> usize {
        self.nconv
    }

    pub fn is_done(&self) -> bool {
        matches!(self.phase, Phase::Done)
    }

    /// The exchange buffer the `Apply` offsets point into.
    pub fn workd(&self) -> &[f64] {
        &self.workd
    }

    pub fn workd_mut(&mut self) -> &mut [f64] {
        &mut self.workd
    }

    /// Advance the protocol by one transition.
    pub fn step(&mut self) -> Result<LanczosStep, LanczosError> {
        match self.phase {
            Phase::Start => {
                let v0 = self.random_unit();
                self.basis[..self.n].copy_from_slice(&v0);
                self.request_product(0)
            }
            Phase::Done => Ok(LanczosStep::Converged {
                restarts: self.restarts,
                products: self.products,
            }),
            Phase::AwaitingProduct { column } => self.absorb_product(column),
        }
    }

    /// Extract eigenvalues (ascending) and, optionally, eigenvectors
    /// (column-major, `n × nev`, unit-norm).
    pub fn extract(&self, want_vectors: bool) -> Result<(Vec<f64>, Option<Vec<f64>>), LanczosError> {
        if !self.is_done() {
            return Err(LanczosError::NotConverged);
        }
        let vals = self.eigvals.clone();
        if !want_vectors {
            return Ok((vals, None));
        }

        let m = self.basis_size;
        let mut vecs = vec![0.0f64; self.n * self.nev];
        for col in 0..self.nev {
            let y = &self.coeffs[col * m..(col + 1) * m];
            let x = &mut vecs[col * self.n..(col + 1) * self.n];
            for (j, &yj) in y.iter().enumerate() {
                if yj == 0.0 {
                    continue;
                }
                let v = &self.basis[j * self.n..(j + 1) * self.n];
                for (xi, &vi) in x.iter_mut().zip(v.iter()) {
                    *xi += yj * vi;
                }
            }
        }
        Ok((vals, Some(vecs)))
    }

    fn request_product(&mut self, column: usize) -> Result<LanczosStep, LanczosError> {
        let col = self.basis[column * self.n..(column + 1) * self.n].to_vec();
        self.workd[..self.n].copy_from_slice(&col);
        self.phase = Phase::AwaitingProduct { column };
        Ok(LanczosStep::Apply { input: 0, output: self.n })
    }

    /// Consume the product for `column`, orthogonalize, and decide what
    /// happens next: extend, restart, or conclude.
    fn absorb_product(&mut self, column: usize) -> Result<LanczosStep, LanczosError> {
        self.products += 1;
        let n = self.n;
        let m = column + 1;

        let mut w = self.workd[n..2 * n].to_vec();

        // Full projection pass: T entries and orthogonalization together.
        for i in 0..m {
            let v = &self.basis[i * n..(i + 1) * n];
            let h = dot(v, &w);
            axpy(&mut w, v, -h);
            self.proj[i * self.ncv + column] = h;
            self.proj[column * self.ncv + i] = h;
        }
        // Second pass against rounding; T is not updated.
        for i in 0..m {
            let v = &self.basis[i * n..(i + 1) * n];
            let h = dot(v, &w);
            axpy(&mut w, v, -h);
        }

        let beta = norm(&w);
        let scale = self.projection_scale(m).max(1.0);
        let broke_down = beta <= BREAKDOWN_TOL * scale;

        if m == self.ncv || broke_down {
            return self.finish_cycle(m, beta, broke_down, w);
        }

        // Ordinary extension: v_{m} = w / β.
        for (slot, &wi) in self.basis[m * n..(m + 1) * n].iter_mut().zip(w.iter()) {
            *slot = wi / beta;
        }
        self.request_product(m)
    }

    /// End of a Krylov cycle (basis full or invariant subspace found).
    fn finish_cycle(
        &mut self,
        m: usize,
        beta: f64,
        broke_down: bool,
        residual: Vec<f64>,
    ) -> Result<LanczosStep, LanczosError> {
        let (theta, y) = self.ritz(m);

        // Wanted set: nev Ritz values of largest magnitude.
        let mut order: Vec<usize> = (0..m).collect();
        order.sort_by(|&i, &j| {
            theta[j]
                .abs()
                .partial_cmp(&theta[i].abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        let wanted: Vec<usize> = order.into_iter().take(self.nev.min(m)).collect();

        let nconv = wanted
            .iter()
            .filter(|&&i| {
                let res = if broke_down { 0.0 } else { beta * y[i * m + (m - 1)].abs() };
                res <= self.tol * theta[i].abs().max(f64::EPSILON)
            })
            .count();

        let have_enough = wanted.len() == self.nev;
        if (nconv == self.nev && have_enough) || (self.restarts >= self.max_restarts && have_enough)
        {
            return Ok(self.conclude(m, &theta, &y, &wanted, nconv));
        }

        if broke_down {
            // Invariant subspace smaller than the wanted set: continue in a
            // fresh random direction orthogonal to everything found so far.
            if m == self.ncv {
                return Ok(self.conclude(m, &theta, &y, &wanted, nconv));
            }
            let v_new = self.random_orthogonal(m)?;
            self.basis[m * self.n..(m + 1) * self.n].copy_from_slice(&v_new);
            return self.request_product(m);
        }

        // Thick restart: lock the wanted Ritz vectors, keep the residual
        // direction as the next basis column.
        let k = self.nev;
        let n = self.n;
        let mut new_basis = vec![0.0f64; (k + 1) * n];
        for (pos, &sel) in wanted.iter().enumerate() {
            let yc = &y[sel * m..(sel + 1) * m];
            let u = &mut new_basis[pos * n..(pos + 1) * n];
            for (j, &yj) in yc.iter().enumerate() {
                if yj == 0.0 {
                    continue;
                }
                let v = &self.basis[j * n..(j + 1) * n];
                for (ui, &vi) in u.iter_mut().zip(v.iter()) {
                    *ui += yj * vi;
                }
            }
        }
        for (slot, &ri) in new_basis[k * n..(k + 1) * n].iter_mut().zip(residual.iter()) {
            *slot = ri / beta;
        }
        self.basis[..(k + 1) * n].copy_from_slice(&new_basis);

        self.proj.iter_mut().for_each(|x| *x = 0.0);
        for (pos, &sel) in wanted.iter().enumerate() {
            self.proj[pos * self.ncv + pos] = theta[sel];
            let coupling = beta * y[sel * m + (m - 1)];
            self.proj[pos * self.ncv + k] = coupling;
            self.proj[k * self.ncv + pos] = coupling;
        }

        self.restarts += 1;
        self.request_product(k)
    }

    fn conclude(
        &mut self,
        m: usize,
        theta: &[f64],
        y: &[f64],
        wanted: &[usize],
        nconv: usize,
    ) -> LanczosStep {
        // Report ascending by value, ARPACK-style.
        let mut sel: Vec<usize> = wanted.to_vec();
        sel.sort_by(|&i, &j| theta[i].partial_cmp(&theta[j]).unwrap_or(std::cmp::Ordering::Equal));

        self.eigvals = sel.iter().map(|&i| theta[i]).collect();
        self.coeffs = Vec::with_capacity(sel.len() * m);
        for &i in &sel {
            self.coeffs.extend_from_slice(&y[i * m..(i + 1) * m]);
        }
        self.basis_size = m;
        self.nconv = nconv;
        self.phase = Phase::Done;

        debug!(
            restarts = self.restarts,
            products = self.products,
            nconv,
            "lanczos iteration finished"
        );
        LanczosStep::Converged { restarts: self.restarts, products: self.products }
    }

    /// Ritz decomposition of the leading `m × m` block of the projection.
    fn ritz(&self, m: usize) -> (Vec<f64>, Vec<f64>) {
        let mut t = vec![0.0f64; m * m];
        for i in 0..m {
            for j in 0..m {
                t[i * m + j] = self.proj[i * self.ncv + j];
            }
        }
        symmetric_eig(&t, m)
    }

    fn projection_scale(&self, m: usize) -> f64 {
        let mut s = 0.0f64;
        for i in 0..m {
            for j in 0..m {
                s = s.max(self.proj[i * self.ncv + j].abs());
            }
        }
        s
    }

    fn random_unit(&mut self) -> Vec<f64> {
        let mut v: Vec<f64> = (0..self.n).map(|_| self.rng.gen_range(-0.5..0.5)).collect();
        let nrm = norm(&v);
        v.iter_mut().for_each(|x| *x /= nrm);
        v
    }

    /// Random direction orthogonalized against the first `m` basis columns.
    fn random_orthogonal(&mut self, m: usize) -> Result<Vec<f64>, LanczosError> {
        for _ in 0..5 {
            let mut v = self.random_unit();
            for _ in 0..2 {
                for i in 0..m {
                    let b = &self.basis[i * self.n..(i + 1) * self.n];
                    let h = dot(b, &v);
                    axpy(&mut v, b, -h);
                }
            }
            let nrm = norm(&v);
            if nrm > 1e-8 {
                v.iter_mut().for_each(|x| *x /= nrm);
                return Ok(v);
            }
        }
        Err(LanczosError::Breakdown)
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

/// `a += scale · b`
fn axpy(a: &mut [f64], b: &[f64], scale: f64) {
    for (ai, &bi) in a.iter_mut().zip(b.iter()) {
        *ai += scale * bi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the solver against an explicit dense symmetric matrix.
    fn run_dense(
        a: &[f64],
        n: usize,
        nev: usize,
        ncv: usize,
        maxiter: usize,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut solver = SymmetricLanczos::new(n, nev, ncv, 0.0, maxiter).unwrap();
        loop {
            match solver.step().unwrap() {
                LanczosStep::Apply { input, output } => {
                    let x = solver.workd()[input..input + n].to_vec();
                    let mut y = vec![0.0f64; n];
                    for i in 0..n {
                        y[i] = (0..n).map(|j| a[i * n + j] * x[j]).sum();
                    }
                    solver.workd_mut()[output..output + n].copy_from_slice(&y);
                }
                LanczosStep::Converged { .. } => break,
            }
        }
        let (vals, vecs) = solver.extract(true).unwrap();
        (vals, vecs.unwrap())
    }

    fn dense_diag(entries: &[f64]) -> Vec<f64> {
        let n = entries.len();
        let mut a = vec![0.0f64; n * n];
        for (i, &e) in entries.iter().enumerate() {
            a[i * n + i] = e;
        }
        a
    }

    #[test]
    fn rejects_invalid_dimensions() {
        assert_eq!(SymmetricLanczos::new(0, 1, 2, 0.0, 10).unwrap_err().code(), -1);
        assert_eq!(SymmetricLanczos::new(5, 0, 2, 0.0, 10).unwrap_err().code(), -2);
        assert_eq!(SymmetricLanczos::new(5, 5, 5, 0.0, 10).unwrap_err().code(), -2);
        assert_eq!(SymmetricLanczos::new(5, 2, 2, 0.0, 10).unwrap_err().code(), -3);
        assert_eq!(SymmetricLanczos::new(5, 2, 6, 0.0, 10).unwrap_err().code(), -3);
    }

    #[test]
    fn first_step_requests_an_apply_at_fixed_offsets() {
        let mut solver = SymmetricLanczos::new(8, 2, 5, 0.0, 10).unwrap();
        match solver.step().unwrap() {
            LanczosStep::Apply { input, output } => {
                assert_eq!(input, 0);
                assert_eq!(output, 8);
            }
            other => panic!("expected Apply, got {other:?}"),
        }
    }

    #[test]
    fn extract_before_convergence_is_an_error() {
        let solver = SymmetricLanczos::new(8, 2, 5, 0.0, 10).unwrap();
        assert_eq!(solver.extract(true).unwrap_err().code(), -12);
    }

    #[test]
    fn diagonal_operator_dominant_eigenpairs() {
        let entries = [10.0, -7.0, 3.0, 1.0, 0.5, -0.25, 2.0, 0.1];
        let n = entries.len();
        let (vals, vecs) = run_dense(&dense_diag(&entries), n, 3, 6, 50);

        // Largest magnitude: 10, -7, 3 — reported ascending.
        assert_eq!(vals.len(), 3);
        assert!((vals[0] + 7.0).abs() < 1e-8, "{vals:?}");
        assert!((vals[1] - 3.0).abs() < 1e-8, "{vals:?}");
        assert!((vals[2] - 10.0).abs() < 1e-8, "{vals:?}");

        // Eigenvector of 10 is e_0 up to sign.
        let x = &vecs[2 * n..3 * n];
        assert!((x[0].abs() - 1.0).abs() < 1e-6);
        for &xi in &x[1..] {
            assert!(xi.abs() < 1e-6);
        }
    }

    #[test]
    fn identity_operator_breaks_down_gracefully() {
        // A = I: the first Krylov step is already invariant.
        let n = 6;
        let (vals, vecs) = run_dense(&dense_diag(&[1.0; 6]), n, 1, 4, 10);
        assert!((vals[0] - 1.0).abs() < 1e-10);
        let nrm: f64 = vecs[..n].iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((nrm - 1.0).abs() < 1e-8);
    }

    #[test]
    fn thick_restart_converges_with_small_ncv() {
        // ncv barely above nev forces several restarts.
        let entries: Vec<f64> = (1..=20).map(|i| i as f64).collect();
        let (vals, _) = run_dense(&dense_diag(&entries), 20, 2, 4, 200);
        assert!((vals[0] - 19.0).abs() < 1e-6, "{vals:?}");
        assert!((vals[1] - 20.0).abs() < 1e-6, "{vals:?}");
    }

    #[test]
    fn nondiagonal_matrix_matches_dense_solver() {
        // 2D Laplacian-ish banded matrix.
        let n = 12;
        let mut a = vec![0.0f64; n * n];
        for i in 0..n {
            a[i * n + i] = 2.0;
            if i + 1 < n {
                a[i * n + i + 1] = -1.0;
                a[(i + 1) * n + i] = -1.0;
            }
        }
        let (dense_vals, _) = crate::dense::symmetric_eig(&a, n);
        let (vals, vecs) = run_dense(&a, n, 2, 8, 100);

        // LM of this PSD matrix = the two largest.
        assert!((vals[0] - dense_vals[n - 2]).abs() < 1e-7);
        assert!((vals[1] - dense_vals[n - 1]).abs() < 1e-7);

        // Residual check for the top pair.
        let lambda = vals[1];
        let x = &vecs[n..2 * n];
        let mut res = 0.0f64;
        for i in 0..n {
            let ax: f64 = (0..n).map(|j| a[i * n + j] * x[j]).sum();
            res += (ax - lambda * x[i]) * (ax - lambda * x[i]);
        }
        assert!(res.sqrt() < 1e-7, "residual {}", res.sqrt());
    }

    #[test]
    fn converged_step_is_idempotent() {
        let n = 5;
        let a = dense_diag(&[5.0, 4.0, 3.0, 2.0, 1.0]);
        let mut solver = SymmetricLanczos::new(n, 1, 3, 0.0, 50).unwrap();
        loop {
            match solver.step().unwrap() {
                LanczosStep::Apply { input, output } => {
                    let x = solver.workd()[input..input + n].to_vec();
                    let mut y = vec![0.0f64; n];
                    for i in 0..n {
                        y[i] = (0..n).map(|j| a[i * n + j] * x[j]).sum();
                    }
                    solver.workd_mut()[output..output + n].copy_from_slice(&y);
                }
                LanczosStep::Converged { .. } => break,
            }
        }
        let again = solver.step().unwrap();
        assert!(matches!(again, LanczosStep::Converged { .. }));
    }
}
