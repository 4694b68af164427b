//! Adjacency operator lifecycle and matrix-vector apply.
//!
//! [`AdjacencyOperator`] owns one summation plan for its whole life. The
//! state machine is small: constructed with no points, points bound and
//! precomputed, back to no points on replacement with an empty set. Apply
//! and the eigen-decomposition demand bound points; everything else is a
//! reported error, never a silent no-op.

use ndarray::{Array2, ArrayView2};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use fastadj_fastsum::FastsumPlan;

use crate::error::AdjacencyError;
use crate::kernel::KernelVariant;

/// Construction parameters. `oversampling` (`NN`) is derived when absent:
/// the smallest power of two at least `2·degree`, so `2N ≤ NN < 4N`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorConfig {
    pub kernel: KernelVariant,
    /// Spatial dimension of the points.
    pub dim: usize,
    /// Kernel bandwidth.
    pub sigma: f64,
    /// Fourier expansion degree per axis (`N`).
    pub degree: usize,
    /// Boundary regularization smoothness (`p`).
    pub smoothness: u32,
    /// Window cutoff (`m`), recorded engine tuning.
    pub cutoff: usize,
    /// Boundary regularization width (`eps_B`).
    pub eps: f64,
    /// Oversampled grid size (`NN`); derived when `None`.
    pub oversampling: Option<usize>,
}

/// Dense kernel adjacency matrix over a point cloud, held implicitly:
/// entry `(i, j)` is `K(‖x_i − x_j‖)` off the diagonal and the mutable
/// `diagonal` value on it. Products with the matrix are approximated in
/// near-linear time by the owned summation plan.
#[derive(Debug)]
pub struct AdjacencyOperator {
    kernel: KernelVariant,
    dim: usize,
    sigma: f64,
    degree: usize,
    smoothness: u32,
    cutoff: usize,
    eps: f64,
    oversampling: usize,

    /// Adjacency diagonal value; mutable at any time, consumed by the next
    /// apply or eigen call.
    diagonal: f64,
    n: usize,
    plan: FastsumPlan,
}

impl AdjacencyOperator {
    /// Validates `dim > 0`, `sigma > 0`, `degree > 0`, derives the
    /// oversampled grid size when unset, and creates the plan bound to the
    /// kernel shape and bandwidth. The plan lives exactly as long as the
    /// operator.
    pub fn new(config: &OperatorConfig) -> Result<Self, AdjacencyError> {
        if config.dim == 0 {
            return Err(AdjacencyError::InvalidParameter { name: "dim", value: 0.0 });
        }
        if !(config.sigma > 0.0) || !config.sigma.is_finite() {
            return Err(AdjacencyError::InvalidParameter { name: "sigma", value: config.sigma });
        }
        if config.degree == 0 {
            return Err(AdjacencyError::InvalidParameter { name: "degree", value: 0.0 });
        }

        let oversampling = match config.oversampling {
            Some(nn) => {
                if nn == 0 {
                    return Err(AdjacencyError::InvalidParameter {
                        name: "oversampling",
                        value: 0.0,
                    });
                }
                nn
            }
            None => derive_oversampling(config.degree),
        };

        let plan = FastsumPlan::new(
            config.dim,
            config.kernel.shape(),
            config.sigma,
            config.degree,
            config.smoothness,
            config.eps,
        )?;

        Ok(Self {
            kernel: config.kernel,
            dim: config.dim,
            sigma: config.sigma,
            degree: config.degree,
            smoothness: config.smoothness,
            cutoff: config.cutoff,
            eps: config.eps,
            oversampling,
            diagonal: 0.0,
            n: 0,
            plan,
        })
    }

    pub fn kernel(&self) -> KernelVariant {
        self.kernel
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn smoothness(&self) -> u32 {
        self.smoothness
    }

    pub fn cutoff(&self) -> usize {
        self.cutoff
    }

    pub fn eps(&self) -> f64 {
        self.eps
    }

    pub fn oversampling(&self) -> usize {
        self.oversampling
    }

    /// Number of currently bound points; 0 disables apply and eigs.
    pub fn num_points(&self) -> usize {
        self.n
    }

    pub fn diagonal(&self) -> f64 {
        self.diagonal
    }

    /// Change the adjacency diagonal; affects only subsequent calls.
    pub fn set_diagonal(&mut self, value: f64) {
        self.diagonal = value;
    }

    pub(crate) fn plan_mut(&mut self) -> &mut FastsumPlan {
        &mut self.plan
    }

    /// Replace the point set.
    ///
    /// Any previously bound points are released first, unconditionally.
    /// `None` or an empty table leaves the operator disabled (`n = 0`).
    /// A non-empty table must have `dim` columns and only finite entries;
    /// validation failure keeps the disabled state — no partial binding
    /// survives. On success, coordinates are copied into both the source
    /// and target roles of the plan and precomputation runs.
    pub fn set_points(&mut self, points: Option<ArrayView2<'_, f64>>) -> Result<(), AdjacencyError> {
        self.release_points();

        let Some(pts) = points else {
            return Ok(());
        };
        let n = pts.nrows();
        if n == 0 {
            return Ok(());
        }
        if pts.ncols() != self.dim {
            return Err(AdjacencyError::PointShape {
                expected: self.dim,
                rows: n,
                cols: pts.ncols(),
            });
        }
        if pts.iter().any(|v| !v.is_finite()) {
            return Err(AdjacencyError::NonFiniteInput { what: "points" });
        }

        self.plan.bind_source_nodes(n, self.oversampling, self.cutoff)?;
        self.plan.bind_target_nodes(n, self.oversampling, self.cutoff)?;

        let mut coords = vec![0.0f64; n * self.dim];
        for i in 0..n {
            for j in 0..self.dim {
                coords[i * self.dim + j] = pts[[i, j]];
            }
        }
        if let Err(e) = self.plan.set_coords(&coords) {
            self.release_points();
            return Err(e.into());
        }
        if let Err(e) = self.plan.precompute() {
            self.release_points();
            return Err(e.into());
        }

        self.n = n;
        Ok(())
    }

    /// A copy of the bound coordinate table, or `None` when disabled. The
    /// internal buffer is never exposed for mutation.
    pub fn points(&self) -> Option<Array2<f64>> {
        if self.n == 0 {
            return None;
        }
        let coords = self.plan.source_coords()?;
        let mut out = Array2::zeros((self.n, self.dim));
        for i in 0..self.n {
            for j in 0..self.dim {
                out[[i, j]] = coords[i * self.dim + j];
            }
        }
        Some(out)
    }

    fn release_points(&mut self) {
        self.plan.release_source_nodes();
        self.plan.release_target_nodes();
        self.n = 0;
    }

    /// One adjacency matrix-vector product.
    ///
    /// Loads `weights` (real, zero imaginary part) into the plan, runs the
    /// approximate transform — or the exact brute-force one when `exact` —
    /// and returns `re(f_i) + (diagonal − K(0))·w_i` per point. Weight
    /// validation failures are pure-read: the operator state is untouched.
    pub fn apply(&mut self, weights: &[f64], exact: bool) -> Result<Vec<f64>, AdjacencyError> {
        if self.n == 0 {
            return Err(AdjacencyError::PointsNotSet { op: "apply" });
        }
        if weights.len() != self.n {
            return Err(AdjacencyError::WeightLength { expected: self.n, got: weights.len() });
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(AdjacencyError::NonFiniteInput { what: "weights" });
        }

        let buf = self.plan.weights_mut()?;
        for (slot, &w) in buf.iter_mut().zip(weights.iter()) {
            *slot = Complex64::new(w, 0.0);
        }

        if exact {
            self.plan.exact_transform()?;
        } else {
            self.plan.transform()?;
        }

        let results = self.plan.results()?;
        Ok(results
            .iter()
            .zip(weights.iter())
            .map(|(f, &w)| f.re + self.kernel.diagonal_correction(self.diagonal, w))
            .collect())
    }
}

/// Smallest power of two `nn` with `2·degree ≤ nn`.
fn derive_oversampling(degree: usize) -> usize {
    let mut nn = 2usize;
    while 2 * degree > nn {
        nn *= 2;
    }
    nn
}
