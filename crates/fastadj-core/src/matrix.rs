//! Convenience surface: accuracy presets, point prescaling, and a wrapper
//! that binds construction and point setup into one call.

use ndarray::{Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::eigs::{EigsConfig, EigsResult};
use crate::error::AdjacencyError;
use crate::kernel::KernelVariant;
use crate::operator::{AdjacencyOperator, OperatorConfig};

/// Engine tuning bundle: expansion degree, boundary smoothness, window
/// cutoff, and boundary width.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracySetup {
    pub degree: usize,
    pub smoothness: u32,
    pub cutoff: usize,
    pub eps: f64,
}

impl AccuracySetup {
    /// Fast and coarse; screening runs.
    pub const ROUGH: Self = Self { degree: 16, smoothness: 1, cutoff: 2, eps: 0.0625 };
    /// Balanced default.
    pub const DEFAULT: Self = Self { degree: 32, smoothness: 2, cutoff: 4, eps: 0.0625 };
    /// High accuracy, several times the work of the default.
    pub const FINE: Self = Self { degree: 64, smoothness: 4, cutoff: 8, eps: 0.03125 };

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "rough" => Some(Self::ROUGH),
            "default" => Some(Self::DEFAULT),
            "fine" => Some(Self::FINE),
            _ => None,
        }
    }
}

impl Default for AccuracySetup {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Center a point cloud and scale it into the origin ball of radius
/// `radius`, as the summation engine expects. Returns the scaled points
/// and the applied factor; dividing the kernel bandwidth by the same
/// factor keeps the adjacency matrix unchanged. A degenerate cloud (all
/// points identical, or empty) is returned centered with factor 1.
pub fn center_and_scale(points: ArrayView2<'_, f64>, radius: f64) -> (Array2<f64>, f64) {
    let n = points.nrows();
    let d = points.ncols();
    let mut out = Array2::zeros((n, d));
    if n == 0 || d == 0 {
        return (out, 1.0);
    }

    let mut mean = vec![0.0f64; d];
    for i in 0..n {
        for j in 0..d {
            mean[j] += points[[i, j]];
        }
    }
    for m in &mut mean {
        *m /= n as f64;
    }

    let mut max_norm: f64 = 0.0;
    for i in 0..n {
        let mut sq = 0.0;
        for j in 0..d {
            let c = points[[i, j]] - mean[j];
            out[[i, j]] = c;
            sq += c * c;
        }
        max_norm = max_norm.max(sq.sqrt());
    }

    let factor = if max_norm > 0.0 && radius > 0.0 { max_norm / radius } else { 1.0 };
    if factor != 1.0 {
        for v in out.iter_mut() {
            *v /= factor;
        }
    }
    (out, factor)
}

/// Kernel adjacency matrix bound to a fixed point cloud.
///
/// Thin facade over [`AdjacencyOperator`]: construction takes the points
/// up front (dimension read from the table), binds and precomputes them,
/// and exposes the apply and eigen operations directly. The operator
/// remains reachable for diagonal changes or point replacement.
#[derive(Debug)]
pub struct AdjacencyMatrix {
    op: AdjacencyOperator,
}

impl AdjacencyMatrix {
    pub fn new(
        points: ArrayView2<'_, f64>,
        sigma: f64,
        kernel: KernelVariant,
        setup: AccuracySetup,
    ) -> Result<Self, AdjacencyError> {
        let mut op = AdjacencyOperator::new(&OperatorConfig {
            kernel,
            dim: points.ncols(),
            sigma,
            degree: setup.degree,
            smoothness: setup.smoothness,
            cutoff: setup.cutoff,
            eps: setup.eps,
            oversampling: None,
        })?;
        op.set_points(Some(points))?;
        Ok(Self { op })
    }

    pub fn operator(&self) -> &AdjacencyOperator {
        &self.op
    }

    pub fn operator_mut(&mut self) -> &mut AdjacencyOperator {
        &mut self.op
    }

    pub fn num_points(&self) -> usize {
        self.op.num_points()
    }

    pub fn diagonal(&self) -> f64 {
        self.op.diagonal()
    }

    pub fn set_diagonal(&mut self, value: f64) {
        self.op.set_diagonal(value);
    }

    /// Fast approximate matrix-vector product.
    pub fn apply(&mut self, weights: &[f64]) -> Result<Vec<f64>, AdjacencyError> {
        self.op.apply(weights, false)
    }

    /// Brute-force product; reference accuracy at quadratic cost.
    pub fn apply_exact(&mut self, weights: &[f64]) -> Result<Vec<f64>, AdjacencyError> {
        self.op.apply(weights, true)
    }

    pub fn normalized_eigs(
        &mut self,
        nev: usize,
        config: &EigsConfig,
    ) -> Result<EigsResult, AdjacencyError> {
        self.op.normalized_eigs(nev, config)
    }

    pub fn normalized_laplacian_norm(&mut self, tol: f64) -> Result<f64, AdjacencyError> {
        self.op.normalized_laplacian_norm(tol)
    }
}
