//! Kernel policy: the one place where kernel-dependent formulas live.
//!
//! The summation engine's transforms include the self term
//! `K(0)·α_i` in every sum — 1.0 for the Gaussian family, 0.0 for the
//! squared Gaussian. Adjacency semantics instead put a caller-chosen
//! `diagonal` value there. The bridge is one formula,
//!
//! ```text
//! correction = (diagonal − K(0)) · weight
//! ```
//!
//! consulted identically by the matrix-vector apply, the degree
//! computation, and the eigen iteration, so a kernel added here is
//! correct everywhere at once.

use fastadj_fastsum::RadialKernel;
use serde::{Deserialize, Serialize};

/// Kernel selector for the adjacency matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelVariant {
    Gaussian,
    SquaredGaussian,
    LaplacianRbf,
    /// The fallback variant: behaves exactly like [`KernelVariant::Gaussian`].
    /// Produced by [`from_selector`](Self::from_selector) for any selector
    /// outside 1..=3 — a silent default rather than an error, kept for
    /// compatibility with the integer-selector construction surface.
    DefaultGaussian,
}

impl KernelVariant {
    /// Map an integer selector: 1 → Gaussian, 2 → SquaredGaussian,
    /// 3 → LaplacianRbf, anything else → [`KernelVariant::DefaultGaussian`].
    pub fn from_selector(selector: i32) -> Self {
        match selector {
            1 => KernelVariant::Gaussian,
            2 => KernelVariant::SquaredGaussian,
            3 => KernelVariant::LaplacianRbf,
            _ => KernelVariant::DefaultGaussian,
        }
    }

    pub fn selector(self) -> i32 {
        match self {
            KernelVariant::Gaussian => 1,
            KernelVariant::SquaredGaussian => 2,
            KernelVariant::LaplacianRbf => 3,
            KernelVariant::DefaultGaussian => 0,
        }
    }

    /// The radial kernel handed to the summation engine at plan
    /// construction.
    pub fn shape(self) -> RadialKernel {
        match self {
            KernelVariant::Gaussian | KernelVariant::DefaultGaussian => RadialKernel::Gaussian,
            KernelVariant::SquaredGaussian => RadialKernel::SquaredGaussian,
            KernelVariant::LaplacianRbf => RadialKernel::LaplacianRbf,
        }
    }

    /// Kernel value the engine implicitly contributes at zero distance.
    pub fn self_contribution(self) -> f64 {
        self.shape().value_at_zero()
    }

    /// Convert an engine sum (self term included at `K(0)`) into the true
    /// adjacency contribution with the caller-chosen diagonal.
    #[inline]
    pub fn diagonal_correction(self, diagonal: f64, weight: f64) -> f64 {
        (diagonal - self.self_contribution()) * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_roundtrip_for_known_kernels() {
        for v in [
            KernelVariant::Gaussian,
            KernelVariant::SquaredGaussian,
            KernelVariant::LaplacianRbf,
        ] {
            assert_eq!(KernelVariant::from_selector(v.selector()), v);
        }
    }

    #[test]
    fn unknown_selectors_fall_back_to_default() {
        for s in [-1, 0, 4, 99] {
            assert_eq!(KernelVariant::from_selector(s), KernelVariant::DefaultGaussian);
        }
    }

    #[test]
    fn default_behaves_like_gaussian() {
        let d = KernelVariant::DefaultGaussian;
        let g = KernelVariant::Gaussian;
        assert_eq!(d.shape(), g.shape());
        assert_eq!(
            d.diagonal_correction(0.5, 2.0),
            g.diagonal_correction(0.5, 2.0)
        );
    }

    #[test]
    fn correction_formulas_per_variant() {
        // Gaussian family: (diagonal − 1) · w
        assert_eq!(KernelVariant::Gaussian.diagonal_correction(0.0, 3.0), -3.0);
        assert_eq!(KernelVariant::LaplacianRbf.diagonal_correction(2.0, 1.0), 1.0);
        // Squared Gaussian: diagonal · w
        assert_eq!(KernelVariant::SquaredGaussian.diagonal_correction(0.0, 3.0), 0.0);
        assert_eq!(KernelVariant::SquaredGaussian.diagonal_correction(0.5, 4.0), 2.0);
    }
}
