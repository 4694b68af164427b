//! Radial kernel functions evaluated by the summation engine.
//!
//! Every kernel is a function of the Euclidean distance `r` and a single
//! scale parameter `c` (the bandwidth sigma of the adjacency matrix).
//!
//! | Kernel           | `K(r)`                    | `K(0)` |
//! |------------------|---------------------------|--------|
//! | Gaussian         | `exp(−r²/c²)`             | 1.0    |
//! | SquaredGaussian  | `r²/c² · exp(−r²/c²)`     | 0.0    |
//! | LaplacianRbf     | `exp(−|r|/c)`             | 1.0    |
//!
//! The zero-distance column matters downstream: the engine's transforms
//! include the self term `K(0)·α_i` in every sum, and callers that want a
//! different diagonal must correct for exactly this value.

/// Radial kernel shape understood by [`FastsumPlan`](crate::FastsumPlan).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadialKernel {
    Gaussian,
    SquaredGaussian,
    LaplacianRbf,
}

impl RadialKernel {
    /// Evaluate `K(r)` at scale `c`.
    #[inline]
    pub fn eval(self, r: f64, c: f64) -> f64 {
        let t = r / c;
        match self {
            RadialKernel::Gaussian => (-t * t).exp(),
            RadialKernel::SquaredGaussian => t * t * (-t * t).exp(),
            RadialKernel::LaplacianRbf => (-t.abs()).exp(),
        }
    }

    /// Kernel value contributed at zero distance (the implicit self term).
    #[inline]
    pub fn value_at_zero(self) -> f64 {
        match self {
            RadialKernel::Gaussian | RadialKernel::LaplacianRbf => 1.0,
            RadialKernel::SquaredGaussian => 0.0,
        }
    }

    /// Short lowercase name, for error messages and logs.
    pub fn name(self) -> &'static str {
        match self {
            RadialKernel::Gaussian => "gaussian",
            RadialKernel::SquaredGaussian => "squared_gaussian",
            RadialKernel::LaplacianRbf => "laplacian_rbf",
        }
    }
}
