//! Summation plan: node storage, precomputation, and the two transforms.
//!
//! A [`FastsumPlan`] computes, for every target node `y_j`, the weighted
//! kernel sum
//!
//! ```text
//! f_j = Σ_k α_k · K(‖y_j − x_k‖)
//! ```
//!
//! either exactly (brute force, `O(n²)`) or approximately through a
//! truncated Fourier expansion of the boundary-regularized kernel:
//!
//! ```text
//! K̃(x) ≈ Σ_{l ∈ I_N}  b_l · e^{2πi l·x}
//! f_j  ≈ Σ_l b_l · ( Σ_k α_k e^{−2πi l·x_k} ) · e^{2πi l·y_j}
//! ```
//!
//! `I_N = [−N/2, N/2)^d` is the frequency cube of the expansion degree and
//! `b_l` are computed once per precomputation by quadrature on an
//! oversampled `nn`-per-axis grid. Both sums include the self term
//! `K(0)·α_j` whenever a target coincides with a source — callers wanting a
//! different diagonal must correct for [`RadialKernel::value_at_zero`].
//!
//! ## Admissible geometry
//!
//! The Fourier expansion lives on the torus `[−0.5, 0.5)^d`. A radial taper
//! forces the kernel to zero on `r ∈ [0.5 − eps_b, 0.5]`, so the periodized
//! kernel is continuous; the approximation equals the true kernel only for
//! pairwise distances below `0.5 − eps_b`. Node coordinates are expected to
//! be prescaled accordingly (see the scaling helper in `fastadj-core`).

use num_complex::Complex64;
use thiserror::Error;

use crate::kernel::RadialKernel;

const TWO_PI: f64 = std::f64::consts::TAU;

#[derive(Debug, Error)]
pub enum FastsumError {
    #[error("invalid plan parameter `{name}`: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("no {role} nodes are bound to the plan")]
    NodesNotBound { role: &'static str },

    #[error("coordinate slice has length {got}, expected {expected}")]
    CoordinateLength { expected: usize, got: usize },

    #[error("plan precomputation has not run")]
    NotPrecomputed,
}

/// One bound node set: coordinates plus the tuning recorded at bind time.
#[derive(Debug)]
struct NodeBlock {
    n: usize,
    /// Oversampled grid size per axis used for coefficient quadrature.
    nn: usize,
    /// Window cutoff. Stored tuning for an accelerated (NFFT-style)
    /// transform path; the direct-sum transforms do not consult it.
    #[allow(dead_code)]
    m: usize,
    /// Row-major `n × dim` coordinates.
    coords: Vec<f64>,
}

/// Summation-engine plan. Created once per operator, bound to one kernel
/// shape and scale for its whole lifetime; nodes come and go.
#[derive(Debug)]
pub struct FastsumPlan {
    dim: usize,
    kernel: RadialKernel,
    scale: f64,
    degree: usize,
    smoothness: u32,
    eps_b: f64,

    source: Option<NodeBlock>,
    target: Option<NodeBlock>,
    /// Per-source complex weights (`α`), allocated with the source block.
    weights: Vec<Complex64>,
    /// Per-target complex results (`f`), allocated with the target block.
    results: Vec<Complex64>,
    /// Fourier coefficients `b_l`, flat over the `degree^dim` cube.
    /// Real because the regularized kernel is even.
    coeffs: Option<Vec<f64>>,
}

impl FastsumPlan {
    /// Create a plan bound to `kernel` at scale `scale` (the adjacency
    /// bandwidth sigma), with expansion degree `degree` per axis,
    /// taper order `smoothness` and boundary width `eps_b ∈ [0, 0.5)`.
    pub fn new(
        dim: usize,
        kernel: RadialKernel,
        scale: f64,
        degree: usize,
        smoothness: u32,
        eps_b: f64,
    ) -> Result<Self, FastsumError> {
        if dim == 0 {
            return Err(FastsumError::InvalidParameter { name: "dim", value: dim as f64 });
        }
        if !(scale > 0.0) || !scale.is_finite() {
            return Err(FastsumError::InvalidParameter { name: "scale", value: scale });
        }
        if degree == 0 {
            return Err(FastsumError::InvalidParameter { name: "degree", value: degree as f64 });
        }
        if !(0.0..0.5).contains(&eps_b) {
            return Err(FastsumError::InvalidParameter { name: "eps_b", value: eps_b });
        }

        Ok(Self {
            dim,
            kernel,
            scale,
            degree,
            smoothness,
            eps_b,
            source: None,
            target: None,
            weights: Vec::new(),
            results: Vec::new(),
            coeffs: None,
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn kernel(&self) -> RadialKernel {
        self.kernel
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn is_precomputed(&self) -> bool {
        self.coeffs.is_some()
    }

    pub fn num_source_nodes(&self) -> usize {
        self.source.as_ref().map_or(0, |b| b.n)
    }

    pub fn num_target_nodes(&self) -> usize {
        self.target.as_ref().map_or(0, |b| b.n)
    }

    /// Bind `n` source nodes; allocates coordinate and weight storage.
    /// Invalidates any previous precomputation.
    pub fn bind_source_nodes(&mut self, n: usize, nn: usize, m: usize) -> Result<(), FastsumError> {
        if n == 0 {
            return Err(FastsumError::InvalidParameter { name: "n", value: 0.0 });
        }
        if nn == 0 {
            return Err(FastsumError::InvalidParameter { name: "nn", value: 0.0 });
        }
        self.source = Some(NodeBlock { n, nn, m, coords: vec![0.0; n * self.dim] });
        self.weights = vec![Complex64::new(0.0, 0.0); n];
        self.coeffs = None;
        Ok(())
    }

    /// Bind `n` target nodes; allocates coordinate and result storage.
    pub fn bind_target_nodes(&mut self, n: usize, nn: usize, m: usize) -> Result<(), FastsumError> {
        if n == 0 {
            return Err(FastsumError::InvalidParameter { name: "n", value: 0.0 });
        }
        if nn == 0 {
            return Err(FastsumError::InvalidParameter { name: "nn", value: 0.0 });
        }
        self.target = Some(NodeBlock { n, nn, m, coords: vec![0.0; n * self.dim] });
        self.results = vec![Complex64::new(0.0, 0.0); n];
        Ok(())
    }

    /// Release source storage. Idempotent.
    pub fn release_source_nodes(&mut self) {
        self.source = None;
        self.weights.clear();
        self.coeffs = None;
    }

    /// Release target storage. Idempotent.
    pub fn release_target_nodes(&mut self) {
        self.target = None;
        self.results.clear();
    }

    /// Mutable row-major `n × dim` source coordinates.
    pub fn source_coords_mut(&mut self) -> Result<&mut [f64], FastsumError> {
        self.source
            .as_mut()
            .map(|b| b.coords.as_mut_slice())
            .ok_or(FastsumError::NodesNotBound { role: "source" })
    }

    /// Row-major `n × dim` source coordinates, if bound.
    pub fn source_coords(&self) -> Option<&[f64]> {
        self.source.as_ref().map(|b| b.coords.as_slice())
    }

    /// Mutable row-major `n × dim` target coordinates.
    pub fn target_coords_mut(&mut self) -> Result<&mut [f64], FastsumError> {
        self.target
            .as_mut()
            .map(|b| b.coords.as_mut_slice())
            .ok_or(FastsumError::NodesNotBound { role: "target" })
    }

    /// Copy `coords` (length `n·dim`) into both the source and the target
    /// roles. The adjacency use case always evaluates one cloud against
    /// itself.
    pub fn set_coords(&mut self, coords: &[f64]) -> Result<(), FastsumError> {
        let expected = self.num_source_nodes() * self.dim;
        if coords.len() != expected {
            return Err(FastsumError::CoordinateLength { expected, got: coords.len() });
        }
        self.source_coords_mut()?.copy_from_slice(coords);
        let tgt = self.target_coords_mut()?;
        if tgt.len() != coords.len() {
            return Err(FastsumError::CoordinateLength { expected: tgt.len(), got: coords.len() });
        }
        tgt.copy_from_slice(coords);
        Ok(())
    }

    /// Per-source complex weight buffer (`α`).
    pub fn weights_mut(&mut self) -> Result<&mut [Complex64], FastsumError> {
        if self.source.is_none() {
            return Err(FastsumError::NodesNotBound { role: "source" });
        }
        Ok(self.weights.as_mut_slice())
    }

    /// Per-target complex results (`f`) written by the last transform.
    pub fn results(&self) -> Result<&[Complex64], FastsumError> {
        if self.target.is_none() {
            return Err(FastsumError::NodesNotBound { role: "target" });
        }
        Ok(self.results.as_slice())
    }

    /// Boundary taper: 1 inside `r ≤ 0.5 − eps_b`, rolls to 0 at `r = 0.5`
    /// with a `cos^{2p}` profile. Identity when `eps_b = 0`.
    fn taper(&self, r: f64) -> f64 {
        if self.eps_b <= 0.0 {
            return 1.0;
        }
        let r0 = 0.5 - self.eps_b;
        if r <= r0 {
            1.0
        } else if r >= 0.5 {
            0.0
        } else {
            let t = (r - r0) / self.eps_b;
            (std::f64::consts::FRAC_PI_2 * t)
                .cos()
                .powi(2 * self.smoothness as i32)
        }
    }

    /// Regularized kernel sampled at a torus offset.
    fn regularized(&self, offset: &[f64]) -> f64 {
        let r = offset.iter().map(|v| v * v).sum::<f64>().sqrt();
        self.kernel.eval(r, self.scale) * self.taper(r)
    }

    /// Compute the Fourier coefficients `b_l` of the regularized kernel by
    /// real-even quadrature on the source block's `nn^dim` grid. Must run
    /// after node binding and before [`transform`](Self::transform).
    pub fn precompute(&mut self) -> Result<(), FastsumError> {
        let nn = self
            .source
            .as_ref()
            .ok_or(FastsumError::NodesNotBound { role: "source" })?
            .nn;
        if self.target.is_none() {
            return Err(FastsumError::NodesNotBound { role: "target" });
        }

        let d = self.dim;
        let n_freq = self.degree.pow(d as u32);
        let n_grid = nn.pow(d as u32);

        // Sample K̃ on the grid once.
        let mut samples = vec![0.0f64; n_grid];
        let mut point = vec![0.0f64; d];
        for (g, sample) in samples.iter_mut().enumerate() {
            decode_grid(g, nn, &mut point);
            *sample = self.regularized(&point);
        }

        // b_l = 1/nn^d · Σ_g K̃(x_g) · cos(2π l·x_g). The kernel is even,
        // so the sine part of the quadrature vanishes.
        let norm = 1.0 / n_grid as f64;
        let mut coeffs = vec![0.0f64; n_freq];
        let mut freq = vec![0i64; d];
        for (li, b) in coeffs.iter_mut().enumerate() {
            decode_freq(li, self.degree, &mut freq);
            let mut acc = 0.0f64;
            for (g, &sample) in samples.iter().enumerate() {
                if sample == 0.0 {
                    continue;
                }
                decode_grid(g, nn, &mut point);
                let phase: f64 = freq
                    .iter()
                    .zip(point.iter())
                    .map(|(&l, &x)| l as f64 * x)
                    .sum();
                acc += sample * (TWO_PI * phase).cos();
            }
            *b = acc * norm;
        }

        self.coeffs = Some(coeffs);
        Ok(())
    }

    /// Approximate transform: weights → results through the truncated
    /// Fourier expansion. `O(n · N^d)` direct discrete Fourier sums.
    pub fn transform(&mut self) -> Result<(), FastsumError> {
        let coeffs = self.coeffs.as_ref().ok_or(FastsumError::NotPrecomputed)?;
        let source = self
            .source
            .as_ref()
            .ok_or(FastsumError::NodesNotBound { role: "source" })?;
        let target = self
            .target
            .as_ref()
            .ok_or(FastsumError::NodesNotBound { role: "target" })?;

        let d = self.dim;
        let n_freq = coeffs.len();
        let mut freq = vec![0i64; d];

        // Adjoint step with the kernel coefficient folded in:
        // s_l = b_l · Σ_k α_k · e^{−2πi l·x_k}
        let mut spectrum = vec![Complex64::new(0.0, 0.0); n_freq];
        for (li, s) in spectrum.iter_mut().enumerate() {
            decode_freq(li, self.degree, &mut freq);
            let mut acc = Complex64::new(0.0, 0.0);
            for k in 0..source.n {
                let x = &source.coords[k * d..(k + 1) * d];
                let phase: f64 = freq.iter().zip(x.iter()).map(|(&l, &xi)| l as f64 * xi).sum();
                acc += self.weights[k] * Complex64::cis(-TWO_PI * phase);
            }
            *s = acc * coeffs[li];
        }

        // Evaluation step: f_j = Σ_l s_l · e^{2πi l·y_j}
        for j in 0..target.n {
            let y = &target.coords[j * d..(j + 1) * d];
            let mut acc = Complex64::new(0.0, 0.0);
            for (li, s) in spectrum.iter().enumerate() {
                decode_freq(li, self.degree, &mut freq);
                let phase: f64 = freq.iter().zip(y.iter()).map(|(&l, &yi)| l as f64 * yi).sum();
                acc += s * Complex64::cis(TWO_PI * phase);
            }
            self.results[j] = acc;
        }
        Ok(())
    }

    /// Exact transform: brute-force `O(n²)` kernel sums over the true
    /// (non-regularized) kernel, self term included.
    pub fn exact_transform(&mut self) -> Result<(), FastsumError> {
        let source = self
            .source
            .as_ref()
            .ok_or(FastsumError::NodesNotBound { role: "source" })?;
        let target = self
            .target
            .as_ref()
            .ok_or(FastsumError::NodesNotBound { role: "target" })?;

        let d = self.dim;
        for j in 0..target.n {
            let y = &target.coords[j * d..(j + 1) * d];
            let mut acc = Complex64::new(0.0, 0.0);
            for k in 0..source.n {
                let x = &source.coords[k * d..(k + 1) * d];
                let r = y
                    .iter()
                    .zip(x.iter())
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f64>()
                    .sqrt();
                acc += self.weights[k] * self.kernel.eval(r, self.scale);
            }
            self.results[j] = acc;
        }
        Ok(())
    }
}

/// Decode flat grid index into torus coordinates `(g_i − nn/2)/nn`.
fn decode_grid(mut idx: usize, nn: usize, out: &mut [f64]) {
    let half = (nn / 2) as f64;
    for slot in out.iter_mut().rev() {
        let g = (idx % nn) as f64;
        *slot = (g - half) / nn as f64;
        idx /= nn;
    }
}

/// Decode flat frequency index into integer frequencies in `[−N/2, N/2)`.
fn decode_freq(mut idx: usize, degree: usize, out: &mut [i64]) {
    let half = (degree / 2) as i64;
    for slot in out.iter_mut().rev() {
        *slot = (idx % degree) as i64 - half;
        idx /= degree;
    }
}
