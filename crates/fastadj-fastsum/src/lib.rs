//! `fastadj-fastsum` — approximate radial-kernel summation engine.
//!
//! Computes weighted kernel sums over a point cloud, either exactly
//! (brute force) or through a truncated Fourier expansion of the
//! boundary-regularized kernel.
//!
//! ## Crate structure
//!
//! | Module     | Responsibility                                          |
//! |------------|---------------------------------------------------------|
//! | [`kernel`] | [`RadialKernel`] shapes and their zero-distance values  |
//! | [`plan`]   | [`FastsumPlan`] — node storage, precompute, transforms  |
//!
//! The plan is a deliberately engine-shaped surface: bind nodes, load
//! complex weights, run a transform, read complex results. Consumers that
//! want an adjacency *matrix* semantics (caller-chosen diagonal, real
//! weights) sit on top of this crate; see `fastadj-core`.

pub mod kernel;
pub mod plan;

pub use kernel::RadialKernel;
pub use plan::{FastsumError, FastsumPlan};
