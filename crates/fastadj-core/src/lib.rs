//! `fastadj-core` — kernel-induced adjacency matrices over point clouds.
//!
//! The adjacency matrix of a point cloud under a radial kernel is dense;
//! this crate never materializes it. [`AdjacencyOperator`] wraps a
//! summation plan from `fastadj-fastsum` for near-linear matrix-vector
//! products, with a caller-chosen diagonal grafted on per kernel variant.
//! The eigen-decomposition of the symmetrically normalized matrix drives
//! the reverse-communication solver from `fastadj-lanczos` around that
//! product.
//!
//! ## Crate structure
//!
//! | Module       | Responsibility                                           |
//! |--------------|----------------------------------------------------------|
//! | [`kernel`]   | [`KernelVariant`] selection and diagonal-correction policy |
//! | [`operator`] | [`AdjacencyOperator`] lifecycle, point binding, apply    |
//! | [`eigs`]     | Normalized eigenpairs and Laplacian norm                 |
//! | [`matrix`]   | [`AdjacencyMatrix`] facade, accuracy presets, prescaling |
//! | [`error`]    | [`AdjacencyError`]                                       |
//!
//! ## Typical use
//!
//! Prescale the cloud into the quarter-radius ball with
//! [`center_and_scale`], divide the bandwidth by the returned factor,
//! build an [`AdjacencyMatrix`] with an [`AccuracySetup`] preset, then
//! apply or decompose.

pub mod eigs;
pub mod error;
pub mod kernel;
pub mod matrix;
pub mod operator;

pub use eigs::{EigsConfig, EigsResult, DEFAULT_MAXITER};
pub use error::AdjacencyError;
pub use kernel::KernelVariant;
pub use matrix::{center_and_scale, AccuracySetup, AdjacencyMatrix};
pub use operator::{AdjacencyOperator, OperatorConfig};
