//! `fastadj-lanczos` — reverse-communication symmetric eigensolver.
//!
//! Computes a few largest-magnitude eigenpairs of an implicit symmetric
//! operator. The solver owns no operator: it yields
//! [`LanczosStep::Apply`] requests with buffer offsets, the caller performs
//! the matrix-vector product and resumes. One explicit loop, no callbacks,
//! no suspension — repeated synchronous round-trips.
//!
//! ## Crate structure
//!
//! | Module     | Responsibility                                           |
//! |------------|----------------------------------------------------------|
//! | [`solver`] | [`SymmetricLanczos`] protocol state machine, thick restart |
//! | [`dense`]  | Jacobi eigen-decomposition of the projected matrix       |

pub mod dense;
pub mod solver;

pub use solver::{LanczosError, LanczosStep, SymmetricLanczos, DEFAULT_TOL};
