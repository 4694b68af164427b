use thiserror::Error;

use fastadj_fastsum::FastsumError;

/// Everything an [`AdjacencyOperator`](crate::AdjacencyOperator) call can
/// report. One variant per taxonomy row: configuration, lifecycle,
/// shape/type, and external-solver failures.
#[derive(Debug, Error)]
pub enum AdjacencyError {
    #[error("invalid parameter `{name}`: must be positive, got {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    #[error("points must be set before calling `{op}`")]
    PointsNotSet { op: &'static str },

    #[error("points must be a 2D table with {expected} columns, got shape ({rows}, {cols})")]
    PointShape { expected: usize, rows: usize, cols: usize },

    #[error("{what} must contain only finite floating point values")]
    NonFiniteInput { what: &'static str },

    #[error("weight vector has length {got}, operator holds {expected} points")]
    WeightLength { expected: usize, got: usize },

    #[error("nev must satisfy 1 <= nev < n, got nev={nev} with n={n}")]
    InvalidNev { nev: usize, n: usize },

    #[error("eigensolver {phase} phase failed with status {code}")]
    Eigensolver { phase: &'static str, code: i32 },

    /// Summation-engine state error surfaced through the operator.
    #[error("summation engine: {0}")]
    Engine(#[from] FastsumError),
}
