//! Normalized eigen-decomposition against dense references.

use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use fastadj_core::{
    center_and_scale, AccuracySetup, AdjacencyError, AdjacencyOperator, EigsConfig,
    KernelVariant, OperatorConfig,
};
use fastadj_lanczos::dense::symmetric_eig;

fn operator(kernel: KernelVariant, dim: usize, sigma: f64, setup: AccuracySetup) -> AdjacencyOperator {
    AdjacencyOperator::new(&OperatorConfig {
        kernel,
        dim,
        sigma,
        degree: setup.degree,
        smoothness: setup.smoothness,
        cutoff: setup.cutoff,
        eps: setup.eps,
        oversampling: None,
    })
    .unwrap()
}

fn prescaled_cloud(n: usize, dim: usize, seed: u64) -> Array2<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut pts = Array2::zeros((n, dim));
    for v in pts.iter_mut() {
        *v = rng.gen_range(0.0..1.0);
    }
    let (scaled, _) = center_and_scale(pts.view(), 0.2);
    scaled
}

/// Materialize the full adjacency matrix column by column with exact
/// products.
fn dense_adjacency(op: &mut AdjacencyOperator, n: usize) -> Vec<f64> {
    let mut a = vec![0.0; n * n];
    for j in 0..n {
        let mut e = vec![0.0; n];
        e[j] = 1.0;
        let col = op.apply(&e, true).unwrap();
        for i in 0..n {
            a[i * n + j] = col[i];
        }
    }
    a
}

fn dense_normalized(a: &[f64], n: usize) -> Vec<f64> {
    let inv_sqrt: Vec<f64> = (0..n)
        .map(|i| {
            let deg: f64 = (0..n).map(|j| a[i * n + j]).sum();
            1.0 / deg.sqrt()
        })
        .collect();
    let mut m = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            m[i * n + j] = inv_sqrt[i] * a[i * n + j] * inv_sqrt[j];
        }
    }
    m
}

#[test]
fn eigs_without_points_is_an_error() {
    let mut op = operator(KernelVariant::Gaussian, 2, 1.0, AccuracySetup::DEFAULT);
    let err = op.normalized_eigs(2, &EigsConfig::default()).unwrap_err();
    assert!(matches!(err, AdjacencyError::PointsNotSet { .. }));
}

#[test]
fn nev_bounds_are_enforced() {
    let mut op = operator(KernelVariant::Gaussian, 2, 1.0, AccuracySetup::DEFAULT);
    op.set_points(Some(prescaled_cloud(6, 2, 1).view())).unwrap();
    assert!(matches!(
        op.normalized_eigs(0, &EigsConfig::default()).unwrap_err(),
        AdjacencyError::InvalidNev { nev: 0, n: 6 }
    ));
    assert!(matches!(
        op.normalized_eigs(6, &EigsConfig::default()).unwrap_err(),
        AdjacencyError::InvalidNev { nev: 6, n: 6 }
    ));
}

#[test]
fn eigenvalues_match_a_dense_reference() {
    let n = 24;
    let nev = 4;
    let mut op = operator(KernelVariant::Gaussian, 2, 1.0, AccuracySetup::FINE);
    op.set_points(Some(prescaled_cloud(n, 2, 2).view())).unwrap();
    op.set_diagonal(1.0);

    let a = dense_adjacency(&mut op, n);
    let normalized = dense_normalized(&a, n);
    let (all_vals, _) = symmetric_eig(&normalized, n);
    let mut wanted: Vec<f64> = all_vals.clone();
    wanted.sort_by(|x, y| y.abs().partial_cmp(&x.abs()).unwrap());
    let mut reference: Vec<f64> = wanted[..nev].to_vec();
    reference.sort_by(|x, y| x.partial_cmp(y).unwrap());

    let result = op.normalized_eigs(nev, &EigsConfig::default()).unwrap();
    assert_eq!(result.eigenvalues.len(), nev);
    for (got, want) in result.eigenvalues.iter().zip(reference.iter()) {
        assert!(
            (got - want).abs() < 5e-2,
            "got {:?}, reference {:?}",
            result.eigenvalues,
            reference
        );
    }
}

#[test]
fn eigenvectors_satisfy_the_eigen_relation() {
    let n = 20;
    let nev = 3;
    let mut op = operator(KernelVariant::Gaussian, 2, 0.9, AccuracySetup::FINE);
    op.set_points(Some(prescaled_cloud(n, 2, 3).view())).unwrap();
    op.set_diagonal(1.0);

    let result = op.normalized_eigs(nev, &EigsConfig::default()).unwrap();
    let vecs = result.eigenvectors.as_ref().unwrap();
    assert_eq!(vecs.shape(), &[n, nev]);

    let a = dense_adjacency(&mut op, n);
    let m = dense_normalized(&a, n);
    for c in 0..nev {
        let v: Vec<f64> = (0..n).map(|i| vecs[[i, c]]).collect();
        let norm: f64 = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6, "column {c} norm {norm}");
        // ‖M v − λ v‖ small relative to the dense M built from exact sums;
        // the iteration itself ran on approximate products.
        let lambda = result.eigenvalues[c];
        let mut residual = 0.0f64;
        for i in 0..n {
            let mv: f64 = (0..n).map(|j| m[i * n + j] * v[j]).sum();
            residual += (mv - lambda * v[i]).powi(2);
        }
        assert!(residual.sqrt() < 5e-2, "column {c} residual {}", residual.sqrt());
    }
}

#[test]
fn no_eigenvectors_when_not_requested() {
    let mut op = operator(KernelVariant::Gaussian, 2, 1.0, AccuracySetup::DEFAULT);
    op.set_points(Some(prescaled_cloud(12, 2, 4).view())).unwrap();
    op.set_diagonal(1.0);
    let config = EigsConfig { return_eigenvectors: false, ..EigsConfig::default() };
    let result = op.normalized_eigs(2, &config).unwrap();
    assert_eq!(result.eigenvalues.len(), 2);
    assert!(result.eigenvectors.is_none());
}

#[test]
fn identical_points_are_a_complete_graph() {
    // All points coincide: with unit diagonal the normalized matrix is
    // exactly J/n whatever the expansion error, so the spectrum is one 1
    // and n−1 zeros, and the top eigenvector is constant up to sign.
    let n = 6;
    let mut op = operator(KernelVariant::Gaussian, 2, 1.0, AccuracySetup::DEFAULT);
    let pts = Array2::from_elem((n, 2), 0.05);
    op.set_points(Some(pts.view())).unwrap();
    op.set_diagonal(1.0);

    let result = op.normalized_eigs(2, &EigsConfig::default()).unwrap();
    let top = result.eigenvalues[1];
    let other = result.eigenvalues[0];
    assert!((top - 1.0).abs() < 1e-8, "top {top}");
    assert!(other.abs() < 1e-8, "other {other}");

    let vecs = result.eigenvectors.unwrap();
    let first = vecs[[0, 1]];
    assert!(first.abs() > 1e-6);
    for i in 0..n {
        assert!(vecs[[i, 1]] * first > 0.0, "component {i} changed sign");
        assert!((vecs[[i, 1]].abs() - (1.0 / (n as f64).sqrt())).abs() < 1e-8);
    }
}

#[test]
fn identical_points_with_zero_diagonal_keep_top_eigenvalue_one() {
    // With diagonal 0 the Gaussian correction term is −w_i, so the
    // effective matrix is K̃(0)·J − I: the hollow complete graph. Its
    // normalized form still has top eigenvalue exactly 1 (eigenvector
    // D^{1/2}·1, constant here since all degrees coincide), while the
    // remaining eigenvalues sit at −1/(K̃(0)·n − 1).
    let n = 6;
    let mut op = operator(KernelVariant::Gaussian, 2, 1.0, AccuracySetup::DEFAULT);
    let pts = Array2::from_elem((n, 2), 0.05);
    op.set_points(Some(pts.view())).unwrap();
    op.set_diagonal(0.0);

    let result = op.normalized_eigs(1, &EigsConfig::default()).unwrap();
    assert_eq!(result.eigenvalues.len(), 1);
    assert!((result.eigenvalues[0] - 1.0).abs() < 1e-8, "top {}", result.eigenvalues[0]);

    let vecs = result.eigenvectors.unwrap();
    let first = vecs[[0, 0]];
    assert!(first.abs() > 1e-6);
    for i in 0..n {
        assert!(vecs[[i, 0]] * first > 0.0, "component {i} changed sign");
    }
}

#[test]
fn laplacian_norm_of_a_complete_graph_is_one() {
    // L̃ = I − J/n has eigenvalues {0, 1}, so its 2-norm is exactly 1.
    let n = 5;
    let mut op = operator(KernelVariant::Gaussian, 2, 1.0, AccuracySetup::DEFAULT);
    let pts = Array2::from_elem((n, 2), -0.1);
    op.set_points(Some(pts.view())).unwrap();
    op.set_diagonal(1.0);

    let norm = op.normalized_laplacian_norm(1e-10).unwrap();
    assert!((norm - 1.0).abs() < 1e-8, "norm {norm}");
}

#[test]
fn laplacian_norm_matches_dense_reference() {
    let n = 18;
    let mut op = operator(KernelVariant::Gaussian, 2, 1.1, AccuracySetup::FINE);
    op.set_points(Some(prescaled_cloud(n, 2, 5).view())).unwrap();
    op.set_diagonal(1.0);

    let a = dense_adjacency(&mut op, n);
    let m = dense_normalized(&a, n);
    let mut lap = vec![0.0; n * n];
    for i in 0..n {
        for j in 0..n {
            lap[i * n + j] = if i == j { 1.0 - m[i * n + j] } else { -m[i * n + j] };
        }
    }
    let (vals, _) = symmetric_eig(&lap, n);
    let reference = vals[n - 1];

    let norm = op.normalized_laplacian_norm(1e-8).unwrap();
    assert!((norm - reference).abs() < 5e-2, "norm {norm}, reference {reference}");
}

#[test]
fn degrees_follow_the_diagonal() {
    // deg = A·1 includes the diagonal entry once per row, so raising the
    // diagonal by δ raises every degree by δ and the spectrum stays
    // well defined. Just exercise that eigs still converges.
    let mut op = operator(KernelVariant::SquaredGaussian, 2, 1.0, AccuracySetup::DEFAULT);
    op.set_points(Some(prescaled_cloud(15, 2, 6).view())).unwrap();
    op.set_diagonal(1.0);
    let result = op.normalized_eigs(2, &EigsConfig::default()).unwrap();
    assert_eq!(result.eigenvalues.len(), 2);
    // The top eigenvalue of a normalized nonnegative matrix is 1.
    assert!((result.eigenvalues[1] - 1.0).abs() < 1e-6);
}
