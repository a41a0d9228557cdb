use approx::*;
use na::Vector3;
pub use pbd::test_utils::*;
use pbd::{PbdModel, Solver};
use utils::zip;

/// Compare vertex positions of two models.
#[allow(dead_code)]
pub fn compare_models(solution: &PbdModel, expected: &PbdModel, tol: f64) {
    let sol = solution.state().positions();
    let exp = expected.state().positions();
    assert_eq!(sol.len(), exp.len());
    for (pos, expected_pos) in sol.iter().zip(exp.iter()) {
        assert_relative_eq!(*pos, *expected_pos, max_relative = tol, epsilon = 5e-6);
    }
}

/// Check that two solvers hold bitwise identical bodies.
#[allow(dead_code)]
pub fn assert_identical(a: &Solver, b: &Solver) {
    assert_eq!(a.models().len(), b.models().len());
    for (ma, mb) in a.models().iter().zip(b.models().iter()) {
        let sa = ma.state();
        let sb = mb.state();
        for (x, y, (u, w)) in zip!(
            sa.positions().iter(),
            sb.positions().iter(),
            sa.velocities().iter().zip(sb.velocities().iter())
        ) {
            assert_eq!(x, y);
            assert_eq!(u, w);
        }
    }
}

/// Smallest coordinate along `axis` over all vertices of the model.
#[allow(dead_code)]
pub fn min_coordinate(model: &PbdModel, axis: usize) -> f64 {
    model
        .state()
        .positions()
        .iter()
        .map(|x: &Vector3<f64>| x[axis])
        .fold(f64::INFINITY, f64::min)
}

pub fn init_logger() {
    let _ = env_logger::Builder::from_env("PBD_LOG")
        .is_test(true)
        .try_init();
}
