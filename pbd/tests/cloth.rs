mod test_utils;

use pbd::*;
pub use test_utils::*;

/// A cloth pinned along one edge swings down under gravity without tearing.
#[test]
fn pinned_cloth() -> Result<(), Error> {
    init_logger();
    let mesh = make_grid_trimesh(4, 4);
    let params = ModelParams {
        fixed_nodes: (0..5).collect(),
        ..ModelParams::default()
    };
    let mut cloth = PbdModel::from_trimesh(&mesh, params)?;
    cloth.init_distance_constraints(1.0)?;
    cloth.init_dihedral_constraints(0.1)?;

    let mut builder = SolverBuilder::new(DYNAMIC_PARAMS);
    let id = builder.add_model(cloth);
    let mut solver = builder.build()?;
    for _ in 0..100 {
        solver.step();
    }

    let state = solver.model(id).state();
    for i in 0..5 {
        assert_eq!(state.positions()[i], state.initial_positions()[i]);
    }
    assert!(state.positions().iter().all(|x| x.iter().all(|c| c.is_finite())));
    // The free edge has swung down.
    assert!(state.positions()[24][1] < -0.1);

    for edge in solver.model(id).surface_edges() {
        let rest = (state.initial_positions()[edge[1]] - state.initial_positions()[edge[0]]).norm();
        let len = (state.positions()[edge[1]] - state.positions()[edge[0]]).norm();
        assert!(len < 1.25 * rest, "edge {:?} stretched to {}", edge, len / rest);
    }
    Ok(())
}

/// Pinning a vertex through a projection keeps it in place.
#[test]
fn pinned_by_projection() -> Result<(), Error> {
    init_logger();
    let mut cloth = PbdModel::from_trimesh(&make_grid_trimesh(2, 2), ModelParams::default())?;
    cloth.init_distance_constraints(1.0)?;
    cloth.init_area_constraints(1.0)?;
    cloth.pin_vertex(0)?;
    cloth.pin_vertex(2)?;

    let mut builder = SolverBuilder::new(DYNAMIC_PARAMS);
    let id = builder.add_model(cloth);
    let mut solver = builder.build()?;
    for _ in 0..30 {
        solver.step();
    }
    let state = solver.model(id).state();
    assert_eq!(state.positions()[0], state.initial_positions()[0]);
    assert_eq!(state.positions()[2], state.initial_positions()[2]);
    assert!(state.positions()[8][1] < 0.0);
    Ok(())
}
