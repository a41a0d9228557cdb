use na::Vector3;

/// Per-particle simulation state of a single body.
///
/// All buffers share one index space (one entry per mesh vertex) and are sized once at
/// construction. A vertex with zero inverse mass is fixed and never moved by the integrator or
/// any constraint projection.
#[derive(Clone, Debug, PartialEq)]
pub struct BodyState {
    /// Rest configuration used to compute constraint rest data.
    initial_pos: Vec<Vector3<f64>>,
    pos: Vec<Vector3<f64>>,
    prev_pos: Vec<Vector3<f64>>,
    vel: Vec<Vector3<f64>>,
    acc: Vec<Vector3<f64>>,
    mass: Vec<f64>,
    inv_mass: Vec<f64>,
}

impl BodyState {
    /// Build a state at rest with unit mass on every vertex.
    pub fn new(positions: impl IntoIterator<Item = [f64; 3]>) -> Self {
        let pos: Vec<_> = positions.into_iter().map(Vector3::from).collect();
        let n = pos.len();
        BodyState {
            initial_pos: pos.clone(),
            prev_pos: pos.clone(),
            pos,
            vel: vec![Vector3::zeros(); n],
            acc: vec![Vector3::zeros(); n],
            mass: vec![1.0; n],
            inv_mass: vec![1.0; n],
        }
    }

    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.pos.len()
    }

    #[inline]
    pub fn vertex_position(&self, i: usize) -> &Vector3<f64> {
        &self.pos[i]
    }

    #[inline]
    pub fn vertex_position_mut(&mut self, i: usize) -> &mut Vector3<f64> {
        &mut self.pos[i]
    }

    #[inline]
    pub fn initial_vertex_position(&self, i: usize) -> &Vector3<f64> {
        &self.initial_pos[i]
    }

    #[inline]
    pub fn inv_mass(&self, i: usize) -> f64 {
        self.inv_mass[i]
    }

    #[inline]
    pub fn mass(&self, i: usize) -> f64 {
        self.mass[i]
    }

    /// Sum of the masses of all movable vertices.
    pub fn total_free_mass(&self) -> f64 {
        self.mass
            .iter()
            .zip(self.inv_mass.iter())
            .filter(|(_, &w)| w > 0.0)
            .map(|(&m, _)| m)
            .sum()
    }

    /// Assign the same mass to every vertex. A zero mass fixes all vertices.
    pub fn set_uniform_mass(&mut self, mass: f64) {
        let inv = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        self.mass.iter_mut().for_each(|m| *m = mass);
        self.inv_mass.iter_mut().for_each(|w| *w = inv);
    }

    /// Assign the mass of a single vertex. A zero mass fixes the vertex.
    pub fn set_particle_mass(&mut self, mass: f64, i: usize) {
        self.mass[i] = mass;
        self.inv_mass[i] = if mass > 0.0 { 1.0 / mass } else { 0.0 };
    }

    pub fn set_fixed_point(&mut self, i: usize) {
        self.set_particle_mass(0.0, i);
    }

    pub fn is_fixed(&self, i: usize) -> bool {
        self.inv_mass[i] == 0.0
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.pos
    }

    pub fn positions_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.pos
    }

    pub fn previous_positions(&self) -> &[Vector3<f64>] {
        &self.prev_pos
    }

    pub fn initial_positions(&self) -> &[Vector3<f64>] {
        &self.initial_pos
    }

    pub fn velocities(&self) -> &[Vector3<f64>] {
        &self.vel
    }

    pub fn velocities_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.vel
    }

    pub fn accelerations_mut(&mut self) -> &mut [Vector3<f64>] {
        &mut self.acc
    }

    /// Positions converted to plain arrays, convenient for writing back into a mesh.
    pub fn position_arrays(&self) -> Vec<[f64; 3]> {
        self.pos.iter().map(|p| [p[0], p[1], p[2]]).collect()
    }

    /// Return to the initial configuration at rest.
    pub fn reset(&mut self) {
        self.pos.copy_from_slice(&self.initial_pos);
        self.prev_pos.copy_from_slice(&self.initial_pos);
        self.vel.iter_mut().for_each(|v| *v = Vector3::zeros());
        self.acc.iter_mut().for_each(|a| *a = Vector3::zeros());
    }

    /// Explicitly predict new positions from the current velocities.
    ///
    /// Per-vertex accelerations are consumed (zeroed) by this call. `damping` is the viscous
    /// damping coefficient in `[0, 1]`.
    pub fn integrate_position(
        &mut self,
        dt: f64,
        gravity: Vector3<f64>,
        extra_acceleration: Vector3<f64>,
        damping: f64,
    ) {
        for i in 0..self.pos.len() {
            if self.inv_mass[i] == 0.0 {
                continue;
            }
            self.vel[i] += (self.acc[i] + gravity + extra_acceleration) * dt;
            self.acc[i] = Vector3::zeros();
            self.prev_pos[i] = self.pos[i];
            self.pos[i] += self.vel[i] * ((1.0 - damping) * dt);
        }
    }

    /// Recover velocities from the position change over the last step.
    pub fn update_velocity(&mut self, dt: f64) {
        if dt <= 0.0 {
            return;
        }
        for i in 0..self.pos.len() {
            if self.inv_mass[i] > 0.0 {
                self.vel[i] = (self.pos[i] - self.prev_pos[i]) / dt;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn two_points() -> BodyState {
        BodyState::new(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]])
    }

    #[test]
    fn masses() {
        let mut state = two_points();
        assert_eq!(state.inv_mass(0), 1.0);
        state.set_uniform_mass(2.0);
        assert_eq!(state.inv_mass(1), 0.5);
        state.set_fixed_point(1);
        assert!(state.is_fixed(1));
        assert_eq!(state.total_free_mass(), 2.0);
        state.set_uniform_mass(0.0);
        assert!(state.is_fixed(0) && state.is_fixed(1));
    }

    #[test]
    fn fixed_vertices_do_not_integrate() {
        let mut state = two_points();
        state.set_fixed_point(0);
        let g = Vector3::new(0.0, -10.0, 0.0);
        state.integrate_position(0.1, g, Vector3::zeros(), 0.0);
        assert_eq!(*state.vertex_position(0), Vector3::zeros());
        assert_relative_eq!(state.vertex_position(1)[1], -0.1, epsilon = 1e-12);
        state.update_velocity(0.1);
        assert_relative_eq!(state.velocities()[1][1], -1.0, epsilon = 1e-12);
        assert_eq!(state.velocities()[0], Vector3::zeros());
    }

    #[test]
    fn full_damping_freezes_positions() {
        let mut state = two_points();
        state.integrate_position(0.1, Vector3::new(0.0, -10.0, 0.0), Vector3::zeros(), 1.0);
        assert_eq!(state.positions(), state.initial_positions());
    }

    #[test]
    fn reset_restores_rest() {
        let mut state = two_points();
        *state.vertex_position_mut(1) = Vector3::new(3.0, 0.0, 0.0);
        state.velocities_mut()[1] = Vector3::new(1.0, 0.0, 0.0);
        state.reset();
        assert_eq!(state.positions(), state.initial_positions());
        assert_eq!(state.velocities()[1], Vector3::zeros());
    }

    #[test]
    #[should_panic]
    fn out_of_bounds_panics() {
        let state = two_points();
        let _ = state.vertex_position(2);
    }
}
