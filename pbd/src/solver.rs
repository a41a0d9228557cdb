use crate::collision::*;
use crate::constraints::CollisionConstraint;
use crate::{Error, IdAllocator, ModelId, PbdModel};
use na::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Simulation parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    pub time_step: f64,
    pub gravity: [f64; 3],
    /// Maximum number of constraint projection passes per step.
    pub max_iterations: u32,
    /// Stop projecting once the largest constraint residual of a pass falls below this value.
    /// Zero always runs `max_iterations` passes.
    pub tolerance: f64,
}

impl Default for SimParams {
    fn default() -> Self {
        SimParams {
            time_step: 0.01,
            gravity: [0.0, -9.81, 0.0],
            max_iterations: 10,
            tolerance: 0.0,
        }
    }
}

/// Immovable analytic obstacle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Obstacle {
    Plane(Plane),
    Sphere(Sphere),
}

/// What a body is tested against.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Collider {
    /// Vertices and edges of the first body against the surface of another body.
    Model(ModelId),
    /// Vertices of the first body against an analytic obstacle.
    Obstacle(Obstacle),
}

/// A pair of geometries tested for collisions every step and resolved with collision
/// constraints.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InteractionPair {
    pub first: ModelId,
    pub second: Collider,
}

/// Penalty based coupling between a body and an obstacle.
///
/// The body is represented by a proxy sphere centred at its centroid. Penalty forces computed
/// from the proxy contacts are accumulated on the body and applied during the next prediction.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PenaltyCoupling {
    pub model: ModelId,
    pub proxy_radius: f64,
    pub obstacle: Obstacle,
    pub stiffness: f64,
}

/// Summary of a single time step.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct StepResult {
    /// Number of projection passes performed.
    pub iterations: u32,
    /// Largest constraint residual in the last pass.
    pub max_residual: f64,
    pub num_collision_constraints: usize,
}

impl std::fmt::Display for StepResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "Iterations: {}\nMax Residual: {}\nCollision Constraints: {}",
            self.iterations, self.max_residual, self.num_collision_constraints
        )
    }
}

pub struct SolverBuilder {
    sim_params: SimParams,
    ids: IdAllocator,
    models: Vec<PbdModel>,
    interactions: Vec<InteractionPair>,
    couplings: Vec<PenaltyCoupling>,
}

impl SolverBuilder {
    pub fn new(sim_params: SimParams) -> Self {
        SolverBuilder {
            sim_params,
            ids: IdAllocator::new(),
            models: Vec::new(),
            interactions: Vec::new(),
            couplings: Vec::new(),
        }
    }

    /// Register a body and return its id within this session.
    pub fn add_model(&mut self, model: PbdModel) -> ModelId {
        let id = self.ids.allocate();
        debug_assert_eq!(id.index(), self.models.len());
        self.models.push(model);
        id
    }

    /// Test `first` against `second` every step.
    ///
    /// Body pairs are one directional: vertices and edges of `first` are tested against the
    /// surface of the second body.
    pub fn add_interaction(&mut self, first: ModelId, second: Collider) -> &mut Self {
        self.interactions.push(InteractionPair { first, second });
        self
    }

    pub fn add_penalty_coupling(&mut self, coupling: PenaltyCoupling) -> &mut Self {
        self.couplings.push(coupling);
        self
    }

    fn check_id(&self, id: ModelId) -> Result<(), Error> {
        if self.ids.contains(id) {
            Ok(())
        } else {
            Err(Error::UnknownModel { id: id.index() })
        }
    }

    fn validate(&self) -> Result<(), Error> {
        let SimParams {
            time_step,
            max_iterations,
            tolerance,
            gravity,
        } = self.sim_params;
        let invalid = |name: &str| Error::InvalidParameter {
            name: name.to_string(),
        };
        if !(time_step > 0.0 && time_step.is_finite()) {
            return Err(invalid("time_step"));
        }
        if max_iterations == 0 {
            return Err(invalid("max_iterations"));
        }
        if !(tolerance >= 0.0) {
            return Err(invalid("tolerance"));
        }
        if !gravity.iter().all(|g| g.is_finite()) {
            return Err(invalid("gravity"));
        }
        for pair in self.interactions.iter() {
            self.check_id(pair.first)?;
            if let Collider::Model(second) = pair.second {
                self.check_id(second)?;
                if second == pair.first {
                    return Err(invalid("self interaction"));
                }
            }
        }
        for c in self.couplings.iter() {
            self.check_id(c.model)?;
            if !(c.proxy_radius > 0.0) {
                return Err(invalid("proxy_radius"));
            }
            if !(c.stiffness >= 0.0) {
                return Err(invalid("penalty stiffness"));
            }
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Solver, Error> {
        self.validate()?;
        log::debug!(
            "Building solver with {} models, {} interactions and {} penalty couplings",
            self.models.len(),
            self.interactions.len(),
            self.couplings.len()
        );
        Ok(Solver {
            sim_params: self.sim_params,
            models: self.models.clone(),
            interactions: self.interactions.clone(),
            couplings: self.couplings.clone(),
            collision_data: Vec::new(),
            collision_constraints: Vec::new(),
        })
    }
}

/// Position based dynamics solver.
///
/// Each step runs predict, detect, project and velocity update in that order.
pub struct Solver {
    sim_params: SimParams,
    models: Vec<PbdModel>,
    interactions: Vec<InteractionPair>,
    couplings: Vec<PenaltyCoupling>,
    /// Contacts of each interaction pair from the last step.
    collision_data: Vec<CollisionData>,
    /// Constraints created from the contacts of the last step.
    collision_constraints: Vec<CollisionConstraint>,
}

impl Solver {
    pub fn params(&self) -> SimParams {
        self.sim_params
    }

    /// Panics if `id` was not issued by the builder of this solver.
    pub fn model(&self, id: ModelId) -> &PbdModel {
        &self.models[id.index()]
    }

    pub fn model_mut(&mut self, id: ModelId) -> &mut PbdModel {
        &mut self.models[id.index()]
    }

    pub fn models(&self) -> &[PbdModel] {
        &self.models
    }

    /// Contacts of each interaction pair, in registration order.
    pub fn collision_data(&self) -> &[CollisionData] {
        &self.collision_data
    }

    pub fn collision_constraints(&self) -> &[CollisionConstraint] {
        &self.collision_constraints
    }

    /// Advance the simulation by one time step.
    pub fn step(&mut self) -> StepResult {
        let dt = self.sim_params.time_step;
        let gravity = Vector3::from(self.sim_params.gravity);

        for model in self.models.iter_mut() {
            model.integrate_position(dt, gravity);
        }

        self.detect_collisions();
        self.apply_penalty_couplings();
        self.generate_collision_constraints();

        let (iterations, max_residual) = self.project();

        for model in self.models.iter_mut() {
            model.update_velocity(dt);
        }

        let result = StepResult {
            iterations,
            max_residual,
            num_collision_constraints: self.collision_constraints.len(),
        };
        log::debug!("Step: {}", result);
        result
    }

    /// Run the narrow phase on every interaction pair in parallel.
    fn detect_collisions(&mut self) {
        let models = &self.models;
        self.collision_data = self
            .interactions
            .par_iter()
            .map(|pair| detect_pair(pair, models))
            .collect();
    }

    /// Accumulate penalty forces for the next prediction.
    ///
    /// Forces are computed in parallel and added in registration order.
    fn apply_penalty_couplings(&self) {
        let models = &self.models;
        let forces: Vec<_> = self
            .couplings
            .par_iter()
            .map(|coupling| {
                let model = &models[coupling.model.index()];
                let proxy = Sphere::new(model.centroid(), coupling.proxy_radius);
                let mut data = CollisionData::new();
                match &coupling.obstacle {
                    Obstacle::Plane(plane) => plane_to_sphere(plane, &proxy, &mut data),
                    Obstacle::Sphere(sphere) => sphere_to_sphere(sphere, &proxy, &mut data),
                }
                let force = PenaltyHandler::new(Side::B, coupling.stiffness).compute_force(&data);
                (coupling.model.index(), force)
            })
            .collect();
        for (index, force) in forces {
            if force != Vector3::zeros() {
                models[index].external_force().add(force);
            }
        }
    }

    fn generate_collision_constraints(&mut self) {
        self.collision_constraints.clear();
        for (pair, data) in self.interactions.iter().zip(self.collision_data.iter()) {
            let first = &self.models[pair.first.index()];
            let handler = match pair.second {
                Collider::Model(id) => {
                    let second = &self.models[id.index()];
                    PbdCollisionHandler {
                        first: pair.first,
                        second: Some(id),
                        proximity: pair_proximity(first, second),
                        stiffness: [
                            first.params().contact_stiffness,
                            second.params().contact_stiffness,
                        ],
                    }
                }
                Collider::Obstacle(_) => PbdCollisionHandler {
                    first: pair.first,
                    second: None,
                    proximity: 0.0,
                    stiffness: [first.params().contact_stiffness, 0.0],
                },
            };
            handler.generate_constraints(
                data,
                first.state().positions(),
                &mut self.collision_constraints,
            );
        }
    }

    /// Gauss-Seidel projection of structural constraints followed by collision constraints.
    ///
    /// Returns the number of passes and the largest residual of the last pass.
    fn project(&mut self) -> (u32, f64) {
        let SimParams {
            max_iterations,
            tolerance,
            ..
        } = self.sim_params;

        let mut iterations = 0;
        let mut max_residual = 0.0;
        while iterations < max_iterations {
            iterations += 1;
            let mut residual: f64 = 0.0;
            for model in self.models.iter_mut() {
                if let Some(r) = model.project_constraints() {
                    residual = residual.max(r);
                }
            }
            for c in self.collision_constraints.iter() {
                if let Some(r) = c.solve_position(&mut self.models[..]) {
                    residual = residual.max(r);
                }
            }
            for model in self.models.iter_mut() {
                model.apply_projections();
            }
            max_residual = residual;
            log::trace!("Pass {}: max residual {:e}", iterations, residual);
            if tolerance > 0.0 && residual < tolerance {
                break;
            }
        }
        (iterations, max_residual)
    }
}

fn pair_proximity(first: &PbdModel, second: &PbdModel) -> f64 {
    first.params().proximity + second.params().proximity
}

fn detect_pair(pair: &InteractionPair, models: &[PbdModel]) -> CollisionData {
    let mut data = CollisionData::new();
    let first = &models[pair.first.index()];
    let points = Geometry::PointSet(first.state().positions());
    match &pair.second {
        Collider::Model(id) => {
            let second = &models[id.index()];
            let a = if first.surface_triangles().is_empty() {
                points
            } else {
                Geometry::SurfaceMesh(first.surface_mesh())
            };
            CollisionDetection::new(DetectorType::MeshToMesh)
                .with_proximity(pair_proximity(first, second))
                .compute(&a, &Geometry::SurfaceMesh(second.surface_mesh()), &mut data);
        }
        Collider::Obstacle(Obstacle::Plane(plane)) => {
            CollisionDetection::new(DetectorType::PointSetToPlane).compute(
                &points,
                &Geometry::Plane(*plane),
                &mut data,
            );
        }
        Collider::Obstacle(Obstacle::Sphere(sphere)) => {
            CollisionDetection::new(DetectorType::PointSetToSphere).compute(
                &points,
                &Geometry::Sphere(*sphere),
                &mut data,
            );
        }
    }
    data
}
