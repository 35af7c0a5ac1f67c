use glam::Vec2;
use rapier2d::prelude::*;
use std::time::Duration;
use workshop_common::SimConfig;

/// Geometry of a collider, in its local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeKind {
    Box { half_extents: Vec2 },
    Ball { radius: f32 },
}

/// Motion state of the body a collider is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyState {
    Static,
    Awake,
    Sleeping,
}

/// A collider placed in world space, as the debug drawer needs it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shape {
    pub kind: ShapeKind,
    pub position: Vec2,
    /// Rotation in radians, counter-clockwise.
    pub angle: f32,
    pub state: BodyState,
}

/// The physics world.
///
/// Owns the rapier pipeline and every body/collider set. The harness steps
/// it once per frame with a fixed timestep equal to the target frame period.
pub struct SimWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    tick: u64,
}

impl SimWorld {
    /// An empty world with the given gravity, stepped by `timestep`.
    pub fn new(gravity: Vec2, timestep: Duration) -> Self {
        let integration_parameters = IntegrationParameters {
            dt: timestep.as_secs_f32(),
            ..Default::default()
        };
        Self {
            gravity: vector![gravity.x, gravity.y],
            integration_parameters,
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            tick: 0,
        }
    }

    /// Build a world from config, optionally populated with the demo scene.
    pub fn from_config(config: &SimConfig, timestep: Duration) -> Self {
        let mut world = Self::new(config.gravity, timestep);
        if config.spawn_demo_scene {
            world.demo_scene();
        }
        world
    }

    /// Number of steps taken so far.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn timestep(&self) -> Duration {
        Duration::from_secs_f32(self.integration_parameters.dt)
    }

    pub fn gravity(&self) -> Vec2 {
        Vec2::new(self.gravity.x, self.gravity.y)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Add a fixed box, e.g. the ground.
    pub fn add_ground(&mut self, position: Vec2, half_extents: Vec2) -> RigidBodyHandle {
        let body = RigidBodyBuilder::fixed()
            .translation(vector![position.x, position.y])
            .build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .friction(0.6)
            .build();
        self.insert(body, collider)
    }

    /// Add a dynamic box.
    pub fn add_box(&mut self, position: Vec2, half_extents: Vec2) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y])
            .build();
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y)
            .density(1.0)
            .friction(0.6)
            .build();
        self.insert(body, collider)
    }

    /// Add a dynamic ball.
    pub fn add_ball(&mut self, position: Vec2, radius: f32) -> RigidBodyHandle {
        let body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y])
            .build();
        let collider = ColliderBuilder::ball(radius)
            .density(1.0)
            .friction(0.6)
            .restitution(0.3)
            .build();
        self.insert(body, collider)
    }

    fn insert(&mut self, body: RigidBody, collider: Collider) -> RigidBodyHandle {
        let handle = self.bodies.insert(body);
        self.colliders
            .insert_with_parent(collider, handle, &mut self.bodies);
        tracing::debug!(bodies = self.bodies.len(), "body added");
        handle
    }

    /// Ground slab, a column of boxes and a ball, framed by the default view.
    pub fn demo_scene(&mut self) {
        self.add_ground(Vec2::new(0.0, -1.0), Vec2::new(40.0, 1.0));
        for i in 0..10 {
            let y = 0.5 + i as f32 * 1.05;
            self.add_box(Vec2::new(0.0, y), Vec2::splat(0.5));
        }
        self.add_ball(Vec2::new(-6.0, 20.0), 1.0);
        tracing::info!(bodies = self.bodies.len(), "demo scene built");
    }

    /// World-space position of a body's origin.
    pub fn body_position(&self, handle: RigidBodyHandle) -> Option<Vec2> {
        self.bodies.get(handle).map(|b| {
            let t = b.translation();
            Vec2::new(t.x, t.y)
        })
    }

    /// Advance the world by one fixed timestep.
    pub fn step(&mut self) {
        let _span = tracing::info_span!("sim_step", tick = self.tick).entered();
        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
        self.tick += 1;
    }

    /// Every collider in world space.
    pub fn shapes(&self) -> Vec<Shape> {
        let mut shapes = Vec::with_capacity(self.colliders.len());
        for (_, collider) in self.colliders.iter() {
            let kind = if let Some(cuboid) = collider.shape().as_cuboid() {
                ShapeKind::Box {
                    half_extents: Vec2::new(cuboid.half_extents.x, cuboid.half_extents.y),
                }
            } else if let Some(ball) = collider.shape().as_ball() {
                ShapeKind::Ball {
                    radius: ball.radius,
                }
            } else {
                continue;
            };

            let state = match collider.parent().and_then(|h| self.bodies.get(h)) {
                Some(body) if body.is_fixed() => BodyState::Static,
                Some(body) if body.is_sleeping() => BodyState::Sleeping,
                Some(_) => BodyState::Awake,
                None => BodyState::Static,
            };

            let iso = collider.position();
            shapes.push(Shape {
                kind,
                position: Vec2::new(iso.translation.vector.x, iso.translation.vector.y),
                angle: iso.rotation.angle(),
                state,
            });
        }
        shapes
    }

    /// Deterministic hash of tick and body poses, for comparing two runs.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        mix(&mut h, &self.tick.to_le_bytes());
        for (_, body) in self.bodies.iter() {
            let t = body.translation();
            mix(&mut h, &t.x.to_le_bytes());
            mix(&mut h, &t.y.to_le_bytes());
            mix(&mut h, &body.rotation().angle().to_le_bytes());
        }
        h
    }
}
