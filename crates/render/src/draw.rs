use glam::Vec2;
use std::f32::consts::TAU;
use workshop_sim::{BodyState, Shape, ShapeKind, SimWorld};

/// Linear RGBA.
pub type Color = [f32; 4];

/// Segments used to approximate a circle.
const CIRCLE_SEGMENTS: usize = 16;

/// One world-space line segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub a: Vec2,
    pub b: Vec2,
    pub color: Color,
}

/// Accumulated debug geometry for one frame.
#[derive(Debug, Clone, Default)]
pub struct DebugDraw {
    lines: Vec<Line>,
}

impl DebugDraw {
    pub const STATIC: Color = [0.5, 0.9, 0.5, 1.0];
    pub const AWAKE: Color = [0.9, 0.7, 0.7, 1.0];
    pub const SLEEPING: Color = [0.6, 0.6, 0.6, 1.0];
    pub const AXIS_X: Color = [0.9, 0.3, 0.3, 1.0];
    pub const AXIS_Y: Color = [0.3, 0.9, 0.3, 1.0];

    pub fn new() -> Self {
        Self::default()
    }

    /// Outline every collider in the world, colored by body state.
    pub fn from_world(world: &SimWorld) -> Self {
        let mut draw = Self::new();
        for shape in world.shapes() {
            draw.shape(&shape);
        }
        tracing::trace!(lines = draw.len(), "debug draw built");
        draw
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn segment(&mut self, a: Vec2, b: Vec2, color: Color) {
        self.lines.push(Line { a, b, color });
    }

    /// Closed outline through `points`.
    pub fn polygon(&mut self, points: &[Vec2], color: Color) {
        if points.len() < 2 {
            return;
        }
        for (i, &a) in points.iter().enumerate() {
            let b = points[(i + 1) % points.len()];
            self.segment(a, b, color);
        }
    }

    /// Circle outline plus a radius line showing its rotation.
    pub fn circle(&mut self, center: Vec2, radius: f32, angle: f32, color: Color) {
        let points: Vec<Vec2> = (0..CIRCLE_SEGMENTS)
            .map(|i| {
                let theta = TAU * i as f32 / CIRCLE_SEGMENTS as f32;
                center + Vec2::from_angle(theta) * radius
            })
            .collect();
        self.polygon(&points, color);
        self.segment(center, center + Vec2::from_angle(angle) * radius, color);
    }

    /// Unit axes of a transform, useful to mark the world origin.
    pub fn transform(&mut self, origin: Vec2, angle: f32, scale: f32) {
        let x = Vec2::from_angle(angle);
        self.segment(origin, origin + x * scale, Self::AXIS_X);
        self.segment(origin, origin + x.perp() * scale, Self::AXIS_Y);
    }

    pub fn shape(&mut self, shape: &Shape) {
        let color = match shape.state {
            BodyState::Static => Self::STATIC,
            BodyState::Awake => Self::AWAKE,
            BodyState::Sleeping => Self::SLEEPING,
        };
        match shape.kind {
            ShapeKind::Box { half_extents } => {
                let rot = Vec2::from_angle(shape.angle);
                let corners = [
                    Vec2::new(-half_extents.x, -half_extents.y),
                    Vec2::new(half_extents.x, -half_extents.y),
                    Vec2::new(half_extents.x, half_extents.y),
                    Vec2::new(-half_extents.x, half_extents.y),
                ]
                .map(|c| shape.position + rot.rotate(c));
                self.polygon(&corners, color);
            }
            ShapeKind::Ball { radius } => {
                self.circle(shape.position, radius, shape.angle, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn polygon_is_closed() {
        let mut draw = DebugDraw::new();
        let pts = [Vec2::ZERO, Vec2::X, Vec2::ONE];
        draw.polygon(&pts, DebugDraw::AWAKE);
        assert_eq!(draw.len(), 3);
        assert_eq!(draw.lines()[2].b, Vec2::ZERO);
    }

    #[test]
    fn degenerate_polygon_draws_nothing() {
        let mut draw = DebugDraw::new();
        draw.polygon(&[Vec2::ONE], DebugDraw::AWAKE);
        assert!(draw.is_empty());
    }

    #[test]
    fn circle_points_lie_on_radius() {
        let mut draw = DebugDraw::new();
        let c = Vec2::new(2.0, -1.0);
        draw.circle(c, 3.0, 0.0, DebugDraw::AWAKE);
        assert_eq!(draw.len(), CIRCLE_SEGMENTS + 1);
        for line in &draw.lines()[..CIRCLE_SEGMENTS] {
            assert!((line.a.distance(c) - 3.0).abs() < 1e-5);
        }
        let spoke = draw.lines()[CIRCLE_SEGMENTS];
        assert!(close(spoke.b, c + Vec2::new(3.0, 0.0)));
    }

    #[test]
    fn rotated_box_corners() {
        let mut draw = DebugDraw::new();
        draw.shape(&Shape {
            kind: ShapeKind::Box {
                half_extents: Vec2::new(2.0, 1.0),
            },
            position: Vec2::new(10.0, 0.0),
            angle: std::f32::consts::FRAC_PI_2,
            state: BodyState::Static,
        });
        assert_eq!(draw.len(), 4);
        assert_eq!(draw.lines()[0].color, DebugDraw::STATIC);
        // (-2, -1) rotated a quarter turn is (1, -2).
        assert!(close(draw.lines()[0].a, Vec2::new(11.0, -2.0)));
    }

    #[test]
    fn transform_axes() {
        let mut draw = DebugDraw::new();
        draw.transform(Vec2::ZERO, 0.0, 1.0);
        assert_eq!(draw.len(), 2);
        assert!(close(draw.lines()[0].b, Vec2::X));
        assert!(close(draw.lines()[1].b, Vec2::Y));
    }

    #[test]
    fn world_outlines_every_collider() {
        let mut world = SimWorld::new(Vec2::new(0.0, -10.0), Duration::from_millis(16));
        world.add_ground(Vec2::ZERO, Vec2::new(5.0, 0.5));
        world.add_box(Vec2::new(0.0, 3.0), Vec2::splat(0.5));
        world.add_ball(Vec2::new(2.0, 3.0), 0.5);
        let draw = DebugDraw::from_world(&world);
        assert_eq!(draw.len(), 4 + 4 + CIRCLE_SEGMENTS + 1);
        assert!(draw.lines().iter().any(|l| l.color == DebugDraw::STATIC));
        assert!(draw.lines().iter().any(|l| l.color == DebugDraw::AWAKE));
    }
}
