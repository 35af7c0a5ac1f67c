use workshop_camera::Camera;
use workshop_sim::SimWorld;

/// Renderer-agnostic interface. All renderers implement this trait.
///
/// The renderer reads world state and the camera, then produces output. It
/// never mutates either.
pub trait Renderer {
    /// The output type produced by this renderer.
    type Output;

    /// Render one frame from the given world state and view.
    fn render(&self, world: &SimWorld, camera: &Camera) -> Self::Output;
}

/// Text renderer for headless runs, logging and tests.
#[derive(Debug, Default)]
pub struct DebugTextRenderer;

impl DebugTextRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for DebugTextRenderer {
    type Output = String;

    fn render(&self, world: &SimWorld, camera: &Camera) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "=== World (tick={}, bodies={}) ===\n",
            world.tick(),
            world.body_count()
        ));

        let c = camera.center();
        let (w, h) = camera.size();
        match camera.bounds() {
            Ok((lower, upper)) => out.push_str(&format!(
                "Camera: center=({:.1}, {:.1}) zoom={:.2} viewport={w}x{h} visible=({:.1}, {:.1})..({:.1}, {:.1})\n",
                c.x,
                c.y,
                camera.zoom(),
                lower.x,
                lower.y,
                upper.x,
                upper.y
            )),
            Err(e) => out.push_str(&format!("Camera: {e}\n")),
        }

        for shape in world.shapes() {
            out.push_str(&format!(
                "  {:?} {:?} pos=({:.2}, {:.2}) angle={:.2}\n",
                shape.state, shape.kind, shape.position.x, shape.position.y, shape.angle
            ));
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use std::time::Duration;

    fn world() -> SimWorld {
        SimWorld::new(Vec2::new(0.0, -10.0), Duration::from_millis(16))
    }

    #[test]
    fn debug_renderer_empty_world() {
        let output = DebugTextRenderer::new().render(&world(), &Camera::default());
        assert!(output.contains("tick=0"));
        assert!(output.contains("bodies=0"));
        assert!(output.contains("zoom=1.00"));
    }

    #[test]
    fn debug_renderer_with_bodies() {
        let mut w = world();
        w.add_box(Vec2::new(1.0, 2.0), Vec2::splat(0.5));
        w.add_ball(Vec2::new(-1.0, 2.0), 0.5);
        let output = DebugTextRenderer::new().render(&w, &Camera::default());
        assert!(output.contains("bodies=2"));
        assert!(output.contains("pos=(1.00, 2.00)"));
    }

    #[test]
    fn debug_renderer_reports_degenerate_view() {
        let mut camera = Camera::default();
        camera.resize(0, 0);
        let output = DebugTextRenderer::new().render(&world(), &camera);
        assert!(output.contains("degenerate viewport 0x0"));
    }
}
