use glam::{DVec2, Vec2};
use workshop_camera::{Camera, CameraError};
use workshop_sim::SimWorld;

/// A high-level action produced from raw window input.
///
/// The camera and world consume actions, never raw input events.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Move the view by a delta in world units.
    Pan(DVec2),
    /// Drag the view with the pointer, between two pixel positions.
    DragPan { from: DVec2, to: DVec2 },
    /// Show less world.
    ZoomIn,
    /// Show more world.
    ZoomOut,
    /// Mouse wheel; positive zooms in.
    Scroll(f64),
    /// Return to the initial framing.
    ResetView,
    /// Drop a box at the world point under this pixel position.
    SpawnBox(DVec2),
    /// Freeze or resume simulation stepping.
    TogglePause,
    /// No-op (used for input mapping that hasn't been bound yet).
    Noop,
}

impl Action {
    /// Distance in world units that one pan key press moves the view.
    pub const PAN_STEP: f64 = 0.5;
    /// Half-size of boxes spawned with [`Action::SpawnBox`].
    pub const SPAWN_HALF_EXTENT: f32 = 0.5;
}

/// What applying an action did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActionOutcome {
    Applied,
    /// The caller owns the pause flag and should flip it.
    PauseToggled,
    /// The action needed a screen/world mapping and the view had none.
    Skipped(CameraError),
}

/// Apply `action` to the camera and world.
pub fn apply_action(action: &Action, camera: &mut Camera, world: &mut SimWorld) -> ActionOutcome {
    match action {
        Action::Pan(delta) => camera.pan(*delta),
        Action::DragPan { from, to } => {
            if let Err(e) = camera.drag_pan(*from, *to) {
                return skipped(action, e);
            }
        }
        Action::ZoomIn => camera.zoom_in(),
        Action::ZoomOut => camera.zoom_out(),
        Action::Scroll(delta) => camera.scroll(*delta),
        Action::ResetView => camera.reset_view(),
        Action::SpawnBox(pixel) => match camera.screen_to_world(*pixel) {
            Ok(p) => {
                world.add_box(p.as_vec2(), Vec2::splat(Action::SPAWN_HALF_EXTENT));
                tracing::debug!(x = p.x, y = p.y, "spawned box");
            }
            Err(e) => return skipped(action, e),
        },
        Action::TogglePause => return ActionOutcome::PauseToggled,
        Action::Noop => {}
    }
    ActionOutcome::Applied
}

fn skipped(action: &Action, error: CameraError) -> ActionOutcome {
    tracing::warn!(?action, %error, "skipping pointer action");
    ActionOutcome::Skipped(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn setup() -> (Camera, SimWorld) {
        let world = SimWorld::new(Vec2::new(0.0, -10.0), Duration::from_millis(16));
        (Camera::default(), world)
    }

    #[test]
    fn pan_moves_center() {
        let (mut cam, mut world) = setup();
        let outcome = apply_action(&Action::Pan(DVec2::new(Action::PAN_STEP, 0.0)), &mut cam, &mut world);
        assert_eq!(outcome, ActionOutcome::Applied);
        assert_eq!(cam.center(), DVec2::new(0.5, 20.0));
    }

    #[test]
    fn zoom_and_reset() {
        let (mut cam, mut world) = setup();
        apply_action(&Action::ZoomOut, &mut cam, &mut world);
        assert!(cam.zoom() > 1.0);
        apply_action(&Action::Scroll(1.0), &mut cam, &mut world);
        apply_action(&Action::ZoomIn, &mut cam, &mut world);
        assert!(cam.zoom() < 1.0);
        apply_action(&Action::ResetView, &mut cam, &mut world);
        assert_eq!(cam.zoom(), 1.0);
        assert_eq!(cam.center(), DVec2::new(0.0, 20.0));
    }

    #[test]
    fn spawn_box_lands_under_cursor() {
        let (mut cam, mut world) = setup();
        let pixel = DVec2::new(640.0, 400.0);
        let outcome = apply_action(&Action::SpawnBox(pixel), &mut cam, &mut world);
        assert_eq!(outcome, ActionOutcome::Applied);
        assert_eq!(world.body_count(), 1);
        let shape = world.shapes()[0];
        assert!((shape.position - Vec2::new(0.0, 20.0)).length() < 1e-4);
    }

    #[test]
    fn spawn_on_minimized_window_is_skipped() {
        let (mut cam, mut world) = setup();
        cam.resize(0, 0);
        let outcome = apply_action(&Action::SpawnBox(DVec2::ZERO), &mut cam, &mut world);
        assert!(matches!(outcome, ActionOutcome::Skipped(_)));
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn drag_pan_on_minimized_window_is_skipped() {
        let (mut cam, mut world) = setup();
        cam.resize(1280, 0);
        let action = Action::DragPan {
            from: DVec2::ZERO,
            to: DVec2::ONE,
        };
        assert!(matches!(
            apply_action(&action, &mut cam, &mut world),
            ActionOutcome::Skipped(_)
        ));
        assert_eq!(cam.center(), DVec2::new(0.0, 20.0));
    }

    #[test]
    fn toggle_pause_is_reported() {
        let (mut cam, mut world) = setup();
        assert_eq!(
            apply_action(&Action::TogglePause, &mut cam, &mut world),
            ActionOutcome::PauseToggled
        );
    }

    #[test]
    fn noop_changes_nothing() {
        let (mut cam, mut world) = setup();
        let before = cam.view;
        apply_action(&Action::Noop, &mut cam, &mut world);
        assert_eq!(cam.view, before);
        assert_eq!(world.body_count(), 0);
    }
}
