use glam::{DVec2, Mat4};
use workshop_common::CameraConfig;

/// Zoom step applied by [`Camera::zoom_out`] and [`Camera::scroll`].
const ZOOM_STEP: f64 = 1.1;
/// Keyboard zoom-in factor. Not the reciprocal of [`ZOOM_STEP`].
const KEY_ZOOM_IN_FACTOR: f64 = 0.9;

/// Errors from mapping through a camera whose view cannot be inverted.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CameraError {
    #[error("degenerate viewport {width}x{height}")]
    DegenerateViewport { width: u32, height: u32 },
    #[error("zoom must be positive and finite, got {0}")]
    NonPositiveZoom(f64),
    #[error("view does not cover a finite, non-empty world region")]
    UnboundedView,
}

/// What the camera is looking at and through which window.
///
/// Mutated by user interaction (pan, zoom) and by window resizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// World point mapped to the middle of the viewport.
    pub center: DVec2,
    /// Multiplier on the visible half-extents. Larger shows more world.
    pub zoom: f64,
    /// Viewport size in pixels.
    pub width: u32,
    pub height: u32,
}

impl ViewState {
    pub fn new(center: DVec2, zoom: f64, width: u32, height: u32) -> Self {
        Self {
            center,
            zoom,
            width,
            height,
        }
    }

    /// Check that the mapping through this view is well defined.
    pub fn check(&self) -> Result<(), CameraError> {
        if self.width == 0 || self.height == 0 {
            return Err(CameraError::DegenerateViewport {
                width: self.width,
                height: self.height,
            });
        }
        if !(self.zoom > 0.0 && self.zoom.is_finite()) {
            return Err(CameraError::NonPositiveZoom(self.zoom));
        }
        Ok(())
    }
}

/// 2D camera mapping between screen pixels and world units.
///
/// Screen space has its origin at the top-left with Y pointing down, as the
/// windowing system reports it. World space has Y pointing up. At zoom 1 the
/// viewport shows `2 * base_half_height` world units vertically; the
/// horizontal extent follows the aspect ratio so nothing is stretched.
#[derive(Debug, Clone)]
pub struct Camera {
    pub view: ViewState,
    base_half_height: f64,
    min_zoom: f64,
    max_zoom: f64,
    home_center: DVec2,
    home_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(&CameraConfig::default(), 1280, 800)
    }
}

impl Camera {
    /// Create a camera framed as `config` describes, for a `width` x `height` viewport.
    ///
    /// Unusable zoom limits are replaced by the defaults.
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let (min_zoom, max_zoom) = if config.zoom_limits_valid() {
            (config.min_zoom, config.max_zoom)
        } else {
            tracing::warn!(
                min_zoom = config.min_zoom,
                max_zoom = config.max_zoom,
                "invalid zoom limits, using defaults"
            );
            (CameraConfig::DEFAULT_MIN_ZOOM, CameraConfig::DEFAULT_MAX_ZOOM)
        };
        Self {
            view: ViewState::new(config.center, config.zoom, width, height),
            base_half_height: config.base_half_height,
            min_zoom,
            max_zoom,
            home_center: config.center,
            home_zoom: config.zoom,
        }
    }

    pub fn center(&self) -> DVec2 {
        self.view.center
    }

    pub fn zoom(&self) -> f64 {
        self.view.zoom
    }

    pub fn size(&self) -> (u32, u32) {
        (self.view.width, self.view.height)
    }

    pub fn base_half_height(&self) -> f64 {
        self.base_half_height
    }

    /// True when the viewport cannot be mapped (e.g. the window is minimized).
    pub fn is_degenerate(&self) -> bool {
        self.bounds().is_err()
    }

    /// Return to the framing the camera was created with. With the default
    /// config that is center (0, 20) at zoom 1.
    pub fn reset_view(&mut self) {
        self.view.center = self.home_center;
        self.view.zoom = self.home_zoom;
        tracing::debug!(center = ?self.home_center, zoom = self.home_zoom, "view reset");
    }

    /// Track a new window size. Zero sizes are stored as-is; mapping then
    /// reports [`CameraError::DegenerateViewport`] until the window comes back.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.view.width = width;
        self.view.height = height;
    }

    /// Half-width and half-height of the visible world region.
    pub fn extents(&self) -> Result<DVec2, CameraError> {
        self.view.check()?;
        let ratio = self.view.width as f64 / self.view.height as f64;
        Ok(DVec2::new(ratio * self.base_half_height, self.base_half_height) * self.view.zoom)
    }

    /// Lower-left and upper-right corners of the visible world region.
    pub fn bounds(&self) -> Result<(DVec2, DVec2), CameraError> {
        let extents = self.extents()?;
        if !(extents.x > 0.0 && extents.y > 0.0) {
            return Err(CameraError::DegenerateViewport {
                width: self.view.width,
                height: self.view.height,
            });
        }
        let lower = self.view.center - extents;
        let upper = self.view.center + extents;
        let span = upper - lower;
        // Overflowed extents or a huge center would make the mapping NaN.
        if !(lower.is_finite() && upper.is_finite() && span.is_finite())
            || !(span.x > 0.0 && span.y > 0.0)
        {
            return Err(CameraError::UnboundedView);
        }
        Ok((lower, upper))
    }

    /// Map a pixel position to the world point under it.
    pub fn screen_to_world(&self, screen: DVec2) -> Result<DVec2, CameraError> {
        let (lower, upper) = self.bounds()?;
        let w = self.view.width as f64;
        let h = self.view.height as f64;
        let u = screen.x / w;
        let v = (h - screen.y) / h;

        Ok(DVec2::new(
            (1.0 - u) * lower.x + u * upper.x,
            (1.0 - v) * lower.y + v * upper.y,
        ))
    }

    /// Map a world point to the pixel position it is drawn at.
    pub fn world_to_screen(&self, world: DVec2) -> Result<DVec2, CameraError> {
        let (lower, upper) = self.bounds()?;
        let w = self.view.width as f64;
        let h = self.view.height as f64;
        let u = (world.x - lower.x) / (upper.x - lower.x);
        let v = (world.y - lower.y) / (upper.y - lower.y);

        Ok(DVec2::new(u * w, (1.0 - v) * h))
    }

    /// Orthographic projection of the visible region onto clip space.
    ///
    /// `z_bias` lands in the translation Z component so overlays can be drawn
    /// in front of or behind the scene.
    pub fn projection_matrix(&self, z_bias: f32) -> Result<Mat4, CameraError> {
        let (lower, upper) = self.bounds()?;
        let span = upper - lower;
        #[rustfmt::skip]
        let m = [
            (2.0 / span.x) as f32, 0.0, 0.0, 0.0,
            0.0, (2.0 / span.y) as f32, 0.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            (-(upper.x + lower.x) / span.x) as f32, (-(upper.y + lower.y) / span.y) as f32, z_bias, 1.0,
        ];
        Ok(Mat4::from_cols_array(&m))
    }

    /// Move the view by `delta` world units.
    pub fn pan(&mut self, delta: DVec2) {
        self.view.center += delta;
    }

    /// Pan so the world point that was under `from` ends up under `to`.
    pub fn drag_pan(&mut self, from: DVec2, to: DVec2) -> Result<(), CameraError> {
        let grabbed = self.screen_to_world(from)?;
        let now_under = self.screen_to_world(to)?;
        self.view.center += grabbed - now_under;
        Ok(())
    }

    /// Show less world (keyboard zoom).
    pub fn zoom_in(&mut self) {
        self.set_zoom(self.view.zoom * KEY_ZOOM_IN_FACTOR);
    }

    /// Show more world (keyboard zoom).
    pub fn zoom_out(&mut self) {
        self.set_zoom(self.view.zoom * ZOOM_STEP);
    }

    /// Mouse wheel zoom: scrolling up (positive) zooms in.
    pub fn scroll(&mut self, delta: f64) {
        if delta > 0.0 {
            self.set_zoom(self.view.zoom / ZOOM_STEP);
        } else if delta < 0.0 {
            self.set_zoom(self.view.zoom * ZOOM_STEP);
        }
    }

    /// Set the zoom, clamped to the configured limits.
    pub fn set_zoom(&mut self, zoom: f64) {
        self.view.zoom = zoom.clamp(self.min_zoom, self.max_zoom);
    }
}
