//! Zoom-to-fit targeting and the eased camera animation that reaches it.

use super::{clamp_zoom, Camera, MAX_FIT_ZOOM};
use crate::model::{Millis, Rect, Viewport};

/// Tunables for zoom-to-fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSettings {
    /// World units added on every side of the content box.
    pub padding: f64,
    /// Divisor applied to the exact-fit scale so content never touches the edges.
    pub breathing_room: f64,
    /// Animation length.
    pub duration_ms: u64,
}

impl Default for FitSettings {
    fn default() -> Self {
        Self {
            padding: 80.0,
            breathing_room: 1.25,
            duration_ms: 450,
        }
    }
}

/// Camera that frames `content` inside `viewport`.
///
/// The scale is clamped to `[MIN_ZOOM, MAX_FIT_ZOOM]` and never exceeds the
/// current zoom: fitting only zooms out or holds. Returns `None` when there is
/// nothing to frame or the viewport has no area.
pub fn fit_target(
    current: &Camera,
    content: Option<Rect>,
    viewport: Viewport,
    settings: &FitSettings,
) -> Option<Camera> {
    let content = content?;
    if !viewport.is_usable() {
        return None;
    }
    let padded = content.padded(settings.padding);
    let exact = (viewport.width / padded.width()).min(viewport.height / padded.height());
    let scale = clamp_zoom(exact / settings.breathing_room, MAX_FIT_ZOOM).min(current.z);

    let center = padded.center();
    Some(Camera {
        x: viewport.width / 2.0 - center.x * scale,
        y: viewport.height / 2.0 - center.y * scale,
        z: scale,
    })
}

/// Cubic ease-out: fast start, gentle landing.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// One frame of a camera animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitStep {
    /// Camera to render this frame.
    pub camera: Camera,
    /// Whether the animation has reached its target.
    pub finished: bool,
}

/// Camera interpolation driven by the host's per-frame callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraAnimation {
    from: Camera,
    to: Camera,
    started: Millis,
    duration_ms: u64,
}

impl CameraAnimation {
    /// Animation from `from` to `to` starting at `started`.
    pub fn new(from: Camera, to: Camera, started: Millis, duration_ms: u64) -> Self {
        Self {
            from,
            to,
            started,
            duration_ms,
        }
    }

    /// Camera the animation ends on.
    pub fn target(&self) -> &Camera {
        &self.to
    }

    /// Camera for the frame at `now`.
    pub fn sample(&self, now: Millis) -> FitStep {
        if self.duration_ms == 0 {
            return FitStep {
                camera: self.to,
                finished: true,
            };
        }
        let t = now.since(self.started) as f64 / self.duration_ms as f64;
        if t >= 1.0 {
            return FitStep {
                camera: self.to,
                finished: true,
            };
        }
        FitStep {
            camera: self.from.lerp(&self.to, ease_out_cubic(t)),
            finished: false,
        }
    }
}
