//! Coordinate and camera system.
//!
//! The camera is a world-to-screen affine transform: uniform scale `z` followed
//! by translation `(x, y)` in screen pixels.
//!
//! ```text
//! screen = world * z + (x, y)
//! world  = (screen - (x, y)) / z
//! ```

pub mod fit;

pub use fit::{ease_out_cubic, fit_target, CameraAnimation, FitSettings, FitStep};

use crate::model::{Point, Rect, Viewport};

#[cfg(test)]
#[path = "camera_tests.rs"]
mod tests;

/// Lowest zoom reachable by any gesture or fit.
pub const MIN_ZOOM: f64 = 0.12;

/// Highest zoom reachable by free zoom gestures.
pub const MAX_FREE_ZOOM: f64 = 8.0;

/// Highest zoom a fit-to-content may choose.
pub const MAX_FIT_ZOOM: f64 = 2.0;

/// Wheel delta (pixels) to multiplicative zoom factor sensitivity.
const WHEEL_ZOOM_SENSITIVITY: f64 = 0.0015;

/// World-to-screen transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Screen-space x translation.
    pub x: f64,
    /// Screen-space y translation.
    pub y: f64,
    /// Uniform scale, always within `[MIN_ZOOM, MAX_FREE_ZOOM]`.
    pub z: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 1.0,
        }
    }
}

impl Camera {
    /// Camera with the scale clamped into the free-zoom range.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z: clamp_zoom(z, MAX_FREE_ZOOM),
        }
    }

    /// World point shown at a screen point.
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point::new((screen.x - self.x) / self.z, (screen.y - self.y) / self.z)
    }

    /// Screen point where a world point is drawn.
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point::new(world.x * self.z + self.x, world.y * self.z + self.y)
    }

    /// Pan by a screen-space drag delta. No scaling is applied.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if dx.is_finite() && dy.is_finite() {
            self.x += dx;
            self.y += dy;
        }
    }

    /// Zoom by `factor`, keeping the world point under `anchor` fixed on screen.
    ///
    /// Returns `false` (camera untouched) for a non-finite or non-positive
    /// factor, or when the clamp leaves the zoom unchanged.
    pub fn zoom_at(&mut self, anchor: Point, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 || !anchor.is_finite() {
            return false;
        }
        let world = self.screen_to_world(anchor);
        let next = clamp_zoom(self.z * factor, MAX_FREE_ZOOM);
        if next == self.z {
            return false;
        }
        self.z = next;
        self.x = anchor.x - world.x * self.z;
        self.y = anchor.y - world.y * self.z;
        true
    }

    /// Zoom in response to a wheel event with vertical delta `delta_y` pixels.
    ///
    /// Scrolling up (negative delta) zooms in.
    pub fn wheel_zoom(&mut self, anchor: Point, delta_y: f64) -> bool {
        self.zoom_at(anchor, (-delta_y * WHEEL_ZOOM_SENSITIVITY).exp())
    }

    /// The world-space rectangle currently covered by the viewport.
    pub fn visible_world_rect(&self, viewport: Viewport) -> Rect {
        Rect::from_corners(
            self.screen_to_world(Point::ORIGIN),
            self.screen_to_world(Point::new(viewport.width, viewport.height)),
        )
    }

    /// Linear blend between two cameras.
    pub fn lerp(&self, to: &Camera, t: f64) -> Camera {
        Camera {
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
            z: self.z + (to.z - self.z) * t,
        }
    }

    /// Equal within a sub-pixel tolerance.
    pub fn approx_eq(&self, other: &Camera) -> bool {
        (self.x - other.x).abs() < 0.5
            && (self.y - other.y).abs() < 0.5
            && (self.z - other.z).abs() < 1e-4
    }
}

/// Clamp a zoom to `[MIN_ZOOM, max]`; NaN maps to `MIN_ZOOM`.
pub(crate) fn clamp_zoom(z: f64, max: f64) -> f64 {
    if z.is_nan() {
        return MIN_ZOOM;
    }
    z.clamp(MIN_ZOOM, max)
}
