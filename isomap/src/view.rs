//! Map view: center, resolution and bearing, and conversions between map and screen
//! coordinates.

use std::f64::consts::PI;

use nalgebra::{Matrix3, Rotation2, Scale2, Translation2};

use crate::geo::{project, unproject, LonLat, Point2, EARTH_RADIUS};

/// Size of a slippy-map tile in pixels. Zoom level `z` shows the world `TILE_SIZE * 2^z` pixels
/// wide.
pub const TILE_SIZE: f64 = 256.0;
/// Minimum allowed zoom.
pub const MIN_ZOOM: f64 = 0.0;
/// Maximum allowed zoom.
pub const MAX_ZOOM: f64 = 22.0;
/// Maximum allowed pitch in degrees.
pub const MAX_PITCH: f64 = 85.0;

/// Size of the viewport in pixels.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct Size {
    /// Width.
    pub width: f64,
    /// Height.
    pub height: f64,
}

impl Size {
    /// Creates a new size.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Half of the width.
    pub fn half_width(&self) -> f64 {
        self.width / 2.0
    }

    /// Half of the height.
    pub fn half_height(&self) -> f64 {
        self.height / 2.0
    }

    /// True if any of the dimensions is zero.
    pub fn is_zero(&self) -> bool {
        self.width == 0.0 || self.height == 0.0
    }
}

/// Meters per pixel in Web-Mercator at the given zoom.
pub fn resolution_at(zoom: f64) -> f64 {
    2.0 * PI * EARTH_RADIUS / (TILE_SIZE * 2f64.powf(zoom))
}

/// The part of the map currently shown: center, zoom, pitch, bearing and viewport size.
///
/// Bearing is the compass direction the top of the viewport faces, in degrees clockwise from
/// north. Pitch is stored and preserved but the map is drawn top-down.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MapView {
    center: LonLat,
    zoom: f64,
    pitch: f64,
    bearing: f64,
    size: Size,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            center: LonLat::default(),
            zoom: MIN_ZOOM,
            pitch: 0.0,
            bearing: 0.0,
            size: Size::default(),
        }
    }
}

impl MapView {
    /// Creates a new view looking at `center` from the given zoom.
    pub fn new(center: LonLat, zoom: f64) -> Self {
        Self::default().with_center(center).with_zoom(zoom)
    }

    /// Center of the view.
    pub fn center(&self) -> LonLat {
        self.center
    }

    /// Zoom level.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Pitch in degrees.
    pub fn pitch(&self) -> f64 {
        self.pitch
    }

    /// Bearing in degrees.
    pub fn bearing(&self) -> f64 {
        self.bearing
    }

    /// Viewport size.
    pub fn size(&self) -> Size {
        self.size
    }

    /// Meters per pixel at the current zoom.
    pub fn resolution(&self) -> f64 {
        resolution_at(self.zoom)
    }

    /// Copy of the view with the given center.
    pub fn with_center(&self, center: LonLat) -> Self {
        // Round trip through the projection to clamp the latitude.
        Self {
            center: unproject(project(center)),
            ..*self
        }
    }

    /// Copy of the view with the given zoom, clamped to `MIN_ZOOM..=MAX_ZOOM`.
    pub fn with_zoom(&self, zoom: f64) -> Self {
        Self {
            zoom: zoom.clamp(MIN_ZOOM, MAX_ZOOM),
            ..*self
        }
    }

    /// Copy of the view with the given pitch, clamped to `0..=MAX_PITCH`.
    pub fn with_pitch(&self, pitch: f64) -> Self {
        Self {
            pitch: pitch.clamp(0.0, MAX_PITCH),
            ..*self
        }
    }

    /// Copy of the view with the given bearing, normalized to `-180..180`.
    pub fn with_bearing(&self, bearing: f64) -> Self {
        Self {
            bearing: (bearing + 180.0).rem_euclid(360.0) - 180.0,
            ..*self
        }
    }

    /// Copy of the view with the given viewport size.
    pub fn with_size(&self, size: Size) -> Self {
        Self { size, ..*self }
    }

    /// Homogeneous transform from projected meters to pixels relative to the top-left corner.
    fn map_to_screen_transform(&self) -> Matrix3<f64> {
        let center = project(self.center);
        let resolution = self.resolution();

        let translate = Translation2::new(-center.x, -center.y).to_homogeneous();
        let rotation = Rotation2::new(self.bearing.to_radians()).to_homogeneous();
        let scale = Scale2::new(1.0 / resolution, -1.0 / resolution).to_homogeneous();
        let to_corner =
            Translation2::new(self.size.half_width(), self.size.half_height()).to_homogeneous();

        to_corner * scale * rotation * translate
    }

    /// Inverse of [`MapView::map_to_screen_transform`].
    fn screen_to_map_transform(&self) -> Matrix3<f64> {
        let center = project(self.center);
        let resolution = self.resolution();

        let from_corner =
            Translation2::new(-self.size.half_width(), -self.size.half_height()).to_homogeneous();
        let scale = Scale2::new(resolution, -resolution).to_homogeneous();
        let rotation = Rotation2::new(-self.bearing.to_radians()).to_homogeneous();
        let translate = Translation2::new(center.x, center.y).to_homogeneous();

        translate * rotation * scale * from_corner
    }

    /// Converts a projected point into a pixel position relative to the top-left corner.
    pub fn map_to_screen(&self, point: Point2) -> Point2 {
        self.map_to_screen_transform().transform_point(&point)
    }

    /// Converts a pixel position into a projected point.
    pub fn screen_to_map(&self, px: Point2) -> Point2 {
        self.screen_to_map_transform().transform_point(&px)
    }

    /// Converts a geographic position into a pixel position.
    pub fn lonlat_to_screen(&self, position: LonLat) -> Point2 {
        self.map_to_screen(project(position))
    }

    /// Converts a pixel position into a geographic position.
    pub fn screen_to_lonlat(&self, px: Point2) -> LonLat {
        unproject(self.screen_to_map(px))
    }

    /// Moves the view so that the map point under `from` ends up under `to`.
    pub fn translate_by_pixels(&self, from: Point2, to: Point2) -> Self {
        let shift = self.screen_to_map(to) - self.screen_to_map(from);
        self.with_center(unproject(project(self.center) - shift))
    }

    /// Changes zoom by `delta` keeping the map point under `anchor` in place.
    pub fn zoom_around(&self, anchor: Point2, delta: f64) -> Self {
        let before = self.screen_to_map(anchor);
        let zoomed = self.with_zoom(self.zoom + delta);
        let after = zoomed.screen_to_map(anchor);

        zoomed.with_center(unproject(project(zoomed.center) + (before - after)))
    }

    /// Projected bounding box `(min, max)` of the visible area.
    pub fn bbox(&self) -> (Point2, Point2) {
        let corners = [
            Point2::new(0.0, 0.0),
            Point2::new(self.size.width, 0.0),
            Point2::new(0.0, self.size.height),
            Point2::new(self.size.width, self.size.height),
        ]
        .map(|corner| self.screen_to_map(corner));

        let min = corners.iter().fold(corners[0], |min, corner| min.inf(corner));
        let max = corners.iter().fold(corners[0], |max, corner| max.sup(corner));

        (min, max)
    }
}
