//! Coordinates, Web-Mercator projection and the projected shapes used for drawing and
//! hit-testing features.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::{Contains, Coord, EuclideanDistance, LineString, MapCoords, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Point in a cartesian space: projected meters or screen pixels depending on context.
pub type Point2 = nalgebra::Point2<f64>;

/// Semi-major axis of the WGS84 ellipsoid, in meters.
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Maximum latitude representable in Web-Mercator.
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Geographic position in degrees.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    /// Longitude.
    pub lon: f64,
    /// Latitude.
    pub lat: f64,
}

impl LonLat {
    /// Creates a new position.
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Projects a geographic position into Web-Mercator (EPSG:3857) meters.
pub fn project(position: LonLat) -> Point2 {
    let lat = position.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = EARTH_RADIUS * position.lon.to_radians();
    let y = EARTH_RADIUS * (FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Point2::new(x, y)
}

/// Inverse of [`project`].
pub fn unproject(point: Point2) -> LonLat {
    let lon = (point.x / EARTH_RADIUS).to_degrees();
    let lat = (2.0 * (point.y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees();
    LonLat::new(lon, lat)
}

/// Converts a projected `geo` coordinate into a point.
pub fn to_point2(coord: Coord<f64>) -> Point2 {
    Point2::new(coord.x, coord.y)
}

fn project_coord(coord: Coord<f64>) -> Coord<f64> {
    let projected = project(LonLat::new(coord.x, coord.y));
    Coord {
        x: projected.x,
        y: projected.y,
    }
}

/// Geometry of a single feature projected into Web-Mercator.
///
/// Geometry collections are flattened: a feature may contribute points, lines and polygons at
/// the same time.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Shapes {
    /// Point geometries.
    pub points: Vec<Point<f64>>,
    /// Line strings.
    pub lines: Vec<LineString<f64>>,
    /// Polygons with their holes.
    pub polygons: Vec<Polygon<f64>>,
}

impl Shapes {
    /// Projects a GeoJSON geometry. Geometry that cannot be converted is skipped.
    pub fn from_geometry(geometry: &geojson::Geometry) -> Self {
        let mut shapes = Self::default();
        match geo::Geometry::<f64>::try_from(&geometry.value) {
            Ok(geometry) => shapes.push(geometry.map_coords(project_coord)),
            Err(err) => log::warn!("Skipping invalid feature geometry: {err}"),
        }

        shapes
    }

    fn push(&mut self, geometry: geo::Geometry<f64>) {
        match geometry {
            geo::Geometry::Point(point) => self.points.push(point),
            geo::Geometry::MultiPoint(points) => self.points.extend(points),
            geo::Geometry::Line(line) => self.lines.push(line.into()),
            geo::Geometry::LineString(line) => self.lines.push(line),
            geo::Geometry::MultiLineString(lines) => self.lines.extend(lines),
            geo::Geometry::Polygon(polygon) => self.polygons.push(polygon),
            geo::Geometry::MultiPolygon(polygons) => self.polygons.extend(polygons),
            geo::Geometry::Rect(rect) => self.polygons.push(rect.to_polygon()),
            geo::Geometry::Triangle(triangle) => self.polygons.push(triangle.to_polygon()),
            geo::Geometry::GeometryCollection(collection) => {
                for geometry in collection {
                    self.push(geometry);
                }
            }
        }
    }

    /// First point of the geometry, if the geometry has points.
    pub fn first_point(&self) -> Option<Point2> {
        self.points.first().map(|point| to_point2(point.0))
    }

    /// True if any point geometry is within `tolerance` of `point`.
    pub fn hits_point(&self, point: &Point2, tolerance: f64) -> bool {
        let point = Point::new(point.x, point.y);
        self.points
            .iter()
            .any(|p| p.euclidean_distance(&point) <= tolerance)
    }

    /// True if any line is within `tolerance` of `point`.
    pub fn hits_line(&self, point: &Point2, tolerance: f64) -> bool {
        let point = Point::new(point.x, point.y);
        self.lines
            .iter()
            .any(|line| point.euclidean_distance(line) <= tolerance)
    }

    /// True if `point` lies inside a polygon and outside of its holes.
    pub fn hits_polygon(&self, point: &Point2) -> bool {
        let point = Point::new(point.x, point.y);
        self.polygons.iter().any(|polygon| polygon.contains(&point))
    }
}
