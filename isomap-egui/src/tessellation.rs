//! Triangulation of polygon layers.
//!
//! Polygons are tessellated once in projected coordinates and only transformed to the screen on
//! every frame. Vertices are stored relative to an origin point of the layer to keep `f32`
//! precision at city scale.

use std::collections::HashMap;

use geo::Polygon;
use isomap::geo::{to_point2, Point2};
use isomap::session::LayerSpec;
use isomap::Map;
use lyon::lyon_tessellation::{
    BuffersBuilder, FillOptions, FillRule, FillTessellator, FillVertex, VertexBuffers,
};
use lyon::math::point;
use lyon::path::Path;

/// Triangles of all polygons of a fill layer.
#[derive(Debug, Default, Clone)]
pub struct FillMesh {
    /// Projected point the vertices are relative to.
    pub origin: Point2,
    /// Vertex positions in meters relative to `origin`.
    pub vertices: Vec<[f32; 2]>,
    /// Triangle indices into `vertices`.
    pub indices: Vec<u32>,
}

impl FillMesh {
    /// Projected position of a vertex.
    pub fn position(&self, vertex: [f32; 2]) -> Point2 {
        Point2::new(
            self.origin.x + vertex[0] as f64,
            self.origin.y + vertex[1] as f64,
        )
    }

    /// True if there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Tessellates projected polygons. Holes are cut out with the even-odd rule.
pub fn tessellate_polygons<'a>(
    polygons: impl IntoIterator<Item = &'a Polygon<f64>> + Clone,
) -> FillMesh {
    let origin = polygons
        .clone()
        .into_iter()
        .find_map(|polygon| polygon.exterior().0.first().copied())
        .map(to_point2)
        .unwrap_or_default();

    let mut buffers: VertexBuffers<[f32; 2], u32> = VertexBuffers::new();
    let mut tessellator = FillTessellator::new();
    let options = FillOptions::DEFAULT.with_fill_rule(FillRule::EvenOdd);

    for polygon in polygons {
        let mut builder = Path::builder();
        for ring in std::iter::once(polygon.exterior()).chain(polygon.interiors()) {
            // Rings are closed, the path closes itself.
            let coords = if ring.is_closed() {
                &ring.0[..ring.0.len().saturating_sub(1)]
            } else {
                &ring.0[..]
            };
            let mut points = coords
                .iter()
                .map(|c| point((c.x - origin.x) as f32, (c.y - origin.y) as f32));

            let Some(first) = points.next() else {
                continue;
            };

            let _ = builder.begin(first);
            for p in points {
                let _ = builder.line_to(p);
            }
            builder.end(true);
        }

        let path = builder.build();
        let result = tessellator.tessellate_path(
            &path,
            &options,
            &mut BuffersBuilder::new(&mut buffers, |vertex: FillVertex| {
                vertex.position().to_array()
            }),
        );

        if let Err(err) = result {
            log::warn!("Failed to tessellate polygon: {err:?}");
        }
    }

    FillMesh {
        origin,
        vertices: buffers.vertices,
        indices: buffers.indices,
    }
}

/// Fill meshes per layer, rebuilt when the map revision changes.
#[derive(Debug, Default)]
pub struct TessellationCache {
    revision: Option<u64>,
    meshes: HashMap<String, FillMesh>,
}

impl TessellationCache {
    /// Mesh of a fill layer of the map.
    pub fn fill(&mut self, map: &Map, layer: &LayerSpec) -> Option<&FillMesh> {
        if self.revision != Some(map.revision()) {
            self.meshes.clear();
            self.revision = Some(map.revision());
        }

        if !self.meshes.contains_key(&layer.id) {
            let source = map.source(&layer.source)?;
            let polygons: Vec<&Polygon<f64>> = source
                .features()
                .filter(|(feature, _)| layer.accepts(feature.properties.as_ref()))
                .flat_map(|(_, shapes)| shapes.polygons.iter())
                .collect();

            let mesh = tessellate_polygons(polygons.iter().copied());
            log::debug!(
                "Tessellated layer '{}': {} triangles",
                layer.id,
                mesh.indices.len() / 3
            );
            self.meshes.insert(layer.id.clone(), mesh);
        }

        self.meshes.get(&layer.id)
    }
}

#[cfg(test)]
mod tests {
    use geo::{line_string, LineString};

    use super::*;

    fn square(x: f64, y: f64, size: f64) -> LineString<f64> {
        line_string![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
        ]
    }

    fn area(mesh: &FillMesh) -> f64 {
        mesh.indices
            .chunks(3)
            .map(|t| {
                let [a, b, c] = [t[0], t[1], t[2]].map(|i| mesh.vertices[i as usize]);
                ((b[0] - a[0]) as f64 * (c[1] - a[1]) as f64
                    - (c[0] - a[0]) as f64 * (b[1] - a[1]) as f64)
                    .abs()
                    / 2.0
            })
            .sum()
    }

    #[test]
    fn square_is_two_triangles() {
        let polygon = Polygon::new(square(2_277_000.0, 5_592_000.0, 100.0), vec![]);
        let mesh = tessellate_polygons([&polygon]);

        assert_eq!(mesh.indices.len(), 6);
        assert_eq!(mesh.origin, Point2::new(2_277_000.0, 5_592_000.0));
        approx::assert_abs_diff_eq!(area(&mesh), 10_000.0, epsilon = 1e-3);
    }

    #[test]
    fn holes_are_not_filled() {
        let polygon = Polygon::new(square(0.0, 0.0, 10.0), vec![square(4.0, 4.0, 2.0)]);
        let mesh = tessellate_polygons([&polygon]);

        approx::assert_abs_diff_eq!(area(&mesh), 96.0, epsilon = 1e-3);
    }

    #[test]
    fn empty_input_gives_empty_mesh() {
        let mesh = tessellate_polygons(std::iter::empty::<&Polygon<f64>>());
        assert!(mesh.is_empty());
    }
}
