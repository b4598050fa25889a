use std::sync::Arc;

use egui::epaint::{Vertex, WHITE_UV};
use egui::{Color32, Mesh, Pos2, Rect, Sense, Shape, Stroke, Ui};
use isomap::catalog::LayerKind;
use isomap::geo::{to_point2, Point2};
use isomap::session::LayerSpec;
use isomap::view::Size;
use isomap::{Color, HttpFetcher, Map, MapSession, MapView, Messenger};

use crate::runtime::Spawner;
use crate::tessellation::TessellationCache;
use crate::tiles::{visible_tiles, TileCache};

/// Zoom change for one point of scroll.
const SCROLL_ZOOM_SPEED: f64 = 1.0 / 200.0;

/// Pointer interaction with the map during one frame, in map widget pixels.
#[derive(Debug, Default, Clone, Copy)]
pub struct MapResponse {
    /// Where the map was clicked.
    pub clicked: Option<Point2>,
    /// Where the pointer is over the map.
    pub hovered: Option<Point2>,
}

/// Egui widget drawing the map of an [`EguiMapState`].
pub struct EguiMap<'a> {
    state: &'a mut EguiMapState,
}

impl<'a> EguiMap<'a> {
    /// Creates a new widget.
    pub fn new(state: &'a mut EguiMapState) -> Self {
        Self { state }
    }

    /// Draws the map into all the available space.
    pub fn show_ui(self, ui: &mut Ui) -> MapResponse {
        self.state.render(ui)
    }
}

/// Map session together with everything needed to draw it.
pub struct EguiMapState {
    map: Map,
    tiles: TileCache,
    fills: TessellationCache,
    rect: Rect,
}

impl EguiMapState {
    /// Creates the state. The map requests repaints of `ctx` when it changes.
    pub fn new(
        mut map: Map,
        ctx: egui::Context,
        spawner: Spawner,
        fetcher: Arc<HttpFetcher>,
    ) -> Self {
        map.set_messenger(Some(MapStateMessenger {
            context: ctx.clone(),
        }));

        Self {
            map,
            tiles: TileCache::new(fetcher, spawner, ctx),
            fills: TessellationCache::default(),
            rect: Rect::NOTHING,
        }
    }

    /// The map session.
    pub fn map(&self) -> &Map {
        &self.map
    }

    /// Mutable map session.
    pub fn map_mut(&mut self) -> &mut Map {
        &mut self.map
    }

    /// Screen position of a point in map widget pixels.
    pub fn to_screen(&self, px: Point2) -> Pos2 {
        self.rect.min + egui::vec2(px.x as f32, px.y as f32)
    }

    /// Handles pointer input and draws the map.
    pub fn render(&mut self, ui: &mut Ui) -> MapResponse {
        let available_size = ui.available_size().floor();
        let (rect, response) = ui.allocate_exact_size(available_size, Sense::click_and_drag());
        self.rect = rect;

        let size = Size::new(rect.width() as f64, rect.height() as f64);
        if self.map.view().size() != size {
            log::trace!("Resizing map to size: {size:?}");
            let view = self.map.view().with_size(size);
            self.map.set_view(view);
        }

        let local = |pos: Pos2| {
            Point2::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64)
        };

        if response.dragged_by(egui::PointerButton::Primary) {
            if let Some(pos) = response.interact_pointer_pos() {
                let to = local(pos);
                let delta = response.drag_delta();
                let from = Point2::new(to.x - delta.x as f64, to.y - delta.y as f64);
                let view = self.map.view().translate_by_pixels(from, to);
                self.map.set_view(view);
            }
        }

        let hovered = response.hover_pos().map(local);
        if let Some(anchor) = hovered {
            let scroll = ui.input(|input| input.smooth_scroll_delta.y) as f64;
            if scroll.abs() > 0.0001 {
                let view = self.map.view().zoom_around(anchor, scroll * SCROLL_ZOOM_SPEED);
                self.map.set_view(view);
            }
        }

        let clicked = if response.clicked() {
            response.interact_pointer_pos().map(local)
        } else {
            None
        };

        self.tiles.poll();
        self.draw(ui, rect);

        MapResponse { clicked, hovered }
    }

    fn draw(&mut self, ui: &Ui, rect: Rect) {
        let painter = ui.painter_at(rect);
        let view = *self.map.view();
        let offset = rect.min.to_vec2();
        let to_pos = move |px: Point2| Pos2::new(px.x as f32, px.y as f32) + offset;

        let basemap = self.map.basemap().clone();
        painter.rect_filled(rect, 0.0, color32(basemap.background));

        self.tiles.set_basemap(&basemap);
        let tiles = visible_tiles(&view, basemap.max_zoom);
        for index in &tiles {
            let Some(texture) = self.tiles.get_or_request(&basemap, *index) else {
                continue;
            };

            let (min, max) = index.bounds();
            let corners = [
                (Point2::new(min.x, max.y), egui::pos2(0.0, 0.0)),
                (Point2::new(max.x, max.y), egui::pos2(1.0, 0.0)),
                (Point2::new(max.x, min.y), egui::pos2(1.0, 1.0)),
                (Point2::new(min.x, min.y), egui::pos2(0.0, 1.0)),
            ];

            let mut mesh = Mesh::with_texture(texture.id());
            for (corner, uv) in corners {
                mesh.vertices.push(Vertex {
                    pos: to_pos(view.map_to_screen(corner)),
                    uv,
                    color: Color32::WHITE,
                });
            }
            mesh.add_triangle(0, 1, 2);
            mesh.add_triangle(0, 2, 3);
            painter.add(Shape::mesh(mesh));
        }
        self.tiles.evict(&tiles);

        let layers: Vec<LayerSpec> = self.map.layers().iter_visible().cloned().collect();
        for layer in &layers {
            let shapes = match layer.kind {
                LayerKind::Fill => self.fill_shapes(&view, layer, to_pos),
                LayerKind::Line => self.line_shapes(&view, layer, to_pos),
                LayerKind::Circle => self.circle_shapes(&view, layer, to_pos),
            };
            painter.extend(shapes);
        }
    }

    fn fill_shapes(
        &mut self,
        view: &MapView,
        layer: &LayerSpec,
        to_pos: impl Fn(Point2) -> Pos2,
    ) -> Vec<Shape> {
        let mut shapes = vec![];

        let fill = self.fills.fill(&self.map, layer);
        if let Some(fill) = fill.filter(|fill| !fill.is_empty()) {
            let color = color32(layer.paint.effective_color());
            let vertices = fill
                .vertices
                .iter()
                .map(|vertex| Vertex {
                    pos: to_pos(view.map_to_screen(fill.position(*vertex))),
                    uv: WHITE_UV,
                    color,
                })
                .collect();

            shapes.push(Shape::mesh(Mesh {
                indices: fill.indices.clone(),
                vertices,
                ..Default::default()
            }));
        }

        let outline = layer.paint.stroke().zip(self.map.source(&layer.source));
        if let Some(((color, width), source)) = outline {
            let stroke = Stroke::new(width, color32(color));
            for (feature, geometry) in source.features() {
                if !layer.accepts(feature.properties.as_ref()) {
                    continue;
                }

                let rings = geometry.polygons.iter().flat_map(|polygon| {
                    std::iter::once(polygon.exterior()).chain(polygon.interiors())
                });
                for ring in rings {
                    let points = ring
                        .coords()
                        .map(|c| to_pos(view.map_to_screen(to_point2(*c))))
                        .collect();
                    shapes.push(Shape::closed_line(points, stroke));
                }
            }
        }

        shapes
    }

    fn line_shapes(
        &self,
        view: &MapView,
        layer: &LayerSpec,
        to_pos: impl Fn(Point2) -> Pos2,
    ) -> Vec<Shape> {
        let Some(source) = self.map.source(&layer.source) else {
            return vec![];
        };

        let stroke = Stroke::new(layer.paint.width, color32(layer.paint.effective_color()));
        source
            .features()
            .filter(|(feature, _)| layer.accepts(feature.properties.as_ref()))
            .flat_map(|(_, geometry)| geometry.lines.iter())
            .map(|line| {
                let points = line
                    .coords()
                    .map(|c| to_pos(view.map_to_screen(to_point2(*c))))
                    .collect();
                Shape::line(points, stroke)
            })
            .collect()
    }

    fn circle_shapes(
        &self,
        view: &MapView,
        layer: &LayerSpec,
        to_pos: impl Fn(Point2) -> Pos2,
    ) -> Vec<Shape> {
        let Some(source) = self.map.source(&layer.source) else {
            return vec![];
        };

        let fill = color32(layer.paint.effective_color());
        let radius = layer.paint.radius;
        let stroke = layer
            .paint
            .stroke()
            .map(|(color, width)| Stroke::new(width, color32(color)));

        let mut shapes = vec![];
        for (feature, geometry) in source.features() {
            if !layer.accepts(feature.properties.as_ref()) {
                continue;
            }

            for point in &geometry.points {
                let center = to_pos(view.map_to_screen(to_point2(point.0)));
                shapes.push(Shape::circle_filled(center, radius, fill));
                if let Some(stroke) = stroke {
                    shapes.push(Shape::circle_stroke(center, radius, stroke));
                }
            }
        }

        shapes
    }
}

/// Converts a map color into an egui color.
pub fn color32(color: Color) -> Color32 {
    Color32::from_rgba_unmultiplied(color.r(), color.g(), color.b(), color.a())
}

#[derive(Debug, Clone)]
struct MapStateMessenger {
    context: egui::Context,
}

impl Messenger for MapStateMessenger {
    fn request_redraw(&self) {
        log::trace!("Redraw requested");
        self.context.request_repaint();
    }
}
