//! Map session holding the basemap, data sources, ordered layers and the view.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use geojson::FeatureCollection;

use super::{LayerCollection, LayerSpec, MapEvent, MapSession, RenderedFeature, Source, Visibility};
use crate::basemap::Basemap;
use crate::catalog::LayerKind;
use crate::error::MapError;
use crate::geo::Point2;
use crate::messenger::Messenger;
use crate::view::MapView;

/// Extra pixels around a drawn feature that still count as a hit.
const HIT_MARGIN: f64 = 3.0;

/// In-memory map session.
pub struct Map {
    view: MapView,
    basemap: Basemap,
    sources: HashMap<String, Arc<Source>>,
    layers: LayerCollection,
    events: VecDeque<MapEvent>,
    revision: u64,
    messenger: Option<Box<dyn Messenger>>,
}

impl std::fmt::Debug for Map {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Map")
            .field("view", &self.view)
            .field("basemap", &self.basemap.name)
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .field("layers", &self.layers.len())
            .field("revision", &self.revision)
            .finish()
    }
}

impl Map {
    /// Creates a new map. [`MapEvent::Ready`] is the first event the map emits.
    pub fn new(view: MapView, basemap: Basemap) -> Self {
        Self {
            view,
            basemap,
            sources: HashMap::new(),
            layers: LayerCollection::default(),
            events: VecDeque::from([MapEvent::Ready]),
            revision: 0,
            messenger: None,
        }
    }

    /// Sets the messenger notified on every change of the map.
    pub fn set_messenger(&mut self, messenger: Option<impl Messenger + 'static>) {
        self.messenger = messenger.map(|m| Box::new(m) as Box<dyn Messenger>);
    }

    /// Request redraw of the map.
    pub fn redraw(&self) {
        if let Some(messenger) = &self.messenger {
            messenger.request_redraw();
        }
    }

    /// Counter that changes every time sources or layers are added or removed, or layer
    /// visibility changes.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Registered source with the given name.
    pub fn source(&self, name: &str) -> Option<&Arc<Source>> {
        self.sources.get(name)
    }

    /// Layers in paint order.
    pub fn layers(&self) -> &LayerCollection {
        &self.layers
    }

    fn touch(&mut self) {
        self.revision += 1;
        self.redraw();
    }

    fn hit_tolerance(&self, layer: &LayerSpec) -> f64 {
        let pixels = match layer.kind {
            LayerKind::Circle => {
                let stroke = layer.paint.stroke().map(|(_, width)| width).unwrap_or(0.0);
                (layer.paint.radius + stroke) as f64
            }
            LayerKind::Line => layer.paint.width as f64 / 2.0,
            LayerKind::Fill => 0.0,
        };

        (pixels + HIT_MARGIN) * self.view.resolution()
    }
}

impl MapSession for Map {
    fn set_style(&mut self, basemap: Basemap) {
        log::debug!("Setting map style to '{}'", basemap.name);

        self.basemap = basemap;
        self.sources.clear();
        self.layers.clear();
        self.events.push_back(MapEvent::StyleLoaded);
        self.touch();
    }

    fn basemap(&self) -> &Basemap {
        &self.basemap
    }

    fn add_source(&mut self, name: &str, data: FeatureCollection) -> Result<(), MapError> {
        if self.sources.contains_key(name) {
            return Err(MapError::DuplicateSource(name.to_string()));
        }

        let source = Source::new(name, data);
        log::debug!(
            "Adding source '{name}' with {} features",
            source.data().features.len()
        );

        self.sources.insert(name.to_string(), Arc::new(source));
        self.touch();

        Ok(())
    }

    fn has_source(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), MapError> {
        if self.layers.contains(&layer.id) {
            return Err(MapError::DuplicateLayer(layer.id));
        }

        if !self.sources.contains_key(&layer.source) {
            return Err(MapError::UnknownSource(layer.source));
        }

        log::trace!("Adding layer '{}' ({:?})", layer.id, layer.visibility);
        self.layers.push(layer);
        self.touch();

        Ok(())
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.contains(id)
    }

    fn set_visibility(&mut self, id: &str, visibility: Visibility) -> Result<(), MapError> {
        let layer = self
            .layers
            .get_mut(id)
            .ok_or_else(|| MapError::UnknownLayer(id.to_string()))?;

        if layer.visibility != visibility {
            layer.visibility = visibility;
            self.touch();
        }

        Ok(())
    }

    fn visibility(&self, id: &str) -> Option<Visibility> {
        self.layers.get(id).map(|layer| layer.visibility)
    }

    fn view(&self) -> &MapView {
        &self.view
    }

    fn set_view(&mut self, view: MapView) {
        self.view = view;
        self.redraw();
    }

    fn query_rendered_features(
        &self,
        point: Point2,
        layers: Option<&[String]>,
    ) -> Vec<RenderedFeature<'_>> {
        let position = self.view.screen_to_map(point);
        let mut found = vec![];

        for layer in self.layers.iter_visible().rev() {
            if let Some(ids) = layers {
                if !ids.iter().any(|id| *id == layer.id) {
                    continue;
                }
            }

            let Some(source) = self.sources.get(&layer.source) else {
                continue;
            };

            let tolerance = self.hit_tolerance(layer);
            for (feature, shapes) in source.features() {
                if !layer.accepts(feature.properties.as_ref()) {
                    continue;
                }

                let is_hit = match layer.kind {
                    LayerKind::Circle => shapes.hits_point(&position, tolerance),
                    LayerKind::Line => shapes.hits_line(&position, tolerance),
                    LayerKind::Fill => shapes.hits_polygon(&position),
                };

                if is_hit {
                    found.push(RenderedFeature {
                        layer_id: &layer.id,
                        feature,
                        shapes,
                    });
                }
            }
        }

        found
    }

    fn poll_event(&mut self) -> Option<MapEvent> {
        self.events.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::catalog::Paint;
    use crate::geo::LonLat;
    use crate::session::Filter;
    use crate::view::Size;
    use crate::Color;

    fn collection(json: &str) -> FeatureCollection {
        json.parse().unwrap()
    }

    fn stations() -> FeatureCollection {
        collection(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": {"name": "Vukov spomenik", "line": "2"},
                        "geometry": {"type": "Point", "coordinates": [20.4795, 44.8041]}
                    },
                    {
                        "type": "Feature",
                        "properties": {"name": "Slavija", "line": "1"},
                        "geometry": {"type": "Point", "coordinates": [20.4636, 44.8025]}
                    }
                ]
            }"#,
        )
    }

    fn area() -> FeatureCollection {
        collection(
            r#"{
                "type": "FeatureCollection",
                "features": [
                    {
                        "type": "Feature",
                        "properties": {"Time": 5},
                        "geometry": {"type": "Polygon", "coordinates": [[
                            [20.47, 44.80], [20.49, 44.80], [20.49, 44.81], [20.47, 44.81], [20.47, 44.80]
                        ]]}
                    }
                ]
            }"#,
        )
    }

    fn layer(id: &str, source: &str, kind: LayerKind) -> LayerSpec {
        LayerSpec {
            id: id.into(),
            source: source.into(),
            kind,
            paint: Paint::new(Color::BLACK),
            filters: vec![],
            visibility: Visibility::Visible,
        }
    }

    fn map() -> Map {
        let view = MapView::new(LonLat::new(20.4795, 44.8041), 14.0)
            .with_size(Size::new(800.0, 600.0));
        Map::new(view, Basemap::new("test", "https://t/{z}/{x}/{y}.png"))
    }

    #[test]
    fn ready_is_the_first_event() {
        let mut map = map();
        assert_eq!(map.poll_event(), Some(MapEvent::Ready));
        assert_eq!(map.poll_event(), None);
    }

    #[test]
    fn layer_requires_known_source() {
        let mut map = map();
        assert_matches!(
            map.add_layer(layer("stations", "metro-stations", LayerKind::Circle)),
            Err(MapError::UnknownSource(name)) if name == "metro-stations"
        );

        map.add_source("metro-stations", stations()).unwrap();
        map.add_layer(layer("stations", "metro-stations", LayerKind::Circle))
            .unwrap();
        assert!(map.has_layer("stations"));

        assert_matches!(
            map.add_layer(layer("stations", "metro-stations", LayerKind::Circle)),
            Err(MapError::DuplicateLayer(_))
        );
        assert_matches!(
            map.add_source("metro-stations", stations()),
            Err(MapError::DuplicateSource(_))
        );
    }

    #[test]
    fn set_style_discards_everything_and_signals_once() {
        let mut map = map();
        let _ = map.poll_event();
        map.add_source("metro-stations", stations()).unwrap();
        map.add_layer(layer("stations", "metro-stations", LayerKind::Circle))
            .unwrap();

        map.set_style(Basemap::new("dark", "https://d/{z}/{x}/{y}.png"));
        assert!(!map.has_source("metro-stations"));
        assert!(!map.has_layer("stations"));
        assert_eq!(map.basemap().name, "dark");

        assert_eq!(map.poll_event(), Some(MapEvent::StyleLoaded));
        assert_eq!(map.poll_event(), None);
    }

    #[test]
    fn query_returns_top_most_first() {
        let mut map = map();
        map.add_source("area", area()).unwrap();
        map.add_source("metro-stations", stations()).unwrap();
        map.add_layer(layer("area-5", "area", LayerKind::Fill)).unwrap();
        map.add_layer(layer("stations", "metro-stations", LayerKind::Circle))
            .unwrap();

        let px = map.view().lonlat_to_screen(LonLat::new(20.4795, 44.8041));
        let found = map.query_rendered_features(px, None);
        let ids: Vec<&str> = found.iter().map(|f| f.layer_id).collect();
        assert_eq!(ids, vec!["stations", "area-5"]);

        let only_area = map.query_rendered_features(px, Some(&["area-5".to_string()]));
        assert_eq!(only_area.len(), 1);
        assert_eq!(only_area[0].layer_id, "area-5");
    }

    #[test]
    fn hidden_layers_are_not_queried() {
        let mut map = map();
        map.add_source("metro-stations", stations()).unwrap();
        map.add_layer(layer("stations", "metro-stations", LayerKind::Circle))
            .unwrap();
        map.set_visibility("stations", Visibility::None).unwrap();

        let px = map.view().lonlat_to_screen(LonLat::new(20.4795, 44.8041));
        assert!(map.query_rendered_features(px, None).is_empty());
        assert_eq!(map.visibility("stations"), Some(Visibility::None));

        assert_matches!(
            map.set_visibility("unknown", Visibility::None),
            Err(MapError::UnknownLayer(_))
        );
    }

    #[test]
    fn filters_apply_to_queries() {
        let mut map = map();
        map.add_source("metro-stations", stations()).unwrap();
        let mut line_1 = layer("stations-1", "metro-stations", LayerKind::Circle);
        line_1.filters.push(Filter::new("line", "1"));
        map.add_layer(line_1).unwrap();

        let px = map.view().lonlat_to_screen(LonLat::new(20.4795, 44.8041));
        assert!(map.query_rendered_features(px, None).is_empty());
    }

    #[test]
    fn circle_hit_uses_radius_in_pixels() {
        let mut map = map();
        map.add_source("metro-stations", stations()).unwrap();
        map.add_layer(layer("stations", "metro-stations", LayerKind::Circle))
            .unwrap();

        let px = map.view().lonlat_to_screen(LonLat::new(20.4795, 44.8041));
        // Radius 5 plus 3 px margin.
        let near = Point2::new(px.x + 7.0, px.y);
        let far = Point2::new(px.x + 10.0, px.y);
        assert_eq!(map.query_rendered_features(near, None).len(), 1);
        assert!(map.query_rendered_features(far, None).is_empty());
    }

    #[test]
    fn view_setters() {
        let mut map = map();
        map.set_zoom(15.5);
        map.set_bearing(20.0);
        map.set_pitch(30.0);
        map.set_center(LonLat::new(20.46, 44.81));

        assert_eq!(map.zoom(), 15.5);
        assert_eq!(map.bearing(), 20.0);
        assert_eq!(map.pitch(), 30.0);
        approx::assert_abs_diff_eq!(map.center().lon, 20.46, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(map.center().lat, 44.81, epsilon = 1e-9);
    }
}
