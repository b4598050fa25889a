//! Map session: the owned map state every controller of the viewer works on.
//!
//! The session holds the basemap style, the view, the registered GeoJSON sources and the ordered
//! collection of styled layers. Controllers never keep references into it; the application owns
//! one session and passes it by reference.

use geojson::{Feature, FeatureCollection};

use crate::basemap::Basemap;
use crate::error::MapError;
use crate::geo::{LonLat, Point2, Shapes};
use crate::view::MapView;

mod layers;
mod map;

pub use layers::{Filter, LayerCollection, LayerSpec, Visibility};
pub use map::Map;

/// GeoJSON document registered with the map under a name.
///
/// Feature geometries are projected once on registration.
#[derive(Debug, Clone)]
pub struct Source {
    name: String,
    data: FeatureCollection,
    shapes: Vec<Shapes>,
}

impl Source {
    /// Creates a source, projecting the geometry of every feature.
    pub fn new(name: impl Into<String>, data: FeatureCollection) -> Self {
        let shapes = data
            .features
            .iter()
            .map(|feature| {
                feature
                    .geometry
                    .as_ref()
                    .map(Shapes::from_geometry)
                    .unwrap_or_default()
            })
            .collect();

        Self {
            name: name.into(),
            data,
            shapes,
        }
    }

    /// Name of the source.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The document as it was registered.
    pub fn data(&self) -> &FeatureCollection {
        &self.data
    }

    /// Features paired with their projected geometry.
    pub fn features(&self) -> impl Iterator<Item = (&Feature, &Shapes)> + '_ {
        self.data.features.iter().zip(self.shapes.iter())
    }
}

/// Events emitted by the map session.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MapEvent {
    /// The map was created and is ready to receive sources.
    Ready,
    /// A style set with [`MapSession::set_style`] finished loading. Sent exactly once per call.
    StyleLoaded,
}

/// Feature found under a screen point.
#[derive(Debug, Clone, Copy)]
pub struct RenderedFeature<'a> {
    /// Id of the layer that draws the feature.
    pub layer_id: &'a str,
    /// The feature.
    pub feature: &'a Feature,
    /// Projected geometry of the feature.
    pub shapes: &'a Shapes,
}

impl RenderedFeature<'_> {
    /// Geographic position of the first point of the feature geometry.
    pub fn point_position(&self) -> Option<LonLat> {
        self.shapes.first_point().map(crate::geo::unproject)
    }
}

/// Operations of an interactive map the viewer relies on.
pub trait MapSession {
    /// Replaces the basemap style.
    ///
    /// All sources and layers are discarded. A [`MapEvent::StyleLoaded`] is emitted once the new
    /// style is ready; sources and layers added before that are lost.
    fn set_style(&mut self, basemap: Basemap);

    /// Current basemap style.
    fn basemap(&self) -> &Basemap;

    /// Registers a GeoJSON document under `name`.
    fn add_source(&mut self, name: &str, data: FeatureCollection) -> Result<(), MapError>;

    /// True if a source with the given name is registered.
    fn has_source(&self, name: &str) -> bool;

    /// Adds a layer on top of all other layers. The layer source must be registered.
    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), MapError>;

    /// True if a layer with the given id is registered.
    fn has_layer(&self, id: &str) -> bool;

    /// Sets visibility of a registered layer.
    fn set_visibility(&mut self, id: &str, visibility: Visibility) -> Result<(), MapError>;

    /// Visibility of a registered layer.
    fn visibility(&self, id: &str) -> Option<Visibility>;

    /// Current view.
    fn view(&self) -> &MapView;

    /// Replaces the view.
    fn set_view(&mut self, view: MapView);

    /// Current zoom.
    fn zoom(&self) -> f64 {
        self.view().zoom()
    }

    /// Sets zoom.
    fn set_zoom(&mut self, zoom: f64) {
        let view = self.view().with_zoom(zoom);
        self.set_view(view);
    }

    /// Current center.
    fn center(&self) -> LonLat {
        self.view().center()
    }

    /// Sets center.
    fn set_center(&mut self, center: LonLat) {
        let view = self.view().with_center(center);
        self.set_view(view);
    }

    /// Current pitch.
    fn pitch(&self) -> f64 {
        self.view().pitch()
    }

    /// Sets pitch.
    fn set_pitch(&mut self, pitch: f64) {
        let view = self.view().with_pitch(pitch);
        self.set_view(view);
    }

    /// Current bearing.
    fn bearing(&self) -> f64 {
        self.view().bearing()
    }

    /// Sets bearing.
    fn set_bearing(&mut self, bearing: f64) {
        let view = self.view().with_bearing(bearing);
        self.set_view(view);
    }

    /// Features drawn under the screen point, top-most first.
    ///
    /// Only visible layers are queried. If `layers` is given, only layers with these ids are
    /// queried.
    fn query_rendered_features(
        &self,
        point: Point2,
        layers: Option<&[String]>,
    ) -> Vec<RenderedFeature<'_>>;

    /// Takes the next pending event.
    fn poll_event(&mut self) -> Option<MapEvent>;
}
