//! Viewer configuration.
//!
//! The configuration is plain data that can be read from a JSON file. [`ViewerConfig::default`]
//! is the Belgrade metro accessibility map.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::basemap::Basemap;
use crate::catalog::LayerCatalog;
use crate::error::MapError;
use crate::geo::LonLat;
use crate::loader::DataSource;
use crate::popup::PopupTarget;
use crate::view::{MapView, MAX_ZOOM, MIN_ZOOM};

const DATA_URL: &str = "https://raw.githubusercontent.com/kanguu10/belgrade_metro_map/main";

/// View the map opens with.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialView {
    /// Center of the map.
    pub center: LonLat,
    /// Zoom level.
    pub zoom: f64,
    /// Pitch in degrees.
    #[serde(default)]
    pub pitch: f64,
    /// Bearing in degrees.
    #[serde(default)]
    pub bearing: f64,
}

impl Default for InitialView {
    fn default() -> Self {
        Self {
            center: LonLat::new(20.4612, 44.8125),
            zoom: 13.0,
            pitch: 0.0,
            bearing: 0.0,
        }
    }
}

impl InitialView {
    /// Map view with these parameters.
    pub fn to_view(&self) -> MapView {
        MapView::new(self.center, self.zoom)
            .with_pitch(self.pitch)
            .with_bearing(self.bearing)
    }
}

/// Complete description of a viewer: texts, data, basemaps, layers and click targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Title shown at the top of the side panel and in the window title.
    pub title: String,
    /// Text shown in the side panel.
    #[serde(default)]
    pub about: String,
    /// View the map opens with.
    #[serde(default)]
    pub initial_view: InitialView,
    /// Data sources in load order.
    pub sources: Vec<DataSource>,
    /// Basemaps in selector order. The first one is used on start.
    #[serde(default = "Basemap::defaults")]
    pub basemaps: Vec<Basemap>,
    /// Layers in legend order.
    pub layers: LayerCatalog,
    /// What a click on the map opens a popup for, in priority order.
    #[serde(default)]
    pub popup_targets: Vec<PopupTarget>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let source = |name: &str, file: &str| DataSource::new(name, format!("{DATA_URL}/{file}"));

        Self {
            title: "Belgrade metro accessibility".into(),
            about: "Areas reachable on foot within 5, 10 and 15 minutes from the stations of \
                the planned Belgrade metro. Click a station or an area to see its details."
                .into(),
            initial_view: InitialView::default(),
            sources: vec![
                source("area-5min", "generalized_5_min_iso.geojson"),
                source("area-10min", "generalized_10_min_iso.geojson"),
                source("area-15min", "generalized_15_min_iso.geojson"),
                source("metro-lines", "metro_lines_smooth.geojson"),
                source("metro-stations", "metro_stations.geojson"),
            ],
            basemaps: Basemap::defaults(),
            layers: LayerCatalog::belgrade_metro(),
            popup_targets: vec![
                PopupTarget::Layer("stations".into()),
                PopupTarget::Query(vec![
                    "area-5".into(),
                    "area-10".into(),
                    "area-15".into(),
                ]),
            ],
        }
    }
}

impl ViewerConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        log::debug!("Reading configuration from {}", path.display());
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Checks that the parts of the configuration agree with each other.
    pub fn validate(&self) -> Result<(), MapError> {
        let mut names = HashSet::new();
        for source in &self.sources {
            if !names.insert(source.name.as_str()) {
                return Err(MapError::Config(format!(
                    "source '{}' is listed twice",
                    source.name
                )));
            }
        }

        self.layers
            .validate_sources(self.sources.iter().map(|s| s.name.as_str()))?;

        if self.basemaps.is_empty() {
            return Err(MapError::Config("at least one basemap is required".into()));
        }

        if !(MIN_ZOOM..=MAX_ZOOM).contains(&self.initial_view.zoom) {
            return Err(MapError::Config(format!(
                "initial zoom {} is out of range",
                self.initial_view.zoom
            )));
        }

        let layer_ids = self.layers.layer_ids();
        for target in &self.popup_targets {
            for id in target.layer_ids() {
                if !layer_ids.contains(id) {
                    return Err(MapError::Config(format!(
                        "popup target refers to unknown layer '{id}'"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = ViewerConfig::default();
        config.validate().unwrap();
        assert_eq!(config.sources.len(), 5);
        assert_eq!(config.layers.len(), 5);
        assert_eq!(
            config.sources[4].url,
            "https://raw.githubusercontent.com/kanguu10/belgrade_metro_map/main/metro_stations.geojson"
        );
    }

    #[test]
    fn json_round_trip_keeps_config() {
        let config = ViewerConfig::default();
        let json = serde_json::to_string_pretty(&config).unwrap();
        assert_eq!(ViewerConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn minimal_json_uses_defaults() {
        let config = ViewerConfig::from_json(
            r##"{
                "title": "Test",
                "sources": [{"name": "iso", "url": "iso.geojson"}],
                "layers": [
                    {"id": "iso", "source": "iso", "kind": "fill", "paint": {"color": "#ff0000"}, "label": "Area"}
                ],
                "popup_targets": [{"query": ["iso"]}]
            }"##,
        )
        .unwrap();

        assert_eq!(config.initial_view, InitialView::default());
        assert_eq!(config.basemaps, Basemap::defaults());
        assert_eq!(config.popup_targets, vec![PopupTarget::Query(vec!["iso".into()])]);
    }

    #[test]
    fn unknown_references_are_rejected() {
        let unknown_source = r##"{
            "title": "Test",
            "sources": [{"name": "iso", "url": "iso.geojson"}],
            "layers": [
                {"id": "iso", "source": "other", "kind": "fill", "paint": {"color": "#ff0000"}, "label": "Area"}
            ]
        }"##;
        assert_matches!(
            ViewerConfig::from_json(unknown_source),
            Err(MapError::Config(_))
        );

        let unknown_target = r##"{
            "title": "Test",
            "sources": [{"name": "iso", "url": "iso.geojson"}],
            "layers": [
                {"id": "iso", "source": "iso", "kind": "fill", "paint": {"color": "#ff0000"}, "label": "Area"}
            ],
            "popup_targets": [{"layer": "stations"}]
        }"##;
        assert_matches!(
            ViewerConfig::from_json(unknown_target),
            Err(MapError::Config(_))
        );
    }

    #[test]
    fn invalid_json_is_an_error() {
        assert_matches!(ViewerConfig::from_json("{"), Err(MapError::Json(_)));
    }
}
