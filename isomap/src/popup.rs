//! Feature popups opened by clicking the map.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::geo::{LonLat, Point2};
use crate::session::{MapSession, RenderedFeature};

/// What a click on the map can open a popup for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PopupTarget {
    /// Features of a single layer. The popup is anchored at the feature point.
    Layer(String),
    /// Features of any of the listed layers. The popup is anchored where the map was clicked.
    Query(Vec<String>),
}

impl PopupTarget {
    /// Ids of the layers the target covers.
    pub fn layer_ids(&self) -> &[String] {
        match self {
            Self::Layer(id) => std::slice::from_ref(id),
            Self::Query(ids) => ids,
        }
    }

    fn covers(&self, layer_id: &str) -> bool {
        self.layer_ids().iter().any(|id| id == layer_id)
    }
}

/// Open popup: feature properties as a key/value table.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    /// Layer of the feature the popup shows.
    pub layer_id: String,
    /// Where the popup points to.
    pub anchor: LonLat,
    /// Property names and display values.
    pub rows: Vec<(String, String)>,
}

impl Popup {
    fn from_feature(feature: &RenderedFeature, anchor: LonLat) -> Self {
        let rows = feature
            .feature
            .properties
            .iter()
            .flatten()
            .map(|(key, value)| (key.clone(), display_value(value)))
            .collect();

        Self {
            layer_id: feature.layer_id.to_string(),
            anchor,
            rows,
        }
    }

    /// Display value of the property, if the feature has it.
    pub fn value(&self, key: &str) -> Option<&str> {
        self.rows
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Keeps at most one popup open and decides what a click shows.
#[derive(Debug, Clone, Default)]
pub struct PopupController {
    targets: Vec<PopupTarget>,
    current: Option<Popup>,
}

impl PopupController {
    /// Creates a controller for the given click targets.
    pub fn new(targets: Vec<PopupTarget>) -> Self {
        Self {
            targets,
            current: None,
        }
    }

    /// Currently open popup.
    pub fn current(&self) -> Option<&Popup> {
        self.current.as_ref()
    }

    /// Closes the open popup.
    pub fn close(&mut self) {
        self.current = None;
    }

    /// Handles a click at a screen point.
    ///
    /// The top-most visible feature of any target layer wins and replaces the open popup. If no
    /// feature is hit the open popup is closed.
    pub fn handle_click(&mut self, map: &impl MapSession, point: Point2) -> Option<&Popup> {
        let layer_ids: Vec<String> = self
            .targets
            .iter()
            .flat_map(|target| target.layer_ids().iter().cloned())
            .collect();

        self.current = if layer_ids.is_empty() {
            None
        } else {
            map.query_rendered_features(point, Some(&layer_ids))
                .first()
                .and_then(|feature| {
                    let target = self.targets.iter().find(|t| t.covers(feature.layer_id))?;
                    let click_position = map.view().screen_to_lonlat(point);
                    let anchor = match target {
                        PopupTarget::Layer(_) => {
                            feature.point_position().unwrap_or(click_position)
                        }
                        PopupTarget::Query(_) => click_position,
                    };

                    Some(Popup::from_feature(feature, anchor))
                })
        };

        match &self.current {
            Some(popup) => log::debug!("Opened popup for layer '{}'", popup.layer_id),
            None => log::trace!("Nothing to show at {point:?}"),
        }

        self.current.as_ref()
    }
}
