//! Basemap switching that keeps the view and overlay visibility.
//!
//! Replacing the style of a map discards all overlay sources and layers. The controller captures
//! the view and layer visibility before the switch and hands them back once the new style is
//! loaded, so the overlays can be registered again in the same state.

use std::collections::HashMap;

use crate::basemap::Basemap;
use crate::geo::LonLat;
use crate::session::{MapSession, Visibility};

/// View and layer visibility captured before a basemap switch.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewSnapshot {
    /// Zoom level.
    pub zoom: f64,
    /// Map center.
    pub center: LonLat,
    /// Pitch in degrees.
    pub pitch: f64,
    /// Bearing in degrees.
    pub bearing: f64,
    /// Visibility by layer id.
    pub visibility: HashMap<String, Visibility>,
}

impl ViewSnapshot {
    /// Captures the current view of the map and the visibility of the given layers.
    ///
    /// Layers that are not registered with the map take their visibility from `fallback`,
    /// if given.
    pub fn capture(
        map: &impl MapSession,
        layer_ids: &[String],
        fallback: Option<&HashMap<String, Visibility>>,
    ) -> Self {
        let visibility = layer_ids
            .iter()
            .filter_map(|id| {
                map.visibility(id)
                    .or_else(|| fallback.and_then(|f| f.get(id).copied()))
                    .map(|visibility| (id.clone(), visibility))
            })
            .collect();

        Self {
            zoom: map.zoom(),
            center: map.center(),
            pitch: map.pitch(),
            bearing: map.bearing(),
            visibility,
        }
    }

    /// Applies the captured view to the map.
    pub fn restore_view(&self, map: &mut impl MapSession) {
        let view = map
            .view()
            .with_center(self.center)
            .with_zoom(self.zoom)
            .with_pitch(self.pitch)
            .with_bearing(self.bearing);
        map.set_view(view);
    }

    /// Captured visibility of a layer. Layers that were not captured are visible.
    pub fn visibility_of(&self, layer_id: &str) -> Visibility {
        self.visibility
            .get(layer_id)
            .copied()
            .unwrap_or(Visibility::Visible)
    }
}

/// Result of a basemap switch request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchRequest {
    /// The style is being replaced.
    Started,
    /// A switch is already running. The request will start when it completes, unless a newer
    /// request replaces it.
    Queued,
}

/// What to do after the style loaded signal.
#[derive(Debug, Clone, PartialEq)]
pub enum SwitchOutcome {
    /// The switch completed. Overlays must be loaded again with this visibility.
    Reload(ViewSnapshot),
    /// The switch completed and the queued switch started right away.
    Restarted,
    /// No switch was running.
    Ignored,
}

#[derive(Debug, Clone, Default)]
enum State {
    #[default]
    Stable,
    Switching {
        snapshot: ViewSnapshot,
        queued: Option<Basemap>,
    },
}

/// State machine for replacing the basemap of a map session.
#[derive(Debug, Clone, Default)]
pub struct StyleSwitchController {
    state: State,
}

impl StyleSwitchController {
    /// Creates a controller in the stable state.
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a switch is waiting for the style loaded signal.
    pub fn is_switching(&self) -> bool {
        matches!(self.state, State::Switching { .. })
    }

    /// Mutable access to the snapshot of the running switch.
    pub fn pending_snapshot_mut(&mut self) -> Option<&mut ViewSnapshot> {
        match &mut self.state {
            State::Switching { snapshot, .. } => Some(snapshot),
            State::Stable => None,
        }
    }

    /// Requests a basemap switch.
    ///
    /// In the stable state the view and the visibility of `layer_ids` are captured and the new
    /// style is set. While switching, the request is queued replacing any earlier queued one.
    pub fn request(
        &mut self,
        map: &mut impl MapSession,
        basemap: Basemap,
        layer_ids: &[String],
        fallback: Option<&HashMap<String, Visibility>>,
    ) -> SwitchRequest {
        match &mut self.state {
            State::Switching { queued, .. } => {
                log::debug!("Basemap switch in progress, queueing '{}'", basemap.name);
                *queued = Some(basemap);
                SwitchRequest::Queued
            }
            State::Stable => {
                let snapshot = ViewSnapshot::capture(map, layer_ids, fallback);
                log::info!("Switching basemap to '{}'", basemap.name);
                map.set_style(basemap);
                self.state = State::Switching {
                    snapshot,
                    queued: None,
                };
                SwitchRequest::Started
            }
        }
    }

    /// Handles the style loaded signal.
    ///
    /// Restores the captured view. If another switch was queued meanwhile, it starts immediately
    /// and carries the captured visibility over; otherwise the snapshot is returned to reload the
    /// overlays with.
    pub fn on_style_loaded(&mut self, map: &mut impl MapSession) -> SwitchOutcome {
        let State::Switching { snapshot, queued } = std::mem::take(&mut self.state) else {
            log::trace!("Style loaded without a pending switch");
            return SwitchOutcome::Ignored;
        };

        snapshot.restore_view(map);

        match queued {
            Some(basemap) => {
                log::info!("Switching basemap to queued '{}'", basemap.name);
                map.set_style(basemap);
                self.state = State::Switching {
                    snapshot,
                    queued: None,
                };
                SwitchOutcome::Restarted
            }
            None => SwitchOutcome::Reload(snapshot),
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use assert_matches::assert_matches;

    use super::*;
    use crate::catalog::{LayerKind, Paint};
    use crate::session::{LayerSpec, Map, MapEvent};
    use crate::view::{MapView, Size};
    use crate::Color;

    fn map() -> Map {
        let view = MapView::new(LonLat::new(20.4612, 44.8125), 13.0)
            .with_size(Size::new(800.0, 600.0));
        let mut map = Map::new(view, Basemap::new("light", "https://l/{z}/{x}/{y}.png"));
        let _ = map.poll_event();

        map.add_source(
            "stations",
            r#"{"type": "FeatureCollection", "features": []}"#.parse().unwrap(),
        )
        .unwrap();
        for id in ["a", "b"] {
            map.add_layer(LayerSpec {
                id: id.into(),
                source: "stations".into(),
                kind: LayerKind::Circle,
                paint: Paint::new(Color::BLACK),
                filters: vec![],
                visibility: Visibility::Visible,
            })
            .unwrap();
        }
        map.set_visibility("b", Visibility::None).unwrap();

        map
    }

    fn ids() -> Vec<String> {
        vec!["a".into(), "b".into()]
    }

    fn dark() -> Basemap {
        Basemap::new("dark", "https://d/{z}/{x}/{y}.png")
    }

    #[test]
    fn switch_restores_view_and_returns_visibility() {
        let mut map = map();
        map.set_zoom(14.25);
        map.set_bearing(12.0);
        map.set_pitch(30.0);
        let center = map.center();

        let mut controller = StyleSwitchController::new();
        assert_eq!(
            controller.request(&mut map, dark(), &ids(), None),
            SwitchRequest::Started
        );
        assert!(controller.is_switching());
        assert!(!map.has_layer("a"));

        // The style resets the view before signalling.
        map.set_zoom(3.0);
        map.set_bearing(0.0);
        assert_eq!(map.poll_event(), Some(MapEvent::StyleLoaded));

        let snapshot = assert_matches!(
            controller.on_style_loaded(&mut map),
            SwitchOutcome::Reload(snapshot) => snapshot
        );
        assert!(!controller.is_switching());

        assert_abs_diff_eq!(map.zoom(), 14.25);
        assert_abs_diff_eq!(map.bearing(), 12.0);
        assert_abs_diff_eq!(map.pitch(), 30.0);
        assert_abs_diff_eq!(map.center().lon, center.lon, epsilon = 1e-9);
        assert_abs_diff_eq!(map.center().lat, center.lat, epsilon = 1e-9);

        assert_eq!(snapshot.visibility_of("a"), Visibility::Visible);
        assert_eq!(snapshot.visibility_of("b"), Visibility::None);
        assert_eq!(snapshot.visibility_of("unknown"), Visibility::Visible);
    }

    #[test]
    fn second_request_is_queued() {
        let mut map = map();
        let mut controller = StyleSwitchController::new();

        controller.request(&mut map, dark(), &ids(), None);
        assert_eq!(
            controller.request(
                &mut map,
                Basemap::new("streets", "https://s/{z}/{x}/{y}.png"),
                &ids(),
                None
            ),
            SwitchRequest::Queued
        );
        assert_eq!(
            controller.request(
                &mut map,
                Basemap::new("satellite", "https://e/{z}/{y}/{x}"),
                &ids(),
                None
            ),
            SwitchRequest::Queued
        );

        // Only one style was set so far.
        assert_eq!(map.basemap().name, "dark");
        assert_eq!(map.poll_event(), Some(MapEvent::StyleLoaded));
        assert_eq!(map.poll_event(), None);

        assert_eq!(controller.on_style_loaded(&mut map), SwitchOutcome::Restarted);
        assert_eq!(map.basemap().name, "satellite");
        assert!(controller.is_switching());

        assert_eq!(map.poll_event(), Some(MapEvent::StyleLoaded));
        let snapshot = assert_matches!(
            controller.on_style_loaded(&mut map),
            SwitchOutcome::Reload(snapshot) => snapshot
        );
        assert_eq!(snapshot.visibility_of("b"), Visibility::None);
    }

    #[test]
    fn style_loaded_without_switch_is_ignored() {
        let mut map = map();
        let mut controller = StyleSwitchController::new();
        assert_eq!(controller.on_style_loaded(&mut map), SwitchOutcome::Ignored);
    }

    #[test]
    fn fallback_covers_unregistered_layers() {
        let map = map();
        let fallback = HashMap::from([("c".to_string(), Visibility::None)]);
        let snapshot = ViewSnapshot::capture(
            &map,
            &["a".into(), "c".into(), "d".into()],
            Some(&fallback),
        );

        assert_eq!(snapshot.visibility.len(), 2);
        assert_eq!(snapshot.visibility_of("c"), Visibility::None);
        assert_eq!(snapshot.visibility_of("d"), Visibility::Visible);
    }
}
