//! Viewer orchestration: one catalog-driven pipeline from map events to registered overlays.
//!
//! The [`Viewer`] does not own the map session nor run any futures. The front-end drives it:
//!
//! 1. [`Viewer::process_events`] is called every frame and returns the load passes to start.
//! 2. The front-end runs [`DataLoader::load`] for each of them on its async runtime.
//! 3. The result is handed back with [`Viewer::on_data_loaded`] together with the generation of
//!    the request. Results of passes that were superseded by a basemap switch are dropped.

use std::collections::HashMap;

use crate::basemap::Basemap;
use crate::config::ViewerConfig;
use crate::error::MapError;
use crate::geo::Point2;
use crate::legend::Legend;
use crate::loader::{DataFetcher, DataLoader, LoadedData};
use crate::panel::SidePanel;
use crate::popup::{Popup, PopupController};
use crate::session::{Map, MapEvent, MapSession, Visibility};
use crate::style_switch::{StyleSwitchController, SwitchOutcome};

/// Request to run a load pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadRequest {
    /// Generation of the pass. Must be passed back to [`Viewer::on_data_loaded`].
    pub generation: u64,
}

/// What happened to the result of a load pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Sources and layers were registered.
    Applied,
    /// The pass was superseded and its result dropped.
    Stale,
}

#[derive(Debug, Clone)]
struct PendingLoad {
    generation: u64,
    visibility: HashMap<String, Visibility>,
}

/// State of the viewer around one map session.
#[derive(Debug)]
pub struct Viewer {
    config: ViewerConfig,
    legend: Option<Legend>,
    popups: PopupController,
    style_switch: StyleSwitchController,
    panel: SidePanel,
    selected_basemap: usize,
    last_generation: u64,
    pending_load: Option<PendingLoad>,
}

impl Viewer {
    /// Creates a viewer for a validated configuration.
    pub fn new(config: ViewerConfig) -> Result<Self, MapError> {
        config.validate()?;

        Ok(Self {
            popups: PopupController::new(config.popup_targets.clone()),
            config,
            legend: None,
            style_switch: StyleSwitchController::new(),
            panel: SidePanel::new(),
            selected_basemap: 0,
            last_generation: 0,
            pending_load: None,
        })
    }

    /// Creates the map session at the configured initial view with the first basemap.
    pub fn create_map(&self) -> Map {
        Map::new(
            self.config.initial_view.to_view(),
            self.selected_basemap().clone(),
        )
    }

    /// The configuration.
    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    /// Loader for the configured data sources.
    pub fn loader<F: DataFetcher>(&self, fetcher: F) -> DataLoader<F> {
        DataLoader::new(fetcher, self.config.sources.clone())
    }

    /// Legend, available after the first successful load.
    pub fn legend(&self) -> Option<&Legend> {
        self.legend.as_ref()
    }

    /// Open popup.
    pub fn popup(&self) -> Option<&Popup> {
        self.popups.current()
    }

    /// Side panel state.
    pub fn panel(&self) -> &SidePanel {
        &self.panel
    }

    /// Mutable side panel state.
    pub fn panel_mut(&mut self) -> &mut SidePanel {
        &mut self.panel
    }

    /// Basemaps in selector order.
    pub fn basemaps(&self) -> &[Basemap] {
        &self.config.basemaps
    }

    /// Index of the selected basemap.
    pub fn selected_basemap_index(&self) -> usize {
        self.selected_basemap
    }

    fn selected_basemap(&self) -> &Basemap {
        // The configuration is validated to have at least one basemap.
        &self.config.basemaps[self.selected_basemap]
    }

    /// True while a basemap switch or a load pass is in progress.
    pub fn is_loading(&self) -> bool {
        self.style_switch.is_switching() || self.pending_load.is_some()
    }

    /// Handles all pending map events. Returns the load passes to start.
    pub fn process_events(&mut self, map: &mut impl MapSession) -> Vec<LoadRequest> {
        let mut requests = vec![];
        while let Some(event) = map.poll_event() {
            log::trace!("Map event: {event:?}");
            let request = match event {
                MapEvent::Ready => Some(self.on_map_ready()),
                MapEvent::StyleLoaded => self.on_style_loaded(map),
            };
            requests.extend(request);
        }

        requests
    }

    /// Starts the initial load pass.
    pub fn on_map_ready(&mut self) -> LoadRequest {
        log::info!("Map is ready, loading {} sources", self.config.sources.len());
        self.start_load(HashMap::new())
    }

    /// Completes a basemap switch. Returns the load pass to start once the switch is complete.
    pub fn on_style_loaded(&mut self, map: &mut impl MapSession) -> Option<LoadRequest> {
        match self.style_switch.on_style_loaded(map) {
            SwitchOutcome::Reload(snapshot) => Some(self.start_load(snapshot.visibility)),
            SwitchOutcome::Restarted | SwitchOutcome::Ignored => None,
        }
    }

    fn start_load(&mut self, visibility: HashMap<String, Visibility>) -> LoadRequest {
        self.last_generation += 1;
        self.pending_load = Some(PendingLoad {
            generation: self.last_generation,
            visibility,
        });

        LoadRequest {
            generation: self.last_generation,
        }
    }

    /// Selects a basemap.
    ///
    /// A load pass in flight is abandoned. The visibility it was going to apply is carried over
    /// to the pass that follows the switch.
    pub fn select_basemap(
        &mut self,
        map: &mut impl MapSession,
        index: usize,
    ) -> Result<(), MapError> {
        let basemap = self
            .config
            .basemaps
            .get(index)
            .cloned()
            .ok_or(MapError::UnknownBasemap(index))?;

        self.selected_basemap = index;
        self.popups.close();

        let abandoned = self.pending_load.take();
        if let Some(load) = &abandoned {
            log::debug!("Abandoning load pass {}", load.generation);
        }

        // Layers missing from the map (a pass in flight or a failed one) keep the legend state.
        let fallback = self
            .legend_visibility()
            .or_else(|| abandoned.map(|load| load.visibility));

        self.style_switch.request(
            map,
            basemap,
            &self.config.layers.layer_ids(),
            fallback.as_ref(),
        );

        Ok(())
    }

    /// Registers the result of a load pass.
    ///
    /// Sources are added first, then layers from the bottom to the top of the paint order. The
    /// whole pass is validated before the map is changed: a failed pass is logged and registers
    /// nothing.
    pub fn on_data_loaded(
        &mut self,
        map: &mut impl MapSession,
        generation: u64,
        result: Result<LoadedData, MapError>,
    ) -> Result<LoadOutcome, MapError> {
        if self.pending_load.as_ref().map(|load| load.generation) != Some(generation) {
            log::debug!("Dropping result of stale load pass {generation}");
            return Ok(LoadOutcome::Stale);
        }

        let Some(load) = self.pending_load.take() else {
            return Ok(LoadOutcome::Stale);
        };

        result
            .and_then(|data| self.register(map, data, &load.visibility))
            .inspect_err(|err| log::error!("Failed to load map data: {err}"))?;

        if self.legend.is_none() {
            self.legend = Some(Legend::from_catalog(&self.config.layers));
        }

        log::info!("Map data registered (pass {generation})");
        Ok(LoadOutcome::Applied)
    }

    fn register(
        &self,
        map: &mut impl MapSession,
        data: LoadedData,
        visibility: &HashMap<String, Visibility>,
    ) -> Result<(), MapError> {
        self.check_loaded(&*map, &data)?;

        let visibility = |id: &str| visibility.get(id).copied().unwrap_or(Visibility::Visible);
        let layers: Vec<_> = self
            .config
            .layers
            .paint_order()
            .flat_map(|descriptor| descriptor.layer_specs(visibility))
            .collect();

        for layer in &layers {
            if !data.sources.iter().any(|(name, _)| *name == layer.source) {
                return Err(MapError::UnknownSource(layer.source.clone()));
            }
            if map.has_layer(&layer.id) {
                return Err(MapError::DuplicateLayer(layer.id.clone()));
            }
        }

        for (name, collection) in data.sources {
            map.add_source(&name, collection)?;
        }

        for layer in layers {
            map.add_layer(layer)?;
        }

        Ok(())
    }

    fn check_loaded(&self, map: &impl MapSession, data: &LoadedData) -> Result<(), MapError> {
        for source in &self.config.sources {
            let count = data
                .sources
                .iter()
                .filter(|(name, _)| *name == source.name)
                .count();

            match count {
                0 => return Err(MapError::UnknownSource(source.name.clone())),
                1 if map.has_source(&source.name) => {
                    return Err(MapError::DuplicateSource(source.name.clone()))
                }
                1 => {}
                _ => return Err(MapError::DuplicateSource(source.name.clone())),
            }
        }

        for (name, _) in &data.sources {
            if !self.config.sources.iter().any(|source| source.name == *name) {
                return Err(MapError::UnknownSource(name.clone()));
            }
        }

        Ok(())
    }

    fn legend_visibility(&self) -> Option<HashMap<String, Visibility>> {
        let legend = self.legend.as_ref()?;
        let visibility = legend
            .rows()
            .iter()
            .flat_map(|row| {
                let visibility = Visibility::from_checked(row.checked);
                row.layer_ids.iter().map(move |id| (id.clone(), visibility))
            })
            .collect();

        Some(visibility)
    }

    /// Sets the checkbox of a legend row and the visibility of its layers.
    ///
    /// While the layers are not registered (a load pass or basemap switch is in progress, or the
    /// last pass failed) the visibility is stored and applied on registration. No data is
    /// loaded.
    pub fn set_layer_checked(
        &mut self,
        map: &mut impl MapSession,
        descriptor_id: &str,
        checked: bool,
    ) -> Result<(), MapError> {
        let layer_ids = self
            .legend
            .as_mut()
            .and_then(|legend| legend.set_checked(descriptor_id, checked))
            .ok_or_else(|| MapError::UnknownLayer(descriptor_id.to_string()))?
            .to_vec();

        let visibility = Visibility::from_checked(checked);
        log::debug!("Setting visibility of '{descriptor_id}' to {visibility:?}");

        for id in layer_ids {
            if map.has_layer(&id) {
                map.set_visibility(&id, visibility)?;
            } else if let Some(load) = &mut self.pending_load {
                load.visibility.insert(id, visibility);
            } else if let Some(snapshot) = self.style_switch.pending_snapshot_mut() {
                snapshot.visibility.insert(id, visibility);
            }
        }

        Ok(())
    }

    /// Handles a click on the map.
    pub fn click(&mut self, map: &impl MapSession, point: Point2) -> Option<&Popup> {
        self.popups.handle_click(map, point)
    }

    /// Closes the open popup.
    pub fn close_popup(&mut self) {
        self.popups.close();
    }

    /// True if the pointer is over a feature of an interactive layer.
    pub fn hover(&self, map: &impl MapSession, point: Point2) -> bool {
        let interactive: Vec<String> = self
            .config
            .layers
            .iter()
            .filter(|d| d.interactive)
            .flat_map(|d| d.layer_ids())
            .collect();

        !interactive.is_empty()
            && !map
                .query_rendered_features(point, Some(&interactive))
                .is_empty()
    }
}
