//! The viewer application: side panel with the legend and basemap selector, the map and popups.

use std::sync::Arc;

use egui::{Align2, Color32, RichText, Sense, Stroke, Ui};
use isomap::error::MapError;
use isomap::legend::{LegendRow, Swatch};
use isomap::loader::LoadedData;
use isomap::{HttpFetcher, LoadOutcome, MapSession, Viewer, ViewerConfig};
use parking_lot::Mutex;

use crate::egui_map::{color32, EguiMap, EguiMapState};
use crate::runtime::Spawner;

const PANEL_WIDTH: f32 = 300.0;
const SWATCH_SIZE: egui::Vec2 = egui::vec2(24.0, 14.0);

type LoadInbox = Arc<Mutex<Vec<(u64, Result<LoadedData, MapError>)>>>;

/// Application showing one [`Viewer`].
pub struct IsomapApp {
    viewer: Viewer,
    map: EguiMapState,
    fetcher: Arc<HttpFetcher>,
    spawner: Spawner,
    inbox: LoadInbox,
}

impl IsomapApp {
    /// Creates the application. Data starts loading on the first frame.
    pub fn new(
        ctx: &egui::Context,
        config: ViewerConfig,
        spawner: Spawner,
    ) -> Result<Self, MapError> {
        let viewer = Viewer::new(config)?;
        let fetcher = Arc::new(HttpFetcher::new()?);
        let map = EguiMapState::new(
            viewer.create_map(),
            ctx.clone(),
            spawner.clone(),
            fetcher.clone(),
        );

        Ok(Self {
            viewer,
            map,
            fetcher,
            spawner,
            inbox: Arc::default(),
        })
    }

    /// The viewer state.
    pub fn viewer(&self) -> &Viewer {
        &self.viewer
    }

    fn start_loads(&mut self, ctx: &egui::Context) {
        for request in self.viewer.process_events(self.map.map_mut()) {
            log::debug!("Starting load pass {}", request.generation);

            let loader = self.viewer.loader(HttpFetcher::clone(&self.fetcher));
            let inbox = self.inbox.clone();
            let ctx = ctx.clone();
            self.spawner.spawn(async move {
                let result = loader.load().await;
                inbox.lock().push((request.generation, result));
                ctx.request_repaint();
            });
        }
    }

    fn apply_loaded(&mut self) {
        let loaded = std::mem::take(&mut *self.inbox.lock());
        for (generation, result) in loaded {
            match self
                .viewer
                .on_data_loaded(self.map.map_mut(), generation, result)
            {
                Ok(LoadOutcome::Applied) => log::debug!("Load pass {generation} applied"),
                Ok(LoadOutcome::Stale) => log::debug!("Dropped stale load pass {generation}"),
                // Already reported by the viewer. The map keeps the basemap only.
                Err(err) => log::debug!("Load pass {generation} left no overlays: {err}"),
            }
        }
    }

    fn side_panel(&mut self, ui: &mut Ui) {
        let label = self.viewer.panel().button_label();
        if ui.button(label).clicked() {
            self.viewer.panel_mut().toggle();
        }

        if self.viewer.panel().is_minimized() {
            return;
        }

        ui.separator();
        ui.heading(&self.viewer.config().title);
        ui.label(&self.viewer.config().about);
        ui.separator();

        self.basemap_selector(ui);
        ui.separator();

        egui::ScrollArea::vertical().show(ui, |ui| self.legend(ui));
    }

    fn basemap_selector(&mut self, ui: &mut Ui) {
        let selected = self.viewer.selected_basemap_index();
        let mut index = selected;
        let names: Vec<String> = self
            .viewer
            .basemaps()
            .iter()
            .map(|basemap| basemap.name.clone())
            .collect();

        ui.horizontal(|ui| {
            ui.label("Basemap");
            egui::ComboBox::from_id_salt("basemap")
                .selected_text(names.get(selected).map(String::as_str).unwrap_or_default())
                .show_ui(ui, |ui| {
                    for (i, name) in names.iter().enumerate() {
                        ui.selectable_value(&mut index, i, name);
                    }
                });

            if self.viewer.is_loading() {
                ui.spinner();
            }
        });

        if index != selected {
            if let Err(err) = self.viewer.select_basemap(self.map.map_mut(), index) {
                log::error!("Failed to select basemap: {err}");
            }
        }
    }

    fn legend(&mut self, ui: &mut Ui) {
        let Some(legend) = self.viewer.legend() else {
            ui.label("Loading map data…");
            return;
        };

        let mut toggled = vec![];
        for row in legend.rows() {
            let mut checked = row.checked;
            ui.horizontal(|ui| {
                if ui.checkbox(&mut checked, "").changed() {
                    toggled.push((row.descriptor_id.clone(), checked));
                }
                swatch(ui, &row.swatch);
                ui.label(&row.label);
            });

            legend_categories(ui, row);
        }

        for (descriptor_id, checked) in toggled {
            if let Err(err) =
                self.viewer
                    .set_layer_checked(self.map.map_mut(), &descriptor_id, checked)
            {
                log::warn!("Failed to toggle '{descriptor_id}': {err}");
            }
        }
    }

    fn popup(&mut self, ctx: &egui::Context) {
        let Some(popup) = self.viewer.popup() else {
            return;
        };

        let position = self
            .map
            .to_screen(self.map.map().view().lonlat_to_screen(popup.anchor));

        let mut close = false;
        egui::Area::new(egui::Id::new("feature_popup"))
            .fixed_pos(position)
            .pivot(Align2::CENTER_BOTTOM)
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Min), |ui| {
                        close = ui.small_button("✖").clicked();
                    });

                    egui::Grid::new("feature_popup_rows")
                        .num_columns(2)
                        .striped(true)
                        .show(ui, |ui| {
                            for (key, value) in &popup.rows {
                                ui.label(RichText::new(key).strong());
                                ui.label(value);
                                ui.end_row();
                            }
                        });
                });
            });

        if close {
            self.viewer.close_popup();
        }
    }

    fn attribution(&self, ui: &Ui) {
        let Some(attribution) = &self.map.map().basemap().attribution else {
            return;
        };

        let rect = ui.max_rect();
        ui.painter().text(
            rect.right_bottom() + egui::vec2(-4.0, -4.0),
            Align2::RIGHT_BOTTOM,
            attribution,
            egui::FontId::proportional(11.0),
            Color32::from_gray(60),
        );
    }
}

impl eframe::App for IsomapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.start_loads(ctx);
        self.apply_loaded();

        egui::SidePanel::left("side_panel")
            .resizable(false)
            .default_width(PANEL_WIDTH)
            .show(ctx, |ui| self.side_panel(ui));

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                let response = EguiMap::new(&mut self.map).show_ui(ui);

                if let Some(point) = response.clicked {
                    self.viewer.click(self.map.map(), point);
                }

                if let Some(point) = response.hovered {
                    if self.viewer.hover(self.map.map(), point) {
                        ctx.set_cursor_icon(egui::CursorIcon::PointingHand);
                    }
                }

                self.attribution(ui);
            });

        self.popup(ctx);
    }
}

fn legend_categories(ui: &mut Ui, row: &LegendRow) {
    if row.categories.is_empty() {
        return;
    }

    ui.indent(&row.descriptor_id, |ui| {
        for category in &row.categories {
            ui.horizontal(|ui| {
                swatch(ui, &category.swatch);
                ui.label(&category.label);
            });
        }
    });
}

fn swatch(ui: &mut Ui, swatch: &Swatch) {
    let (rect, _) = ui.allocate_exact_size(SWATCH_SIZE, Sense::hover());
    let painter = ui.painter();

    match *swatch {
        Swatch::Line { color, width } => {
            let height = width.clamp(2.0, rect.height());
            let bar = egui::Rect::from_center_size(rect.center(), egui::vec2(rect.width(), height));
            painter.rect_filled(bar, 0.0, color32(color));
        }
        Swatch::Circle {
            fill,
            radius,
            stroke,
        } => {
            let radius = radius.min(rect.height() / 2.0);
            painter.circle_filled(rect.center(), radius, color32(fill));
            if let Some((color, width)) = stroke {
                painter.circle_stroke(rect.center(), radius, Stroke::new(width, color32(color)));
            }
        }
        Swatch::Fill { color, outline } => {
            painter.rect_filled(rect, 2.0, color32(color));
            if let Some(outline) = outline {
                painter.rect_stroke(
                    rect,
                    2.0,
                    Stroke::new(1.0, color32(outline)),
                    egui::StrokeKind::Inside,
                );
            }
        }
    }
}
