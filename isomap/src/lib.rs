//! Isomap is the core of an interactive accessibility map: walking isochrones around metro
//! stations, metro lines and stations drawn over a switchable basemap.
//!
//! The crate does not draw anything itself. It contains:
//!
//! * the [`LayerCatalog`] describing overlay layers and their paint;
//! * the [`DataLoader`] fetching all GeoJSON sources of a load pass at once;
//! * the [`Map`] session with sources, ordered layers, visibility and hit-testing;
//! * controllers for basemap switching, the legend, popups and the side panel;
//! * the [`Viewer`] that ties them together into one pipeline driven by map events.
//!
//! A front-end creates a [`Viewer`] from a [`ViewerConfig`], creates the map with
//! [`Viewer::create_map`] and then, every frame, calls [`Viewer::process_events`] and runs the
//! returned load requests on its async runtime.
//!
//! ```no_run
//! use isomap::{HttpFetcher, Viewer, ViewerConfig};
//!
//! # async fn run() -> Result<(), isomap::error::MapError> {
//! let mut viewer = Viewer::new(ViewerConfig::default())?;
//! let mut map = viewer.create_map();
//!
//! for request in viewer.process_events(&mut map) {
//!     let result = viewer.loader(HttpFetcher::new()?).load().await;
//!     viewer.on_data_loaded(&mut map, request.generation, result)?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod basemap;
pub mod catalog;
mod color;
pub mod config;
pub mod error;
pub mod geo;
pub mod legend;
pub mod loader;
mod messenger;
pub mod panel;
pub mod popup;
pub mod session;
pub mod style_switch;
pub mod view;
pub mod viewer;

pub use basemap::Basemap;
pub use catalog::{LayerCatalog, LayerDescriptor, LayerKind, Paint};
pub use color::{Color, InvalidColor};
pub use config::ViewerConfig;
pub use loader::{DataFetcher, DataLoader, DataSource, HttpFetcher};
pub use messenger::Messenger;
pub use session::{Map, MapEvent, MapSession, Visibility};
pub use view::MapView;
pub use viewer::{LoadOutcome, LoadRequest, Viewer};
