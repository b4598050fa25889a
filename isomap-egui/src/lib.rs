//! Egui front-end of the Isomap viewer.
//!
//! [`EguiMap`] draws a [`Map`](isomap::Map) session: raster basemap tiles and the GeoJSON overlay
//! layers. With the `init` feature the crate also contains the complete viewer application that
//! can be started with [`run`].

mod egui_map;
pub mod runtime;
pub mod tessellation;
pub mod tiles;

#[cfg(feature = "init")]
mod app;
#[cfg(feature = "init")]
mod init;

#[cfg(feature = "init")]
pub use app::IsomapApp;
pub use egui_map::{color32, EguiMap, EguiMapState, MapResponse};
#[cfg(feature = "init")]
pub use init::run;
pub use runtime::Spawner;
