//! Isomap viewer.
//!
//! Usage: `isomap [CONFIG.json]`. Without a configuration file the built-in Belgrade metro map
//! is shown.

use isomap::ViewerConfig;

fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => ViewerConfig::from_file(&path)?,
        None => ViewerConfig::default(),
    };

    isomap_egui::run(config)
}
