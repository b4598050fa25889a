//! Basemap styles the map can be drawn over.

use serde::{Deserialize, Serialize};

use crate::Color;

/// Underlying cartographic style drawn below the overlay layers.
///
/// A basemap is a raster tile source. The `tiles` template contains `{z}`, `{x}` and `{y}`
/// placeholders that are replaced with the tile index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Basemap {
    /// Name shown in the basemap selector.
    pub name: String,
    /// Tile url template.
    pub tiles: String,
    /// Color shown where tiles are not loaded yet.
    #[serde(default = "default_background")]
    pub background: Color,
    /// Attribution text of the tile provider.
    #[serde(default)]
    pub attribution: Option<String>,
    /// Maximum zoom level the provider has tiles for.
    #[serde(default = "default_max_zoom")]
    pub max_zoom: u8,
}

fn default_background() -> Color {
    Color::rgb(0xf2, 0xef, 0xe9)
}

fn default_max_zoom() -> u8 {
    19
}

impl Basemap {
    /// Creates a basemap with default background and zoom limit.
    pub fn new(name: impl Into<String>, tiles: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tiles: tiles.into(),
            background: default_background(),
            attribution: None,
            max_zoom: default_max_zoom(),
        }
    }

    /// Sets the background color.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Sets the attribution text.
    pub fn with_attribution(mut self, attribution: impl Into<String>) -> Self {
        self.attribution = Some(attribution.into());
        self
    }

    /// Sets the maximum zoom level.
    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    /// Url of the tile with the given index.
    pub fn tile_url(&self, z: u8, x: u32, y: u32) -> String {
        self.tiles
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }

    /// Basemaps offered by default. The first one is selected on start.
    pub fn defaults() -> Vec<Basemap> {
        vec![
            Basemap::new(
                "Light",
                "https://basemaps.cartocdn.com/light_all/{z}/{x}/{y}.png",
            )
            .with_background(Color::rgb(0xfa, 0xfa, 0xf8))
            .with_attribution("© OpenStreetMap contributors © CARTO")
            .with_max_zoom(20),
            Basemap::new(
                "Dark",
                "https://basemaps.cartocdn.com/dark_all/{z}/{x}/{y}.png",
            )
            .with_background(Color::rgb(0x26, 0x26, 0x26))
            .with_attribution("© OpenStreetMap contributors © CARTO")
            .with_max_zoom(20),
            Basemap::new("Streets", "https://tile.openstreetmap.org/{z}/{x}/{y}.png")
                .with_attribution("© OpenStreetMap contributors"),
            Basemap::new(
                "Satellite",
                "https://server.arcgisonline.com/ArcGIS/rest/services/World_Imagery/MapServer/tile/{z}/{y}/{x}",
            )
            .with_background(Color::rgb(0x1c, 0x24, 0x1c))
            .with_attribution("Tiles © Esri")
            .with_max_zoom(18),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tile_url_substitutes_index() {
        let basemap = Basemap::new("osm", "https://tile.example.org/{z}/{x}/{y}.png");
        assert_eq!(
            basemap.tile_url(13, 4562, 2925),
            "https://tile.example.org/13/4562/2925.png"
        );

        let esri = Basemap::new("esri", "https://example.org/tile/{z}/{y}/{x}");
        assert_eq!(esri.tile_url(1, 0, 1), "https://example.org/tile/1/1/0");
    }

    #[test]
    fn optional_fields_have_defaults() {
        let basemap: Basemap =
            serde_json::from_str(r#"{"name": "osm", "tiles": "https://t/{z}/{x}/{y}.png"}"#)
                .unwrap();
        assert_eq!(basemap.max_zoom, 19);
        assert_eq!(basemap.attribution, None);
    }
}
