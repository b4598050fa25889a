//! Raster basemap tiles: loading, decoding and caching as egui textures.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use egui::{ColorImage, TextureHandle, TextureOptions};
use isomap::error::FetchError;
use isomap::geo::{Point2, EARTH_RADIUS};
use isomap::{Basemap, DataFetcher, HttpFetcher, MapView};
use parking_lot::Mutex;

use crate::runtime::Spawner;

const HALF_WORLD: f64 = PI * EARTH_RADIUS;
const MAX_VISIBLE_TILES: usize = 512;
const MAX_CACHED_TILES: usize = 1024;

/// Index of a slippy-map tile.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TileIndex {
    /// Zoom level.
    pub z: u8,
    /// Column, from the west.
    pub x: u32,
    /// Row, from the north.
    pub y: u32,
}

impl TileIndex {
    /// Creates a new index.
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Projected `(min, max)` corners of the tile.
    pub fn bounds(&self) -> (Point2, Point2) {
        let span = tile_span(self.z);
        let min_x = self.x as f64 * span - HALF_WORLD;
        let max_y = HALF_WORLD - self.y as f64 * span;

        (
            Point2::new(min_x, max_y - span),
            Point2::new(min_x + span, max_y),
        )
    }
}

fn tile_span(z: u8) -> f64 {
    2.0 * HALF_WORLD / 2f64.powi(z as i32)
}

/// Tiles needed to cover the view, using the tile zoom level closest to the view zoom.
pub fn visible_tiles(view: &MapView, max_zoom: u8) -> Vec<TileIndex> {
    if view.size().is_zero() {
        return vec![];
    }

    let z = (view.zoom().round().max(0.0) as u8).min(max_zoom);
    let span = tile_span(z);
    let last = (1u32 << z) - 1;
    let (min, max) = view.bbox();

    let column = |x: f64| (((x + HALF_WORLD) / span).floor().max(0.0) as u32).min(last);
    let row = |y: f64| (((HALF_WORLD - y) / span).floor().max(0.0) as u32).min(last);

    let (x_from, x_to) = (column(min.x), column(max.x));
    let (y_from, y_to) = (row(max.y), row(min.y));

    let count = (x_to - x_from + 1) as usize * (y_to - y_from + 1) as usize;
    if count > MAX_VISIBLE_TILES {
        log::warn!("View needs {count} tiles at zoom {z}, skipping basemap");
        return vec![];
    }

    (y_from..=y_to)
        .flat_map(|y| (x_from..=x_to).map(move |x| TileIndex::new(z, x, y)))
        .collect()
}

/// Decodes a PNG or JPEG tile image.
pub fn decode_tile(bytes: &[u8]) -> Result<ColorImage, FetchError> {
    let image = image::load_from_memory(bytes)
        .map_err(|err| FetchError::Decode(err.to_string()))?
        .to_rgba8();
    let size = [image.width() as usize, image.height() as usize];

    Ok(ColorImage::from_rgba_unmultiplied(size, image.as_raw()))
}

enum TileState {
    Loading,
    Ready(TextureHandle),
    Failed,
}

type Inbox = Arc<Mutex<Vec<(String, TileIndex, Result<ColorImage, FetchError>)>>>;

/// Tiles of the current basemap.
///
/// Tiles are requested on the background runtime and uploaded as textures when the UI thread
/// polls the cache. Switching the basemap drops every cached tile.
pub struct TileCache {
    fetcher: Arc<HttpFetcher>,
    spawner: Spawner,
    ctx: egui::Context,
    template: String,
    tiles: HashMap<TileIndex, TileState>,
    inbox: Inbox,
}

impl TileCache {
    /// Creates an empty cache.
    pub fn new(fetcher: Arc<HttpFetcher>, spawner: Spawner, ctx: egui::Context) -> Self {
        Self {
            fetcher,
            spawner,
            ctx,
            template: String::new(),
            tiles: HashMap::new(),
            inbox: Arc::default(),
        }
    }

    /// Drops all tiles if the basemap changed.
    pub fn set_basemap(&mut self, basemap: &Basemap) {
        if self.template != basemap.tiles {
            log::debug!("Basemap tiles changed to {}", basemap.tiles);
            self.template = basemap.tiles.clone();
            self.tiles.clear();
        }
    }

    /// Moves decoded tiles into textures.
    pub fn poll(&mut self) {
        let loaded = std::mem::take(&mut *self.inbox.lock());
        for (template, index, result) in loaded {
            if template != self.template {
                continue;
            }

            let state = match result {
                Ok(image) => {
                    let name = format!("tile-{}-{}-{}", index.z, index.x, index.y);
                    TileState::Ready(self.ctx.load_texture(name, image, TextureOptions::LINEAR))
                }
                Err(err) => {
                    log::warn!("Failed to load tile {index:?}: {err}");
                    TileState::Failed
                }
            };

            self.tiles.insert(index, state);
        }
    }

    /// Texture of a loaded tile. Starts loading tiles that were not requested yet.
    pub fn get_or_request(
        &mut self,
        basemap: &Basemap,
        index: TileIndex,
    ) -> Option<&TextureHandle> {
        if !self.tiles.contains_key(&index) {
            self.request(basemap, index);
        }

        match self.tiles.get(&index) {
            Some(TileState::Ready(texture)) => Some(texture),
            _ => None,
        }
    }

    /// Drops loaded tiles that are not in `keep` once the cache grows too big.
    pub fn evict(&mut self, keep: &[TileIndex]) {
        if self.tiles.len() <= MAX_CACHED_TILES {
            return;
        }

        self.tiles
            .retain(|index, state| matches!(state, TileState::Loading) || keep.contains(index));
    }

    fn request(&mut self, basemap: &Basemap, index: TileIndex) {
        self.tiles.insert(index, TileState::Loading);

        let url = basemap.tile_url(index.z, index.x, index.y);
        let template = basemap.tiles.clone();
        let fetcher = self.fetcher.clone();
        let inbox = self.inbox.clone();
        let ctx = self.ctx.clone();

        log::trace!("Loading tile {index:?} from {url}");
        self.spawner.spawn(async move {
            let result = match fetcher.fetch(&url).await {
                Ok(bytes) => decode_tile(&bytes),
                Err(err) => Err(err),
            };

            inbox.lock().push((template, index, result));
            ctx.request_repaint();
        });
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use isomap::geo::LonLat;
    use isomap::view::Size;

    use super::*;

    #[test]
    fn tile_bounds() {
        let (min, max) = TileIndex::new(0, 0, 0).bounds();
        assert_abs_diff_eq!(min.x, -HALF_WORLD);
        assert_abs_diff_eq!(max.y, HALF_WORLD);

        let (min, max) = TileIndex::new(1, 1, 0).bounds();
        assert_abs_diff_eq!(min.x, 0.0);
        assert_abs_diff_eq!(min.y, 0.0);
        assert_abs_diff_eq!(max.x, HALF_WORLD);
        assert_abs_diff_eq!(max.y, HALF_WORLD);
    }

    #[test]
    fn visible_tiles_cover_the_view() {
        let view = MapView::new(LonLat::new(20.4612, 44.8125), 13.0)
            .with_size(Size::new(512.0, 512.0));
        let tiles = visible_tiles(&view, 19);

        assert!(tiles.iter().all(|t| t.z == 13));
        assert!(tiles.len() >= 4 && tiles.len() <= 9);
        // Belgrade center is in tile 4561/2952 at zoom 13.
        assert!(tiles.contains(&TileIndex::new(13, 4561, 2952)));
    }

    #[test]
    fn tile_zoom_is_limited_by_basemap() {
        let view = MapView::new(LonLat::new(20.4612, 44.8125), 21.0)
            .with_size(Size::new(256.0, 256.0));
        assert!(visible_tiles(&view, 18).iter().all(|t| t.z == 18));
        assert!(visible_tiles(&view.with_size(Size::default()), 18).is_empty());
    }

    #[test]
    fn decodes_png() {
        let mut png = vec![];
        image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]))
            .write_to(
                &mut std::io::Cursor::new(&mut png),
                image::ImageOutputFormat::Png,
            )
            .unwrap();

        let decoded = decode_tile(&png).unwrap();
        assert_eq!(decoded.size, [2, 3]);
        assert_eq!(decoded.pixels[0], egui::Color32::from_rgb(10, 20, 30));

        assert!(decode_tile(b"not an image").is_err());
    }
}
