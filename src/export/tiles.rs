//! Background map tiles: the provider seam, an HTTP provider, and bounded loading.
//!
//! Tile failures never abort an export. Each tile gets its own timeout; tiles
//! that fail or time out are logged and left out of the background.

use crate::config::ExportConfig;
use crate::constants;
use crate::error::TileError;
use futures::future::join_all;
use std::future::Future;
use std::io::Read;
use std::time::Duration;
use tiny_skia::{ColorU8, IntSize, Pixmap};

/// Slippy-map tile address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    /// Zoom level
    pub z: u8,
    /// Column
    pub x: u32,
    /// Row
    pub y: u32,
}

/// Source of encoded tile images (PNG or JPEG).
pub trait TileProvider {
    /// Fetches one tile.
    fn fetch(&self, tile: TileId) -> impl Future<Output = Result<Vec<u8>, TileError>>;
}

/// A missing provider means tiles are disabled.
impl<T: TileProvider> TileProvider for Option<T> {
    async fn fetch(&self, tile: TileId) -> Result<Vec<u8>, TileError> {
        match self {
            Some(provider) => provider.fetch(tile).await,
            None => Err(TileError::Offline),
        }
    }
}

/// Fetches tiles over HTTP from a URL template.
#[derive(Debug, Clone)]
pub struct HttpTileProvider {
    template: String,
    subdomains: Vec<String>,
    user_agent: String,
    timeout: Duration,
}

impl HttpTileProvider {
    /// Creates a provider for a template with `{s}`, `{z}`, `{x}`, `{y}` and `{r}` placeholders.
    pub fn new(template: impl Into<String>, subdomains: Vec<String>) -> Self {
        Self {
            template: template.into(),
            subdomains,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_millis(constants::TILE_TIMEOUT_MS),
        }
    }

    /// Bounds each request, connection included.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Provider configured by `config.tile_url`, or `None` when tiles are disabled.
    pub fn from_config(config: &ExportConfig) -> Option<Self> {
        config
            .tile_url
            .as_ref()
            .map(|url| Self::new(url.clone(), config.tile_subdomains.clone()).with_timeout(config.tile_timeout()))
    }

    /// The request URL for a tile.
    pub fn url_for(&self, tile: TileId) -> String {
        let subdomain = if self.subdomains.is_empty() {
            ""
        } else {
            let index = (tile.x as usize + tile.y as usize) % self.subdomains.len();
            self.subdomains[index].as_str()
        };
        self.template
            .replace("{s}", subdomain)
            .replace("{z}", &tile.z.to_string())
            .replace("{x}", &tile.x.to_string())
            .replace("{y}", &tile.y.to_string())
            .replace("{r}", "")
    }
}

impl TileProvider for HttpTileProvider {
    async fn fetch(&self, tile: TileId) -> Result<Vec<u8>, TileError> {
        let url = self.url_for(tile);
        let user_agent = self.user_agent.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || {
            let response = ureq::get(&url)
                .timeout(timeout)
                .set("User-Agent", &user_agent)
                .call()
                .map_err(|e| TileError::Http(e.to_string()))?;
            let mut bytes = Vec::new();
            response
                .into_reader()
                .read_to_end(&mut bytes)
                .map_err(|e| TileError::Http(e.to_string()))?;
            Ok(bytes)
        })
        .await
        .map_err(|e| TileError::Http(e.to_string()))?
    }
}

/// A decoded tile placed on the surface.
#[derive(Clone)]
pub struct LoadedTile {
    /// Surface position of the tile's top-left corner
    pub offset: (f32, f32),
    /// Premultiplied pixels
    pub pixmap: Pixmap,
}

/// Outcome of loading the background.
#[derive(Default)]
pub struct TileLoad {
    /// Tiles that arrived and decoded
    pub tiles: Vec<LoadedTile>,
    /// Tiles that failed or timed out
    pub failed: usize,
}

/// Loads every tile concurrently, each bounded by `timeout`.
pub async fn load_tiles<P: TileProvider>(
    provider: &P,
    coverage: Vec<(TileId, (f32, f32))>,
    timeout: Duration,
) -> TileLoad {
    let fetches = coverage.into_iter().map(move |(id, offset)| async move {
        let result = match tokio::time::timeout(timeout, provider.fetch(id)).await {
            Ok(Ok(bytes)) => decode_tile(&bytes),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(TileError::Timeout),
        };
        match result {
            Ok(pixmap) => Some(LoadedTile { offset, pixmap }),
            Err(TileError::Offline) => None,
            Err(e) => {
                log::warn!("Tile {}/{}/{} skipped: {}", id.z, id.x, id.y, e);
                None
            }
        }
    });

    let mut load = TileLoad::default();
    for tile in join_all(fetches).await {
        match tile {
            Some(tile) => load.tiles.push(tile),
            None => load.failed += 1,
        }
    }
    load
}

/// Decodes a PNG or JPEG tile into a premultiplied pixmap.
pub fn decode_tile(bytes: &[u8]) -> Result<Pixmap, TileError> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| TileError::Decode(e.to_string()))?
        .to_rgba8();
    let (w, h) = rgba.dimensions();
    let mut data = Vec::with_capacity(rgba.as_raw().len());
    for px in rgba.pixels() {
        let [r, g, b, a] = px.0;
        let p = ColorU8::from_rgba(r, g, b, a).premultiply();
        data.extend_from_slice(&[p.red(), p.green(), p.blue(), p.alpha()]);
    }
    let size = IntSize::from_wh(w, h).ok_or_else(|| TileError::Decode("empty tile".into()))?;
    Pixmap::from_vec(data, size).ok_or_else(|| TileError::Decode("bad tile dimensions".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SolidTiles;

    impl TileProvider for SolidTiles {
        async fn fetch(&self, tile: TileId) -> Result<Vec<u8>, TileError> {
            if tile.x % 2 == 1 {
                return Err(TileError::Http("503".into()));
            }
            let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([10, 20, 30, 255]));
            let mut bytes = Vec::new();
            img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
                .map_err(|e| TileError::Decode(e.to_string()))?;
            Ok(bytes)
        }
    }

    struct NeverTiles;

    impl TileProvider for NeverTiles {
        async fn fetch(&self, _tile: TileId) -> Result<Vec<u8>, TileError> {
            futures::future::pending().await
        }
    }

    fn coverage(n: u32) -> Vec<(TileId, (f32, f32))> {
        (0..n).map(|x| (TileId { z: 3, x, y: 1 }, (x as f32 * 256.0, 0.0))).collect()
    }

    #[test]
    fn test_url_template() {
        let p = HttpTileProvider::new("https://{s}.tiles/{z}/{x}/{y}{r}.png", vec!["a".into(), "b".into()]);
        assert_eq!(p.url_for(TileId { z: 5, x: 3, y: 2 }), "https://b.tiles/5/3/2.png");
        assert_eq!(p.url_for(TileId { z: 5, x: 2, y: 2 }), "https://a.tiles/5/2/2.png");
    }

    #[test]
    fn test_provider_takes_configured_timeout() {
        let config = ExportConfig {
            tile_url: Some("http://localhost/{z}/{x}/{y}.png".into()),
            tile_timeout_ms: 250,
            ..ExportConfig::default()
        };
        let provider = HttpTileProvider::from_config(&config).unwrap();
        assert_eq!(provider.timeout(), Duration::from_millis(250));
    }

    #[tokio::test]
    async fn test_silent_server_request_gives_up() {
        // Accepts connections at the socket level but never answers
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let provider = HttpTileProvider::new(format!("http://127.0.0.1:{port}/{{z}}/{{x}}/{{y}}.png"), Vec::new())
            .with_timeout(Duration::from_millis(200));

        let started = std::time::Instant::now();
        let result = provider.fetch(TileId { z: 1, x: 0, y: 0 }).await;
        assert!(matches!(result, Err(TileError::Http(_))));
        assert!(started.elapsed() < Duration::from_secs(5));
        drop(listener);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_tile(b"not an image"), Err(TileError::Decode(_))));
    }

    #[tokio::test]
    async fn test_failed_tiles_are_skipped() {
        let load = load_tiles(&SolidTiles, coverage(4), Duration::from_secs(1)).await;
        assert_eq!(load.tiles.len(), 2);
        assert_eq!(load.failed, 2);
        assert_eq!(load.tiles[0].pixmap.width(), 4);
    }

    #[tokio::test]
    async fn test_stalled_tiles_time_out() {
        let load = load_tiles(&NeverTiles, coverage(3), Duration::from_millis(20)).await;
        assert!(load.tiles.is_empty());
        assert_eq!(load.failed, 3);
    }

    #[tokio::test]
    async fn test_missing_provider_is_offline() {
        let none: Option<SolidTiles> = None;
        let load = load_tiles(&none, coverage(2), Duration::from_secs(1)).await;
        assert!(load.tiles.is_empty());
    }
}
