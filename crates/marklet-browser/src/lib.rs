//! marklet document pipeline.
//!
//! Fetches plain-text documents with inline markup over minimal HTTP,
//! lays them out into a draw plan, and resolves clicks on links. The
//! host draws and dispatches input; [`Browser`] is the whole contract it
//! needs:
//!
//! - [`Browser::load_document`] fetches and lays out a document, with
//!   relative text resolved against the current one.
//! - [`Browser::hit_test`] maps a point to a link target.
//! - [`Browser::resolve_image`] returns a cached embedded image.

pub mod config;
pub mod image;
pub mod layout;
pub mod loader;
pub mod markup;
pub mod url;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::BrowserConfig;
pub use image::DecodedImage;
pub use layout::{
    LayoutParams, LayoutResult, LinkMap, MonospaceMeasurer, Placement, StyledRun, TextMeasurer,
};
pub use loader::{CachedImage, Fetcher, HttpFetcher, ImageCache};
pub use markup::TextStyle;
pub use url::Locator;

use marklet_types::error::Result;
use marklet_types::geometry::Point;

/// The document currently on display.
#[derive(Debug)]
struct Page {
    locator: Locator,
    lines: Vec<String>,
    layout: LayoutResult,
}

/// Host facade over the document pipeline.
///
/// Holds the current document, the image cache, and the viewport. A
/// failed load leaves the current document untouched.
pub struct Browser<F = HttpFetcher, M = MonospaceMeasurer> {
    config: BrowserConfig,
    params: LayoutParams,
    home: Locator,
    fetcher: F,
    measurer: M,
    images: ImageCache,
    page: Option<Page>,
}

impl Browser {
    /// A browser fetching over HTTP with a fixed-pitch measurer.
    pub fn new(config: BrowserConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(config.http_options());
        Self::with_parts(config, fetcher, MonospaceMeasurer::default())
    }
}

impl<F: Fetcher, M: TextMeasurer> Browser<F, M> {
    pub fn with_parts(config: BrowserConfig, fetcher: F, measurer: M) -> Result<Self> {
        config.validate()?;
        let params = config.layout_params()?;
        let home = config.home_locator()?;
        Ok(Self {
            config,
            params,
            home,
            fetcher,
            measurer,
            images: ImageCache::new(),
            page: None,
        })
    }

    // ---------------------------------------------------------------
    // Navigation
    // ---------------------------------------------------------------

    /// Load a document and lay it out.
    ///
    /// `text` is resolved against the current document if there is one,
    /// and parsed as an absolute locator otherwise.
    pub fn load_document(&mut self, text: &str) -> Result<&LayoutResult> {
        let resolved = match &self.page {
            Some(page) => Locator::resolve_relative(text, &page.locator),
            None => Locator::parse_absolute(text),
        };
        let locator = resolved.inspect_err(|e| log::warn!("cannot load {text:?}: {e}"))?;
        self.load(locator)
    }

    /// Load the configured home document.
    pub fn go_home(&mut self) -> Result<&LayoutResult> {
        self.load(self.home.clone())
    }

    /// Follow the link under `point`, if any.
    ///
    /// `Ok(None)` means the point hit no link.
    pub fn click(&mut self, point: Point) -> Result<Option<&LayoutResult>> {
        let Some(target) = self.hit_test(point).cloned() else {
            return Ok(None);
        };
        self.load(target).map(Some)
    }

    /// The link target under `point` in the current layout.
    pub fn hit_test(&self, point: Point) -> Option<&Locator> {
        self.page.as_ref()?.layout.hit_test(point)
    }

    /// Change the viewport and lay the current document out again
    /// without refetching it. `Ok(None)` when nothing is loaded yet.
    ///
    /// A viewport layout cannot use is rejected with a config error and
    /// the previous one kept.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<Option<&LayoutResult>> {
        config::check_viewport(width, height, self.params.margin)?;
        self.params.viewport_width = width;
        self.params.viewport_height = height;

        let Some(page) = self.page.as_ref() else {
            return Ok(None);
        };
        let layout = self.run_layout(&page.locator, &page.lines);
        Ok(self.page.as_mut().map(|page| {
            page.layout = layout;
            &page.layout
        }))
    }

    /// The image named `name`, relative to the current document (or the
    /// home document before anything is loaded).
    pub fn resolve_image(&self, name: &str) -> CachedImage {
        let base = self.current_locator().unwrap_or(&self.home);
        match Locator::resolve_relative(name, base) {
            Ok(locator) => self.cached_image(&locator),
            Err(e) => {
                log::warn!("cannot resolve image {name:?}: {e}");
                None
            },
        }
    }

    // ---------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------

    pub fn current_locator(&self) -> Option<&Locator> {
        self.page.as_ref().map(|p| &p.locator)
    }

    pub fn layout(&self) -> Option<&LayoutResult> {
        self.page.as_ref().map(|p| &p.layout)
    }

    pub fn home(&self) -> &Locator {
        &self.home
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    pub fn layout_params(&self) -> &LayoutParams {
        &self.params
    }

    pub fn image_cache(&self) -> &ImageCache {
        &self.images
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    // ---------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------

    fn load(&mut self, locator: Locator) -> Result<&LayoutResult> {
        log::info!("loading {locator}");
        let body = self
            .fetcher
            .fetch_text(&locator)
            .inspect_err(|e| log::warn!("load of {locator} failed: {e}"))?;

        let lines: Vec<String> = body.lines().map(str::to_string).collect();
        let layout = self.run_layout(&locator, &lines);
        if let Some(height) = layout.required_height {
            log::debug!("{locator} needs {height}px of canvas");
        }

        let page = self.page.insert(Page {
            locator,
            lines,
            layout,
        });
        Ok(&page.layout)
    }

    fn run_layout(&self, locator: &Locator, lines: &[String]) -> LayoutResult {
        let images = |source: &Locator| self.cached_image(source);
        layout::layout_document(lines, locator, &self.params, &self.measurer, &images)
    }

    fn cached_image(&self, locator: &Locator) -> CachedImage {
        self.images.get_image(locator, |l| {
            self.fetcher
                .fetch_image(l)
                .inspect_err(|e| log::warn!("image {l} failed: {e}"))
                .ok()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MapFetcher, png_bytes, serve_once};
    use marklet_types::error::ErrorKind;

    const INDEX: &str = "http://docs.local/guide/index.txt";
    const NEXT: &str = "http://docs.local/guide/next.txt";

    fn config() -> BrowserConfig {
        BrowserConfig {
            home_url: INDEX.to_string(),
            ..BrowserConfig::default()
        }
    }

    fn browser(fetcher: MapFetcher) -> Browser<MapFetcher> {
        Browser::with_parts(config(), fetcher, MonospaceMeasurer::default()).unwrap()
    }

    fn words(layout: &LayoutResult) -> Vec<&str> {
        layout
            .placements
            .iter()
            .filter_map(|p| match p {
                Placement::Text { run, .. } => Some(run.text.as_str()),
                Placement::Image { .. } => None,
            })
            .collect()
    }

    #[test]
    fn first_load_is_absolute_then_relative() {
        let mut b = browser(
            MapFetcher::new()
                .with_document(INDEX, "welcome home")
                .with_document(NEXT, "page two"),
        );
        assert!(b.layout().is_none());

        let layout = b.load_document(INDEX).unwrap();
        assert_eq!(words(layout), ["welcome", "home"]);

        let layout = b.load_document("next.txt").unwrap();
        assert_eq!(words(layout), ["page", "two"]);
        assert_eq!(b.current_locator().unwrap().to_string(), "http://docs.local:80/guide/next.txt");
    }

    #[test]
    fn failed_load_keeps_current_page() {
        let mut b = browser(MapFetcher::new().with_document(INDEX, "still here"));
        b.load_document(INDEX).unwrap();

        let err = b.load_document("missing.txt").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(b.current_locator().unwrap().path(), "/guide/index.txt");
        assert_eq!(words(b.layout().unwrap()), ["still", "here"]);
    }

    #[test]
    fn malformed_locator_never_fetches() {
        let mut b = browser(MapFetcher::new());
        let err = b.load_document("http://:80/x").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MalformedLocator);
        assert_eq!(b.fetcher().text_calls(), 0);
        assert!(b.layout().is_none());
    }

    #[test]
    fn click_follows_relative_link() {
        let mut b = browser(
            MapFetcher::new()
                .with_document(INDEX, "[[next.txt]] onward")
                .with_document(NEXT, "arrived"),
        );
        b.load_document(INDEX).unwrap();

        assert!(b.click(Point::new(700, 500)).unwrap().is_none());
        assert_eq!(b.fetcher().text_calls(), 1);

        let layout = b.click(Point::new(15, 15)).unwrap().unwrap();
        assert_eq!(words(layout), ["arrived"]);
        assert_eq!(b.current_locator().unwrap().path(), "/guide/next.txt");
    }

    #[test]
    fn click_on_dead_link_keeps_page() {
        let mut b = browser(MapFetcher::new().with_document(INDEX, "[[gone.txt]] broken"));
        b.load_document(INDEX).unwrap();

        let err = b.click(Point::new(15, 15)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(b.current_locator().unwrap().path(), "/guide/index.txt");
    }

    #[test]
    fn hit_test_without_document() {
        let b = browser(MapFetcher::new());
        assert_eq!(b.hit_test(Point::new(15, 15)), None);
    }

    #[test]
    fn go_home_loads_configured_document() {
        let mut b = browser(
            MapFetcher::new()
                .with_document(INDEX, "home page")
                .with_document(NEXT, "elsewhere"),
        );
        b.load_document(NEXT).unwrap();
        let layout = b.go_home().unwrap();
        assert_eq!(words(layout), ["home", "page"]);
        assert_eq!(b.current_locator(), Some(b.home()));
    }

    #[test]
    fn images_are_fetched_once_across_relayouts() {
        let mut b = browser(
            MapFetcher::new()
                .with_document(INDEX, "<<pic.png>>\nagain <<pic.png>>")
                .with_image("http://docs.local/guide/pic.png", png_bytes(12, 8)),
        );
        let layout = b.load_document(INDEX).unwrap();
        let images = layout
            .placements
            .iter()
            .filter(|p| matches!(p, Placement::Image { .. }))
            .count();
        assert_eq!(images, 2);

        b.resize(200, 100).unwrap().unwrap();
        let img = b.resolve_image("pic.png").unwrap();
        assert_eq!((img.width, img.height), (12, 8));

        assert_eq!(b.fetcher().image_calls(), 1);
        assert_eq!(b.fetcher().text_calls(), 1);
    }

    #[test]
    fn undecodable_image_is_skipped() {
        let mut b = browser(
            MapFetcher::new()
                .with_document(INDEX, "before <<bad.png>> after")
                .with_image("http://docs.local/guide/bad.png", b"not an image".to_vec()),
        );
        let layout = b.load_document(INDEX).unwrap();
        assert_eq!(words(layout), ["before", "after"]);
        assert!(b.resolve_image("bad.png").is_none());
        assert_eq!(b.fetcher().image_calls(), 1);
    }

    #[test]
    fn resize_rewraps_without_refetch() {
        let mut b = browser(MapFetcher::new().with_document(INDEX, "aaaa bbbb cccc"));
        let rows = |layout: &LayoutResult| -> Vec<i32> {
            layout
                .placements
                .iter()
                .map(|p| match p {
                    Placement::Text { y, .. } | Placement::Image { y, .. } => *y,
                })
                .collect()
        };

        let wide = rows(b.load_document(INDEX).unwrap());
        assert_eq!(wide, [10, 10, 10]);

        let narrow = rows(b.resize(110, 600).unwrap().unwrap());
        assert_eq!(narrow, [10, 10, 26]);
        assert_eq!(b.layout_params().viewport_width, 110);
        assert_eq!(b.fetcher().text_calls(), 1);
    }

    #[test]
    fn resize_before_load_only_updates_viewport() {
        let mut b = browser(MapFetcher::new());
        assert!(b.resize(320, 240).unwrap().is_none());
        assert_eq!(b.layout_params().viewport_height, 240);
    }

    #[test]
    fn resize_rejects_unusable_viewport() {
        let mut b = browser(MapFetcher::new().with_document(INDEX, "aaaa bbbb"));
        b.load_document(INDEX).unwrap();
        let before = b.layout().unwrap().clone();

        for (w, h) in [(0, 0), (320, 0), (u32::MAX, 240), (25, 240)] {
            let err = b.resize(w, h).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Config, "{w}x{h}");
        }
        assert_eq!(b.layout_params().viewport_width, 800);
        assert_eq!(b.layout_params().viewport_height, 600);
        assert_eq!(b.layout(), Some(&before));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = BrowserConfig {
            link_color: "blue".to_string(),
            ..config()
        };
        let err = Browser::with_parts(config, MapFetcher::new(), MonospaceMeasurer::default())
            .err()
            .unwrap();
        assert_eq!(err.kind(), ErrorKind::Config);
    }

    #[test]
    fn loads_over_loopback_http() {
        let (port, server) = serve_once(
            b"HTTP/1.1 200 OK\r\nContent-Length: 20\r\n\r\n*hello* [[b.txt]] go".to_vec(),
        );
        let mut b = Browser::new(config()).unwrap();
        let layout = b
            .load_document(&format!("http://127.0.0.1:{port}/a/doc.txt"))
            .unwrap();
        assert_eq!(words(layout), ["hello", "go"]);

        let target = b.hit_test(Point::new(60, 15)).unwrap();
        assert_eq!(target.to_string(), format!("http://127.0.0.1:{port}/a/b.txt"));

        let request = server.join().unwrap();
        assert!(request.starts_with("GET /a/doc.txt HTTP/1.1\r\nHost: 127.0.0.1\r\n"));
    }
}
