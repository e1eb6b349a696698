//! Resource loading: the HTTP transaction, the image cache, and the
//! [`Fetcher`] seam the browser loads through.

pub mod cache;
pub mod http;

pub use cache::{CachedImage, ImageCache};
pub use http::{HttpOptions, Transaction};

use marklet_types::error::Result;

use crate::image::DecodedImage;
use crate::url::Locator;

/// Source of documents and images.
///
/// [`HttpFetcher`] is the production implementation; tests substitute
/// in-memory fetchers.
pub trait Fetcher {
    /// Fetch a document body as text.
    fn fetch_text(&self, locator: &Locator) -> Result<String>;

    /// Fetch and decode an image.
    fn fetch_image(&self, locator: &Locator) -> Result<DecodedImage>;
}

/// Fetches over plain HTTP, one [`Transaction`] per resource.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    options: HttpOptions,
}

impl HttpFetcher {
    pub fn new(options: HttpOptions) -> Self {
        Self { options }
    }

    fn open(&self, locator: &Locator) -> Result<Transaction> {
        let tx = Transaction::open(locator, &self.options)?;
        match tx.status_code() {
            Ok(code) if !(200..300).contains(&code) => {
                log::warn!("{locator}: {}", tx.status_line());
            },
            Ok(_) => {},
            Err(e) => log::warn!("{locator}: {e}"),
        }
        Ok(tx)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, locator: &Locator) -> Result<String> {
        self.open(locator)?.body_as_text()
    }

    fn fetch_image(&self, locator: &Locator) -> Result<DecodedImage> {
        self.open(locator)?.body_as_image()
    }
}
