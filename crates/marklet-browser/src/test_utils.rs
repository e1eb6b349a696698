//! Shared test utilities for the browser crate.
//!
//! Provides a one-shot loopback HTTP server, an in-memory [`MapFetcher`]
//! that counts its calls, and a PNG encoder for image fixtures.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};

use marklet_types::error::{MarkletError, Result};

use crate::image::{DecodedImage, decode_image};
use crate::loader::Fetcher;
use crate::url::Locator;

/// Encode a solid grey RGB PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let data = vec![0x80; (width * height * 3) as usize];
        writer.write_image_data(&data).unwrap();
    }
    out
}

/// Accept one connection on an ephemeral loopback port, reply with
/// `response`, then close.
///
/// The join handle yields the request head the client sent.
pub fn serve_once(response: Vec<u8>) -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 512];
        while !request.ends_with(b"\r\n\r\n") {
            let n = stream.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }
        stream.write_all(&response).unwrap();
        stream.flush().unwrap();
        String::from_utf8_lossy(&request).into_owned()
    });

    (port, handle)
}

/// In-memory fetcher keyed by the locator's display form.
///
/// Images are stored encoded and decoded on fetch, so decode failures
/// behave as they would over HTTP.
#[derive(Default)]
pub struct MapFetcher {
    documents: HashMap<String, String>,
    images: HashMap<String, Vec<u8>>,
    text_calls: AtomicUsize,
    image_calls: AtomicUsize,
}

impl MapFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, locator: &str, body: &str) -> Self {
        self.documents.insert(key(locator), body.to_string());
        self
    }

    pub fn with_image(mut self, locator: &str, bytes: Vec<u8>) -> Self {
        self.images.insert(key(locator), bytes);
        self
    }

    pub fn text_calls(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn image_calls(&self) -> usize {
        self.image_calls.load(Ordering::SeqCst)
    }
}

fn key(locator: &str) -> String {
    Locator::parse_absolute(locator).unwrap().to_string()
}

impl Fetcher for MapFetcher {
    fn fetch_text(&self, locator: &Locator) -> Result<String> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(&locator.to_string())
            .cloned()
            .ok_or_else(|| MarkletError::Connection(format!("no document at {locator}")))
    }

    fn fetch_image(&self, locator: &Locator) -> Result<DecodedImage> {
        self.image_calls.fetch_add(1, Ordering::SeqCst);
        let bytes = self
            .images
            .get(&locator.to_string())
            .ok_or_else(|| MarkletError::Connection(format!("no image at {locator}")))?;
        decode_image(bytes)
    }
}
