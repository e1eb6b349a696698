//! Browser configuration, loaded from TOML.
//!
//! Every field is optional; a missing file or an empty document yields
//! the defaults.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use marklet_types::color::{Color, parse_hex_color};
use marklet_types::error::{MarkletError, Result};

use crate::layout::LayoutParams;
use crate::loader::http::{self, HttpOptions};
use crate::url::Locator;

/// Browser settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BrowserConfig {
    /// Document loaded by the home action.
    #[serde(default = "default_home_url")]
    pub home_url: String,
    /// Initial viewport width in pixels.
    #[serde(default = "default_viewport_width")]
    pub viewport_width: u32,
    /// Initial viewport height in pixels.
    #[serde(default = "default_viewport_height")]
    pub viewport_height: u32,
    /// Blank border around the content, in pixels.
    #[serde(default = "default_margin")]
    pub margin: u32,
    /// Plain text color (`#rrggbb`).
    #[serde(default = "default_text_color")]
    pub text_color: String,
    /// Link text color (`#rrggbb`).
    #[serde(default = "default_link_color")]
    pub link_color: String,
    /// TCP connect timeout in seconds; 0 waits indefinitely.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// Socket read timeout in seconds; 0 waits indefinitely.
    #[serde(default = "default_read_timeout")]
    pub read_timeout_secs: u64,
    /// Largest response body accepted.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_home_url() -> String {
    "http://localhost/index.txt".to_string()
}
fn default_viewport_width() -> u32 {
    800
}
fn default_viewport_height() -> u32 {
    600
}
fn default_margin() -> u32 {
    10
}
fn default_text_color() -> String {
    "#000000".to_string()
}
fn default_link_color() -> String {
    "#0000FF".to_string()
}
fn default_connect_timeout() -> u64 {
    http::CONNECT_TIMEOUT.as_secs()
}
fn default_read_timeout() -> u64 {
    http::READ_TIMEOUT.as_secs()
}
fn default_max_body_bytes() -> usize {
    http::MAX_BODY_SIZE
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            home_url: default_home_url(),
            viewport_width: default_viewport_width(),
            viewport_height: default_viewport_height(),
            margin: default_margin(),
            text_color: default_text_color(),
            link_color: default_link_color(),
            connect_timeout_secs: default_connect_timeout(),
            read_timeout_secs: default_read_timeout(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl BrowserConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Check values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        check_viewport(self.viewport_width, self.viewport_height, self.margin)?;
        if self.max_body_bytes == 0 {
            return Err(MarkletError::Config(
                "max_body_bytes must be positive".to_string(),
            ));
        }
        self.text_color()?;
        self.link_color()?;
        self.home_locator()?;
        Ok(())
    }

    pub fn text_color(&self) -> Result<Color> {
        parse_color("text_color", &self.text_color)
    }

    pub fn link_color(&self) -> Result<Color> {
        parse_color("link_color", &self.link_color)
    }

    pub fn home_locator(&self) -> Result<Locator> {
        Locator::parse_absolute(&self.home_url)
            .map_err(|e| MarkletError::Config(format!("home_url: {e}")))
    }

    pub fn http_options(&self) -> HttpOptions {
        let secs = |s: u64| (s > 0).then(|| Duration::from_secs(s));
        HttpOptions {
            connect_timeout: secs(self.connect_timeout_secs),
            read_timeout: secs(self.read_timeout_secs),
            max_body_bytes: self.max_body_bytes,
        }
    }

    /// Layout parameters for the configured viewport.
    pub fn layout_params(&self) -> Result<LayoutParams> {
        Ok(LayoutParams {
            viewport_width: self.viewport_width,
            viewport_height: self.viewport_height,
            margin: self.margin,
            text_color: self.text_color()?,
            link_color: self.link_color()?,
        })
    }
}

/// Reject viewports layout cannot use: empty, too large for signed
/// pixel coordinates, or with no room left inside the margins.
///
/// Text starts one margin in and wraps at `width - 2 * margin`.
pub fn check_viewport(width: u32, height: u32, margin: u32) -> Result<()> {
    let max = i32::MAX as u32;
    if width == 0 || height == 0 || width > max || height > max {
        return Err(MarkletError::Config(format!(
            "viewport {width}x{height} is out of range"
        )));
    }
    if margin.saturating_mul(3) >= width {
        return Err(MarkletError::Config(format!(
            "margin {margin} leaves no room in a {width}px viewport"
        )));
    }
    Ok(())
}

fn parse_color(field: &str, value: &str) -> Result<Color> {
    parse_hex_color(value)
        .ok_or_else(|| MarkletError::Config(format!("{field}: invalid color {value:?}")))
}
