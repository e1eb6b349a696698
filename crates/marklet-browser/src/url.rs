//! Locator parsing and relative resolution.
//!
//! A [`Locator`] is the scheme/host/port/path quadruple that names a
//! document or image. Relative references only replace the last path
//! segment of the base; there is no support for `../`, query strings,
//! or fragments.

use std::fmt;
use std::str::FromStr;

use marklet_types::error::{MarkletError, Result};

/// Separates the scheme from the authority.
pub const SCHEME_DELIMITER: &str = "://";

/// Scheme used when the text names none.
pub const DEFAULT_SCHEME: &str = "http";

/// Port used when the authority names none.
pub const DEFAULT_PORT: u16 = 80;

/// Path used when the text has nothing after the authority.
pub const DEFAULT_PATH: &str = "/";

/// A parsed resource locator. Immutable once constructed; the host is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    scheme: String,
    host: String,
    port: u16,
    path: String,
}

impl Locator {
    /// Parse an absolute locator such as `http://host:8080/dir/page.txt`.
    ///
    /// Without a `://` delimiter the whole text is treated as
    /// `host[:port][/path]` under the default scheme. The port is taken
    /// from the last `:` before the first `/` of the authority.
    pub fn parse_absolute(text: &str) -> Result<Self> {
        let text = text.trim();

        let (scheme, rest) = match text.find(SCHEME_DELIMITER) {
            Some(i) => (&text[..i], &text[i + SCHEME_DELIMITER.len()..]),
            None => ("", text),
        };
        let scheme = if scheme.is_empty() {
            DEFAULT_SCHEME
        } else {
            scheme
        };

        let (authority, path) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, DEFAULT_PATH),
        };

        let (host, port) = match authority.rfind(':') {
            Some(i) => {
                let digits = &authority[i + 1..];
                let port = digits.parse::<u16>().map_err(|_| {
                    MarkletError::MalformedLocator(format!("bad port {digits:?} in {text:?}"))
                })?;
                (&authority[..i], port)
            },
            None => (authority, DEFAULT_PORT),
        };

        if host.is_empty() {
            return Err(MarkletError::MalformedLocator(format!(
                "empty host in {text:?}"
            )));
        }

        Ok(Locator {
            scheme: scheme.to_string(),
            host: host.to_string(),
            port,
            path: path.to_string(),
        })
    }

    /// Resolve `text` against `base`.
    ///
    /// Text containing `://` is parsed as absolute and `base` is ignored.
    /// Anything else replaces everything after the final `/` of the
    /// base path, keeping the base scheme, host, and port.
    pub fn resolve_relative(text: &str, base: &Locator) -> Result<Self> {
        let text = text.trim();
        if text.contains(SCHEME_DELIMITER) {
            return Self::parse_absolute(text);
        }

        let dir_end = base.path.rfind('/').map_or(0, |i| i + 1);
        Ok(Locator {
            scheme: base.scheme.clone(),
            host: base.host.clone(),
            port: base.port,
            path: format!("{}{}", &base.path[..dir_end], text),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for Locator {
    /// Canonical `scheme://host:port/path`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}{}", self.scheme, self.host, self.port, self.path)
    }
}

impl FromStr for Locator {
    type Err = MarkletError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_absolute(s)
    }
}
