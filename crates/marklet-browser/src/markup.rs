//! Inline markup tokenizer.
//!
//! Documents are plain text split into whitespace-delimited tokens.
//! Markers are prefixes and suffixes of those tokens, not tokens of
//! their own:
//!
//! | Marker | Meaning |
//! |---|---|
//! | `*word*` | bold |
//! | `_word_` | italic |
//! | `[[target]] text` | link to `target`, shown as `text` |
//! | `<<name>>` | image resolved relative to the document |
//!
//! Style flags live in a [`StyleState`] the caller threads through every
//! line, so an open marker stays in force until its close marker, even
//! across lines. Unclosed markers simply stay open for the rest of the
//! document.
//!
//! Link text quirk: when a line holds more than one token and another
//! token follows `[[target]]`, that next token becomes the visible
//! text and the target itself is not shown. The link then stays open
//! until some later token ends in `]]`, so `[[a.txt]] click more` links
//! both words. `[[target]]` alone, or as the last token of its line,
//! shows the target and closes at once.

/// Bold open/close marker.
pub const BOLD: &str = "*";
/// Italic open/close marker.
pub const ITALIC: &str = "_";
/// Link open marker.
pub const LINK_OPEN: &str = "[[";
/// Link close marker.
pub const LINK_CLOSE: &str = "]]";
/// Image reference open marker.
pub const IMAGE_OPEN: &str = "<<";
/// Image reference close marker.
pub const IMAGE_CLOSE: &str = ">>";

/// Font variant used to measure and draw a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextStyle {
    pub bold: bool,
    pub italic: bool,
}

/// Style flags carried from token to token and line to line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleState {
    pub bold: bool,
    pub italic: bool,
    /// Target of the open link, if any.
    pub link: Option<String>,
}

impl StyleState {
    pub fn text_style(&self) -> TextStyle {
        TextStyle {
            bold: self.bold,
            italic: self.italic,
        }
    }
}

/// A word after marker stripping, with the style in force for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// May be empty when the token consisted only of markers.
    pub text: String,
    pub style: TextStyle,
    /// Raw link target text, unresolved.
    pub link: Option<String>,
}

/// One unit of laid-out content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(Word),
    /// Image reference name, unresolved.
    Image(String),
}

/// Tokenize one line, updating `state` as markers open and close.
pub fn tokenize_line(line: &str, state: &mut StyleState) -> Vec<Token> {
    let raw_tokens: Vec<&str> = line.split_whitespace().collect();
    let multi_token_line = raw_tokens.len() > 1;
    let mut raw_tokens = raw_tokens.into_iter();
    let mut out = Vec::new();

    while let Some(raw) = raw_tokens.next() {
        if let Some(name) = image_name(raw) {
            out.push(Token::Image(name.to_string()));
            continue;
        }

        let mut word = raw;

        if let Some(rest) = word.strip_prefix(BOLD) {
            state.bold = true;
            word = rest;
        }
        if let Some(rest) = word.strip_prefix(ITALIC) {
            state.italic = true;
            word = rest;
        }
        if let Some(rest) = word.strip_prefix(LINK_OPEN) {
            let target = rest.find(LINK_CLOSE).map_or(rest, |i| &rest[..i]);
            state.link = Some(target.to_string());
            word = rest;

            if multi_token_line {
                if let Some(next) = raw_tokens.next() {
                    word = next;
                }
            }
        }

        let style = state.text_style();
        let link = state.link.clone();

        if let Some(rest) = word.strip_suffix(BOLD) {
            state.bold = false;
            word = rest;
        }
        if let Some(rest) = word.strip_suffix(ITALIC) {
            state.italic = false;
            word = rest;
        }
        if let Some(rest) = word.strip_suffix(LINK_CLOSE) {
            state.link = None;
            word = rest;
        }

        out.push(Token::Word(Word {
            text: word.to_string(),
            style,
            link,
        }));
    }

    out
}

/// The name inside `<<name>>`, if `token` is an image reference.
fn image_name(token: &str) -> Option<&str> {
    if token.len() < IMAGE_OPEN.len() + IMAGE_CLOSE.len() {
        return None;
    }
    token.strip_prefix(IMAGE_OPEN)?.strip_suffix(IMAGE_CLOSE)
}
