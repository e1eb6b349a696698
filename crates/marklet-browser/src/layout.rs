//! Flow layout for marked-up text.
//!
//! Words flow left to right from the top-left margin and wrap when the
//! cursor plus the next word would pass `viewport_width - 2 * margin`. Each source line ends with a
//! line break. Images sit on their own row at the left margin.
//!
//! The output is a draw plan ([`Placement`]s) plus a [`LinkMap`] of
//! clickable rectangles. A layout pass owns all of its state, so laying
//! out the same document twice gives the same result.

use std::collections::HashMap;
use std::sync::Arc;

use marklet_types::color::Color;
use marklet_types::geometry::{Point, Rect};

use crate::image::DecodedImage;
use crate::markup::{StyleState, TextStyle, Token, Word, tokenize_line};
use crate::url::Locator;

// -------------------------------------------------------------------
// Seams
// -------------------------------------------------------------------

/// Measures text for line breaking.
///
/// Hosts with real fonts supply their own implementation; the layout
/// engine only needs widths and a uniform line height.
pub trait TextMeasurer {
    /// Width in pixels of `text` drawn in `style`.
    fn measure_text(&self, text: &str, style: TextStyle) -> u32;

    /// Height in pixels of one line of text.
    fn line_height(&self) -> u32;
}

/// Fixed-pitch measurer: every character is `glyph_width` pixels wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonospaceMeasurer {
    pub glyph_width: u32,
    pub line_height: u32,
}

impl Default for MonospaceMeasurer {
    fn default() -> Self {
        Self {
            glyph_width: 8,
            line_height: 16,
        }
    }
}

impl TextMeasurer for MonospaceMeasurer {
    fn measure_text(&self, text: &str, _style: TextStyle) -> u32 {
        text.chars().count() as u32 * self.glyph_width
    }

    fn line_height(&self) -> u32 {
        self.line_height
    }
}

/// Supplies decoded images by absolute locator. `None` means the image
/// is unavailable and gets skipped.
pub trait ImageSource {
    fn image(&self, locator: &Locator) -> Option<Arc<DecodedImage>>;
}

impl<F> ImageSource for F
where
    F: Fn(&Locator) -> Option<Arc<DecodedImage>>,
{
    fn image(&self, locator: &Locator) -> Option<Arc<DecodedImage>> {
        self(locator)
    }
}

// -------------------------------------------------------------------
// Output
// -------------------------------------------------------------------

/// A word with its resolved style and link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledRun {
    pub text: String,
    pub bold: bool,
    pub italic: bool,
    pub link: Option<Locator>,
}

impl StyledRun {
    pub fn style(&self) -> TextStyle {
        TextStyle {
            bold: self.bold,
            italic: self.italic,
        }
    }
}

/// One entry of the draw plan. `x`/`y` is the top-left corner.
#[derive(Debug, Clone, PartialEq)]
pub enum Placement {
    Text {
        x: i32,
        y: i32,
        /// Measured width, including the trailing inter-word space.
        width: u32,
        run: StyledRun,
        color: Color,
    },
    Image {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        source: Locator,
    },
}

/// A clickable region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRegion {
    pub rect: Rect,
    pub target: Locator,
}

/// Clickable regions in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkMap {
    regions: Vec<LinkRegion>,
}

impl LinkMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, rect: Rect, target: Locator) {
        self.regions.push(LinkRegion { rect, target });
    }

    /// The target of the first region containing `point`.
    pub fn hit_test(&self, point: Point) -> Option<&Locator> {
        self.regions
            .iter()
            .find(|r| r.rect.contains(point))
            .map(|r| &r.target)
    }

    pub fn regions(&self) -> &[LinkRegion] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// The outcome of one layout pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutResult {
    pub placements: Vec<Placement>,
    pub link_map: LinkMap,
    /// Final vertical cursor position.
    pub content_height: u32,
    /// Canvas height the host should grow to, when the content runs
    /// past the viewport.
    pub required_height: Option<u32>,
}

impl LayoutResult {
    pub fn hit_test(&self, point: Point) -> Option<&Locator> {
        self.link_map.hit_test(point)
    }
}

/// Viewport geometry and colors for a layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutParams {
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub margin: u32,
    pub text_color: Color,
    pub link_color: Color,
}

impl Default for LayoutParams {
    fn default() -> Self {
        Self {
            viewport_width: 800,
            viewport_height: 600,
            margin: 10,
            text_color: Color::BLACK,
            link_color: Color::BLUE,
        }
    }
}

// -------------------------------------------------------------------
// Layout pass
// -------------------------------------------------------------------

/// Cursor and accumulated output of one pass.
struct Flow<'a> {
    base: &'a Locator,
    params: &'a LayoutParams,
    measurer: &'a dyn TextMeasurer,
    line_height: i32,
    left: i32,
    right: i32,
    x: i32,
    y: i32,
    placements: Vec<Placement>,
    link_map: LinkMap,
    /// Resolved link targets by raw text; `None` marks a target that
    /// failed to resolve and was already reported.
    link_targets: HashMap<String, Option<Locator>>,
}

impl<'a> Flow<'a> {
    fn new(base: &'a Locator, params: &'a LayoutParams, measurer: &'a dyn TextMeasurer) -> Self {
        let left = params.margin as i32;
        Self {
            base,
            params,
            measurer,
            line_height: measurer.line_height() as i32,
            left,
            right: params.viewport_width as i32 - 2 * left,
            x: left,
            y: left,
            placements: Vec::new(),
            link_map: LinkMap::new(),
            link_targets: HashMap::new(),
        }
    }

    fn new_line(&mut self) {
        self.x = self.left;
        self.y += self.line_height;
    }

    fn place_word(&mut self, word: Word) {
        let width = self
            .measurer
            .measure_text(&format!("{} ", word.text), word.style);
        if self.x + width as i32 > self.right {
            self.new_line();
        }

        let color = if word.link.is_some() {
            self.params.link_color
        } else {
            self.params.text_color
        };

        let link = word.link.and_then(|target| self.resolve_link(target));
        if let Some(target) = &link {
            let rect = Rect::new(self.x, self.y, width, self.line_height as u32);
            self.link_map.insert(rect, target.clone());
        }

        self.placements.push(Placement::Text {
            x: self.x,
            y: self.y,
            width,
            run: StyledRun {
                text: word.text,
                bold: word.style.bold,
                italic: word.style.italic,
                link,
            },
            color,
        });
        self.x += width as i32;
    }

    fn resolve_link(&mut self, target: String) -> Option<Locator> {
        let base = self.base;
        self.link_targets
            .entry(target)
            .or_insert_with_key(|target| {
                Locator::resolve_relative(target, base)
                    .inspect_err(|e| log::warn!("ignoring link {target:?}: {e}"))
                    .ok()
            })
            .clone()
    }

    fn place_image(&mut self, name: &str, images: &dyn ImageSource) {
        let source = match Locator::resolve_relative(name, self.base) {
            Ok(locator) => locator,
            Err(e) => {
                log::warn!("ignoring image {name:?}: {e}");
                return;
            },
        };
        let Some(image) = images.image(&source) else {
            log::warn!("image unavailable: {source}");
            return;
        };

        self.placements.push(Placement::Image {
            x: self.left,
            y: self.y + self.line_height,
            width: image.width,
            height: image.height,
            source,
        });
        self.x = self.left;
        self.y += self.line_height + image.height as i32 + self.line_height;
    }

    fn finish(self) -> LayoutResult {
        let content_height = self.y.max(0) as u32;
        let required_height = (content_height > self.params.viewport_height).then(|| {
            content_height + self.line_height as u32 + 2 * self.params.margin
        });
        LayoutResult {
            placements: self.placements,
            link_map: self.link_map,
            content_height,
            required_height,
        }
    }
}

/// Lay out `lines` of marked-up text.
///
/// Relative links and image names resolve against `base`.
pub fn layout_document<S: AsRef<str>>(
    lines: &[S],
    base: &Locator,
    params: &LayoutParams,
    measurer: &dyn TextMeasurer,
    images: &dyn ImageSource,
) -> LayoutResult {
    let mut flow = Flow::new(base, params, measurer);
    let mut state = StyleState::default();

    for line in lines {
        for token in tokenize_line(line.as_ref(), &mut state) {
            match token {
                Token::Word(word) => flow.place_word(word),
                Token::Image(name) => flow.place_image(&name, images),
            }
        }
        flow.new_line();
    }

    log::debug!(
        "laid out {} lines: {} placements, {} links",
        lines.len(),
        flow.placements.len(),
        flow.link_map.len()
    );
    flow.finish()
}
