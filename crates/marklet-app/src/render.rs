//! Text rendering of a draw plan.

use marklet_browser::{LayoutResult, Placement};
use marklet_types::color::Color;

/// One line per placement, then the link regions.
pub fn describe(layout: &LayoutResult) -> Vec<String> {
    let mut out = Vec::with_capacity(layout.placements.len() + layout.link_map.len() + 1);

    for placement in &layout.placements {
        out.push(match placement {
            Placement::Text {
                x,
                y,
                width,
                run,
                color,
            } => {
                let mut flags = String::new();
                if run.bold {
                    flags.push('B');
                }
                if run.italic {
                    flags.push('I');
                }
                format!(
                    "text  ({x:>4},{y:>5}) w={width:<4} {} {flags:<2} {:?}",
                    hex(*color),
                    run.text
                )
            },
            Placement::Image {
                x,
                y,
                width,
                height,
                source,
            } => format!("image ({x:>4},{y:>5}) {width}x{height} {source}"),
        });
    }

    for region in layout.link_map.regions() {
        let r = region.rect;
        out.push(format!(
            "link  ({},{}) {}x{} -> {}",
            r.x, r.y, r.width, r.height, region.target
        ));
    }

    if let Some(height) = layout.required_height {
        out.push(format!("canvas needs {height}px"));
    }
    out
}

fn hex(c: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b)
}
