//! Stdin command parsing.

use marklet_types::geometry::Point;

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load a locator, relative to the current document.
    Open(String),
    /// Follow the link under a point.
    Click(Point),
    Home,
    Resize { width: u32, height: u32 },
    /// Print the current draw plan again.
    Show,
    /// Report whether an embedded image resolves.
    Image(String),
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  open <locator>      load a document (relative to the current one)
  click <x> <y>       follow the link at a point
  home                load the home document
  resize <w> <h>      change the viewport and lay out again
  show                print the current draw plan
  image <name>        fetch an embedded image through the cache
  help                this text
  quit                exit";

/// Parse one input line. Blank lines parse to `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let mut parts = line.split_whitespace();
    let Some(verb) = parts.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = parts.collect();

    let command = match (verb, args.as_slice()) {
        ("open" | "o", [target]) => Command::Open((*target).to_string()),
        ("click" | "c", [x, y]) => Command::Click(Point::new(number(x)?, number(y)?)),
        ("home", []) => Command::Home,
        ("resize", [w, h]) => Command::Resize {
            width: number(w)?,
            height: number(h)?,
        },
        ("show", []) => Command::Show,
        ("image", [name]) => Command::Image((*name).to_string()),
        ("help" | "?", []) => Command::Help,
        ("quit" | "exit" | "q", []) => Command::Quit,
        _ => return Err(format!("unrecognized command: {}", line.trim())),
    };
    Ok(Some(command))
}

fn number<T: std::str::FromStr>(text: &str) -> Result<T, String> {
    text.parse().map_err(|_| format!("not a number: {text}"))
}
