//! marklet text-mode host.
//!
//! Drives the document browser from stdin and prints each draw plan.
//! The first argument, if any, is loaded instead of the home document.
//! Type `help` for the command list.

mod commands;
mod render;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};

use commands::Command;
use marklet_browser::{Browser, BrowserConfig, LayoutResult};

const CONFIG_ENV: &str = "MARKLET_CONFIG";
const CONFIG_FILE: &str = "marklet.toml";

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config()?;
    log::info!(
        "Starting marklet ({}x{}, home {})",
        config.viewport_width,
        config.viewport_height,
        config.home_url
    );
    let mut browser = Browser::new(config).context("invalid browser configuration")?;

    let first = std::env::args().nth(1);
    let initial = match &first {
        Some(target) => browser.load_document(target),
        None => browser.go_home(),
    };
    report(initial);

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;
        let Some(line) = lines.next() else {
            break;
        };
        let command = match commands::parse(&line?) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(msg) => {
                println!("{msg} (try `help`)");
                continue;
            },
        };

        match command {
            Command::Open(target) => report(browser.load_document(&target)),
            Command::Click(point) => match browser.click(point) {
                Ok(Some(layout)) => print_layout(layout),
                Ok(None) => println!("no link at ({}, {})", point.x, point.y),
                Err(e) => println!("error ({:?}): {e}", e.kind()),
            },
            Command::Home => report(browser.go_home()),
            Command::Resize { width, height } => match browser.resize(width, height) {
                Ok(Some(layout)) => print_layout(layout),
                Ok(None) => println!("viewport is now {width}x{height}"),
                Err(e) => println!("error ({:?}): {e}", e.kind()),
            },
            Command::Show => match browser.layout() {
                Some(layout) => print_layout(layout),
                None => println!("no document loaded"),
            },
            Command::Image(name) => match browser.resolve_image(&name) {
                Some(img) => println!("{name}: {}x{}", img.width, img.height),
                None => println!("{name}: unavailable"),
            },
            Command::Help => println!("{}", commands::HELP),
            Command::Quit => break,
        }
    }

    log::info!("Shutting down");
    Ok(())
}

/// `$MARKLET_CONFIG`, then `./marklet.toml`, then built-in defaults.
fn load_config() -> Result<BrowserConfig> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        let path = PathBuf::from(path);
        return BrowserConfig::from_file(&path)
            .with_context(|| format!("loading {} from ${CONFIG_ENV}", path.display()));
    }

    let local = PathBuf::from(CONFIG_FILE);
    if local.is_file() {
        return BrowserConfig::from_file(&local)
            .with_context(|| format!("loading {}", local.display()));
    }

    log::info!("no config file, using defaults");
    Ok(BrowserConfig::default())
}

fn report(result: marklet_types::Result<&LayoutResult>) {
    match result {
        Ok(layout) => print_layout(layout),
        Err(e) => println!("error ({:?}): {e}", e.kind()),
    }
}

fn print_layout(layout: &LayoutResult) {
    for line in render::describe(layout) {
        println!("{line}");
    }
}
