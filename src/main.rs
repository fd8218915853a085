// Hide console window on Windows in release builds
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

//! Facing - Main Entry Point
//!
//! A side-by-side reader for annotated texts. Panels scroll together along
//! shared location markers. Built with Rust and egui.

mod app;
mod config;
mod content;
mod error;
mod files;
mod markup;
mod share;
mod theme;
mod ui;
mod viewer;

use app::{FacingApp, StartupOptions};
use clap::Parser;
use config::load_config;
use content::source_config_from_arg;
use log::{info, warn};

/// Application name constant.
const APP_NAME: &str = "Facing";

#[derive(Parser, Debug)]
#[command(name = "facing")]
#[command(about = "Read annotated texts side by side", long_about = None)]
struct Args {
    /// Directory of section files, or base URL of a text server
    #[arg(short, long)]
    source: Option<String>,

    /// Location to open, e.g. `ch1/ch2,p3`
    #[arg(short, long)]
    location: Option<String>,

    /// Number of panels (1 to 4)
    #[arg(short, long)]
    panels: Option<usize>,
}

fn main() -> eframe::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Starting {}", APP_NAME);

    let settings = load_config();
    let window_size = settings.window_size;

    let source = args
        .source
        .as_deref()
        .and_then(|arg| match source_config_from_arg(arg) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring --source: {}", e);
                None
            }
        });
    let options = StartupOptions {
        source,
        location: args.location,
        panels: args.panels,
    };

    let viewport = eframe::egui::ViewportBuilder::default()
        .with_title(APP_NAME)
        .with_inner_size([window_size.width, window_size.height])
        .with_min_inner_size([480.0, 320.0])
        .with_maximized(window_size.maximized);

    let native_options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(move |cc| Ok(Box::new(FacingApp::new(cc, settings, options)))),
    )
}
