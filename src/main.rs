mod app;
mod braille;
mod config;
mod fetch;
mod map;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::Parser;
use config::{Args, Config};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;
use std::time::Duration;

fn main() -> Result<()> {
    let config = Config::from_args(Args::parse());
    init_logging(&config)?;

    // The fetch runs on its own runtime so the UI thread never blocks
    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let fetch = fetch::spawn_fetch(runtime.handle(), config.endpoint_url.clone());

    // Initialize terminal
    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, &config, fetch);

    // Restore the terminal before reporting anything
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();

    result
}

/// Route diagnostics to a file; stdout/stderr belong to the map
fn init_logging(config: &Config) -> Result<()> {
    let log_file = std::fs::File::create(&config.log_file)
        .with_context(|| format!("failed to open log file {}", config.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siteview=info".into()),
        )
        .with_writer(std::sync::Arc::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Handle mouse events for panning, zooming and feature interaction
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    // Always track position for the cursor marker and hover hit-testing
    app.set_mouse_pos(mouse.column, mouse.row);

    match mouse.kind {
        // Scroll wheel zooms towards the mouse position
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        // Horizontal scroll pans (trackpad two-finger swipe)
        MouseEventKind::ScrollLeft => app.pan(-15, 0),
        MouseEventKind::ScrollRight => app.pan(15, 0),
        // Click selects a site; drag pans
        MouseEventKind::Down(MouseButton::Left) => {
            app.last_mouse = Some((mouse.column, mouse.row));
            app.click(mouse.column, mouse.row);
        }
        MouseEventKind::Drag(MouseButton::Left) => {
            app.handle_drag(mouse.column, mouse.row);
        }
        MouseEventKind::Up(MouseButton::Left) => {
            app.end_drag();
        }
        _ => {}
    }
}

fn run(terminal: &mut DefaultTerminal, config: &Config, fetch: fetch::FetchHandle) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(config, size.width as usize, size.height as usize, fetch);

    loop {
        // Collect fetch outcome and surface events before drawing
        app.tick();

        terminal.draw(|frame| ui::render(frame, &app))?;

        // Handle events with ~60fps target
        if event::poll(Duration::from_millis(16))? {
            match event::read()? {
                Event::Key(key) => {
                    // Only handle key press events (not release)
                    if key.kind == KeyEventKind::Press {
                        match key.code {
                            KeyCode::Char('q') => app.quit(),
                            KeyCode::Esc => {
                                // Close an open popup first, then quit
                                if app.surface.popup().is_some() {
                                    app.surface.close_popup();
                                } else {
                                    app.quit();
                                }
                            }
                            KeyCode::Char('x') => app.surface.close_popup(),

                            // Pan with hjkl or arrow keys
                            KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
                            KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
                            KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
                            KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),

                            // Zoom
                            KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
                            KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),

                            _ => {}
                        }
                    }
                }
                Event::Mouse(mouse) => {
                    handle_mouse(&mut app, mouse);
                }
                Event::Resize(width, height) => {
                    app.resize(width as usize, height as usize);
                }
                _ => {}
            }
        }

        if app.should_quit {
            break;
        }
    }

    // Dropping the app aborts any still-running fetch with it
    Ok(())
}
