//! SCRAMBLE! - peer-to-peer typing race on a per-match shuffled keyboard
//!
//! Host a room, share the code, race to type the word.

mod app;
mod game;
mod network;
mod session;
mod tui;

use app::AppCoordinator;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::io;
use std::time::{Duration, Instant};
use tui::Tui;

fn main() -> io::Result<()> {
    // Initialize terminal
    let mut terminal = Tui::new()?;
    terminal.enter()?;

    let mut app = AppCoordinator::new();

    // Game timers tick once a second; the loop spins faster than that to
    // keep network polling and input latency low.
    let tick_rate = Duration::from_secs(1);
    let poll_rate = Duration::from_millis(50);
    let mut last_tick = Instant::now();

    loop {
        // Render
        terminal.draw(|frame| tui::render(frame, &app))?;

        // Poll for input with a short timeout
        if event::poll(poll_rate)? {
            if let Event::Key(key) = event::read()? {
                // Only handle key press events (not release)
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Esc => app.on_escape(),
                        KeyCode::Enter => app.on_enter(),
                        KeyCode::Backspace => app.on_backspace(),
                        KeyCode::Tab => app.on_tab(),
                        KeyCode::Up => app.on_nav(false),
                        KeyCode::Down => app.on_nav(true),
                        KeyCode::Char(c) => app.on_char(c),
                        _ => {}
                    }
                }
            }
        }

        // Apply pending network events
        app.poll();

        // Handle timer tick
        if last_tick.elapsed() >= tick_rate {
            app.tick();
            last_tick = Instant::now();
        }

        // Check for quit
        if app.should_quit {
            break;
        }
    }

    // Terminal cleanup happens automatically via Tui::drop
    Ok(())
}
