//! UI rendering using ratatui
//!
//! Supports multiple screens:
//! - Menu: Main menu with options
//! - CodeEntry: Typing a room code
//! - Connecting: Resolving a room code on the network
//! - Hosting/Joined: the room, from lobby through game over
//! - Error: Error message display

use crate::app::{AppCoordinator, MenuOption, Screen};
use crate::game::match_state::{MatchState, Phase};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

/// Render the appropriate screen based on app state
pub fn render(frame: &mut Frame, coordinator: &AppCoordinator) {
    match &coordinator.screen {
        Screen::Menu { selected, handle_input, editing_handle } => {
            render_menu(frame, *selected, &coordinator.handle, handle_input, *editing_handle);
        }
        Screen::CodeEntry { code_input } => {
            render_code_entry(frame, code_input);
        }
        Screen::Connecting { code, .. } => {
            render_connecting(frame, code);
        }
        Screen::Hosting { session } => {
            render_room(
                frame,
                session.state(),
                session.room_code(),
                true,
                &coordinator.status,
            );
        }
        Screen::Joined { session } => {
            render_room(
                frame,
                session.state(),
                session.room_code(),
                false,
                &coordinator.status,
            );
        }
        Screen::Error { message } => {
            render_error(frame, message);
        }
    }
}

/// Render the main menu
fn render_menu(
    frame: &mut Frame,
    selected: usize,
    handle: &str,
    handle_input: &str,
    editing_handle: bool,
) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),  // Logo
            Constraint::Length(3),  // Handle input
            Constraint::Length(1),  // Spacer
            Constraint::Min(5),     // Menu options
            Constraint::Length(2),  // Footer
        ])
        .margin(2)
        .split(area);

    let logo = r#"
 ____   ___  ____      _    __  __  ____  _     _____
/ ___| / __|| __ \    / \  |  \/  || __ )| |   | ____|
\___ \| |   |  _ /   / _ \ | |\/| ||  _ \| |   |  _|
 ___) | |__ | | \ \ / ___ \| |  | || |_) | |___| |___
|____/ \___||_|  \_/_/   \_\_|  |_||____/|_____|_____|
"#;
    let logo_widget = Paragraph::new(logo)
        .style(Style::default().fg(Color::Yellow).bold())
        .alignment(Alignment::Center);
    frame.render_widget(logo_widget, layout[0]);

    let handle_display = if editing_handle {
        format!("Name: [{}]_", handle_input)
    } else {
        format!("Name: {} (Tab to edit)", handle)
    };
    let handle_style = if editing_handle {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let handle_widget = Paragraph::new(handle_display)
        .style(handle_style)
        .alignment(Alignment::Center);
    frame.render_widget(handle_widget, layout[1]);

    let items: Vec<ListItem> = MenuOption::all()
        .iter()
        .enumerate()
        .map(|(i, opt)| {
            let style = if i == selected {
                Style::default().fg(Color::Yellow).bold()
            } else {
                Style::default().fg(Color::White)
            };
            let prefix = if i == selected { "> " } else { "  " };
            ListItem::new(format!("{}{}", prefix, opt.label())).style(style)
        })
        .collect();

    let menu = List::new(items).block(Block::default());
    frame.render_widget(menu, layout[3]);

    let footer = Paragraph::new("↑↓ Navigate  Enter Select  Esc Quit")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(footer, layout[4]);
}

/// Render the room code entry screen
fn render_code_entry(frame: &mut Frame, code_input: &str) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .margin(2)
        .split(area);

    let header = Paragraph::new("Join a Room")
        .style(Style::default().fg(Color::Cyan).bold())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, layout[0]);

    let entry = Paragraph::new(format!("Enter room code: {}_", code_input))
        .style(Style::default().fg(Color::White).bold())
        .alignment(Alignment::Center);
    frame.render_widget(entry, layout[1]);

    let footer = Paragraph::new("Enter Join  Esc Back")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(footer, layout[3]);
}

/// Render the connecting screen
fn render_connecting(frame: &mut Frame, code: &str) {
    let area = frame.area();
    let message = Paragraph::new(format!("Looking for room {}...", code))
        .style(Style::default().fg(Color::Cyan))
        .alignment(Alignment::Center);
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(45), Constraint::Length(3), Constraint::Min(1)])
        .split(area);
    frame.render_widget(message, layout[1]);
}

/// Render the room in whatever phase the match is in
fn render_room(
    frame: &mut Frame,
    state: &MatchState,
    room_code: &str,
    is_host: bool,
    status: &str,
) {
    match state.phase {
        Phase::Lobby => render_lobby(frame, state, room_code, is_host, status),
        Phase::Countdown(n) => render_countdown(frame, n),
        Phase::Playing => render_playing(frame, state),
        Phase::Results { .. } => render_results(frame, state, is_host),
        Phase::GameOver => render_game_over(frame, state),
    }
}

/// Render the in-room lobby: roster, readiness, and the shareable code
fn render_lobby(
    frame: &mut Frame,
    state: &MatchState,
    room_code: &str,
    is_host: bool,
    status: &str,
) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Length(3),  // Room code
            Constraint::Min(5),     // Player list
            Constraint::Length(1),  // Status
            Constraint::Length(2),  // Footer
        ])
        .margin(1)
        .split(area);

    let header = Paragraph::new(if is_host { "Hosting Room" } else { "Joined Room" })
        .style(Style::default().fg(Color::Yellow).bold())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, layout[0]);

    let code_line = if is_host {
        format!("Share this code: {}", room_code)
    } else {
        format!("Room code: {}", room_code)
    };
    let code_widget = Paragraph::new(code_line)
        .style(Style::default().fg(Color::Cyan).bold())
        .alignment(Alignment::Center);
    frame.render_widget(code_widget, layout[1]);

    let items: Vec<ListItem> = state
        .players()
        .iter()
        .map(|p| {
            let marker = if p.ready { "●" } else { "○" };
            let suffix = if p.id == 1 { " (Host)" } else { "" };
            let style = if Some(p.id) == state.local_id() {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            let ready_note = if p.ready { "ready" } else { "not ready" };
            ListItem::new(format!("  {} {}{} — {}", marker, p.name, suffix, ready_note))
                .style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Players {}/3", state.players().len())),
    );
    frame.render_widget(list, layout[2]);

    let status_widget = Paragraph::new(status)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(status_widget, layout[3]);

    let ready = state.local().map(|p| p.ready).unwrap_or(false);
    let footer_text = if ready {
        "R Unready  Esc Leave — waiting for everyone to ready up"
    } else {
        "R Ready  Esc Leave"
    };
    let footer = Paragraph::new(footer_text)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(footer, layout[4]);
}

/// Render the pre-round countdown; the word and keyboard stay hidden
fn render_countdown(frame: &mut Frame, n: u8) {
    let area = frame.area();
    let text = if n > 0 { n.to_string() } else { "GO!".to_string() };

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Length(3), Constraint::Min(1)])
        .split(area);

    let widget = Paragraph::new(text)
        .style(Style::default().fg(Color::Green).bold())
        .alignment(Alignment::Center);
    frame.render_widget(widget, layout[1]);
}

/// Render the playing screen: word, progress, shuffled keyboard
fn render_playing(frame: &mut Frame, state: &MatchState) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),  // Score line
            Constraint::Length(3),  // Word
            Constraint::Length(1),  // Feedback
            Constraint::Min(4),     // Player progress
            Constraint::Length(5),  // Keyboard
            Constraint::Length(1),  // Footer
        ])
        .margin(1)
        .split(area);

    frame.render_widget(score_line(state), layout[0]);

    // Word with typed-prefix highlighting.
    let typed_len = state.typed().chars().count();
    let mut spans: Vec<Span> = Vec::new();
    for (i, c) in state.current_word().chars().enumerate() {
        let style = if i < typed_len {
            Style::default().fg(Color::Green).bold()
        } else if i == typed_len {
            Style::default().fg(Color::Yellow).bold().underlined()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!("{} ", c), style));
    }
    let word_widget = Paragraph::new(Line::from(spans)).alignment(Alignment::Center);
    frame.render_widget(word_widget, layout[1]);

    let feedback = match state.last_miss {
        Some(c) => Paragraph::new(format!("✗ {}", c))
            .style(Style::default().fg(Color::Red).bold()),
        None => Paragraph::new(""),
    }
    .alignment(Alignment::Center);
    frame.render_widget(feedback, layout[2]);

    // One line per player: bar, time, or "typing...".
    let word_len = state.current_word().chars().count();
    let items: Vec<ListItem> = state
        .players()
        .iter()
        .map(|p| {
            let is_local = Some(p.id) == state.local_id();
            let label = if is_local { format!("{} (you)", p.name) } else { p.name.clone() };
            let line = match p.time {
                Some(t) => format!("{:<14} {:.2}s", label, t),
                None => {
                    let bar: String = "█".repeat(p.progress)
                        + &"░".repeat(word_len.saturating_sub(p.progress));
                    format!("{:<14} [{}]", label, bar)
                }
            };
            let style = if is_local {
                Style::default().fg(Color::Cyan)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(line).style(style)
        })
        .collect();
    let progress_list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Race"));
    frame.render_widget(progress_list, layout[3]);

    // The shuffled keyboard.
    if let Some(layout_rows) = state.layout() {
        let mut lines: Vec<Line> = Vec::new();
        for (i, row) in layout_rows.rows().iter().enumerate() {
            let indent = " ".repeat(i * 2);
            let keys: String = row.iter().map(|c| format!("{} ", c)).collect();
            lines.push(Line::from(format!("{}{}", indent, keys)));
        }
        let keyboard = Paragraph::new(lines)
            .style(Style::default().fg(Color::White))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::TOP));
        frame.render_widget(keyboard, layout[4]);
    }

    let hint = if state.local_waiting() {
        "Finished! Waiting for the others..."
    } else {
        "Type the word — keys are shuffled!  Backspace undoes"
    };
    let footer = Paragraph::new(hint)
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(footer, layout[5]);
}

/// Render round results and the next-round prompt
fn render_results(frame: &mut Frame, state: &MatchState, is_host: bool) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),  // Header
            Constraint::Min(5),     // Ranking
            Constraint::Length(2),  // Score line
            Constraint::Length(2),  // Next round prompt
        ])
        .margin(1)
        .split(area);

    let header = Paragraph::new(format!("Round {} results", state.round_number()))
        .style(Style::default().fg(Color::Yellow).bold())
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, layout[0]);

    if !state.results_revealed() {
        let pending = Paragraph::new("Round over...")
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(pending, layout[1]);
        return;
    }

    let items: Vec<ListItem> = state
        .last_results()
        .iter()
        .enumerate()
        .map(|(i, r)| {
            let style = match i {
                0 => Style::default().fg(Color::Green).bold(),
                1 => Style::default().fg(Color::White),
                _ => Style::default().fg(Color::DarkGray),
            };
            ListItem::new(format!(
                "  {}. {:<14} {:.2}s  +{}",
                i + 1,
                r.name,
                r.time,
                r.points
            ))
            .style(style)
        })
        .collect();
    let ranking = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Times"));
    frame.render_widget(ranking, layout[1]);

    frame.render_widget(score_line(state), layout[2]);

    let prompt = if is_host {
        Paragraph::new("[ Press N for next round ]")
            .style(Style::default().fg(Color::Green).bold())
    } else {
        Paragraph::new("Waiting for host...")
            .style(Style::default().fg(Color::DarkGray))
    }
    .alignment(Alignment::Center);
    frame.render_widget(prompt, layout[3]);
}

/// Render the terminal game-over screen
fn render_game_over(frame: &mut Frame, state: &MatchState) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(1),
            Constraint::Length(2),
        ])
        .split(area);

    let winner = state
        .champion()
        .map(|p| format!("{} wins the match!", p.name))
        .unwrap_or_else(|| "Match over".to_string());
    let banner = Paragraph::new(winner)
        .style(Style::default().fg(Color::Yellow).bold())
        .alignment(Alignment::Center);
    frame.render_widget(banner, layout[1]);

    frame.render_widget(score_line(state), layout[2]);

    let footer = Paragraph::new("Esc Back to menu")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(footer, layout[4]);
}

/// Render an error screen
fn render_error(frame: &mut Frame, message: &str) {
    let area = frame.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Length(3), Constraint::Length(2), Constraint::Min(1)])
        .split(area);

    let widget = Paragraph::new(message)
        .style(Style::default().fg(Color::Red).bold())
        .alignment(Alignment::Center);
    frame.render_widget(widget, layout[1]);

    let footer = Paragraph::new("Enter / Esc Back to menu")
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
    frame.render_widget(footer, layout[2]);
}

/// The running score line, shown during play, results, and game over
fn score_line(state: &MatchState) -> Paragraph<'static> {
    let scores: Vec<String> = state
        .players()
        .iter()
        .map(|p| format!("{} {}", p.name, p.score))
        .collect();
    Paragraph::new(scores.join("  —  "))
        .style(Style::default().fg(Color::White).bold())
        .alignment(Alignment::Center)
}
