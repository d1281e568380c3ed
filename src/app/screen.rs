//! Application screen state management
//!
//! Handles transitions between different application screens:
//! - Main menu
//! - Room code entry
//! - Connecting (resolving a room code)
//! - In a room, as host or guest (lobby through game over)
//! - Connection error

use crate::game::match_state::{MatchState, Phase};
use crate::network::RoomFinder;
use crate::session::{GuestSession, HostSession, SessionEvent};
use std::time::{Duration, Instant};

/// How long a typed room code is searched for before giving up.
const FIND_ROOM_TIMEOUT: Duration = Duration::from_secs(10);

/// Menu option on the main screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuOption {
    CreateRoom,
    JoinRoom,
    Quit,
}

impl MenuOption {
    /// Get all menu options in order
    pub fn all() -> &'static [MenuOption] {
        &[MenuOption::CreateRoom, MenuOption::JoinRoom, MenuOption::Quit]
    }

    /// Get the display label for this option
    pub fn label(&self) -> &'static str {
        match self {
            MenuOption::CreateRoom => "Create Room",
            MenuOption::JoinRoom => "Join Room",
            MenuOption::Quit => "Quit",
        }
    }
}

/// The current application screen
pub enum Screen {
    /// Main menu
    Menu {
        selected: usize,
        handle_input: String,
        editing_handle: bool,
    },
    /// Typing a room code to join
    CodeEntry { code_input: String },
    /// Resolving the room code on the network
    Connecting {
        finder: RoomFinder,
        code: String,
        deadline: Instant,
    },
    /// Hosting a room
    Hosting { session: HostSession },
    /// Joined a room as a guest
    Joined { session: GuestSession },
    /// Connection error
    Error { message: String },
}

/// Main application coordinator
pub struct AppCoordinator {
    /// Current screen
    pub screen: Screen,
    /// Local display name
    pub handle: String,
    /// Transient status line (joins, departures)
    pub status: String,
    /// Whether the application should quit
    pub should_quit: bool,
}

impl Default for AppCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl AppCoordinator {
    /// Create a new app coordinator starting at the menu
    pub fn new() -> Self {
        // Try to get a default handle from the environment
        let default_handle = std::env::var("USER")
            .unwrap_or_else(|_| "Player".to_string())
            .chars()
            .take(crate::session::MAX_NAME_LEN)
            .collect::<String>();

        Self {
            screen: Screen::Menu {
                selected: 0,
                handle_input: default_handle.clone(),
                editing_handle: false,
            },
            handle: default_handle,
            status: String::new(),
            should_quit: false,
        }
    }

    /// The active match state, when in a room.
    pub fn match_state(&self) -> Option<&MatchState> {
        match &self.screen {
            Screen::Hosting { session } => Some(session.state()),
            Screen::Joined { session } => Some(session.state()),
            _ => None,
        }
    }

    /// Poll network-backed screens. Called every loop iteration.
    pub fn poll(&mut self) {
        match &mut self.screen {
            Screen::Connecting { finder, deadline, .. } => {
                if let Some(room) = finder.poll() {
                    match GuestSession::join(&room, &self.handle) {
                        Ok(session) => {
                            self.status.clear();
                            self.screen = Screen::Joined { session };
                        }
                        Err(message) => self.screen = Screen::Error { message },
                    }
                } else if Instant::now() >= *deadline {
                    self.screen = Screen::Error {
                        message: "Room not found. Check the code and try again.".to_string(),
                    };
                }
            }
            Screen::Hosting { session } => {
                for event in session.poll() {
                    match event {
                        SessionEvent::PlayerJoined(name) => {
                            self.status = format!("{} joined", name);
                        }
                        SessionEvent::PlayerLeft(name) => {
                            self.status = format!("{} left", name);
                        }
                        SessionEvent::ConnectionLost(_) => {}
                    }
                }
            }
            Screen::Joined { session } => {
                let mut lost = None;
                for event in session.poll() {
                    match event {
                        SessionEvent::PlayerJoined(name) => {
                            self.status = format!("{} joined", name);
                        }
                        SessionEvent::PlayerLeft(name) => {
                            self.status = format!("{} left", name);
                        }
                        SessionEvent::ConnectionLost(message) => lost = Some(message),
                    }
                }
                if let Some(message) = lost {
                    self.screen = Screen::Error { message };
                }
            }
            _ => {}
        }
    }

    /// Advance 1-second timers in the active session.
    pub fn tick(&mut self) {
        match &mut self.screen {
            Screen::Hosting { session } => session.tick(),
            Screen::Joined { session } => session.tick(),
            _ => {}
        }
    }

    /// Handle a typed character.
    pub fn on_char(&mut self, c: char) {
        match &mut self.screen {
            Screen::Menu { handle_input, editing_handle, .. } => {
                if *editing_handle
                    && handle_input.chars().count() < crate::session::MAX_NAME_LEN
                    && !c.is_control()
                {
                    handle_input.push(c);
                }
            }
            Screen::CodeEntry { code_input } => {
                let c = c.to_ascii_uppercase();
                if code_input.len() < crate::session::ROOM_CODE_LEN
                    && c.is_ascii_alphanumeric()
                {
                    code_input.push(c);
                }
            }
            Screen::Hosting { session } => {
                let phase = session.state().phase.clone();
                match phase {
                    Phase::Lobby => {
                        if c.eq_ignore_ascii_case(&'r') {
                            session.toggle_ready();
                        }
                    }
                    Phase::Playing => {
                        // Physical key -> the letter displayed at that
                        // position on the shuffled keyboard.
                        let letter = session
                            .state()
                            .layout()
                            .and_then(|layout| layout.displayed_for(c));
                        if let Some(letter) = letter {
                            session.on_key(letter);
                        }
                    }
                    Phase::Results { .. } => {
                        if c.eq_ignore_ascii_case(&'n') {
                            session.start_next_round();
                        }
                    }
                    _ => {}
                }
            }
            Screen::Joined { session } => {
                let phase = session.state().phase.clone();
                match phase {
                    Phase::Lobby => {
                        if c.eq_ignore_ascii_case(&'r') {
                            session.toggle_ready();
                        }
                    }
                    Phase::Playing => {
                        let letter = session
                            .state()
                            .layout()
                            .and_then(|layout| layout.displayed_for(c));
                        if let Some(letter) = letter {
                            session.on_key(letter);
                        }
                    }
                    // Advancing the round is the host's call; the results
                    // screen shows "waiting for host".
                    _ => {}
                }
            }
            _ => {}
        }
    }

    /// Handle Enter.
    pub fn on_enter(&mut self) {
        match &mut self.screen {
            Screen::Menu { selected, handle_input, editing_handle } => {
                if *editing_handle {
                    self.handle = crate::session::sanitize_name(handle_input);
                    *handle_input = self.handle.clone();
                    *editing_handle = false;
                    return;
                }
                match MenuOption::all()[*selected] {
                    MenuOption::CreateRoom => match HostSession::open(&self.handle) {
                        Ok(session) => {
                            self.status.clear();
                            self.screen = Screen::Hosting { session };
                        }
                        Err(message) => self.screen = Screen::Error { message },
                    },
                    MenuOption::JoinRoom => {
                        self.screen = Screen::CodeEntry { code_input: String::new() };
                    }
                    MenuOption::Quit => self.should_quit = true,
                }
            }
            Screen::CodeEntry { code_input } => {
                if code_input.len() == crate::session::ROOM_CODE_LEN {
                    let code = code_input.clone();
                    match RoomFinder::start(&code) {
                        Ok(finder) => {
                            self.screen = Screen::Connecting {
                                finder,
                                code,
                                deadline: Instant::now() + FIND_ROOM_TIMEOUT,
                            };
                        }
                        Err(message) => self.screen = Screen::Error { message },
                    }
                }
            }
            Screen::Hosting { session } => {
                if matches!(session.state().phase, Phase::Results { .. }) {
                    session.start_next_round();
                }
            }
            Screen::Error { .. } => self.to_menu(),
            _ => {}
        }
    }

    /// Handle Backspace.
    pub fn on_backspace(&mut self) {
        match &mut self.screen {
            Screen::Menu { handle_input, editing_handle, .. } => {
                if *editing_handle {
                    handle_input.pop();
                }
            }
            Screen::CodeEntry { code_input } => {
                code_input.pop();
            }
            Screen::Hosting { session } => {
                if session.state().phase == Phase::Playing {
                    session.on_backspace();
                }
            }
            Screen::Joined { session } => {
                if session.state().phase == Phase::Playing {
                    session.on_backspace();
                }
            }
            _ => {}
        }
    }

    /// Handle Tab (toggles handle editing on the menu).
    pub fn on_tab(&mut self) {
        if let Screen::Menu { handle_input, editing_handle, .. } = &mut self.screen {
            if *editing_handle {
                self.handle = crate::session::sanitize_name(handle_input);
                *handle_input = self.handle.clone();
            }
            *editing_handle = !*editing_handle;
        }
    }

    /// Handle Up/Down menu navigation.
    pub fn on_nav(&mut self, down: bool) {
        if let Screen::Menu { selected, editing_handle, .. } = &mut self.screen {
            if *editing_handle {
                return;
            }
            let count = MenuOption::all().len();
            *selected = if down {
                (*selected + 1) % count
            } else {
                (*selected + count - 1) % count
            };
        }
    }

    /// Handle Escape: back out of the current screen, tearing down any
    /// session resources.
    pub fn on_escape(&mut self) {
        match &self.screen {
            Screen::Menu { .. } => self.should_quit = true,
            _ => self.to_menu(),
        }
    }

    /// Return to the menu, releasing whatever the current screen holds.
    fn to_menu(&mut self) {
        let old = std::mem::replace(
            &mut self.screen,
            Screen::Menu {
                selected: 0,
                handle_input: self.handle.clone(),
                editing_handle: false,
            },
        );
        match old {
            Screen::Hosting { session } => session.shutdown(),
            Screen::Connecting { finder, .. } => {
                let _ = finder.stop();
            }
            _ => {}
        }
        self.status.clear();
    }
}
