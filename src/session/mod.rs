//! Session coordination for hosted and joined rooms
//!
//! Handles:
//! - Hosting a room (TCP server + room code advertisement)
//! - Joining a room (resolve code, dial, join handshake)
//! - Admission, roster and ready-state management
//! - Relaying gameplay events between guests (at most one hop, never echoed
//!   back to the sender)
//! - Driving the shared match state machine from either role
//!
//! The host owns the authoritative room state; each guest owns a replica it
//! updates from host-originated messages plus its own optimistic typing.

use crate::game::match_state::{
    MatchState, Phase, PlayerId, DEFAULT_WIN_THRESHOLD,
};
use crate::game::words::word_for_round;
use crate::network::{
    Client, FoundRoom, Message, PlayerInfo, RoomDirectory, Server, ServerEvent,
};
use rand::prelude::*;
use std::collections::HashMap;
use std::net::SocketAddr;

/// Maximum players in a room (host + 2 guests)
pub const MAX_PLAYERS: usize = 3;

/// Minimum players to start a match
pub const MIN_PLAYERS: usize = 2;

/// Maximum display-name length
pub const MAX_NAME_LEN: usize = 12;

/// Room code alphabet; visually-ambiguous characters (0, O, 1, I) excluded.
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Room code length
pub const ROOM_CODE_LEN: usize = 6;

/// Ticks between the all-ready edge and the `game-start` broadcast.
const START_GRACE_TICKS: u8 = 1;

/// Generate a random room code.
pub fn generate_room_code() -> String {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ROOM_CODE_CHARS[rng.random_range(0..ROOM_CODE_CHARS.len())] as char)
        .collect()
}

/// Generate a fresh match seed.
pub fn generate_seed() -> u32 {
    rand::rng().random::<u32>()
}

/// Cap a user-supplied display name, defaulting when empty.
pub fn sanitize_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "Player".to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

/// Events surfaced to the application layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A player joined the room
    PlayerJoined(String),
    /// A player left the room
    PlayerLeft(String),
    /// The session is dead; tear down and show the message.
    ConnectionLost(String),
}

/// A hosted room: the authoritative side of the session.
pub struct HostSession {
    /// The room code guests dial
    room_code: String,
    /// TCP listener for guest links
    server: Server,
    /// mDNS advertisement of the room code (absent in tests)
    directory: Option<RoomDirectory>,
    /// Authoritative match state
    state: MatchState,
    /// Admitted links; value is the player id once `join-request` arrives
    links: HashMap<SocketAddr, Option<PlayerId>>,
    /// Next player id to allocate
    next_player_id: PlayerId,
    /// The all-ready condition is edge-triggered; once the match has been
    /// launched, later ready churn must not relaunch it.
    start_latched: bool,
    /// Grace countdown between the all-ready edge and launch
    pending_start: Option<u8>,
}

impl HostSession {
    /// Create a room: generate a code, open the listener, advertise the code
    /// as the dial address, and seat the host as player 1.
    pub fn open(host_name: &str) -> Result<Self, String> {
        let room_code = generate_room_code();
        let server =
            Server::start().map_err(|e| format!("Failed to open listener: {}", e))?;

        let mut directory = RoomDirectory::new()?;
        directory
            .advertise(&room_code, &sanitize_name(host_name), server.port())
            .map_err(|_| "Room code already in use. Please try again.".to_string())?;

        Ok(Self::with_parts(
            room_code,
            server,
            Some(directory),
            host_name,
        ))
    }

    fn with_parts(
        room_code: String,
        server: Server,
        directory: Option<RoomDirectory>,
        host_name: &str,
    ) -> Self {
        let mut state = MatchState::new(DEFAULT_WIN_THRESHOLD);
        state.add_player(1, sanitize_name(host_name));
        state.set_local_id(1);

        Self {
            room_code,
            server,
            directory,
            state,
            links: HashMap::new(),
            next_player_id: 2,
            start_latched: false,
            pending_start: None,
        }
    }

    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    pub fn port(&self) -> u16 {
        self.server.port()
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Poll the listener and apply every pending network event.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        for server_event in self.server.poll() {
            match server_event {
                ServerEvent::LinkOpened { addr } => {
                    if self.links.len() >= MAX_PLAYERS - 1 {
                        // Rejection needs an open link: send, then close.
                        log::debug!("rejecting {}: room full", addr);
                        let _ = self.server.send_to(addr, &Message::RoomFull);
                        self.server.disconnect(addr);
                    } else {
                        self.links.insert(addr, None);
                    }
                }
                ServerEvent::LinkClosed { addr } => {
                    if let Some(Some(id)) = self.links.remove(&addr) {
                        let name = self
                            .state
                            .player(id)
                            .map(|p| p.name.clone())
                            .unwrap_or_default();
                        self.state.remove_player(id);
                        self.broadcast_roster();
                        events.push(SessionEvent::PlayerLeft(name));
                    }
                }
                ServerEvent::MessageReceived { from, message } => {
                    self.handle_message(from, message, &mut events);
                }
            }
        }

        events
    }

    fn handle_message(
        &mut self,
        from: SocketAddr,
        message: Message,
        events: &mut Vec<SessionEvent>,
    ) {
        match message {
            Message::JoinRequest { name } => {
                if !self.links.contains_key(&from) {
                    return;
                }
                if self.state.phase != Phase::Lobby {
                    // The room only admits players in the lobby phase.
                    log::debug!("rejecting {}: match already started", from);
                    let _ = self.server.send_to(from, &Message::RoomFull);
                    self.server.disconnect(from);
                    self.links.remove(&from);
                    return;
                }

                let id = self.next_player_id;
                self.next_player_id += 1;
                let name = sanitize_name(&name);
                self.state.add_player(id, name.clone());
                self.links.insert(from, Some(id));

                // The joiner gets the roster inside the acceptance; everyone
                // else gets a fresh snapshot.
                let _ = self.server.send_to(
                    from,
                    &Message::JoinAccepted {
                        player_id: id,
                        room_code: self.room_code.clone(),
                        players: self.roster(),
                    },
                );
                self.server.broadcast_except(
                    from,
                    &Message::PlayerList { players: self.roster() },
                );
                events.push(SessionEvent::PlayerJoined(name));
            }
            Message::ReadyToggle { player_id, ready } => {
                if self.links.get(&from) != Some(&Some(player_id)) {
                    log::warn!("ready-toggle for foreign player id {} from {}", player_id, from);
                    return;
                }
                self.state.set_ready(player_id, ready);
                self.broadcast_roster();
                self.evaluate_start();
            }
            Message::Progress { player_id, progress } => {
                if self.links.get(&from) != Some(&Some(player_id)) {
                    log::warn!("progress for foreign player id {} from {}", player_id, from);
                    return;
                }
                // Relay to every other guest, then apply locally through the
                // same transition the guests run.
                self.server
                    .broadcast_except(from, &Message::Progress { player_id, progress });
                self.state.apply_progress(player_id, progress as usize);
            }
            Message::Complete { player_id, time } => {
                if self.links.get(&from) != Some(&Some(player_id)) {
                    log::warn!("complete for foreign player id {} from {}", player_id, from);
                    return;
                }
                self.server
                    .broadcast_except(from, &Message::Complete { player_id, time });
                self.state.apply_complete(player_id, time);
            }
            // Host-originated message types arriving at the host are protocol
            // violations; ignore them.
            Message::JoinAccepted { .. }
            | Message::RoomFull
            | Message::PlayerList { .. }
            | Message::GameStart { .. }
            | Message::StartRound { .. } => {
                log::warn!("ignoring host-bound message from {}", from);
            }
        }
    }

    /// Toggle the host's own ready flag.
    pub fn toggle_ready(&mut self) {
        let ready = self.state.local().map(|p| !p.ready).unwrap_or(true);
        self.state.set_ready(1, ready);
        self.broadcast_roster();
        self.evaluate_start();
    }

    fn evaluate_start(&mut self) {
        if self.start_latched
            || self.state.phase != Phase::Lobby
            || !self.state.all_ready(MIN_PLAYERS)
        {
            return;
        }
        self.start_latched = true;
        self.pending_start = Some(START_GRACE_TICKS);
    }

    /// Advance 1-second timers: launch grace, countdown, results reveal.
    pub fn tick(&mut self) {
        // State timers first, so a launch in this tick shows its full
        // countdown starting next tick.
        self.state.tick();
        match self.pending_start {
            Some(0) => {
                self.pending_start = None;
                self.launch_match();
            }
            Some(n) => self.pending_start = Some(n - 1),
            None => {}
        }
    }

    fn launch_match(&mut self) {
        let seed = generate_seed();
        self.state.start_match(seed);
        self.server.broadcast(&Message::GameStart {
            seed,
            players: self.roster(),
        });
        self.begin_round(1);
    }

    /// Start the next round. Only meaningful once results are on screen and
    /// nobody has won; guests have no equivalent control.
    pub fn start_next_round(&mut self) {
        if !self.state.results_revealed() || self.state.champion().is_some() {
            return;
        }
        self.begin_round(self.state.round_number() + 1);
    }

    fn begin_round(&mut self, round_number: u32) {
        let word = word_for_round(self.state.seed(), round_number);
        self.server.broadcast(&Message::StartRound {
            round_number,
            word: word.clone(),
        });
        self.state.begin_round(round_number, word);
    }

    /// Feed a displayed letter typed by the host.
    pub fn on_key(&mut self, letter: char) {
        use crate::game::match_state::KeyOutcome;
        match self.state.on_key(letter) {
            KeyOutcome::Progress(progress) => {
                self.server.broadcast(&Message::Progress {
                    player_id: 1,
                    progress: progress as u32,
                });
            }
            KeyOutcome::Completed(time) => {
                self.server.broadcast(&Message::Complete { player_id: 1, time });
            }
            KeyOutcome::Rejected | KeyOutcome::Ignored => {}
        }
    }

    /// Host backspace.
    pub fn on_backspace(&mut self) {
        if let Some(progress) = self.state.on_backspace() {
            self.server.broadcast(&Message::Progress {
                player_id: 1,
                progress: progress as u32,
            });
        }
    }

    fn roster(&self) -> Vec<PlayerInfo> {
        self.state
            .players()
            .iter()
            .map(|p| PlayerInfo {
                id: p.id,
                name: p.name.clone(),
                ready: p.ready,
                score: p.score,
            })
            .collect()
    }

    fn broadcast_roster(&self) {
        self.server
            .broadcast(&Message::PlayerList { players: self.roster() });
    }

    /// Tear the room down: stop advertising, close every link.
    pub fn shutdown(mut self) {
        if let Some(mut directory) = self.directory.take() {
            let _ = directory.stop_advertising();
            let _ = directory.shutdown();
        }
        self.server.stop();
    }
}

/// A joined room: the replica side of the session.
pub struct GuestSession {
    /// Link to the host
    client: Client,
    /// Replica match state
    state: MatchState,
    /// The code we dialed
    room_code: String,
    /// Set once `join-accepted` arrives
    joined: bool,
}

impl GuestSession {
    /// Dial a resolved room and send the join request.
    pub fn join(room: &FoundRoom, name: &str) -> Result<Self, String> {
        // Try addresses in order; IPv4 sorts first.
        let mut last_err = "No address available for room".to_string();
        for addr in &room.addresses {
            let socket_addr = SocketAddr::new(*addr, room.port);
            match Self::join_addr(socket_addr, &room.room_code, name) {
                Ok(session) => return Ok(session),
                Err(e) => last_err = e,
            }
        }
        Err(format!("Failed to connect. Check the room code. ({})", last_err))
    }

    /// Dial a known socket address directly.
    pub fn join_addr(addr: SocketAddr, room_code: &str, name: &str) -> Result<Self, String> {
        let client = Client::connect_addr(addr)
            .map_err(|e| format!("Failed to connect: {}", e))?;

        client
            .send(Message::JoinRequest {
                name: sanitize_name(name),
            })
            .map_err(|e| format!("Failed to join: {}", e))?;

        Ok(Self {
            client,
            state: MatchState::new(DEFAULT_WIN_THRESHOLD),
            room_code: room_code.to_uppercase(),
            joined: false,
        })
    }

    pub fn room_code(&self) -> &str {
        &self.room_code
    }

    pub fn state(&self) -> &MatchState {
        &self.state
    }

    /// Whether the host has accepted the join yet.
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Poll the host link and apply every pending message to the replica.
    pub fn poll(&mut self) -> Vec<SessionEvent> {
        let mut events = Vec::new();

        for msg in self.client.poll() {
            match msg {
                Message::JoinAccepted { player_id, room_code, players } => {
                    self.joined = true;
                    self.room_code = room_code;
                    self.state.set_local_id(player_id);
                    self.sync_roster(&players, &mut events);
                }
                Message::RoomFull => {
                    events.push(SessionEvent::ConnectionLost(
                        "Room is full.".to_string(),
                    ));
                }
                Message::PlayerList { players } => {
                    self.sync_roster(&players, &mut events);
                }
                Message::GameStart { seed, players } => {
                    self.sync_roster(&players, &mut events);
                    self.state.start_match(seed);
                }
                Message::StartRound { round_number, word } => {
                    let derived = self.state.derived_word(round_number);
                    if derived != word {
                        // The wire word wins; this only means our generator
                        // disagrees with the host's.
                        log::warn!(
                            "word generator drift in round {}: derived {} but host sent {}",
                            round_number,
                            derived,
                            word
                        );
                    }
                    self.state.begin_round(round_number, word);
                }
                Message::Progress { player_id, progress } => {
                    // Our own events are applied optimistically at the
                    // keystroke; the host never echoes them back anyway.
                    if Some(player_id) != self.state.local_id() {
                        self.state.apply_progress(player_id, progress as usize);
                    }
                }
                Message::Complete { player_id, time } => {
                    if Some(player_id) != self.state.local_id() {
                        self.state.apply_complete(player_id, time);
                    }
                }
                Message::JoinRequest { .. } | Message::ReadyToggle { .. } => {
                    log::warn!("ignoring guest-bound message from host");
                }
            }
        }

        // Checked after the drain so a final message (such as `room-full`)
        // is still delivered before the loss is reported.
        if !self.client.is_connected() {
            events.push(SessionEvent::ConnectionLost(
                "Connection to host lost.".to_string(),
            ));
        }

        events
    }

    fn sync_roster(&mut self, players: &[PlayerInfo], events: &mut Vec<SessionEvent>) {
        let before: Vec<(PlayerId, String)> = self
            .state
            .players()
            .iter()
            .map(|p| (p.id, p.name.clone()))
            .collect();

        let roster: Vec<(PlayerId, String, bool, u32)> = players
            .iter()
            .map(|p| (p.id, p.name.clone(), p.ready, p.score))
            .collect();
        self.state.sync_roster(&roster);

        for (id, name) in &before {
            if !players.iter().any(|p| p.id == *id) {
                events.push(SessionEvent::PlayerLeft(name.clone()));
            }
        }
        for p in players {
            if !before.iter().any(|(id, _)| *id == p.id) && Some(p.id) != self.state.local_id() {
                events.push(SessionEvent::PlayerJoined(p.name.clone()));
            }
        }
    }

    /// Advance 1-second timers (countdown, results reveal).
    pub fn tick(&mut self) {
        self.state.tick();
    }

    /// Toggle our ready flag: optimistic local update, then tell the host.
    pub fn toggle_ready(&mut self) {
        let Some(local) = self.state.local() else { return };
        let (id, ready) = (local.id, !local.ready);
        self.state.set_ready(id, ready);
        let _ = self.client.send(Message::ReadyToggle { player_id: id, ready });
    }

    /// Feed a displayed letter typed by this guest. Applied locally first,
    /// then reported upward; guests never talk to each other directly.
    pub fn on_key(&mut self, letter: char) {
        use crate::game::match_state::KeyOutcome;
        let Some(id) = self.state.local_id() else { return };
        match self.state.on_key(letter) {
            KeyOutcome::Progress(progress) => {
                let _ = self.client.send(Message::Progress {
                    player_id: id,
                    progress: progress as u32,
                });
            }
            KeyOutcome::Completed(time) => {
                let _ = self.client.send(Message::Complete { player_id: id, time });
            }
            KeyOutcome::Rejected | KeyOutcome::Ignored => {}
        }
    }

    /// Guest backspace.
    pub fn on_backspace(&mut self) {
        let Some(id) = self.state.local_id() else { return };
        if let Some(progress) = self.state.on_backspace() {
            let _ = self.client.send(Message::Progress {
                player_id: id,
                progress: progress as u32,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::match_state::COUNTDOWN_SECONDS;
    use crate::network::server::Server;
    use std::thread;
    use std::time::Duration;

    fn test_host(name: &str) -> HostSession {
        // Bind an ephemeral port and skip mDNS; tests dial the port directly.
        let server = Server::start_on_port(0).expect("bind test listener");
        HostSession::with_parts("TESTRM".to_string(), server, None, name)
    }

    fn settle(host: &mut HostSession) -> Vec<SessionEvent> {
        thread::sleep(Duration::from_millis(200));
        host.poll()
    }

    fn join_guest(host: &mut HostSession, name: &str) -> GuestSession {
        let addr: SocketAddr = format!("127.0.0.1:{}", host.port()).parse().unwrap();
        let mut guest = GuestSession::join_addr(addr, "TESTRM", name).unwrap();
        settle(host);
        // Give the acceptance time to travel back.
        thread::sleep(Duration::from_millis(150));
        guest.poll();
        assert!(guest.is_joined(), "guest {} not admitted", name);
        guest
    }

    #[test]
    fn test_room_code_format() {
        for _ in 0..50 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LEN);
            for c in code.bytes() {
                assert!(ROOM_CODE_CHARS.contains(&c), "bad char {}", c as char);
                assert!(!b"0O1I".contains(&c));
            }
        }
    }

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("  "), "Player");
        assert_eq!(sanitize_name("Bob"), "Bob");
        assert_eq!(sanitize_name("AVeryLongPlayerName"), "AVeryLongPla");
    }

    #[test]
    fn test_host_seats_itself_first() {
        let host = test_host("Alice");
        assert_eq!(host.state().players().len(), 1);
        assert_eq!(host.state().players()[0].id, 1);
        assert_eq!(host.state().players()[0].name, "Alice");
        assert_eq!(host.state().local_id(), Some(1));
    }

    #[test]
    fn test_join_handshake_allocates_id_and_roster() {
        let mut host = test_host("Alice");
        let guest = join_guest(&mut host, "Bob");

        assert_eq!(guest.state().local_id(), Some(2));
        assert_eq!(guest.room_code(), "TESTRM");
        let names: Vec<&str> = guest.state().players().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Alice", "Bob"]);
    }

    #[test]
    fn test_second_join_broadcasts_roster_to_first() {
        let mut host = test_host("Alice");
        let mut bob = join_guest(&mut host, "Bob");
        let cara = join_guest(&mut host, "Cara");

        bob.poll();
        assert_eq!(bob.state().players().len(), 3);
        assert_eq!(cara.state().players().len(), 3);
    }

    #[test]
    fn test_third_guest_rejected_room_full() {
        let mut host = test_host("Alice");
        let _bob = join_guest(&mut host, "Bob");
        let _cara = join_guest(&mut host, "Cara");

        let addr: SocketAddr = format!("127.0.0.1:{}", host.port()).parse().unwrap();
        let mut late = GuestSession::join_addr(addr, "TESTRM", "Dave").unwrap();
        settle(&mut host);
        thread::sleep(Duration::from_millis(200));

        let events = late.poll();
        assert!(
            events.iter().any(|e| matches!(e, SessionEvent::ConnectionLost(msg) if msg.contains("full"))),
            "expected room-full, got {:?}",
            events
        );
        // The rejected link never made it into the roster.
        assert_eq!(host.state().players().len(), 3);
    }

    #[test]
    fn test_ready_gate_launches_match_once() {
        let mut host = test_host("Alice");
        let mut bob = join_guest(&mut host, "Bob");

        bob.toggle_ready();
        settle(&mut host);
        assert_eq!(host.state().phase, Phase::Lobby);

        host.toggle_ready();
        // Grace tick, then launch.
        host.tick();
        host.tick();
        assert!(matches!(host.state().phase, Phase::Countdown(_)));

        thread::sleep(Duration::from_millis(200));
        bob.poll();
        assert!(matches!(bob.state().phase, Phase::Countdown(_)));
        assert_eq!(bob.state().seed(), host.state().seed());
        assert_eq!(bob.state().current_word(), host.state().current_word());

        // Edge-trigger: ready churn after launch must not restart the match.
        let word_before = host.state().current_word().to_string();
        bob.toggle_ready();
        bob.toggle_ready();
        settle(&mut host);
        for _ in 0..3 {
            host.tick();
        }
        assert_eq!(host.state().round_number(), 1);
        assert_eq!(host.state().current_word(), word_before);
    }

    #[test]
    fn test_peers_derive_identical_layout() {
        let mut host = test_host("Alice");
        let mut bob = join_guest(&mut host, "Bob");

        bob.toggle_ready();
        settle(&mut host);
        host.toggle_ready();
        host.tick();
        host.tick();
        thread::sleep(Duration::from_millis(200));
        bob.poll();

        let host_rows = host.state().layout().unwrap().rows().clone();
        let bob_rows = bob.state().layout().unwrap().rows().clone();
        assert_eq!(host_rows, bob_rows);
    }

    #[test]
    fn test_progress_relayed_to_others_not_sender() {
        let mut host = test_host("Alice");
        let mut bob = join_guest(&mut host, "Bob");
        let mut cara = join_guest(&mut host, "Cara");
        bob.poll();

        // Everyone up; start the round and play it out to Playing.
        bob.toggle_ready();
        cara.toggle_ready();
        settle(&mut host);
        host.toggle_ready();
        for _ in 0..2 + u32::from(COUNTDOWN_SECONDS) + 2 {
            host.tick();
        }
        assert_eq!(host.state().phase, Phase::Playing);

        thread::sleep(Duration::from_millis(200));
        bob.poll();
        cara.poll();
        for _ in 0..=COUNTDOWN_SECONDS {
            bob.tick();
            cara.tick();
        }

        // Bob types his first letter and reports progress 1.
        let first = bob.state().current_word().chars().next().unwrap();
        bob.on_key(first);
        assert_eq!(bob.state().local().unwrap().progress, 1);

        settle(&mut host);
        thread::sleep(Duration::from_millis(200));

        // Host applied it, Cara received the relay.
        assert_eq!(host.state().player(2).unwrap().progress, 1);
        cara.poll();
        assert_eq!(cara.state().player(2).unwrap().progress, 1);
        // Nothing came back to Bob: his replica still shows his own
        // optimistic value, and no relayed copy arrived for his id.
        let before = bob.state().local().unwrap().progress;
        bob.poll();
        assert_eq!(bob.state().local().unwrap().progress, before);
    }

    #[test]
    fn test_guest_disconnect_prunes_roster() {
        let mut host = test_host("Alice");
        let mut bob = join_guest(&mut host, "Bob");
        let cara = join_guest(&mut host, "Cara");
        bob.poll();
        assert_eq!(host.state().players().len(), 3);

        drop(cara);
        thread::sleep(Duration::from_millis(400));
        let events = host.poll();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::PlayerLeft(name) if name == "Cara")));
        assert_eq!(host.state().players().len(), 2);

        thread::sleep(Duration::from_millis(200));
        let events = bob.poll();
        assert_eq!(bob.state().players().len(), 2);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::PlayerLeft(name) if name == "Cara")));
    }

    #[test]
    fn test_guest_sees_host_disconnect() {
        let mut host = test_host("Alice");
        let mut bob = join_guest(&mut host, "Bob");

        host.shutdown();
        thread::sleep(Duration::from_millis(400));

        let events = bob.poll();
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::ConnectionLost(_))));
    }

    #[test]
    fn test_round_resolves_across_peers() {
        let mut host = test_host("Alice");
        let mut bob = join_guest(&mut host, "Bob");

        bob.toggle_ready();
        settle(&mut host);
        host.toggle_ready();
        for _ in 0..2 + u32::from(COUNTDOWN_SECONDS) + 2 {
            host.tick();
        }
        assert_eq!(host.state().phase, Phase::Playing);

        // Host types the whole word the instant its round clock starts, so
        // its reported time is near zero.
        let word = host.state().current_word().to_string();
        for c in word.chars() {
            host.on_key(c);
        }
        assert!(host.state().local_waiting());

        thread::sleep(Duration::from_millis(200));
        bob.poll();
        for _ in 0..=COUNTDOWN_SECONDS {
            bob.tick();
        }
        assert_eq!(bob.state().phase, Phase::Playing);

        // Bob dawdles long enough that his time cannot undercut the host's
        // even with scheduling jitter.
        thread::sleep(Duration::from_millis(300));
        for c in word.chars() {
            bob.on_key(c);
        }
        settle(&mut host);

        assert!(matches!(host.state().phase, Phase::Results { .. }));
        thread::sleep(Duration::from_millis(200));
        bob.poll();
        assert!(matches!(bob.state().phase, Phase::Results { .. }));

        // Host finished first and takes the round point on both replicas.
        assert_eq!(host.state().player(1).unwrap().score, 1);
        assert_eq!(bob.state().player(1).unwrap().score, 1);
        assert_eq!(bob.state().player(2).unwrap().score, 0);
    }
}
