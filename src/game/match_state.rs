//! Match state machine
//!
//! One shared transition module driven by both roles. The host applies events
//! it authors or receives, guests apply events relayed by the host; both run
//! exactly this code, so replicas cannot drift through duplicated logic.
//!
//! Events from different players commute (applying A's progress then B's, or
//! B's then A's, yields the same state). Events from the same player rely on
//! per-link ordering, which the transport guarantees.

use super::layout::ShuffledLayout;
use super::words::word_for_round;
use std::time::Instant;

/// First player to reach this many round points wins the match.
pub const DEFAULT_WIN_THRESHOLD: u32 = 5;

/// Countdown displayed before each round: 3, 2, 1, GO.
pub const COUNTDOWN_SECONDS: u8 = 3;

/// Ticks between the last completion and the results reveal.
const RESULTS_REVEAL_TICKS: u8 = 1;

/// Opaque player token, allocated by the host, unique within a room.
pub type PlayerId = u32;

/// One player's slot in the room.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSlot {
    pub id: PlayerId,
    pub name: String,
    pub ready: bool,
    /// Cumulative round points this match.
    pub score: u32,
    /// Elapsed seconds for the current round, once finished.
    pub time: Option<f64>,
    /// Correctly-typed prefix length for the current round.
    pub progress: usize,
}

impl PlayerSlot {
    fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            ready: false,
            score: 0,
            time: None,
            progress: 0,
        }
    }
}

/// Current phase of the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// In-room membership and readiness negotiation.
    Lobby,
    /// Pre-round countdown; the value counts 3, 2, 1 and 0 displays GO.
    Countdown(u8),
    /// Keyboard accepts input.
    Playing,
    /// Round over; results are revealed once `reveal_in` reaches zero.
    Results { reveal_in: u8 },
    /// Terminal. Only exit is process restart.
    GameOver,
}

/// One player's line in the round ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundResult {
    pub id: PlayerId,
    pub name: String,
    pub time: f64,
    pub points: u32,
}

/// Outcome of feeding one displayed letter to the local player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyOutcome {
    /// Letter matched; report the new prefix length.
    Progress(usize),
    /// Word finished; report the elapsed seconds.
    Completed(f64),
    /// Letter did not match the next expected character; no state change.
    Rejected,
    /// Input not accepted in the current phase.
    Ignored,
}

/// Replicated match state for one room.
///
/// The host owns the authoritative copy; each guest owns a replica mutated
/// only by host-originated messages plus its own optimistic local typing.
pub struct MatchState {
    pub phase: Phase,
    seed: u32,
    round_number: u32,
    current_word: String,
    layout: Option<ShuffledLayout>,
    players: Vec<PlayerSlot>,
    local_id: Option<PlayerId>,
    typed: String,
    round_started_at: Option<Instant>,
    /// Ranking of the most recently finished round.
    last_results: Vec<RoundResult>,
    /// Last rejected keystroke, for transient feedback. Cleared on accept.
    pub last_miss: Option<char>,
    win_threshold: u32,
}

impl MatchState {
    pub fn new(win_threshold: u32) -> Self {
        Self {
            phase: Phase::Lobby,
            seed: 0,
            round_number: 0,
            current_word: String::new(),
            layout: None,
            players: Vec::new(),
            local_id: None,
            typed: String::new(),
            round_started_at: None,
            last_results: Vec::new(),
            last_miss: None,
            win_threshold,
        }
    }

    // --- roster ---

    /// Add a player to the roster. Ignored if the id is already present.
    pub fn add_player(&mut self, id: PlayerId, name: String) {
        if self.player(id).is_none() {
            self.players.push(PlayerSlot::new(id, name));
        }
    }

    /// Remove a player (disconnect). Round end no longer waits on them.
    pub fn remove_player(&mut self, id: PlayerId) {
        self.players.retain(|p| p.id != id);
        self.maybe_finish_round();
    }

    /// Replace the roster from a host snapshot, keeping the current round's
    /// progress and time for players that remain.
    pub fn sync_roster(&mut self, roster: &[(PlayerId, String, bool, u32)]) {
        let old = std::mem::take(&mut self.players);
        for (id, name, ready, score) in roster {
            let mut slot = PlayerSlot::new(*id, name.clone());
            slot.ready = *ready;
            slot.score = *score;
            if let Some(prev) = old.iter().find(|p| p.id == *id) {
                slot.time = prev.time;
                slot.progress = prev.progress;
            }
            self.players.push(slot);
        }
        self.maybe_finish_round();
    }

    pub fn set_ready(&mut self, id: PlayerId, ready: bool) {
        if let Some(p) = self.player_mut(id) {
            p.ready = ready;
        }
    }

    /// All players ready with enough of them to race.
    pub fn all_ready(&self, min_players: usize) -> bool {
        self.players.len() >= min_players && self.players.iter().all(|p| p.ready)
    }

    pub fn set_local_id(&mut self, id: PlayerId) {
        self.local_id = Some(id);
    }

    pub fn local_id(&self) -> Option<PlayerId> {
        self.local_id
    }

    pub fn players(&self) -> &[PlayerSlot] {
        &self.players
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerSlot> {
        self.players.iter().find(|p| p.id == id)
    }

    fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerSlot> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn local(&self) -> Option<&PlayerSlot> {
        self.local_id.and_then(|id| self.player(id))
    }

    // --- match / round lifecycle ---

    /// Apply `game-start`: fix the seed, derive the layout, reset scores.
    pub fn start_match(&mut self, seed: u32) {
        self.seed = seed;
        self.layout = Some(ShuffledLayout::generate(seed));
        self.round_number = 0;
        for p in &mut self.players {
            p.score = 0;
        }
    }

    /// Apply `start-round`: the host's resolved word, then count down.
    pub fn begin_round(&mut self, round_number: u32, word: String) {
        self.round_number = round_number;
        self.current_word = word;
        self.typed.clear();
        self.last_miss = None;
        self.last_results.clear();
        self.round_started_at = None;
        for p in &mut self.players {
            p.time = None;
            p.progress = 0;
        }
        self.phase = Phase::Countdown(COUNTDOWN_SECONDS);
    }

    /// The word this peer derives locally for a round. The wire carries the
    /// host's resolved word; this exists to detect generator drift.
    pub fn derived_word(&self, round_number: u32) -> String {
        word_for_round(self.seed, round_number)
    }

    /// Advance 1-second timers: countdown steps and the results reveal.
    pub fn tick(&mut self) {
        match self.phase {
            Phase::Countdown(0) => {
                self.phase = Phase::Playing;
                self.round_started_at = Some(Instant::now());
            }
            Phase::Countdown(n) => self.phase = Phase::Countdown(n - 1),
            Phase::Results { reveal_in: 0 } => {
                if self.champion().is_some() {
                    self.phase = Phase::GameOver;
                }
            }
            Phase::Results { reveal_in } => {
                self.phase = Phase::Results { reveal_in: reveal_in - 1 };
            }
            _ => {}
        }
    }

    // --- local input ---

    /// Feed one displayed letter to the local player.
    pub fn on_key(&mut self, letter: char) -> KeyOutcome {
        if self.phase != Phase::Playing {
            return KeyOutcome::Ignored;
        }
        let Some(local_id) = self.local_id else {
            return KeyOutcome::Ignored;
        };
        if self.player(local_id).and_then(|p| p.time).is_some() {
            return KeyOutcome::Ignored;
        }

        let expected = self.current_word.chars().nth(self.typed.chars().count());
        if expected != Some(letter) {
            self.last_miss = Some(letter);
            return KeyOutcome::Rejected;
        }

        self.typed.push(letter);
        self.last_miss = None;
        let progress = self.typed.chars().count();
        self.apply_progress(local_id, progress);

        if self.typed == self.current_word {
            let time = self
                .round_started_at
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0);
            self.apply_complete(local_id, time);
            KeyOutcome::Completed(time)
        } else {
            KeyOutcome::Progress(progress)
        }
    }

    /// Remove the last accepted character. Returns the new prefix length to
    /// report, or `None` when nothing changed.
    pub fn on_backspace(&mut self) -> Option<usize> {
        if self.phase != Phase::Playing {
            return None;
        }
        let local_id = self.local_id?;
        if self.player(local_id).and_then(|p| p.time).is_some() {
            return None;
        }
        self.typed.pop()?;
        self.last_miss = None;
        let progress = self.typed.chars().count();
        self.apply_progress(local_id, progress);
        Some(progress)
    }

    /// Typed prefix of the local player.
    pub fn typed(&self) -> &str {
        &self.typed
    }

    /// Local player finished but the round is still running.
    pub fn local_waiting(&self) -> bool {
        self.phase == Phase::Playing && self.local().and_then(|p| p.time).is_some()
    }

    // --- replicated events ---

    /// Apply a `progress` event for any player.
    pub fn apply_progress(&mut self, id: PlayerId, progress: usize) {
        let cap = self.current_word.chars().count();
        if let Some(p) = self.player_mut(id) {
            p.progress = progress.min(cap);
        }
    }

    /// Apply a `complete` event for any player. Finishes the round once every
    /// currently-connected player has a time.
    pub fn apply_complete(&mut self, id: PlayerId, time: f64) {
        let cap = self.current_word.chars().count();
        if let Some(p) = self.player_mut(id) {
            if p.time.is_none() {
                p.time = Some(time);
                p.progress = cap;
            }
        }
        self.maybe_finish_round();
    }

    fn maybe_finish_round(&mut self) {
        if self.phase != Phase::Playing {
            return;
        }
        if self.players.is_empty() || self.players.iter().any(|p| p.time.is_none()) {
            return;
        }

        // Rank by ascending time; exact ties break by ascending player id so
        // every replica ranks identically regardless of arrival order.
        let mut finishers: Vec<(PlayerId, String, f64)> = self
            .players
            .iter()
            .filter_map(|p| p.time.map(|t| (p.id, p.name.clone(), t)))
            .collect();
        finishers.sort_by(|a, b| a.2.partial_cmp(&b.2).unwrap_or(std::cmp::Ordering::Equal).then(a.0.cmp(&b.0)));

        let n = finishers.len();
        self.last_results = finishers
            .into_iter()
            .enumerate()
            .map(|(rank, (id, name, time))| RoundResult {
                id,
                name,
                time,
                points: round_points(n, rank),
            })
            .collect();

        for result in &self.last_results {
            if let Some(p) = self.players.iter_mut().find(|p| p.id == result.id) {
                p.score += result.points;
            }
        }

        self.phase = Phase::Results {
            reveal_in: RESULTS_REVEAL_TICKS,
        };
    }

    // --- results / end of match ---

    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    pub fn current_word(&self) -> &str {
        &self.current_word
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn layout(&self) -> Option<&ShuffledLayout> {
        self.layout.as_ref()
    }

    pub fn last_results(&self) -> &[RoundResult] {
        &self.last_results
    }

    /// Results are on screen (reveal delay elapsed).
    pub fn results_revealed(&self) -> bool {
        matches!(self.phase, Phase::Results { reveal_in: 0 })
    }

    /// The match winner, once somebody reached the threshold. Ties break by
    /// ascending player id.
    pub fn champion(&self) -> Option<&PlayerSlot> {
        self.players
            .iter()
            .filter(|p| p.score >= self.win_threshold)
            .max_by(|a, b| a.score.cmp(&b.score).then(b.id.cmp(&a.id)))
    }
}

/// Round points by finishing rank: 2 players award the winner 1; 3 players
/// award 2/1/0. A lone finisher (everyone else disconnected) takes 1.
fn round_points(finishers: usize, rank: usize) -> u32 {
    match (finishers, rank) {
        (3, 0) => 2,
        (3, 1) => 1,
        (_, 0) => 1,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playing_state(names: &[&str]) -> MatchState {
        let mut state = MatchState::new(DEFAULT_WIN_THRESHOLD);
        for (i, name) in names.iter().enumerate() {
            state.add_player(i as PlayerId + 1, name.to_string());
        }
        state.set_local_id(1);
        state.start_match(42);
        state.begin_round(1, "CRANE".to_string());
        // Run out the countdown: 3 -> 2 -> 1 -> 0 -> playing.
        for _ in 0..=COUNTDOWN_SECONDS {
            state.tick();
        }
        assert_eq!(state.phase, Phase::Playing);
        state
    }

    #[test]
    fn test_countdown_sequence() {
        let mut state = MatchState::new(DEFAULT_WIN_THRESHOLD);
        state.add_player(1, "A".to_string());
        state.begin_round(1, "WORD".to_string());
        assert_eq!(state.phase, Phase::Countdown(3));
        state.tick();
        assert_eq!(state.phase, Phase::Countdown(2));
        state.tick();
        state.tick();
        assert_eq!(state.phase, Phase::Countdown(0)); // GO
        state.tick();
        assert_eq!(state.phase, Phase::Playing);
    }

    #[test]
    fn test_valid_keystrokes_advance_prefix() {
        let mut state = playing_state(&["Alice", "Bob"]);

        for c in ['C', 'R', 'A', 'N'] {
            assert!(matches!(state.on_key(c), KeyOutcome::Progress(_)));
        }
        assert_eq!(state.typed(), "CRAN");
        assert_eq!(state.local().unwrap().progress, 4);
    }

    #[test]
    fn test_mismatch_rejected_without_state_change() {
        let mut state = playing_state(&["Alice", "Bob"]);

        assert!(matches!(state.on_key('C'), KeyOutcome::Progress(1)));
        assert_eq!(state.on_key('X'), KeyOutcome::Rejected);
        assert_eq!(state.typed(), "C");
        assert_eq!(state.local().unwrap().progress, 1);
        assert_eq!(state.last_miss, Some('X'));
    }

    #[test]
    fn test_backspace_then_completion() {
        let mut state = playing_state(&["Alice", "Bob"]);

        for c in ['C', 'R', 'A', 'N'] {
            state.on_key(c);
        }
        assert_eq!(state.on_backspace(), Some(3));
        assert_eq!(state.typed(), "CRA");

        state.on_key('N');
        let outcome = state.on_key('E');
        assert!(matches!(outcome, KeyOutcome::Completed(_)));
        assert_eq!(state.typed(), "CRANE");
        assert!(state.local().unwrap().time.is_some());
        assert!(state.local_waiting());
    }

    #[test]
    fn test_backspace_noop_at_empty_prefix() {
        let mut state = playing_state(&["Alice", "Bob"]);
        assert_eq!(state.on_backspace(), None);
    }

    #[test]
    fn test_input_ignored_outside_playing() {
        let mut state = MatchState::new(DEFAULT_WIN_THRESHOLD);
        state.add_player(1, "Alice".to_string());
        state.set_local_id(1);
        state.begin_round(1, "CRANE".to_string());
        assert_eq!(state.on_key('C'), KeyOutcome::Ignored);
    }

    #[test]
    fn test_input_ignored_after_finishing() {
        let mut state = playing_state(&["Alice", "Bob"]);
        for c in "CRANE".chars() {
            state.on_key(c);
        }
        assert_eq!(state.on_key('C'), KeyOutcome::Ignored);
        assert_eq!(state.on_backspace(), None);
    }

    #[test]
    fn test_round_end_waits_for_all_players() {
        let mut state = playing_state(&["Alice", "Bob", "Cara"]);

        state.apply_complete(1, 2.0);
        assert_eq!(state.phase, Phase::Playing);
        state.apply_complete(2, 3.0);
        assert_eq!(state.phase, Phase::Playing);
        state.apply_complete(3, 4.0);
        assert!(matches!(state.phase, Phase::Results { .. }));
    }

    #[test]
    fn test_disconnect_unblocks_round_end() {
        let mut state = playing_state(&["Alice", "Bob", "Cara"]);

        state.apply_complete(1, 2.0);
        state.apply_complete(2, 3.0);
        assert_eq!(state.phase, Phase::Playing);

        // Cara never finishes; her disconnect must not block the round.
        state.remove_player(3);
        assert!(matches!(state.phase, Phase::Results { .. }));
        assert_eq!(state.last_results().len(), 2);
    }

    #[test]
    fn test_two_player_scoring() {
        let mut state = playing_state(&["Alice", "Bob"]);

        state.apply_complete(1, 2.0);
        state.apply_complete(2, 3.0);

        assert_eq!(state.player(1).unwrap().score, 1);
        assert_eq!(state.player(2).unwrap().score, 0);
        assert_eq!(state.last_results()[0].id, 1);
    }

    #[test]
    fn test_three_player_scoring() {
        let mut state = playing_state(&["Alice", "Bob", "Cara"]);

        state.apply_complete(2, 1.5);
        state.apply_complete(3, 2.5);
        state.apply_complete(1, 3.5);

        assert_eq!(state.player(2).unwrap().score, 2);
        assert_eq!(state.player(3).unwrap().score, 1);
        assert_eq!(state.player(1).unwrap().score, 0);
    }

    #[test]
    fn test_tie_breaks_by_player_id() {
        let mut state = playing_state(&["Alice", "Bob"]);

        // Apply in reverse id order; ranking must not depend on it.
        state.apply_complete(2, 2.0);
        state.apply_complete(1, 2.0);

        assert_eq!(state.last_results()[0].id, 1);
        assert_eq!(state.player(1).unwrap().score, 1);
        assert_eq!(state.player(2).unwrap().score, 0);
    }

    #[test]
    fn test_progress_commutes_across_players() {
        let mut a = playing_state(&["Alice", "Bob"]);
        let mut b = playing_state(&["Alice", "Bob"]);

        a.apply_progress(1, 2);
        a.apply_progress(2, 4);
        b.apply_progress(2, 4);
        b.apply_progress(1, 2);

        assert_eq!(a.players(), b.players());
    }

    #[test]
    fn test_duplicate_complete_ignored() {
        let mut state = playing_state(&["Alice", "Bob"]);
        state.apply_complete(1, 2.0);
        state.apply_complete(1, 9.0);
        assert_eq!(state.player(1).unwrap().time, Some(2.0));
    }

    #[test]
    fn test_progress_clamped_to_word_length() {
        let mut state = playing_state(&["Alice", "Bob"]);
        state.apply_progress(2, 999);
        assert_eq!(state.player(2).unwrap().progress, 5);
    }

    #[test]
    fn test_results_reveal_then_game_over() {
        let mut state = playing_state(&["Alice", "Bob"]);

        // Push Alice to the threshold over successive rounds.
        for round in 1..=DEFAULT_WIN_THRESHOLD {
            state.apply_complete(1, 1.0);
            state.apply_complete(2, 2.0);
            assert_eq!(state.phase, Phase::Results { reveal_in: 1 });
            state.tick();
            assert!(state.results_revealed());
            state.tick();
            if round < DEFAULT_WIN_THRESHOLD {
                assert_eq!(state.phase, Phase::Results { reveal_in: 0 });
                state.begin_round(round + 1, "CRANE".to_string());
                for _ in 0..=COUNTDOWN_SECONDS {
                    state.tick();
                }
            }
        }

        assert_eq!(state.phase, Phase::GameOver);
        assert_eq!(state.champion().unwrap().id, 1);
    }

    #[test]
    fn test_ready_gate_needs_everyone() {
        let mut state = MatchState::new(DEFAULT_WIN_THRESHOLD);
        state.add_player(1, "Alice".to_string());
        state.add_player(2, "Bob".to_string());

        assert!(!state.all_ready(2));
        state.set_ready(1, true);
        assert!(!state.all_ready(2));
        state.set_ready(2, true);
        assert!(state.all_ready(2));
    }

    #[test]
    fn test_ready_gate_needs_min_players() {
        let mut state = MatchState::new(DEFAULT_WIN_THRESHOLD);
        state.add_player(1, "Alice".to_string());
        state.set_ready(1, true);
        assert!(!state.all_ready(2));
    }

    #[test]
    fn test_sync_roster_preserves_round_progress() {
        let mut state = playing_state(&["Alice", "Bob"]);
        state.apply_progress(2, 3);

        state.sync_roster(&[
            (1, "Alice".to_string(), true, 0),
            (2, "Bob".to_string(), true, 0),
        ]);
        assert_eq!(state.player(2).unwrap().progress, 3);
    }

    #[test]
    fn test_sync_roster_drop_unblocks_round() {
        let mut state = playing_state(&["Alice", "Bob", "Cara"]);
        state.apply_complete(1, 2.0);
        state.apply_complete(2, 3.0);

        // Host snapshot without Cara: the round finishes on the replica too.
        state.sync_roster(&[
            (1, "Alice".to_string(), true, 0),
            (2, "Bob".to_string(), true, 0),
        ]);
        assert!(matches!(state.phase, Phase::Results { .. }));
    }

    #[test]
    fn test_start_match_resets_scores_and_derives_layout() {
        let mut state = MatchState::new(DEFAULT_WIN_THRESHOLD);
        state.add_player(1, "Alice".to_string());
        state.start_match(42);

        assert!(state.layout().is_some());
        let rows: Vec<String> = state
            .layout()
            .unwrap()
            .rows()
            .iter()
            .map(|r| r.iter().collect())
            .collect();
        assert_eq!(rows[0], "WPTLIJDQGU");
    }

    #[test]
    fn test_lone_finisher_takes_the_round() {
        let mut state = playing_state(&["Alice", "Bob"]);
        state.remove_player(2);
        state.apply_complete(1, 4.0);
        assert_eq!(state.player(1).unwrap().score, 1);
        assert!(matches!(state.phase, Phase::Results { .. }));
    }
}
