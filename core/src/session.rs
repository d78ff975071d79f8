use std::collections::BTreeSet;

use rand::prelude::*;
use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::*;

/// Valid transitions:
/// - NotStarted -> InProgress
/// - InProgress -> Won
/// - InProgress -> Lost
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameState {
    NotStarted,
    InProgress,
    Won,
    Lost,
}

impl GameState {
    /// No game has been started yet.
    pub const fn is_initial(self) -> bool {
        matches!(self, Self::NotStarted)
    }

    /// The game ended and no further moves are accepted.
    pub const fn is_final(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::NotStarted
    }
}

/// When the mines of a new game are committed to the board.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StartPolicy {
    /// Place at `new_game`; the first clear can detonate.
    Immediate,
    /// Defer to the first clear and keep that cell mine-free.
    SafeCell,
    /// Defer to the first clear and keep that cell and all its neighbors
    /// mine-free, so the opening move always cascades.
    ZeroStart,
}

/// Result of a flag toggle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FlagOutcome {
    pub now_flagged: bool,
    /// Mines still unflagged; reaches zero exactly when the board is
    /// correctly solved.
    pub flags_left: CellCount,
}

/// One playthrough from new-game to Won/Lost.
///
/// The session exclusively owns its [`Field`], the rng that places mines,
/// and the game clock. Everything is driven from a single control thread;
/// a clear blocks for the full duration of its cascade.
#[derive(Debug)]
pub struct Session {
    field: Option<Field>,
    state: GameState,
    policy: StartPolicy,
    rng: SmallRng,
    clock: GameClock,
    elapsed_secs: u32,
}

impl Session {
    /// A session with no game yet. `seed` drives every mine placement
    /// this session performs, so replays are reproducible.
    pub fn new(seed: u64) -> Self {
        Self {
            field: None,
            state: GameState::NotStarted,
            policy: StartPolicy::ZeroStart,
            rng: SmallRng::seed_from_u64(seed),
            clock: GameClock::new(),
            elapsed_secs: 0,
        }
    }

    /// Adopts an already-built field (a restored save, or a crafted test
    /// board) and resumes play on it.
    pub fn with_field(field: Field, seed: u64) -> Self {
        let mut session = Self::new(seed);
        session.field = Some(field);
        session.state = GameState::InProgress;
        session.clock.start(Instant::now());
        session
    }

    /// Starts a game with the default zero-start opening guarantee.
    pub fn new_game(&mut self, config: GameConfig) {
        self.new_game_with(config, StartPolicy::ZeroStart);
    }

    /// Starts over with a fresh field, discarding any previous game.
    pub fn new_game_with(&mut self, config: GameConfig, policy: StartPolicy) {
        let mut field = Field::new(config);
        if matches!(policy, StartPolicy::Immediate) {
            // cannot fail: the exclusion zone is empty
            if let Err(err) = field.place_mines(&mut self.rng, &BTreeSet::new()) {
                log::warn!("eager mine placement rejected: {err}");
            }
        }

        log::debug!(
            "new game: {}x{} with {} mines",
            config.size.0,
            config.size.1,
            config.mines
        );
        self.field = Some(field);
        self.state = GameState::InProgress;
        self.policy = policy;
        self.clock = GameClock::new();
        self.clock.start(Instant::now());
        self.elapsed_secs = 0;
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn field(&self) -> Option<&Field> {
        self.field.as_ref()
    }

    pub fn config(&self) -> Option<GameConfig> {
        self.field.as_ref().map(Field::config)
    }

    pub fn mines_left(&self) -> CellCount {
        self.field.as_ref().map_or(0, Field::mines_left)
    }

    pub fn cells_left(&self) -> CellCount {
        self.field.as_ref().map_or(0, Field::cells_left)
    }

    pub fn flags_placed(&self) -> CellCount {
        self.field.as_ref().map_or(0, Field::flags_placed)
    }

    /// Counter shown next to the flag display: mines not yet flagged.
    pub fn flags_left(&self) -> CellCount {
        self.mines_left()
    }

    /// Attempts to clear a cell. Outside `InProgress` the call is
    /// rejected with no changes; `success: false` otherwise means the
    /// game is over.
    pub fn clear_cell(&mut self, coords: Coord2) -> ClearOutcome {
        if !matches!(self.state, GameState::InProgress) {
            return ClearOutcome::untouched(false);
        }
        let Some(field) = self.field.as_mut() else {
            return ClearOutcome::untouched(false);
        };

        if !field.is_armed() {
            if let Err(err) = Self::arm(field, &mut self.rng, self.policy, coords) {
                log::warn!("deferred mine placement rejected: {err}");
                return ClearOutcome::untouched(false);
            }
        }

        let outcome = clear_region(field, coords);
        if !outcome.success {
            self.state = GameState::Lost;
            self.clock.stop(Instant::now());
            log::debug!("game lost at {:?}", coords);
        } else {
            self.check_win();
        }
        outcome
    }

    /// Toggles the flag on a cell. Outside `InProgress`, or on a cleared
    /// cell, nothing changes.
    pub fn toggle_flag_cell(&mut self, coords: Coord2) -> FlagOutcome {
        if !matches!(self.state, GameState::InProgress) {
            return FlagOutcome {
                now_flagged: false,
                flags_left: self.flags_left(),
            };
        }
        let Some(field) = self.field.as_mut() else {
            return FlagOutcome {
                now_flagged: false,
                flags_left: 0,
            };
        };

        let now_flagged = field.toggle_flag(coords);
        let flags_left = field.mines_left();
        if now_flagged {
            // flagging the last mine can finish the game
            self.check_win();
        }
        FlagOutcome {
            now_flagged,
            flags_left,
        }
    }

    /// Where the mines were, for display after a loss.
    pub fn mine_coordinates(&self) -> Option<Vec<Coord2>> {
        match (&self.field, self.state) {
            (Some(field), GameState::Lost) => Some(field.mine_coords()),
            _ => None,
        }
    }

    /// Latest elapsed-seconds value, refreshed by [`Session::tick`].
    pub fn elapsed_secs(&self) -> u32 {
        self.elapsed_secs
    }

    /// Periodic-tick entry point; the embedding environment calls this
    /// about once a second. Returns whether the displayed value changed.
    pub fn tick(&mut self) -> bool {
        self.tick_at(Instant::now())
    }

    pub fn tick_at(&mut self, now: Instant) -> bool {
        let secs = self.clock.elapsed_secs(now);
        if secs == self.elapsed_secs {
            return false;
        }
        self.elapsed_secs = secs;
        true
    }

    /// First-clear mine placement, honoring the session's start policy.
    fn arm(
        field: &mut Field,
        rng: &mut SmallRng,
        policy: StartPolicy,
        start: Coord2,
    ) -> Result<()> {
        let mut excluded = BTreeSet::new();
        match policy {
            StartPolicy::Immediate => {}
            StartPolicy::SafeCell => {
                excluded.insert(start);
            }
            StartPolicy::ZeroStart => {
                excluded.insert(start);
                excluded.extend(field.neighbors(start));
            }
        }

        let total = usize::from(field.total_cells());
        if total - excluded.len() < usize::from(field.mine_count()) {
            // a single safe cell always fits: the config caps mines below
            // the cell count
            log::warn!(
                "board too small for a zero start at {:?}, keeping only the start cell safe",
                start
            );
            excluded.clear();
            excluded.insert(start);
        }

        field.place_mines(rng, &excluded)
    }

    fn check_win(&mut self) {
        let Some(field) = self.field.as_ref() else {
            return;
        };
        if field.mines_left() == 0 && field.cells_left() == 0 {
            self.state = GameState::Won;
            self.clock.stop(Instant::now());
            log::debug!("game won");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn started(size: Coord2, mines: &[Coord2]) -> Session {
        Session::with_field(Field::from_mine_coords(size, mines).unwrap(), 0)
    }

    #[test]
    fn easy_preset_first_clear_never_detonates() {
        let config = GameConfig::easy();
        for seed in 0..10 {
            for x in 0..config.size.0 {
                for y in 0..config.size.1 {
                    let mut session = Session::new(seed);
                    session.new_game(config);
                    let outcome = session.clear_cell((x, y));
                    assert!(outcome.success, "seed {seed} detonated at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn zero_start_cascades_from_the_opening_move() {
        let mut session = Session::new(42);
        session.new_game(GameConfig::easy());

        let outcome = session.clear_cell((4, 4));

        assert!(outcome.success);
        // the start cell and all its neighbors are mine-free, so the
        // opening reveal covers at least the 3x3 box
        assert!(outcome.changed.len() >= 9);
    }

    #[test]
    fn safe_cell_policy_survives_a_nearly_full_board() {
        // 19 mines on 20 cells: only the start cell can stay free
        let config = GameConfig::new((5, 4), 19).unwrap();
        for seed in 0..20 {
            let mut session = Session::new(seed);
            session.new_game_with(config, StartPolicy::SafeCell);
            assert!(session.clear_cell((2, 2)).success);
        }
    }

    #[test]
    fn zero_start_downgrades_when_the_zone_does_not_fit() {
        let config = GameConfig::new((5, 4), 19).unwrap();
        for seed in 0..20 {
            let mut session = Session::new(seed);
            session.new_game(config);
            assert!(session.clear_cell((2, 2)).success);
        }
    }

    #[test]
    fn immediate_policy_places_mines_at_new_game() {
        let mut session = Session::new(5);
        session.new_game_with(GameConfig::easy(), StartPolicy::Immediate);

        let field = session.field().unwrap();
        assert!(field.is_armed());
        assert_eq!(field.mine_coords().len(), 10);
    }

    #[test]
    fn deferred_placement_happens_once_per_game() {
        let mut session = Session::new(3);
        session.new_game(GameConfig::easy());

        session.clear_cell((0, 0));
        let mines = session.field().unwrap().mine_coords();
        assert_eq!(mines.len(), 10);

        session.clear_cell((8, 8));
        assert_eq!(session.field().unwrap().mine_coords(), mines);
    }

    #[test]
    fn two_by_one_mineless_board_wins_on_the_first_clear() {
        let mut session = Session::new(0);
        session.new_game(GameConfig::new((2, 1), 0).unwrap());

        let outcome = session.clear_cell((0, 0));

        assert!(outcome.success);
        assert_eq!(session.cells_left(), 0);
        assert_eq!(session.state(), GameState::Won);
    }

    #[test]
    fn detonation_moves_the_session_to_lost_and_exposes_the_mines() {
        let mut session = started((3, 1), &[(2, 0)]);

        let outcome = session.clear_cell((2, 0));

        assert!(!outcome.success);
        assert!(outcome.changed.is_empty());
        assert_eq!(session.state(), GameState::Lost);
        assert_eq!(session.mine_coordinates(), Some(vec![(2, 0)]));
    }

    #[test]
    fn mine_coordinates_stay_hidden_until_lost() {
        let mut session = started((3, 1), &[(2, 0)]);
        assert_eq!(session.mine_coordinates(), None);

        session.clear_cell((0, 0));
        assert_eq!(session.mine_coordinates(), None);
    }

    #[test]
    fn terminal_states_reject_further_moves() {
        let mut session = started((3, 1), &[(2, 0)]);
        session.clear_cell((2, 0));
        assert!(session.state().is_final());

        let cleared = session.clear_cell((0, 0));
        assert!(!cleared.success);
        assert!(cleared.changed.is_empty());
        assert!(!session.field().unwrap().cell((0, 0)).cleared);

        let flagged = session.toggle_flag_cell((0, 0));
        assert!(!flagged.now_flagged);
        assert!(!session.field().unwrap().cell((0, 0)).flagged);
    }

    #[test]
    fn clearing_before_any_game_is_rejected() {
        let mut session = Session::new(0);
        assert!(session.state().is_initial());

        let outcome = session.clear_cell((0, 0));
        assert!(!outcome.success);
        assert!(outcome.changed.is_empty());
    }

    #[test]
    fn flag_toggle_round_trip_restores_flags_left() {
        let mut session = started((3, 1), &[(2, 0)]);
        let before = session.flags_left();

        // a safe cell: flags-left counts correctly flagged mines only
        let on = session.toggle_flag_cell((1, 0));
        assert!(on.now_flagged);
        assert_eq!(on.flags_left, before);
        assert_eq!(session.flags_placed(), 1);

        let off = session.toggle_flag_cell((1, 0));
        assert!(!off.now_flagged);
        assert_eq!(off.flags_left, before);
        assert_eq!(session.flags_placed(), 0);
    }

    #[test]
    fn flagging_a_mine_moves_the_flags_left_counter() {
        let mut session = started((3, 1), &[(2, 0)]);
        let before = session.flags_left();

        let outcome = session.toggle_flag_cell((2, 0));
        assert_eq!(outcome.flags_left, before - 1);
    }

    #[test]
    fn flagging_a_cleared_cell_is_rejected() {
        let mut session = started((3, 1), &[(2, 0)]);
        session.clear_cell((1, 0));

        let outcome = session.toggle_flag_cell((1, 0));
        assert!(!outcome.now_flagged);
        assert!(!session.field().unwrap().cell((1, 0)).flagged);
    }

    #[test]
    fn flag_then_clear_leaves_the_cell_covered() {
        let mut session = started((2, 2), &[(0, 0)]);
        assert!(session.toggle_flag_cell((0, 0)).now_flagged);

        let outcome = session.clear_cell((0, 0));

        assert!(outcome.success);
        assert!(outcome.changed.is_empty());
        assert!(!session.field().unwrap().cell((0, 0)).cleared);
        assert_eq!(session.state(), GameState::InProgress);
    }

    #[test]
    fn solving_the_board_wins_exactly_when_the_counters_reach_zero() {
        let mut session = started((2, 2), &[(0, 0)]);
        assert!(session.clear_cell((1, 0)).success);
        assert!(session.clear_cell((0, 1)).success);
        assert!(session.clear_cell((1, 1)).success);

        // every safe cell is cleared, but the mine is still unflagged
        assert_eq!(session.state(), GameState::InProgress);
        assert_eq!(session.cells_left(), 1);

        let outcome = session.toggle_flag_cell((0, 0));
        assert_eq!(outcome.flags_left, 0);
        assert_eq!(session.cells_left(), 0);
        assert_eq!(session.state(), GameState::Won);
    }

    #[test]
    fn elapsed_seconds_freeze_after_the_game_ends() {
        let mut session = started((2, 1), &[]);
        session.clear_cell((0, 0));
        assert_eq!(session.state(), GameState::Won);

        let changed = session.tick_at(Instant::now() + Duration::from_secs(100));
        assert!(!changed);
        assert_eq!(session.elapsed_secs(), 0);
    }

    #[test]
    fn new_game_resets_a_finished_session() {
        let mut session = started((2, 1), &[(1, 0)]);
        session.clear_cell((1, 0));
        assert_eq!(session.state(), GameState::Lost);

        session.new_game(GameConfig::easy());

        assert_eq!(session.state(), GameState::InProgress);
        assert_eq!(session.config(), Some(GameConfig::easy()));
        assert_eq!(session.elapsed_secs(), 0);
        assert_eq!(session.mines_left(), 10);
        assert!(session.clear_cell((0, 0)).success);
    }

    #[test]
    fn restored_field_continues_the_game() {
        let mut session = started((3, 3), &[(2, 2)]);
        session.clear_cell((0, 0));
        let json = serde_json::to_string(session.field().unwrap()).unwrap();

        let restored: Field = serde_json::from_str(&json).unwrap();
        let mut resumed = Session::with_field(restored, 9);

        assert_eq!(resumed.state(), GameState::InProgress);
        assert_eq!(resumed.cells_left(), 1);
        assert_eq!(resumed.toggle_flag_cell((2, 2)).flags_left, 0);
        assert_eq!(resumed.state(), GameState::Won);
    }
}
