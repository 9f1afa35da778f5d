//! Pre-built game states and scenario helpers.

use dustfront_core::config::{GameConfig, TICK_RATE};
use dustfront_core::events::GameEvent;
use dustfront_core::factions::FactionKind;
use dustfront_core::game::{Game, GameOver, GameSetup, PlayerSlot};
use dustfront_core::map::{Biome, Density};
use dustfront_core::units::PlayerId;

/// Everything a scenario run produced.
#[derive(Debug, Default)]
pub struct ScenarioLog {
    /// Player-directed events, in emission order.
    pub events: Vec<(PlayerId, GameEvent)>,
    /// Set if the game ended during the run.
    pub game_over: Option<GameOver>,
}

impl ScenarioLog {
    /// Events addressed to one player.
    #[must_use]
    pub fn events_for(&self, player: PlayerId) -> Vec<&GameEvent> {
        self.events
            .iter()
            .filter(|(p, _)| *p == player)
            .map(|(_, e)| e)
            .collect()
    }
}

/// Standard two-player setup: player 1 (Coalition, team 1) versus
/// player 2 (Nomads, team 2) on low-density dunes with a fixed seed.
#[must_use]
pub fn duel_setup() -> GameSetup {
    GameSetup {
        players: vec![
            PlayerSlot {
                player: 1,
                faction: FactionKind::Coalition,
                team: 1,
            },
            PlayerSlot {
                player: 2,
                faction: FactionKind::Nomads,
                team: 2,
            },
        ],
        biome: Biome::Dunes,
        density: Density::Low,
        seed: 1234,
        config: GameConfig::default(),
    }
}

/// A fresh two-player game.
#[must_use]
pub fn duel_game() -> Game {
    Game::new(duel_setup())
}

/// A two-player game with every generated obstacle removed, for
/// scenarios that need clean sight lines.
#[must_use]
pub fn open_duel_game() -> Game {
    let mut game = duel_game();
    clear_obstacles(&mut game);
    game
}

/// Deactivate all obstacles and run one tick so they are culled (and
/// the occupancy grid rebuilt).
pub fn clear_obstacles(game: &mut Game) {
    for obstacle in game.entities_mut().obstacles.values_mut() {
        obstacle.active = false;
    }
    game.tick();
}

/// Run `ticks` ticks, accumulating events and the first game-over.
pub fn run_ticks(game: &mut Game, ticks: u64) -> ScenarioLog {
    let mut log = ScenarioLog::default();
    for _ in 0..ticks {
        let output = game.tick();
        log.events.extend(output.events);
        if log.game_over.is_none() {
            log.game_over = output.game_over;
        }
    }
    log
}

/// Run `secs` seconds of simulated time.
pub fn run_secs(game: &mut Game, secs: f32) -> ScenarioLog {
    run_ticks(game, (secs * TICK_RATE as f32).ceil() as u64)
}
