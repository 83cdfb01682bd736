//! Authoritative game state and the per-tick simulation rules.
//!
//! Every method on [`GameState`] runs to completion while the caller
//! holds the single game lock, so each one is atomic with respect to
//! the handler, simulation and broadcast tasks.

use log::{debug, info};
use rand::Rng;
use shared::{
    Cell, Direction, PlayerId, PlayerSnapshot, StateSnapshot, Winner, GRID_HEIGHT, GRID_WIDTH,
    PROTOCOL_VERSION,
};
use std::collections::{BTreeMap, VecDeque};

const INITIAL_FOOD: Cell = Cell { x: 10, y: 10 };

/// One snake: body cells ordered oldest first with the head last.
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub body: VecDeque<Cell>,
    pub direction: Direction,
    pub alive: bool,
}

impl PlayerState {
    fn spawn(cell: Cell, direction: Direction) -> Self {
        Self {
            body: VecDeque::from([cell]),
            direction,
            alive: true,
        }
    }

    pub fn head(&self) -> Cell {
        *self.body.back().expect("snake body is never empty")
    }
}

/// The single authoritative record of the match.
///
/// Exactly two players with fixed identities exist for the process
/// lifetime; a disconnect never removes an entry. Once `winner` is
/// set the simulation freezes until a unanimous restart vote resets
/// everything to the initial conditions.
pub struct GameState {
    players: BTreeMap<PlayerId, PlayerState>,
    food: Cell,
    winner: Option<Winner>,
    restart_votes: BTreeMap<PlayerId, bool>,
    tick: u64,
}

impl GameState {
    pub fn new() -> Self {
        Self {
            players: Self::initial_players(),
            food: INITIAL_FOOD,
            winner: None,
            restart_votes: PlayerId::BOTH.iter().map(|id| (*id, false)).collect(),
            tick: 0,
        }
    }

    fn initial_players() -> BTreeMap<PlayerId, PlayerState> {
        BTreeMap::from([
            (
                PlayerId::Player1,
                PlayerState::spawn(Cell::new(5, 5), Direction::Right),
            ),
            (
                PlayerId::Player2,
                PlayerState::spawn(Cell::new(15, 15), Direction::Left),
            ),
        ])
    }

    /// Sets the player's heading for the next tick. Dead players keep
    /// their last heading; the change is silently dropped.
    pub fn apply_direction(&mut self, id: PlayerId, direction: Direction) {
        if let Some(player) = self.players.get_mut(&id) {
            if player.alive {
                player.direction = direction;
            }
        }
    }

    /// Marks the player's restart vote. Once every tracked player has
    /// voted, the game and the votes reset atomically to the initial
    /// conditions. Returns whether the reset fired.
    pub fn record_vote(&mut self, id: PlayerId) -> bool {
        if let Some(vote) = self.restart_votes.get_mut(&id) {
            *vote = true;
        }
        if self.restart_votes.values().all(|voted| *voted) {
            self.reset();
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.players = Self::initial_players();
        self.food = INITIAL_FOOD;
        self.winner = None;
        for vote in self.restart_votes.values_mut() {
            *vote = false;
        }
        info!("All players voted to restart, game reset");
    }

    /// Advances the simulation by one tick.
    ///
    /// All collision checks run against the bodies as they were at the
    /// start of the tick, so the outcome does not depend on player
    /// processing order and a simultaneous head-on collision kills
    /// both snakes. With `winner` set the tick is a no-op and the game
    /// stays frozen until a reset.
    pub fn step<R: Rng>(&mut self, rng: &mut R) {
        self.tick += 1;
        if self.winner.is_some() {
            return;
        }

        let pre_tick_bodies: Vec<VecDeque<Cell>> =
            self.players.values().map(|p| p.body.clone()).collect();

        let moves: Vec<(PlayerId, Cell)> = self
            .players
            .iter()
            .filter(|(_, player)| player.alive)
            .map(|(id, player)| (*id, player.head().offset(player.direction)))
            .collect();

        for (id, new_head) in moves {
            let collided = !new_head.in_bounds()
                || pre_tick_bodies.iter().any(|body| body.contains(&new_head));

            if let Some(player) = self.players.get_mut(&id) {
                if collided {
                    player.alive = false;
                    info!("{} died on tick {}", id, self.tick);
                    continue;
                }

                player.body.push_back(new_head);
                if new_head == self.food {
                    self.food = Cell::new(
                        rng.gen_range(0..GRID_WIDTH),
                        rng.gen_range(0..GRID_HEIGHT),
                    );
                    info!(
                        "{} ate the food, new food at ({}, {})",
                        id, self.food.x, self.food.y
                    );
                } else {
                    player.body.pop_front();
                }
            }
        }

        let alive: Vec<PlayerId> = self
            .players
            .iter()
            .filter(|(_, player)| player.alive)
            .map(|(id, _)| *id)
            .collect();

        match alive.as_slice() {
            [last] => {
                self.winner = Some(Winner::from(*last));
                info!("{} wins on tick {}", last, self.tick);
            }
            [] => {
                self.winner = Some(Winner::Draw);
                info!("Game ends in a draw on tick {}", self.tick);
            }
            _ => {}
        }

        if self.tick % 50 == 0 {
            debug!(
                "tick {}: {} alive, food at ({}, {})",
                self.tick,
                alive.len(),
                self.food.x,
                self.food.y
            );
        }
    }

    /// Copies the state into the wire schema. The copy happens under
    /// the game lock; serialization happens outside it.
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            version: PROTOCOL_VERSION,
            players: self
                .players
                .iter()
                .map(|(id, player)| {
                    (
                        *id,
                        PlayerSnapshot {
                            body: player.body.iter().copied().collect(),
                            alive: player.alive,
                        },
                    )
                })
                .collect(),
            food: self.food,
            winner: self.winner,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}
