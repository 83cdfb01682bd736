use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const GRID_WIDTH: i32 = 20;
pub const GRID_HEIGHT: i32 = 20;
pub const DEFAULT_PORT: u16 = 12343;
pub const DEFAULT_TICK_MS: u64 = 200;

/// Snapshot schema version; bumped whenever the wire layout changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// A single grid cell. The playfield spans `[0, GRID_WIDTH) x [0, GRID_HEIGHT)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighbouring cell one step in the given direction. May be
    /// out of bounds; callers check with [`Cell::in_bounds`].
    pub fn offset(self, direction: Direction) -> Cell {
        let (dx, dy) = direction.vector();
        Cell::new(self.x + dx, self.y + dy)
    }

    pub fn in_bounds(self) -> bool {
        (0..GRID_WIDTH).contains(&self.x) && (0..GRID_HEIGHT).contains(&self.y)
    }
}

/// Snake heading. Screen coordinates: y grows downward, so `Up` is (0, -1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn vector(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// Stable player identity, assigned in accept order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerId {
    Player1,
    Player2,
}

impl PlayerId {
    /// Both identities in their fixed accept order.
    pub const BOTH: [PlayerId; 2] = [PlayerId::Player1, PlayerId::Player2];

    pub fn as_str(self) -> &'static str {
        match self {
            PlayerId::Player1 => "player1",
            PlayerId::Player2 => "player2",
        }
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed inbound command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Turn(Direction),
    Restart,
}

impl Command {
    /// Parses one line from a client. Whitespace is trimmed; anything
    /// other than the five known tokens yields `None` and is ignored
    /// by the server.
    pub fn parse(line: &str) -> Option<Command> {
        match line.trim() {
            "up" => Some(Command::Turn(Direction::Up)),
            "down" => Some(Command::Turn(Direction::Down)),
            "left" => Some(Command::Turn(Direction::Left)),
            "right" => Some(Command::Turn(Direction::Right)),
            "restart" => Some(Command::Restart),
            _ => None,
        }
    }
}

/// Game outcome. Encoded on the wire as `"player1"`, `"player2"` or
/// `"draw"`; an unfinished game carries `null` via `Option<Winner>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Winner {
    Player1,
    Player2,
    Draw,
}

impl From<PlayerId> for Winner {
    fn from(id: PlayerId) -> Self {
        match id {
            PlayerId::Player1 => Winner::Player1,
            PlayerId::Player2 => Winner::Player2,
        }
    }
}

/// One player's view in a broadcast snapshot. Body cells are ordered
/// oldest first, head last.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub body: Vec<Cell>,
    pub alive: bool,
}

/// The full state pushed to every peer once per broadcast period,
/// one JSON object per line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: u32,
    pub players: BTreeMap<PlayerId, PlayerSnapshot>,
    pub food: Cell,
    pub winner: Option<Winner>,
}
