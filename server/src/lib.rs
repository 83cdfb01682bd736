//! # Snake Arena Server
//!
//! Authoritative server for a two-player grid snake game. The server
//! owns the only copy of the game state: clients send direction and
//! restart tokens, the server advances the simulation on a fixed tick
//! and pushes serialized snapshots back to both peers. Clients render
//! whatever they are told; nothing they send is trusted beyond the
//! five known command tokens.
//!
//! ## Architecture
//!
//! Four long-running tokio tasks cooperate through one shared
//! `Mutex<GameState>`:
//!
//! - one **connection handler** per player reading command lines,
//! - the **simulation loop** stepping both snakes once per tick and
//!   resolving collisions, food and the win/draw outcome,
//! - the **broadcast loop** snapshotting the state each period and
//!   pushing one JSON line to every registered peer.
//!
//! There are no channels between the tasks; the lock provides a strict
//! total order of simulation steps interleaved with command
//! applications, and it is never held across socket I/O.
//!
//! ## Lifecycle
//!
//! The accept phase blocks until exactly two peers connect; the first
//! becomes `player1`, the second `player2`. Only then do the loops
//! start. A disconnected player stops steering but its snake stays in
//! the game; there is no reconnection and no mid-game joining. A match
//! that ends freezes in place until both players vote `restart`, which
//! resets everything to the initial layout. The process itself runs
//! until externally terminated.
//!
//! ## Module Organization
//!
//! - [`game`] — game state, tick algorithm, votes and snapshots.
//! - [`network`] — accept phase, command handlers and the two
//!   periodic loops.
//!
//! The wire vocabulary (grid constants, directions, identities and the
//! versioned snapshot schema) lives in the `shared` crate so test
//! clients speak the same schema.

pub mod game;
pub mod network;
