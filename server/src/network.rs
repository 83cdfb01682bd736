//! TCP accept phase, per-player command handlers and the periodic
//! simulation and broadcast loops.
//!
//! All four long-running tasks share the game state behind a single
//! `tokio::sync::Mutex`; the broadcast target set has its own small
//! lock that is never taken while the game lock is held. Neither lock
//! is held across socket I/O on the game-state side: snapshots are
//! copied under the lock and serialized outside it.

use crate::game::GameState;
use log::{debug, info, warn};
use shared::{Command, PlayerId};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// The single game lock shared by every task.
pub type SharedState = Arc<Mutex<GameState>>;

/// One registered outbound connection. Dropping it closes the write
/// half of the socket.
struct Peer {
    id: PlayerId,
    writer: OwnedWriteHalf,
}

/// The broadcast target set: every live outbound connection eligible
/// to receive snapshots.
type PeerSet = Arc<Mutex<Vec<Peer>>>;

/// Runs the server on an already-bound listener: accepts exactly two
/// players, then drives their handlers plus the simulation and
/// broadcast loops until the process is terminated.
///
/// Returns an error only if an accept fails before both players are
/// in place.
pub async fn run(listener: TcpListener, tick_interval: Duration) -> io::Result<()> {
    let state: SharedState = Arc::new(Mutex::new(GameState::new()));
    let peers: PeerSet = Arc::new(Mutex::new(Vec::new()));

    // Accept phase: the first connection is player1, the second
    // player2. Nothing else ever joins.
    for id in PlayerId::BOTH {
        let (socket, addr) = listener.accept().await?;
        info!("{} connected from {}", id, addr);

        let (reader, mut writer) = socket.into_split();
        if let Err(e) = writer
            .write_all(format!("Welcome {}!\n", id).as_bytes())
            .await
        {
            // The handler will notice the dead socket; the broadcast
            // loop prunes the writer on its next cycle.
            warn!("Failed to send welcome to {}: {}", id, e);
        }

        peers.lock().await.push(Peer { id, writer });
        spawn_handler(id, reader, Arc::clone(&state), Arc::clone(&peers));
    }

    info!("Both players connected, starting game");
    let simulation = spawn_simulation_loop(Arc::clone(&state), tick_interval);
    let broadcast = spawn_broadcast_loop(state, peers, tick_interval);

    // The loops have no shutdown path; they run until process exit.
    let _ = tokio::join!(simulation, broadcast);
    Ok(())
}

/// Spawns the read loop for one player.
///
/// Commands are applied to the game state under the lock; unknown
/// tokens are ignored. Any read failure or EOF ends the task, which
/// then removes this player's writer from the broadcast target set.
/// The player's game-state entry is never removed.
fn spawn_handler(
    id: PlayerId,
    reader: OwnedReadHalf,
    state: SharedState,
    peers: PeerSet,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match Command::parse(&line) {
                    Some(Command::Turn(direction)) => {
                        state.lock().await.apply_direction(id, direction);
                    }
                    Some(Command::Restart) => {
                        state.lock().await.record_vote(id);
                    }
                    None => {
                        debug!("Ignoring unknown command from {}: {:?}", id, line.trim());
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    warn!("Read error from {}: {}", id, e);
                    break;
                }
            }
        }

        peers.lock().await.retain(|peer| peer.id != id);
        info!("{} disconnected", id);
    })
}

/// Spawns the fixed-period simulation task.
fn spawn_simulation_loop(state: SharedState, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick fires immediately.
        timer.tick().await;

        loop {
            timer.tick().await;
            let mut game = state.lock().await;
            game.step(&mut rand::thread_rng());
        }
    })
}

/// Spawns the fixed-period broadcast task.
///
/// Each cycle snapshots the state under the game lock, serializes the
/// snapshot once outside it, and writes the identical payload to every
/// registered peer. A failed write drops that peer from the target
/// set; there are no retries.
fn spawn_broadcast_loop(state: SharedState, peers: PeerSet, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        timer.tick().await;

        loop {
            timer.tick().await;
            let snapshot = state.lock().await.snapshot();

            if let Ok(mut payload) = serde_json::to_string(&snapshot) {
                payload.push('\n');

                let mut targets = peers.lock().await;
                let mut dropped = Vec::new();
                for peer in targets.iter_mut() {
                    if let Err(e) = peer.writer.write_all(payload.as_bytes()).await {
                        warn!("Dropping {} from broadcast: {}", peer.id, e);
                        dropped.push(peer.id);
                    }
                }
                targets.retain(|peer| !dropped.contains(&peer.id));
            }
        }
    })
}
