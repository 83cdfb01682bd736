//! Integration tests driving the server over real TCP sockets.
//!
//! Each test binds a listener on an ephemeral port, runs the server
//! loop as a background task with a short tick, and speaks the actual
//! wire protocol: plaintext command tokens in, JSON snapshot lines out.

use shared::{PlayerId, StateSnapshot, Winner, GRID_HEIGHT, GRID_WIDTH, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// Fast tick so the full die/win/restart cycle fits in a test run.
const TICK: Duration = Duration::from_millis(20);
const WAIT: Duration = Duration::from_secs(5);

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server::network::run(listener, TICK).await;
    });
    addr
}

struct TestPeer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestPeer {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = timeout(WAIT, TcpStream::connect(addr)).await.unwrap().unwrap();
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn read_line(&mut self) -> String {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .expect("read failed")
            .expect("connection closed")
    }

    async fn send(&mut self, token: &str) {
        self.writer
            .write_all(format!("{}\n", token).as_bytes())
            .await
            .unwrap();
    }

    async fn next_snapshot(&mut self) -> StateSnapshot {
        let line = self.read_line().await;
        serde_json::from_str(&line).expect("snapshot line did not parse")
    }

    /// Reads snapshots until one satisfies the predicate.
    async fn wait_for<F>(&mut self, mut predicate: F) -> StateSnapshot
    where
        F: FnMut(&StateSnapshot) -> bool,
    {
        timeout(WAIT, async {
            loop {
                let snapshot = self.next_snapshot().await;
                if predicate(&snapshot) {
                    return snapshot;
                }
            }
        })
        .await
        .expect("timed out waiting for a matching snapshot")
    }
}

async fn connect_both(addr: SocketAddr) -> (TestPeer, TestPeer) {
    let mut player1 = TestPeer::connect(addr).await;
    assert_eq!(player1.read_line().await, "Welcome player1!");
    let mut player2 = TestPeer::connect(addr).await;
    assert_eq!(player2.read_line().await, "Welcome player2!");
    (player1, player2)
}

/// HANDSHAKE & SNAPSHOT SCHEMA TESTS
mod protocol_tests {
    use super::*;

    /// The first peer is always player1, the second player2, and both
    /// get a plaintext welcome line before any snapshot.
    #[tokio::test]
    async fn handshake_assigns_stable_identities() {
        let addr = start_server().await;
        let (mut player1, mut player2) = connect_both(addr).await;

        let snapshot = player1.next_snapshot().await;
        assert_eq!(snapshot.version, PROTOCOL_VERSION);
        assert_eq!(snapshot.players.len(), 2);
        assert!(snapshot.players.contains_key(&PlayerId::Player1));
        assert!(snapshot.players.contains_key(&PlayerId::Player2));

        // Both peers receive the identical schema.
        let other = player2.next_snapshot().await;
        assert_eq!(other.version, PROTOCOL_VERSION);
    }

    /// Every broadcast cell stays on the grid.
    #[tokio::test]
    async fn snapshots_stay_within_grid_bounds() {
        let addr = start_server().await;
        let (mut player1, _player2) = connect_both(addr).await;

        for _ in 0..10 {
            let snapshot = player1.next_snapshot().await;
            for player in snapshot.players.values() {
                for cell in &player.body {
                    assert!((0..GRID_WIDTH).contains(&cell.x));
                    assert!((0..GRID_HEIGHT).contains(&cell.y));
                }
            }
            assert!((0..GRID_WIDTH).contains(&snapshot.food.x));
            assert!((0..GRID_HEIGHT).contains(&snapshot.food.y));
        }
    }
}

/// GAMEPLAY TESTS
mod gameplay_tests {
    use super::*;

    /// With no input, player1 marches right and the snapshots show it.
    #[tokio::test]
    async fn snapshots_reflect_movement() {
        let addr = start_server().await;
        let (mut player1, _player2) = connect_both(addr).await;

        let first = player1.next_snapshot().await;
        let start_x = first.players[&PlayerId::Player1].body.last().unwrap().x;

        let moved = player1
            .wait_for(|s| {
                let p1 = &s.players[&PlayerId::Player1];
                !p1.alive || p1.body.last().unwrap().x > start_x
            })
            .await;
        // Heading right: the row never changes, only x advances.
        let p1 = &moved.players[&PlayerId::Player1];
        assert_eq!(p1.body.last().unwrap().y, 5);
    }

    /// A direction token turns the snake; garbage around it is ignored.
    #[tokio::test]
    async fn direction_commands_apply_and_unknown_tokens_are_ignored() {
        let addr = start_server().await;
        let (mut player1, _player2) = connect_both(addr).await;

        player1.send("teleport").await;
        player1.send("UP").await;
        player1.send("down").await;

        let turned = player1
            .wait_for(|s| {
                let p1 = &s.players[&PlayerId::Player1];
                p1.alive && p1.body.last().unwrap().y > 5
            })
            .await;
        // Heading down, not up: the unknown tokens had no effect.
        assert!(turned.players[&PlayerId::Player1].body.last().unwrap().y > 5);
    }

    /// With nobody steering, player1 hits the right wall first and
    /// player2 is declared the winner; a unanimous restart vote then
    /// resets the match to its initial layout.
    #[tokio::test]
    async fn winner_declared_then_unanimous_restart_resets() {
        let addr = start_server().await;
        let (mut player1, mut player2) = connect_both(addr).await;

        let finished = player1
            .wait_for(|s| s.winner.is_some())
            .await;
        assert_eq!(finished.winner, Some(Winner::Player2));
        assert!(!finished.players[&PlayerId::Player1].alive);
        assert!(finished.players[&PlayerId::Player2].alive);

        // One vote is not enough; the game stays frozen.
        player1.send("restart").await;
        let still_frozen = player1.next_snapshot().await;
        assert_eq!(still_frozen.winner, Some(Winner::Player2));

        player2.send("restart").await;
        let reset = player1.wait_for(|s| s.winner.is_none()).await;
        assert!(reset.players.values().all(|p| p.alive));
        assert!(reset.players.values().all(|p| p.body.len() == 1));
        assert_eq!(reset.players[&PlayerId::Player1].body[0].y, 5);
        assert_eq!(reset.players[&PlayerId::Player2].body[0].y, 15);
    }

    /// Dropping one peer prunes it from the broadcast set but leaves
    /// its snake in the game; the remaining peer keeps playing.
    #[tokio::test]
    async fn disconnected_peer_is_pruned_and_game_continues() {
        let addr = start_server().await;
        let (mut player1, player2) = connect_both(addr).await;
        drop(player2);

        // player1 still receives fresh snapshots listing both players.
        let first = player1.next_snapshot().await;
        let start_x = first.players[&PlayerId::Player1].body.last().unwrap().x;
        let later = player1
            .wait_for(|s| {
                let p1 = &s.players[&PlayerId::Player1];
                !p1.alive || p1.body.last().unwrap().x > start_x
            })
            .await;
        assert_eq!(later.players.len(), 2);
    }
}
