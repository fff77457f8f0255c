use std::sync::Arc;
use std::time::Duration;

use client::{ClientConfig, ClientSession, Redraw, TransportKind};
use server::config::Config;
use system::{ClientReplica, Point, Snapshot};

const ATTEMPTS: usize = 100;
const BURST: usize = 64;

fn no_redraw() -> Redraw {
    Arc::new(|_: &ClientReplica| {})
}

fn test_config() -> Config {
    Config {
        bind: "127.0.0.1:0".into(),
        poll_timeout_secs: 5,
        ..Config::default()
    }
}

async fn start_server() -> String {
    start_server_with(test_config()).await
}

async fn start_server_with(config: Config) -> String {
    let (http, addr) = server::start(config).unwrap();
    actix_web::rt::spawn(http);
    format!("http://{}", addr)
}

async fn join(url: &str, username: &str, transport: TransportKind) -> ClientSession {
    ClientSession::connect(&ClientConfig::new(url, transport), username, no_redraw())
        .await
        .unwrap()
}

#[actix_web::test]
async fn strokes_reach_both_transports() {
    let url = start_server().await;
    let alice = join(&url, "alice", TransportKind::Push).await;
    let bob = join(&url, "bob", TransportKind::LongPoll).await;

    alice.move_to(Point::new(0.0, 0.0)).await.unwrap();
    alice.press(Point::new(0.0, 0.0), "#f00").await.unwrap();

    let mut mirrored = false;
    for i in 1..=ATTEMPTS {
        alice.move_to(Point::new(i as f64, i as f64)).await.unwrap();
        actix_web::rt::time::sleep(Duration::from_millis(50)).await;
        let seen = |replica: ClientReplica| {
            replica
                .stroke(0)
                .map_or(false, |stroke| stroke.points.len() >= 2 && stroke.color == "#f00")
        };
        if seen(alice.replica()) && seen(bob.replica()) {
            mirrored = true;
            break;
        }
    }
    assert!(mirrored, "stroke 0 never reached both replicas");

    alice.release().await.unwrap();
    bob.close().await;
    alice.close().await;
}

#[actix_web::test]
async fn leave_removes_the_pencil_everywhere() {
    let url = start_server().await;
    let alice = join(&url, "alice", TransportKind::Push).await;
    let bob = join(&url, "bob", TransportKind::LongPoll).await;

    alice.move_to(Point::new(1.0, 1.0)).await.unwrap();
    alice.close().await;

    let mut gone = false;
    for i in 1..=ATTEMPTS {
        bob.move_to(Point::new(i as f64, 0.0)).await.unwrap();
        actix_web::rt::time::sleep(Duration::from_millis(50)).await;
        let pencils = bob.replica().pencils().clone();
        if pencils.contains_key("bob") && !pencils.contains_key("alice") {
            gone = true;
            break;
        }
    }
    assert!(gone, "bob never saw alice leave");
    bob.close().await;
}

#[actix_web::test]
async fn push_burst_survives_a_full_server_queue() {
    let url = start_server_with(Config {
        command_buffer: 1,
        ..test_config()
    })
    .await;
    let alice = join(&url, "alice", TransportKind::Push).await;

    alice.move_to(Point::new(0.0, 0.0)).await.unwrap();
    alice.press(Point::new(0.0, 0.0), "#f00").await.unwrap();
    for i in 1..=BURST {
        alice.move_to(Point::new(i as f64, 0.0)).await.unwrap();
    }
    alice.release().await.unwrap();
    let last = Point::new(-1.0, -1.0);
    alice.move_to(last).await.unwrap();

    let mut settled = None;
    for _ in 0..ATTEMPTS {
        actix_web::rt::time::sleep(Duration::from_millis(50)).await;
        let board: Snapshot = reqwest::get(format!("{}/", url))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if board.pencils.get("alice").map_or(false, |pencil| pencil.position == last) {
            settled = Some(board);
            break;
        }
    }

    let board = settled.expect("the last frame of the burst was never applied");
    assert_eq!(board.lines.len(), 1);
    assert_eq!(board.lines[0].points.len(), BURST + 1);
    assert_eq!(board.pencils["alice"].current_line, None);
    alice.close().await;
}
