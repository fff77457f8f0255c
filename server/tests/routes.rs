use actix_web::{test, web, App};
use server::config::Config;
use server::handlers::root;
use server::server::spawn_server;
use system::serde_json::{json, Value};
use system::{Envelope, Snapshot};

macro_rules! app {
    ($config:expr) => {{
        let config: Config = $config;
        let srv_tx = spawn_server(&config);
        test::init_service(
            App::new()
                .app_data(web::Data::new(srv_tx))
                .app_data(web::Data::new(config))
                .configure(root),
        )
        .await
    }};
}

fn emit_request(event: &str, data: Value) -> actix_web::test::TestRequest {
    test::TestRequest::post()
        .uri("/emit")
        .set_json(json!({ "event": event, "data": data }))
}

#[actix_web::test]
async fn it_serves_an_empty_board_initially() {
    let app = app!(Config::default());

    let snapshot: Snapshot =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;

    assert!(snapshot.lines.is_empty());
    assert!(snapshot.pencils.is_empty());
}

#[actix_web::test]
async fn it_applies_emitted_events_before_acknowledging() {
    let app = app!(Config::default());

    let ack: Value = test::call_and_read_body_json(
        &app,
        emit_request("move", json!({ "position": { "x": 0, "y": 0 }, "username": "alice" }))
            .to_request(),
    )
    .await;
    assert_eq!(ack, json!({ "message": "ok" }));

    test::call_service(
        &app,
        emit_request(
            "down",
            json!({ "position": { "x": 0, "y": 0 }, "color": "#f00", "username": "alice" }),
        )
        .to_request(),
    )
    .await;
    test::call_service(
        &app,
        emit_request("move", json!({ "position": { "x": 5, "y": 5 }, "username": "alice" }))
            .to_request(),
    )
    .await;

    let body: Value =
        test::call_and_read_body_json(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(body["lines"][0]["id"], 0);
    assert_eq!(body["lines"][0]["color"], "#f00");
    assert_eq!(body["lines"][0]["points"].as_array().unwrap().len(), 2);
    assert_eq!(body["pencils"]["alice"]["position"], json!({ "x": 5.0, "y": 5.0 }));
    assert_eq!(body["pencils"]["alice"]["currentLine"], 0);
}

#[actix_web::test]
async fn it_acknowledges_events_it_drops() {
    let app = app!(Config::default());

    let resp = test::call_service(
        &app,
        emit_request("down", json!({ "username": "ghost" })).to_request(),
    )
    .await;

    assert!(resp.status().is_success());
}

#[actix_web::test]
async fn it_rejects_bodies_that_are_not_envelopes() {
    let app = app!(Config::default());

    let resp = test::call_service(
        &app,
        test::TestRequest::post()
            .uri("/emit")
            .set_json(json!({ "data": {} }))
            .to_request(),
    )
    .await;

    assert_eq!(resp.status().as_u16(), 400);
}

#[actix_web::test]
async fn it_answers_no_content_when_poll_times_out() {
    let app = app!(Config {
        poll_timeout_secs: 0,
        ..Config::default()
    });

    let resp = test::call_service(&app, test::TestRequest::get().uri("/poll").to_request()).await;

    assert_eq!(resp.status().as_u16(), 204);
}

#[actix_web::test]
async fn it_delivers_broadcasts_to_a_pending_poll() {
    let app = app!(Config::default());

    let poll = test::call_and_read_body_json::<_, _, Envelope>(
        &app,
        test::TestRequest::get().uri("/poll").to_request(),
    );
    let emit = test::call_service(&app, emit_request("clear", json!({})).to_request());
    let (polled, _) = tokio::join!(poll, emit);

    assert_eq!(polled, Envelope::empty("clear"));
}
