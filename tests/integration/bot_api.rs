//! A publish run over real HTTP against a local fake of the Bot API.

use axum::{
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use secrecy::Secret;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tipster::composer::{Composer, Renderer};
use tipster::config::DispatchMode;
use tipster::engine::publisher::{Publisher, PublisherSettings, RunOutcome};
use tipster::generator::{Catalog, SyntheticGenerator};
use tipster::telegram::TelegramClient;

type Log = Arc<Mutex<Vec<Value>>>;

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn fake_bot_api(log: Log, authorized: bool) -> Router {
    Router::new()
        .route(
            "/botTOKEN/getMe",
            get(move || async move {
                if authorized {
                    (
                        StatusCode::OK,
                        Json(json!({
                            "ok": true,
                            "result": { "id": 5, "is_bot": true, "first_name": "Tipster", "username": "tipster_bot" }
                        })),
                    )
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "ok": false, "error_code": 401, "description": "Unauthorized" })),
                    )
                }
            }),
        )
        .route(
            "/botTOKEN/sendMessage",
            post(move |Json(body): Json<Value>| {
                let log = log.clone();
                async move {
                    let id = {
                        let mut log = log.lock().unwrap();
                        log.push(body);
                        log.len()
                    };
                    Json(json!({ "ok": true, "result": { "message_id": id } }))
                }
            }),
        )
}

fn publisher(base: &str, count: usize) -> Publisher {
    let client = TelegramClient::with_base_url(
        Secret::new("TOKEN".into()),
        "@tips".into(),
        Duration::from_secs(5),
        base,
    )
    .unwrap();
    let catalog = Arc::new(Catalog::default());

    Publisher::new(
        Composer::new(None, SyntheticGenerator::with_seed(catalog.clone(), 2), false),
        Renderer::with_seed(catalog, false, 2),
        Arc::new(client),
        PublisherSettings {
            predictions_per_run: count,
            mode: DispatchMode::Separate,
            pause: Duration::ZERO,
            timezone: chrono_tz::Europe::Moscow,
        },
    )
}

#[tokio::test]
async fn test_run_posts_markdown_to_channel() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let base = serve(fake_bot_api(log.clone(), true)).await;

    let report = publisher(&base, 2).publish("test").await;

    assert_eq!(report.outcome, RunOutcome::Published);
    assert_eq!(report.messages_sent, 4);

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 4);
    for body in log.iter() {
        assert_eq!(body["chat_id"], "@tips");
        assert_eq!(body["parse_mode"], "Markdown");
    }
    assert!(log[1]["text"].as_str().unwrap().contains("ПРОГНОЗ #1"));
}

#[tokio::test]
async fn test_unauthorized_bot_sends_nothing() {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let base = serve(fake_bot_api(log.clone(), false)).await;

    let report = publisher(&base, 2).publish("test").await;

    assert_eq!(report.outcome, RunOutcome::Failed);
    assert!(report.error.unwrap().contains("Unauthorized"));
    assert!(log.lock().unwrap().is_empty());
}
