use std::{collections::HashMap, sync::Arc, time::Duration};

use bytes::Bytes;
use futures::stream;
use mirakurun_relay::{
    application::{
        flush_scheduler::{Binding, DrainOutcome, FlushScheduler},
        item_queue::ItemQueue,
    },
    common::{
        configuration::configuration_from,
        telemetry::{get_subscriber, init_tracing_subscriber},
    },
    domain::models::source::Source,
    infrastructure::{stream::pump_chunks, webhook::WebhookClient},
    startup::Application,
};
use once_cell::sync::Lazy;
use secrecy::Secret;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, Request, ResponseTemplate,
};

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_tracing_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_tracing_subscriber(subscriber);
    };
});

fn contents(requests: &[Request], hook_path: &str) -> Vec<String> {
    requests
        .iter()
        .filter(|request| request.url.path() == hook_path)
        .map(|request| {
            let body: serde_json::Value =
                serde_json::from_slice(&request.body).expect("Webhook body was not JSON");
            body["content"].as_str().unwrap_or_default().to_string()
        })
        .collect()
}

#[tokio::test]
async fn log_chunks_are_posted_one_per_tick_in_arrival_order() {
    Lazy::force(&TRACING);
    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/log"))
        .respond_with(ResponseTemplate::new(204))
        .expect(2)
        .mount(&webhook)
        .await;

    let log_queue = Arc::new(ItemQueue::new(Source::Log));
    let chunks: Vec<Result<Bytes, reqwest::Error>> = vec![
        Ok(Bytes::from_static(b"INFO start")),
        Ok(Bytes::from_static(b"WARN disk 90%")),
    ];
    pump_chunks("log", stream::iter(chunks), &*log_queue)
        .await
        .unwrap();
    assert_eq!(log_queue.len().await, 2);

    let scheduler = FlushScheduler::new(
        vec![Binding {
            queue: Arc::clone(&log_queue),
            webhook_url: Secret::new(format!("{}/api/webhooks/log", webhook.uri())),
            username: "Mirakurun Log".to_string(),
        }],
        Arc::new(WebhookClient::new(reqwest::Client::new())),
        Duration::from_millis(5000),
        2000,
    );

    assert_eq!(scheduler.tick().await, vec![DrainOutcome::Delivered]);
    assert_eq!(scheduler.tick().await, vec![DrainOutcome::Delivered]);

    let requests = webhook.received_requests().await.unwrap();
    assert_eq!(
        contents(&requests, "/api/webhooks/log"),
        vec!["INFO start", "WARN disk 90%"]
    );
    assert!(log_queue.is_empty().await);
}

#[tokio::test]
async fn rejected_delivery_is_retried_on_the_next_tick_without_loss() {
    Lazy::force(&TRACING);
    let mirakurun = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/log/stream"))
        .respond_with(ResponseTemplate::new(200).set_body_string("INFO start"))
        .mount(&mirakurun)
        .await;
    // the events subscriber fails on its own without stopping the relay
    Mock::given(method("GET"))
        .and(path("/api/events/stream"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mirakurun)
        .await;

    let webhook = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/log"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&webhook)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/log"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&webhook)
        .await;

    let settings = configuration_from(HashMap::from([
        ("MIRAKURUN_URL".to_string(), mirakurun.uri()),
        (
            "LOG_WEBHOOK_URL".to_string(),
            format!("{}/api/webhooks/log", webhook.uri()),
        ),
        (
            "EVENTS_WEBHOOK_URL".to_string(),
            format!("{}/api/webhooks/events", webhook.uri()),
        ),
        (
            "RELAY__RELAY__FLUSH_INTERVAL_MILLISECONDS".to_string(),
            "50".to_string(),
        ),
    ]))
    .expect("Failed to build configuration");

    let application = Application::build(settings).expect("Failed to build application");
    let log_queue = application.queue(Source::Log);
    let relay = tokio::spawn(application.run_until_stopped());

    tokio::time::sleep(Duration::from_millis(600)).await;

    let requests = webhook.received_requests().await.unwrap();
    assert_eq!(
        contents(&requests, "/api/webhooks/log"),
        vec!["INFO start", "INFO start"]
    );
    assert!(contents(&requests, "/api/webhooks/events").is_empty());
    assert!(log_queue.is_empty().await);

    relay.abort();
}
