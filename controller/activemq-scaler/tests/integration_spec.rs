//! Integration tests for the ActiveMQ scaler against a stubbed Jolokia endpoint
//!
//! Tests cover:
//! - Request shape (path, basic auth, content type)
//! - Dual status validation and decode failures
//! - Cancellation and timeouts
//! - restAPITemplate handling end to end

use activemq_scaler::{
    monitoring::monitoring_endpoint, parse_rest_api_template, ActiveMqScaler, ErrorKind, Scaler,
    ScalerError, TriggerConfig,
};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{basic_auth, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const QUEUE_SIZE_PATH: &str = "/api/jolokia/read/org.apache.activemq:type=Broker,brokerName=localhost,destinationType=Queue,destinationName=testQueue/QueueSize";

fn trigger_config(mock_server: &MockServer) -> TriggerConfig {
    let mut config = TriggerConfig::default();
    config.trigger_metadata.insert(
        "managementEndpoint".to_string(),
        mock_server.address().to_string(),
    );
    config
        .trigger_metadata
        .insert("destinationName".to_string(), "testQueue".to_string());
    config
        .trigger_metadata
        .insert("brokerName".to_string(), "localhost".to_string());
    config
        .auth_params
        .insert("username".to_string(), "admin".to_string());
    config
        .auth_params
        .insert("password".to_string(), "secret".to_string());
    config
}

fn jolokia_body(value: i64, status: i64) -> serde_json::Value {
    json!({
        "request": {
            "mbean": "org.apache.activemq:brokerName=localhost,destinationName=testQueue,destinationType=Queue,type=Broker",
            "attribute": "QueueSize",
            "type": "read"
        },
        "value": value,
        "timestamp": 1_700_000_000,
        "status": status
    })
}

#[tokio::test]
async fn test_poll_sends_authenticated_json_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE_SIZE_PATH))
        .and(basic_auth("admin", "secret"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(jolokia_body(3, 200)))
        .expect(2)
        .mount(&mock_server)
        .await;

    let scaler = ActiveMqScaler::new(&trigger_config(&mock_server)).unwrap();
    let cancel = CancellationToken::new();

    assert!(scaler.is_active(&cancel).await.unwrap());

    let values = scaler
        .metrics("s0-activemq-testQueue", &cancel)
        .await
        .unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].value, 3);
}

#[tokio::test]
async fn test_empty_queue_is_inactive() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE_SIZE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jolokia_body(0, 200)))
        .mount(&mock_server)
        .await;

    let scaler = ActiveMqScaler::new(&trigger_config(&mock_server)).unwrap();
    let cancel = CancellationToken::new();

    assert!(!scaler.is_active(&cancel).await.unwrap());
    let values = scaler.metrics("m", &cancel).await.unwrap();
    assert_eq!(values[0].value, 0);
}

#[tokio::test]
async fn test_payload_status_mismatch_names_both_codes() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE_SIZE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jolokia_body(12, 500)))
        .mount(&mock_server)
        .await;

    let scaler = ActiveMqScaler::new(&trigger_config(&mock_server)).unwrap();
    let err = scaler
        .metrics("m", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(matches!(
        err.root(),
        ScalerError::StatusMismatch {
            http_status: 200,
            payload_status: 500
        }
    ));
    assert!(err.to_string().contains("200 500"));
}

#[tokio::test]
async fn test_http_status_mismatch() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE_SIZE_PATH))
        .respond_with(ResponseTemplate::new(503).set_body_json(jolokia_body(12, 200)))
        .mount(&mock_server)
        .await;

    let scaler = ActiveMqScaler::new(&trigger_config(&mock_server)).unwrap();
    let err = scaler
        .is_active(&CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ScalerError::StatusMismatch {
            http_status: 503,
            payload_status: 200
        }
    ));
}

#[tokio::test]
async fn test_undecodable_body_is_protocol_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE_SIZE_PATH))
        .respond_with(ResponseTemplate::new(401).set_body_string("<html>Unauthorized</html>"))
        .mount(&mock_server)
        .await;

    let scaler = ActiveMqScaler::new(&trigger_config(&mock_server)).unwrap();
    let err = scaler
        .is_active(&CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(matches!(err, ScalerError::Decode { http_status: 401, .. }));
}

#[tokio::test]
async fn test_cancellation_aborts_in_flight_poll() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE_SIZE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jolokia_body(3, 200))
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&mock_server)
        .await;

    let mut config = trigger_config(&mock_server);
    config.global_http_timeout_ms = 60_000;
    let scaler = ActiveMqScaler::new(&config).unwrap();

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(Duration::from_secs(5), scaler.metrics("m", &cancel))
        .await
        .expect("cancelled poll must return promptly");
    let err = result.unwrap_err();
    assert!(matches!(err.root(), ScalerError::Cancelled));
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[tokio::test]
async fn test_request_timeout_is_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(QUEUE_SIZE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(jolokia_body(3, 200))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&mock_server)
        .await;

    let mut config = trigger_config(&mock_server);
    config.global_http_timeout_ms = 100;
    let scaler = ActiveMqScaler::new(&config).unwrap();

    let err = scaler
        .is_active(&CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ScalerError::Transport { .. }));
}

#[tokio::test]
async fn test_custom_template_supplies_identity_only() {
    let mock_server = MockServer::start().await;

    // The request still targets the default Jolokia path on the template's host
    Mock::given(method("GET"))
        .and(path(QUEUE_SIZE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jolokia_body(8, 200)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = trigger_config(&mock_server);
    config.trigger_metadata.remove("managementEndpoint");
    config
        .trigger_metadata
        .insert("brokerName".to_string(), "ignored".to_string());
    config.trigger_metadata.insert(
        "restAPITemplate".to_string(),
        format!(
            "http://{}/custom/read/org.apache.activemq:type=Broker,brokerName=localhost,destinationType=Queue,destinationName=testQueue",
            mock_server.address()
        ),
    );

    let scaler = ActiveMqScaler::new(&config).unwrap();
    assert_eq!(scaler.metadata().broker_name, "localhost");

    let values = scaler.metrics("m", &CancellationToken::new()).await.unwrap();
    assert_eq!(values[0].value, 8);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let mock_server = MockServer::start().await;
    let mut config = trigger_config(&mock_server);

    // Reserve a port, then release it so nothing is listening there
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed_addr = listener.local_addr().unwrap();
    drop(listener);
    config
        .trigger_metadata
        .insert("managementEndpoint".to_string(), closed_addr.to_string());

    let scaler = ActiveMqScaler::new(&config).unwrap();
    let err = scaler
        .metrics("m", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
}

#[test]
fn test_rendered_url_round_trips_identity() {
    for (endpoint, broker, destination) in [
        ("localhost:8161", "localhost", "testQueue"),
        ("amq.prod.internal:443", "amq-0", "orders-eu"),
        ("10.0.0.5:8161", "b", "q"),
    ] {
        let mut config = TriggerConfig::default();
        config
            .trigger_metadata
            .insert("managementEndpoint".to_string(), endpoint.to_string());
        config
            .trigger_metadata
            .insert("brokerName".to_string(), broker.to_string());
        config
            .trigger_metadata
            .insert("destinationName".to_string(), destination.to_string());
        config
            .trigger_metadata
            .insert("username".to_string(), "u".to_string());
        config
            .trigger_metadata
            .insert("password".to_string(), "p".to_string());

        let metadata = activemq_scaler::ScalerMetadata::parse(&config).unwrap();
        let url = monitoring_endpoint(&metadata).unwrap();
        let parsed = parse_rest_api_template(&url).unwrap();

        assert_eq!(parsed.management_endpoint, endpoint);
        assert_eq!(parsed.broker_name, broker);
        assert_eq!(parsed.destination_name, destination);
    }
}
