//! Lifecycle operations against a mock SignalFx API.

use std::time::Duration;

use serde_json::json;
use signalform_provider::lifecycle::{self, ReadOutcome, ResourceState};
use signalform_provider::resources::chart::{TextChart, TextChartConfig};
use signalform_provider::resources::detector::{Detector, DetectorConfig};
use signalform_provider::resources::team::{Team, TeamConfig};
use signalform_provider::validation::Severity;
use signalform_provider::{Error, Rule, SignalFxClient, SignalformProvider};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> SignalFxClient {
    SignalFxClient::new(
        server.uri(),
        "https://app.signalfx.com",
        "test-token",
        Duration::from_secs(5),
    )
    .unwrap()
}

fn team() -> TeamConfig {
    TeamConfig {
        name: "SRE".to_string(),
        members: vec!["U1".to_string()],
        notifications_critical: vec!["PagerDuty,PD1".to_string()],
        ..TeamConfig::default()
    }
}

fn team_response(id: &str, last_updated: f64) -> serde_json::Value {
    json!({
        "id": id,
        "lastUpdated": last_updated,
        "name": "SRE",
        "members": ["U1"],
        "notificationLists": {
            "critical": [{"type": "PagerDuty", "credentialId": "PD1"}]
        }
    })
}

#[tokio::test]
async fn test_create_records_id_and_link() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/team"))
        .and(body_partial_json(json!({"name": "SRE", "members": ["U1"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(team_response("T1", 1_000.0)))
        .expect(1)
        .mount(&server)
        .await;

    let mut state = ResourceState::new(team());
    lifecycle::create(&Team, &client_for(&server), &mut state)
        .await
        .unwrap();

    assert_eq!(state.id, "T1");
    assert!(state.sync.synced);
    assert!((state.sync.last_updated - 1_000.0).abs() < f64::EPSILON);
    assert!(state.sync.url.ends_with("#/team/T1"), "{}", state.sync.url);
}

#[tokio::test]
async fn test_create_failure_carries_server_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/team"))
        .respond_with(ResponseTemplate::new(400).set_body_string("name is taken"))
        .mount(&server)
        .await;

    let mut state = ResourceState::new(team());
    let err = lifecycle::create(&Team, &client_for(&server), &mut state)
        .await
        .unwrap_err();

    match err {
        Error::Api { status, body, .. } => {
            assert_eq!(status, 400);
            assert_eq!(body, "name is taken");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!state.is_tracked());
}

#[tokio::test]
async fn test_invalid_config_never_reaches_the_api() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut config = team();
    config.notifications_major = vec!["Carrier,pigeon".to_string()];
    let mut state = ResourceState::new(config);
    let err = lifecycle::create(&Team, &client_for(&server), &mut state)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidNotification { .. }), "{err:?}");
}

#[tokio::test]
async fn test_read_gone_clears_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/team/T1"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let mut state = ResourceState::new(team());
    state.id = "T1".to_string();
    let outcome = lifecycle::read(&Team, &client_for(&server), &mut state)
        .await
        .unwrap();

    assert_eq!(outcome, ReadOutcome::Gone);
    assert!(!state.is_tracked());
}

#[tokio::test]
async fn test_read_flags_drift() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/team/T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(team_response("T1", 100_000.0)))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let mut within_tolerance = ResourceState::new(team());
    within_tolerance.id = "T1".to_string();
    within_tolerance.sync.last_updated = 95_000.0;
    lifecycle::read(&Team, &client, &mut within_tolerance)
        .await
        .unwrap();
    assert!(within_tolerance.sync.synced);

    let mut drifted = ResourceState::new(team());
    drifted.id = "T1".to_string();
    drifted.sync.last_updated = 50_000.0;
    lifecycle::read(&Team, &client, &mut drifted).await.unwrap();
    assert!(!drifted.sync.synced);
    assert!((drifted.sync.last_updated - 100_000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_read_refreshes_config() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/chart/C1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "C1",
            "lastUpdated": 5.0,
            "name": "Runbook",
            "options": {"type": "Text", "markdown": "edited in the UI"}
        })))
        .mount(&server)
        .await;

    let mut state = ResourceState::new(TextChartConfig {
        name: "Runbook".to_string(),
        markdown: "original".to_string(),
        ..TextChartConfig::default()
    });
    state.id = "C1".to_string();
    lifecycle::read(&TextChart, &client_for(&server), &mut state)
        .await
        .unwrap();
    assert_eq!(state.config.markdown, "edited in the UI");
    assert!(state.sync.url.ends_with("#/chart/v2/C1"));
}

#[tokio::test]
async fn test_update_puts_to_item_path() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v2/team/T1"))
        .and(body_partial_json(json!({"name": "SRE"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(team_response("T1", 2_000.0)))
        .expect(1)
        .mount(&server)
        .await;

    let mut state = ResourceState::new(team());
    state.id = "T1".to_string();
    state.sync.synced = false;
    lifecycle::update(&Team, &client_for(&server), &mut state)
        .await
        .unwrap();
    assert!(state.sync.synced);
    assert!((state.sync.last_updated - 2_000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_update_without_id_is_an_error() {
    let server = MockServer::start().await;
    let mut state = ResourceState::new(team());
    let err = lifecycle::update(&Team, &client_for(&server), &mut state)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MissingId { .. }));
}

#[tokio::test]
async fn test_delete_tolerates_missing_object() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v2/team/T1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v2/team/T2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let client = client_for(&server);

    for id in ["T1", "T2"] {
        let mut state = ResourceState::new(team());
        state.id = id.to_string();
        lifecycle::delete::<Team>(&client, &mut state).await.unwrap();
        assert!(!state.is_tracked());
    }
}

#[tokio::test]
async fn test_delete_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v2/team/T1"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let mut state = ResourceState::new(team());
    state.id = "T1".to_string();
    let err = lifecycle::delete::<Team>(&client_for(&server), &mut state)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 500, .. }));
    assert!(state.is_tracked());
}

#[tokio::test]
async fn test_exists() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/team/T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(team_response("T1", 1.0)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/team/T2"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let mut state = ResourceState::new(team());
    state.id = "T1".to_string();
    assert!(lifecycle::exists::<Team>(&client, &state).await.unwrap());
    state.id = "T2".to_string();
    assert!(!lifecycle::exists::<Team>(&client, &state).await.unwrap());
}

#[tokio::test]
async fn test_import_adopts_server_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/team/T1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(team_response("T1", 7_000.0)))
        .mount(&server)
        .await;

    let state = lifecycle::import(&Team, &client_for(&server), "T1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.config, team());
    assert!(state.sync.synced);
    assert!((state.sync.last_updated - 7_000.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_import_detector_with_null_collections() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v2/detector/D1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "D1",
            "creator": "U1",
            "lastUpdated": 9_000.0,
            "name": "CPU",
            "programText": "detect(when(data('cpu.utilization') > 90)).publish('cpu high')",
            "teams": null,
            "tags": null,
            "rules": [{"severity": "Critical", "detectLabel": "cpu high", "notifications": null}],
            "visualizationOptions": null,
            "status": "ACTIVE"
        })))
        .mount(&server)
        .await;

    let state = lifecycle::import(&Detector, &client_for(&server), "D1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.id, "D1");
    assert!(state.config.teams.is_empty());
    assert!(state.config.tags.is_empty());
    assert_eq!(state.config.rule.len(), 1);
    assert!((state.sync.last_updated - 9_000.0).abs() < f64::EPSILON);
}

fn detector() -> DetectorConfig {
    let mut rule = Rule::new(Severity::Critical, "cpu high");
    rule.notifications = vec!["Email,oncall@example.com".to_string()];
    DetectorConfig {
        name: "CPU".to_string(),
        program_text: "detect(when(data('cpu.utilization') > 90)).publish('cpu high')".to_string(),
        rule: vec![rule].into(),
        ..DetectorConfig::default()
    }
}

#[tokio::test]
async fn test_detector_program_validated_before_create() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/detector/validate"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/detector"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "D1", "lastUpdated": 1.0})))
        .expect(1)
        .mount(&server)
        .await;

    let mut state = ResourceState::new(detector());
    lifecycle::create(&Detector, &client_for(&server), &mut state)
        .await
        .unwrap();
    assert_eq!(state.id, "D1");
    assert!(state.sync.url.ends_with("#/detector/v2/D1/edit"));
}

#[tokio::test]
async fn test_detector_rejected_program_aborts_create() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/detector/validate"))
        .respond_with(ResponseTemplate::new(400).set_body_string("detect label 'cpu high' not found"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v2/detector"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut state = ResourceState::new(detector());
    let err = lifecycle::create(&Detector, &client_for(&server), &mut state)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"), "{err}");
}

#[tokio::test]
async fn test_provider_round_trips_state_documents() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v2/team"))
        .respond_with(ResponseTemplate::new(200).set_body_json(team_response("T1", 1_000.0)))
        .mount(&server)
        .await;
    let provider = SignalformProvider::new(client_for(&server));

    let state = provider
        .create("signalform_team", serde_json::to_value(ResourceState::new(team())).unwrap())
        .await
        .unwrap();
    assert_eq!(state["id"], "T1");
    assert_eq!(state["name"], "SRE");
    assert_eq!(state["synced"], true);

    let err = provider
        .create("signalform_alert_muting_rule", json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownResourceType { .. }));
}
