//! Integration tests for `InsightsClient` against a local `wiremock` server.

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kerbside_feed::{zone_stats, FeedError, FeedOptions, InsightsClient};

fn test_options(server: &MockServer) -> FeedOptions {
    FeedOptions {
        base_url: format!("{}/dev", server.uri()),
        bays_path: "/parkingbays".to_owned(),
        api_key: None,
        timeout_secs: 5,
        user_agent: "kerbside-test/0.1".to_owned(),
        max_retries: 0,
        backoff_base_ms: 0,
        cache_ttl: Duration::ZERO,
    }
}

fn test_client(server: &MockServer) -> InsightsClient {
    InsightsClient::new(&test_options(server)).expect("failed to build test InsightsClient")
}

/// Lambda proxy response with the rows as a JSON-encoded string body.
fn envelope(rows: &serde_json::Value) -> serde_json::Value {
    json!({
        "statusCode": 200,
        "headers": {"Content-Type": "application/json"},
        "body": rows.to_string()
    })
}

async fn mount(server: &MockServer, endpoint: &str, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

async fn received(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |r| r.len())
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

#[tokio::test]
async fn parking_trends_from_envelope() {
    let server = MockServer::start().await;
    let rows = json!([
        {"Year": 2023, "Present": 2100, "Unoccupied": 1400, "Total_Sensors": 3500, "Occupancy_Rate": 0.6},
        {"Year": 2024, "Present": 2275, "Unoccupied": 1225, "Total_Sensors": 3500, "Occupancy_Rate": 0.65}
    ]);
    mount(&server, "/dev/parkingtrends", envelope(&rows)).await;

    let trends = test_client(&server).parking_trends().await.unwrap();
    assert_eq!(trends.len(), 2);
    assert_eq!(trends[1].period.as_deref(), Some("2024"));
    assert_eq!(trends[1].total_sensors, Some(3500));
}

#[tokio::test]
async fn parking_zones_roll_up_by_zone() {
    let server = MockServer::start().await;
    let rows = json!([
        {"zone_id": 7301, "on_street": "Swanston St", "street_from": "La Trobe St", "street_to": "Little Lonsdale St", "segment_id": 20045, "occupancy_rate_percent": "71.5", "total_readings": 9120, "lat": -37.8101, "lon": 144.9642},
        {"zone_id": 7301, "on_street": "Swanston St", "street_from": "La Trobe St", "street_to": "Little Lonsdale St", "segment_id": 20045, "occupancy_rate_percent": "71.5", "total_readings": 9120, "lat": -37.8103, "lon": 144.9643},
        {"zone_id": "7550", "on_street": "Flinders Ln", "street_from": null, "street_to": null, "segment_id": 21001, "occupancy_rate_percent": null, "total_readings": null, "lat": null, "lon": null}
    ]);
    mount(&server, "/dev/parkingzones", json!(rows)).await;

    let segments = test_client(&server).parking_zones().await.unwrap();
    assert_eq!(segments.len(), 3);
    assert_eq!(segments[0].on_street.as_deref(), Some("Swanston St"));

    let stats = zone_stats(&segments);
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].zone, "7301");
    assert_eq!(stats[0].segments, 1);
    assert_eq!(stats[0].bays, 2);
    assert_eq!(stats[0].occupancy_rate_percent, Some(71.5));
    assert_eq!(stats[1].bays, 0);
}

#[tokio::test]
async fn motor_census_periods() {
    let server = MockServer::start().await;
    let rows = json!([{
        "census_id": 2, "state": "VIC",
        "year_2019_2020": 5_100_000, "year_2019_2020_attrition_rate": 2.1,
        "year_2020_2021": 5_200_000, "year_2020_2021_attrition_rate": 1.8
    }]);
    mount(&server, "/dev/motorcensus", envelope(&rows)).await;

    let census = test_client(&server).motor_census().await.unwrap();
    let periods = census[0].periods();
    assert_eq!(census[0].state.as_deref(), Some("VIC"));
    assert_eq!(periods.len(), 2);
    assert_eq!(periods[1].period, "2020-2021");
    assert_eq!(periods[1].vehicles, Some(5_200_000.0));
}

#[tokio::test]
async fn population_growth_uses_populationtrends_endpoint() {
    let server = MockServer::start().await;
    let rows = json!([{"Period": "2021-2022", "Previous_Population": 149615, "Current_Population": 158000, "Growth_Absolute": 8385, "Growth_Rate_Percent": 5.6}]);
    mount(&server, "/dev/populationtrends", envelope(&rows)).await;

    let growth = test_client(&server).population_growth().await.unwrap();
    assert_eq!(growth[0].current_population, Some(158_000));
}

#[tokio::test]
async fn population_web_series() {
    let server = MockServer::start().await;
    let rows = json!([{
        "S/T code": 2, "S/T name": "Victoria", "GCCSA code": "2GMEL",
        "GCCSA name": "Greater Melbourne", "SA4 code": 206, "SA4 name": "Melbourne - Inner",
        "2019": 700_000, "2020": 715_000, "2021": 690_000
    }]);
    mount(&server, "/dev/populationweb", envelope(&rows)).await;

    let regions = test_client(&server).population_web().await.unwrap();
    let series = regions[0].series();
    assert_eq!(regions[0].gccsa_name.as_deref(), Some("Greater Melbourne"));
    assert_eq!(series.len(), 3);
    assert_eq!(series[2].year, 2021);
}

// ---------------------------------------------------------------------------
// Transport behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sends_api_key_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dev/parkingtrends"))
        .and(header("x-api-key", "insights-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let mut options = test_options(&server);
    options.api_key = Some("insights-key".to_owned());
    let client = InsightsClient::new(&options).unwrap();
    assert!(client.parking_trends().await.unwrap().is_empty());
}

#[tokio::test]
async fn envelope_error_status_is_reported() {
    let server = MockServer::start().await;
    mount(
        &server,
        "/dev/motorcensus",
        json!({"statusCode": 500, "body": "{\"error\": \"db unavailable\"}"}),
    )
    .await;

    let err = test_client(&server).motor_census().await.unwrap_err();
    assert!(
        matches!(err, FeedError::UnexpectedStatus { status: 500, .. }),
        "expected UnexpectedStatus(500), got: {err:?}"
    );
}

#[tokio::test]
async fn missing_dataset_maps_to_not_found() {
    let server = MockServer::start().await;
    let err = test_client(&server).population_web().await.unwrap_err();
    assert!(
        matches!(err, FeedError::NotFound { ref url } if url.ends_with("/dev/populationweb")),
        "expected NotFound, got: {err:?}"
    );
}

#[tokio::test]
async fn datasets_are_cached_independently() {
    let server = MockServer::start().await;
    mount(&server, "/dev/parkingtrends", json!([])).await;
    mount(&server, "/dev/parkingzones", json!([])).await;

    let mut options = test_options(&server);
    options.cache_ttl = Duration::from_secs(300);
    let client = InsightsClient::new(&options).unwrap();

    client.parking_trends().await.unwrap();
    client.parking_zones().await.unwrap();
    client.parking_trends().await.unwrap();
    client.parking_zones().await.unwrap();
    assert_eq!(received(&server).await, 2);

    client.clear_cache();
    client.parking_trends().await.unwrap();
    assert_eq!(received(&server).await, 3);
}
