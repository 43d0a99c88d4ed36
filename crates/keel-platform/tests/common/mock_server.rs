//! Mock server helpers for platform API tests
//!
//! Mocks mounted earlier win while they still have uses left, so a
//! sequence of responses is built by mounting limited mocks in order.

use serde_json::Value;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Respond with a JSON body, at most `times` times
pub async fn mock_json_times(
    server: &MockServer,
    http_method: &str,
    url_path: &str,
    status: u16,
    body: Value,
    times: u64,
) {
    Mock::given(method(http_method))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .up_to_n_times(times)
        .mount(server)
        .await;
}

/// Respond with a JSON body for every matching request
pub async fn mock_json(
    server: &MockServer,
    http_method: &str,
    url_path: &str,
    status: u16,
    body: Value,
) {
    Mock::given(method(http_method))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// Respond with a bare status and text body for every matching request
pub async fn mock_status(
    server: &MockServer,
    http_method: &str,
    url_path: &str,
    status: u16,
    body: &str,
) {
    Mock::given(method(http_method))
        .and(path(url_path))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Serve `{"status": ...}` bodies in order, repeating the last one forever
pub async fn mock_status_sequence(server: &MockServer, url_path: &str, statuses: &[&str]) {
    let Some((last, leading)) = statuses.split_last() else {
        return;
    };
    for status in leading {
        mock_json_times(
            server,
            "GET",
            url_path,
            200,
            serde_json::json!({ "status": status }),
            1,
        )
        .await;
    }
    mock_json(
        server,
        "GET",
        url_path,
        200,
        serde_json::json!({ "status": last }),
    )
    .await;
}

/// All received requests as "METHOD /path", oldest first
pub async fn request_log(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|r| format!("{} {}", r.method, r.url.path()))
        .collect()
}

/// Number of received requests matching method and path
pub async fn count_requests(server: &MockServer, http_method: &str, url_path: &str) -> usize {
    let wanted = format!("{} {}", http_method, url_path);
    request_log(server)
        .await
        .into_iter()
        .filter(|entry| *entry == wanted)
        .count()
}
