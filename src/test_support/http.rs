use httpmock::MockServer;

/// Starts a fresh `httpmock::MockServer` for a REST backend test.
pub async fn start_mock_server() -> MockServer {
    MockServer::start_async().await
}
