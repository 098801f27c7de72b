//! Shared fixtures for the bioapi integration tests.

use rhesus_bioapi::{EbiClient, EbiConfig};
use wiremock::MockServer;

pub async fn setup_mock_server() -> MockServer {
    MockServer::start().await
}

/// An EBI client pointed at the mock server.
#[allow(dead_code)]
pub fn ebi_client(server: &MockServer) -> EbiClient {
    let config = EbiConfig {
        base_url: server.uri(),
        email: "tests@example.com".to_string(),
        ..EbiConfig::default()
    };
    EbiClient::new(config).expect("client builds")
}
