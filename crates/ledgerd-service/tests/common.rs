//! Common test utilities for ledgerd integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use tempfile::TempDir;

use ledgerd_core::{OrganizationId, UserId};
use ledgerd_service::{
    create_router, AppState, GeneratedImage, GeneratorError, ImageGenerator, ServiceConfig,
};
use ledgerd_store::RocksStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// Temporary directory for the database (kept alive for test duration).
    pub _temp_dir: TempDir,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// The service API key for service-to-service requests.
    pub service_api_key: String,
}

impl TestHarness {
    /// Create a new test harness with a fresh database and no generator.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a harness whose image generator is the given stub.
    pub fn with_generator(generator: Arc<dyn ImageGenerator>) -> Self {
        Self::build(Some(generator))
    }

    fn build(generator: Option<Arc<dyn ImageGenerator>>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = RocksStore::open(temp_dir.path()).expect("Failed to open store");

        let service_api_key = "test-service-key".to_string();

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: temp_dir.path().to_string_lossy().to_string(),
            service_api_key: Some(service_api_key.clone()),
            ..ServiceConfig::default()
        };

        let mut state = AppState::new(Arc::new(store), config);
        if let Some(generator) = generator {
            state = state.with_generator(generator);
        }
        let router: Router = create_router(state);

        let server = TestServer::new(router).expect("Failed to create test server");
        let test_user_id = UserId::generate();

        Self {
            server,
            _temp_dir: temp_dir,
            test_user_id,
            service_api_key,
        }
    }

    /// Get the authorization header for user authentication.
    pub fn user_auth_header(&self) -> String {
        format!("Bearer test-token:{}", self.test_user_id)
    }

    /// Get a different user's auth header (for testing isolation).
    pub fn other_user_auth_header() -> String {
        let other_user = UserId::generate();
        format!("Bearer test-token:{other_user}")
    }

    /// A fresh organization id header value.
    pub fn organization_header() -> String {
        OrganizationId::generate().to_string()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Generator stub with a fixed outcome.
pub struct StubGenerator {
    /// Whether edits should fail.
    pub fail: bool,
}

#[async_trait]
impl ImageGenerator for StubGenerator {
    async fn edit(
        &self,
        model: &str,
        _prompt: &str,
        _image_url: Option<&str>,
    ) -> Result<GeneratedImage, GeneratorError> {
        if self.fail {
            Err(GeneratorError::Backend {
                status: 500,
                message: "backend exploded".into(),
            })
        } else {
            Ok(GeneratedImage {
                url: "https://images.example/out.png".into(),
                model: model.to_string(),
            })
        }
    }
}
