#![allow(dead_code)]

use service_core::config::Config as CoreConfig;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use wellness_service::config::WellnessConfig;
use wellness_service::models::ConversationSession;
use wellness_service::services::providers::mock::MockProvider;
use wellness_service::startup::Application;

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
    pub provider: Arc<MockProvider>,
    /// The shared conversation, when the app runs with a shared scope.
    pub session: Option<Arc<ConversationSession>>,
    /// Kept alive for the lifetime of the app; removed on drop.
    pub staging: TempDir,
}

/// Config for tests: mock provider, random port, staging under `staging_dir`.
pub fn test_config(staging_dir: &Path, overrides: &[(&str, &str)]) -> WellnessConfig {
    let mut env: HashMap<String, String> = HashMap::from([
        ("GOOGLE_API_KEY".to_string(), "test-api-key".to_string()),
        ("WELLNESS_PROVIDER".to_string(), "mock".to_string()),
        (
            "WELLNESS_STAGING_DIR".to_string(),
            staging_dir.display().to_string(),
        ),
    ]);
    for (key, value) in overrides {
        env.insert(key.to_string(), value.to_string());
    }
    let lookup = move |key: &str| env.get(key).cloned();

    let common = CoreConfig {
        port: 0, // Random port for testing
        log_level: "info".to_string(),
    };

    WellnessConfig::from_lookup(common, &lookup, false).expect("Failed to build test configuration")
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(MockProvider::new(), &[]).await
    }

    pub async fn spawn_with(provider: MockProvider, overrides: &[(&str, &str)]) -> Self {
        let staging = tempfile::tempdir().expect("Failed to create staging dir");
        let config = test_config(staging.path(), overrides);
        let provider = Arc::new(provider);

        let app = Application::build_with_provider(config, provider.clone())
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let session = app.session();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server by polling the health endpoint
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }

        TestApp {
            address,
            port,
            client,
            provider,
            session,
            staging,
        }
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn post_form(&self, path: &str, form: reqwest::multipart::Form) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Files currently left in the staging directory.
    pub fn staged_files(&self) -> Vec<std::path::PathBuf> {
        std::fs::read_dir(self.staging.path())
            .expect("Failed to read staging dir")
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .collect()
    }
}

/// A multipart file part with a name and content type.
pub fn file_part(bytes: &[u8], file_name: &str, mime: &str) -> reqwest::multipart::Part {
    reqwest::multipart::Part::bytes(bytes.to_vec())
        .file_name(file_name.to_string())
        .mime_str(mime)
        .expect("valid mime type")
}
