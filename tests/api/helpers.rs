use marketing_api::configuration::{Settings, StorageSettings, get_configuration};
use marketing_api::startup::Application;
use marketing_api::telemetry::{get_subscriber, init_subscriber};
use secrecy::Secret;
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;
use uuid::Uuid;
use wiremock::MockServer;

// Ensure that the `tracing` stack is only initialised once
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber).expect("Failed to initialise tracing.");
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber).expect("Failed to initialise tracing.");
    };
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub db_pool: SqlitePool,
    pub email_server: MockServer,
    pub api_client: reqwest::Client,
    pub admin_api_key: String,
}

impl TestApp {
    pub async fn post_subscribe<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(&format!("{}/subscribe", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_subscribe_raw(&self, body: &'static str) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/subscribe", &self.address))
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_contact<Body>(&self, body: &Body) -> reqwest::Response
    where
        Body: serde::Serialize,
    {
        self.api_client
            .post(&format!("{}/contact", &self.address))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_subscribers(&self) -> reqwest::Response {
        self.get_as_admin("subscribers", "admin", &self.admin_api_key)
            .await
    }

    pub async fn get_messages(&self) -> reqwest::Response {
        self.get_as_admin("messages", "admin", &self.admin_api_key)
            .await
    }

    pub async fn get_as_admin(
        &self,
        resource: &str,
        username: &str,
        password: &str,
    ) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/{}", &self.address, resource))
            .basic_auth(username, Some(password))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_fetch_feed(&self, url: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}/fetch-feed", &self.address))
            .query(&[("url", url)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    /// Emails are sent from detached tasks, so they may land after the
    /// response. Polls the mock email API until `count` requests arrived.
    pub async fn wait_for_emails(&self, count: usize) -> Vec<wiremock::Request> {
        for _ in 0..50 {
            let received = self
                .email_server
                .received_requests()
                .await
                .unwrap_or_default();
            if received.len() >= count {
                return received;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        panic!("Expected {} email requests to be sent.", count);
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Spawns the application with a fresh database and mock email API,
/// letting the caller tweak the configuration first.
pub async fn spawn_app_with<F>(customise: F) -> TestApp
where
    F: FnOnce(&mut Settings),
{
    LazyLock::force(&TRACING);

    // Launch a mock server to stand in for the email API
    let email_server = MockServer::start().await;
    let database_path = std::env::temp_dir().join(format!("{}.db", Uuid::new_v4()));
    let admin_api_key = Uuid::new_v4().to_string();

    // Randomise configuration to ensure test isolation
    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        c.storage = StorageSettings::Sqlite {
            database_path: database_path.display().to_string(),
            create_if_missing: true,
        };
        // Use a random OS port
        c.application.port = 0;
        c.application.host = "127.0.0.1".to_string();
        c.application.admin_api_key = Secret::new(admin_api_key.clone());
        // Use the mock server as email API
        c.email_client.base_url = email_server.uri();
        customise(&mut c);
        c
    };

    // Launch the application as a background task
    let application = Application::build(configuration)
        .await
        .expect("Failed to build application.");
    let application_port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    let client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        port: application_port,
        db_pool: connect(database_path).await,
        email_server,
        api_client: client,
        admin_api_key,
    }
}

async fn connect(database_path: PathBuf) -> SqlitePool {
    SqlitePool::connect_with(SqliteConnectOptions::new().filename(database_path))
        .await
        .expect("Failed to connect to the test database.")
}
