#![allow(dead_code)]

use acs_service::config::{AcsServiceConfig, AcsSettings};
use acs_service::startup::Application;
use serde_json::{json, Value};
use service_core::config::{Config, Environment};

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(Environment::Development, true).await
    }

    pub async fn spawn_with(environment: Environment, adapter_cache_enabled: bool) -> Self {
        let config = AcsServiceConfig {
            common: Config {
                port: 0, // Random port
                ..Config::default()
            },
            environment,
            acs: AcsSettings {
                session_ttl_minutes: 30,
                http_timeout_secs: Some(5),
                adapter_cache_enabled,
                adapter_cache_capacity: 16,
            },
        };

        let app = Application::build(config)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
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
        }
    }

    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(format!("{}{}", self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn provision(&self, body: &Value) -> (u16, Value) {
        let response = self.post("/v1/access/provision", body).await;
        let status = response.status().as_u16();
        (status, response.json().await.expect("Failed to parse JSON"))
    }

    pub async fn revoke(&self, body: &Value) -> (u16, Value) {
        let response = self.post("/v1/access/revoke", body).await;
        let status = response.status().as_u16();
        (status, response.json().await.expect("Failed to parse JSON"))
    }

    pub async fn test_connection(&self, configuration: &Value) -> Value {
        self.post(
            "/v1/access/test-connection",
            &json!({ "configuration": configuration }),
        )
        .await
        .json()
        .await
        .expect("Failed to parse JSON")
    }
}

pub fn visitor() -> Value {
    json!({
        "id": "visitor-1",
        "first_name": "Ada",
        "last_name": "Lovelace",
        "email": "ada@example.com",
        "company": "Analytical Engines Ltd"
    })
}

pub fn visitor_with_card() -> Value {
    let mut visitor = visitor();
    visitor["civ_piv_card_info"] = json!({
        "edipi": "1234567890",
        "fasc_n": "D13810D828AC6C10843C10C1",
        "card_number": "000777",
        "expiration_date": "2030-01-01"
    });
    visitor
}

pub fn configuration(acs_type: &str, api_endpoint: Option<&str>, credentials: Value) -> Value {
    json!({
        "id": format!("cfg-{}", acs_type),
        "tenant_id": "tenant-1",
        "name": "Headquarters",
        "acs_type": acs_type,
        "api_endpoint": api_endpoint,
        "credentials": credentials,
        "is_active": true
    })
}

pub fn ccure_configuration(base_url: &str) -> Value {
    configuration(
        "ccure9000",
        None,
        json!({
            "base_url": base_url,
            "user_name": "svc-vms",
            "password": "s3cret",
            "client_name": "VMS",
            "client_id": "client-1"
        }),
    )
}
