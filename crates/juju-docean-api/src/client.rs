//! DigitalOcean v1 API client
//!
//! Every response is an envelope `{"status": "OK", ...}`; anything else is
//! turned into an API error carrying the HTTP status and the provider's
//! message. Entities are decoded into private wire structs and mapped field
//! by field onto the typed models of `juju-docean-cloud`.

use crate::error::{DigitalOceanError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use juju_docean_cloud::{
    CloudError, CloudProvider, Image, Instance, InstanceSpec, InstanceStatus, Region, SshKey,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api.digitalocean.com/v1";

const USER_AGENT: &str = "juju/client";

/// Upper bound on a single API request, connect through body
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// DigitalOcean API client
pub struct DigitalOceanClient {
    client: reqwest::Client,
    client_id: String,
    api_key: String,
    api_base: String,
}

impl DigitalOceanClient {
    pub fn new(client_id: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::with_timeout(client_id, api_key, REQUEST_TIMEOUT)
    }

    /// Client whose requests fail once `timeout` has passed
    pub fn with_timeout(
        client_id: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            client_id: client_id.into(),
            api_key: api_key.into(),
            api_base: DEFAULT_API_BASE.to_string(),
        })
    }

    /// Point the client at a different API root
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, target: &str) -> String {
        format!("{}{}", self.api_base, target)
    }

    /// Issue a request and decode the payload of a successful envelope
    async fn request<T: DeserializeOwned>(
        &self,
        target: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let mut query: Vec<(&str, String)> = params.to_vec();
        query.push(("client_id", self.client_id.clone()));
        query.push(("api_key", self.api_key.clone()));

        tracing::debug!("GET {}", self.url(target));

        let response = self
            .client
            .get(self.url(target))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&query)
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        let payload = check_envelope(status, &body)?;
        Ok(serde_json::from_value(payload)?)
    }
}

/// Validate a response envelope, returning the decoded body on `status: OK`
fn check_envelope(status: u16, body: &str) -> Result<serde_json::Value> {
    let data: serde_json::Value = match serde_json::from_str(body) {
        Ok(serde_json::Value::Null) | Err(_) => {
            return Err(DigitalOceanError::Api {
                status,
                message: "No json result found".to_string(),
            });
        }
        Ok(value) => value,
    };

    if data.get("status").and_then(|s| s.as_str()) != Some("OK") {
        let message = data
            .get("message")
            .or_else(|| data.get("error_message"))
            .and_then(|m| m.as_str())
            .unwrap_or("Unknown error")
            .to_string();
        return Err(DigitalOceanError::Api { status, message });
    }

    Ok(data)
}

#[async_trait]
impl CloudProvider for DigitalOceanClient {
    fn name(&self) -> &str {
        "digitalocean"
    }

    async fn list_instances(&self) -> juju_docean_cloud::Result<Vec<Instance>> {
        let data: DropletsResponse = self.request("/droplets/", &[]).await?;
        Ok(data.droplets.into_iter().map(ApiDroplet::into_instance).collect())
    }

    async fn get_instance(&self, id: u64) -> juju_docean_cloud::Result<Instance> {
        let data: DropletResponse = self.request(&format!("/droplets/{}", id), &[]).await?;
        data.droplet
            .map(ApiDroplet::into_instance)
            .ok_or(CloudError::InstanceNotFound(id))
    }

    async fn create_instance(&self, spec: &InstanceSpec) -> juju_docean_cloud::Result<Instance> {
        let mut params = vec![
            ("name", spec.name.clone()),
            ("size_id", spec.size_id.to_string()),
            ("image_id", spec.image_id.to_string()),
            ("region_id", spec.region_id.to_string()),
            ("virtio", "true".to_string()),
            ("private_networking", spec.private_networking.to_string()),
            ("backups_enabled", spec.backups_enabled.to_string()),
        ];
        if !spec.ssh_key_ids.is_empty() {
            let ids: Vec<String> = spec.ssh_key_ids.iter().map(u64::to_string).collect();
            params.push(("ssh_key_ids", ids.join(",")));
        }

        tracing::info!("Creating droplet: {}", spec.name);
        let data: DropletResponse = self.request("/droplets/new", &params).await?;
        let droplet = data.droplet.ok_or_else(|| {
            CloudError::InvalidResponse(format!("no droplet in create response for {}", spec.name))
        })?;
        Ok(droplet.into_created_instance(spec))
    }

    async fn destroy_instance(&self, id: u64) -> juju_docean_cloud::Result<Option<u64>> {
        tracing::info!("Destroying droplet: {}", id);
        let data: DestroyResponse = self
            .request(
                &format!("/droplets/{}/destroy", id),
                &[("scrub_data", "1".to_string())],
            )
            .await?;
        Ok(data.event_id)
    }

    async fn list_images(&self) -> juju_docean_cloud::Result<Vec<Image>> {
        let data: ImagesResponse = self
            .request("/images", &[("filter", "global".to_string())])
            .await?;
        Ok(data.images.into_iter().map(ApiImage::into_image).collect())
    }

    async fn list_regions(&self) -> juju_docean_cloud::Result<Vec<Region>> {
        let data: RegionsResponse = self.request("/regions", &[]).await?;
        Ok(data
            .regions
            .into_iter()
            .map(|r| Region {
                id: r.id,
                name: r.name,
                slug: r.slug.unwrap_or_default(),
            })
            .collect())
    }

    async fn list_ssh_keys(&self) -> juju_docean_cloud::Result<Vec<SshKey>> {
        let data: SshKeysResponse = self.request("/ssh_keys", &[]).await?;
        Ok(data
            .ssh_keys
            .into_iter()
            .map(|k| SshKey {
                id: k.id,
                name: k.name,
            })
            .collect())
    }
}

// ============ API Types ============

#[derive(Debug, Deserialize)]
struct DropletsResponse {
    #[serde(default)]
    droplets: Vec<ApiDroplet>,
}

#[derive(Debug, Deserialize)]
struct DropletResponse {
    droplet: Option<ApiDroplet>,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    event_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct RegionsResponse {
    #[serde(default)]
    regions: Vec<ApiRegion>,
}

#[derive(Debug, Deserialize)]
struct SshKeysResponse {
    #[serde(default)]
    ssh_keys: Vec<ApiSshKey>,
}

#[derive(Debug, Deserialize)]
struct ApiDroplet {
    id: u64,
    #[serde(default)]
    name: String,
    size_id: Option<u64>,
    image_id: Option<u64>,
    region_id: Option<u64>,
    status: Option<String>,
    ip_address: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl ApiDroplet {
    fn into_instance(self) -> Instance {
        Instance {
            id: self.id,
            name: self.name,
            size_id: self.size_id.unwrap_or_default(),
            image_id: self.image_id.unwrap_or_default(),
            region_id: self.region_id.unwrap_or_default(),
            status: self
                .status
                .map(InstanceStatus::from)
                .unwrap_or(InstanceStatus::New),
            ip_address: self.ip_address,
            created_at: self.created_at,
        }
    }

    /// The create response omits most fields; fill them from the request
    fn into_created_instance(self, spec: &InstanceSpec) -> Instance {
        Instance {
            id: self.id,
            name: if self.name.is_empty() {
                spec.name.clone()
            } else {
                self.name
            },
            size_id: self.size_id.unwrap_or(spec.size_id),
            image_id: self.image_id.unwrap_or(spec.image_id),
            region_id: self.region_id.unwrap_or(spec.region_id),
            status: self
                .status
                .map(InstanceStatus::from)
                .unwrap_or(InstanceStatus::New),
            ip_address: self.ip_address,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    id: u64,
    #[serde(default)]
    name: String,
    slug: Option<String>,
    #[serde(default)]
    distribution: String,
    #[serde(default)]
    public: bool,
}

impl ApiImage {
    fn into_image(self) -> Image {
        Image {
            id: self.id,
            name: self.name,
            slug: self.slug,
            distribution: self.distribution,
            public: self.public,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiRegion {
    id: u64,
    #[serde(default)]
    name: String,
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiSshKey {
    id: u64,
    #[serde(default)]
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_envelope_ok() {
        let body = r#"{"status": "OK", "event_id": 42}"#;
        let data = check_envelope(200, body).unwrap();
        let parsed: DestroyResponse = serde_json::from_value(data).unwrap();
        assert_eq!(parsed.event_id, Some(42));
    }

    #[test]
    fn test_check_envelope_error_message() {
        let body = r#"{"status": "ERROR", "error_message": "Access Denied"}"#;
        match check_envelope(401, body) {
            Err(DigitalOceanError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Access Denied");
            }
            other => panic!("Expected API error, got {:?}", other),
        }
    }

    #[test]
    fn test_check_envelope_not_json() {
        let err = check_envelope(502, "<html>Bad Gateway</html>").unwrap_err();
        let cloud: CloudError = err.into();
        assert_eq!(cloud.status(), Some(502));
        assert!(cloud.to_string().contains("No json result found"));
    }

    #[test]
    fn test_droplet_mapping() {
        let body = r#"{
            "status": "OK",
            "droplets": [{
                "id": 100823,
                "name": "prod-0",
                "image_id": 420,
                "size_id": 66,
                "region_id": 8,
                "backups_active": false,
                "ip_address": "10.0.0.5",
                "private_ip_address": null,
                "locked": false,
                "status": "active",
                "created_at": "2014-03-12T19:37:08Z"
            }]
        }"#;
        let data: DropletsResponse =
            serde_json::from_value(check_envelope(200, body).unwrap()).unwrap();
        let instances: Vec<Instance> = data
            .droplets
            .into_iter()
            .map(ApiDroplet::into_instance)
            .collect();

        assert_eq!(instances.len(), 1);
        let i = &instances[0];
        assert_eq!(i.id, 100823);
        assert_eq!(i.region_id, 8);
        assert!(i.is_ready());
        assert_eq!(i.address(), Some("10.0.0.5"));
        assert!(i.created_at.is_some());
    }

    #[test]
    fn test_created_droplet_fills_from_spec() {
        let droplet = ApiDroplet {
            id: 7,
            name: String::new(),
            size_id: None,
            image_id: Some(420),
            region_id: None,
            status: None,
            ip_address: None,
            created_at: None,
        };
        let spec = InstanceSpec::new("prod-abc", 420, 66, 8, vec![1]);
        let instance = droplet.into_created_instance(&spec);

        assert_eq!(instance.name, "prod-abc");
        assert_eq!(instance.size_id, 66);
        assert_eq!(instance.region_id, 8);
        assert_eq!(instance.status, InstanceStatus::New);
        assert!(!instance.is_ready());
    }

    #[test]
    fn test_api_base_trailing_slash() {
        let client = DigitalOceanClient::new("id", "key")
            .unwrap()
            .with_api_base("http://localhost:9999/v1/");
        assert_eq!(client.url("/images"), "http://localhost:9999/v1/images");
    }

    #[tokio::test]
    async fn test_stalled_request_times_out() {
        // accepts connections but never answers
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let client = DigitalOceanClient::with_timeout("id", "key", Duration::from_millis(200))
            .unwrap()
            .with_api_base(format!("http://{}/v1", addr));

        let started = std::time::Instant::now();
        let err = client.list_ssh_keys().await.unwrap_err();
        assert!(matches!(err, CloudError::Transport(_)), "got {:?}", err);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
