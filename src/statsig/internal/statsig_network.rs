use std::collections::HashMap;

use async_trait::async_trait;
use http::header::HeaderValue;
use http::HeaderMap;
use reqwest::{Client, Response};
use serde_json::{json, Value};

use crate::statsig::statsig_adapters::{EventLoggingAdapter, SpecsAdapter};
use crate::statsig::statsig_error::StatsigError;
use crate::statsig::statsig_event::StatsigEventInternal;
use crate::StatsigOptions;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default transport: `download_config_specs` and `log_event` against the Statsig API.
pub struct StatsigNetwork {
    client: Client,
    secret: String,
    base_api: String,
    statsig_metadata: Value,
}

impl StatsigNetwork {
    pub fn new(secret_key: &str, options: &StatsigOptions) -> Self {
        StatsigNetwork {
            client: Client::new(),
            secret: secret_key.to_string(),
            base_api: options.api.trim_end_matches('/').to_string(),
            statsig_metadata: json!(HashMap::from([
                ("sdkType".to_string(), "rust-local-eval".to_string()),
                ("sdkVersion".to_string(), VERSION.to_string())
            ])),
        }
    }

    async fn make_request(
        &self,
        endpoint: &str,
        body: &mut HashMap<&str, Value>,
    ) -> Result<Response, StatsigError> {
        let url = format!("{}/{}", self.base_api, endpoint);

        let mut headers = HeaderMap::new();
        let api_key = HeaderValue::from_str(&self.secret).map_err(|e| StatsigError::NetworkError {
            status_code: None,
            message: format!("Invalid server secret: {}", e),
        })?;
        headers.insert("STATSIG-API-KEY", api_key);

        body.insert("statsigMetadata", self.statsig_metadata.clone());

        let res = self
            .client
            .post(url)
            .json(&body)
            .headers(headers)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(StatsigError::NetworkError {
                status_code: Some(res.status().as_u16()),
                message: format!("{} returned {}", endpoint, res.status()),
            });
        }

        Ok(res)
    }
}

#[async_trait]
impl SpecsAdapter for StatsigNetwork {
    async fn fetch_specs(&self, since_time: u64) -> Result<String, StatsigError> {
        let mut body = HashMap::new();
        body.insert("sinceTime", json!(since_time));

        let res = self.make_request("download_config_specs", &mut body).await?;
        Ok(res.text().await?)
    }
}

#[async_trait]
impl EventLoggingAdapter for StatsigNetwork {
    async fn log_events(&self, events: Vec<StatsigEventInternal>) -> Result<(), StatsigError> {
        let mut body: HashMap<&str, Value> = HashMap::new();
        body.insert("events", json!(events));

        self.make_request("log_event", &mut body).await?;
        Ok(())
    }
}
