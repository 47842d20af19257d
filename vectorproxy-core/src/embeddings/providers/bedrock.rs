//! Amazon Bedrock embedding provider (Titan text embeddings)

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_bedrockruntime::error::DisplayErrorContext;
use aws_sdk_bedrockruntime::primitives::Blob;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::EmbeddingProvider;
use crate::config::{DEFAULT_EMBEDDING_MODEL, EmbeddingsConfig};
use crate::error::{ProxyError, Result};

const DEFAULT_REGION: &str = "us-west-2";

/// How requests reach the Bedrock runtime
enum Transport {
    /// SigV4-signed `InvokeModel` through the AWS SDK credential chain
    Sdk(aws_sdk_bedrockruntime::Client),
    /// Bedrock API key sent as a bearer token
    ApiKey {
        client: reqwest::Client,
        endpoint: String,
    },
}

/// Bedrock embeddings over the runtime `InvokeModel` API.
pub struct BedrockEmbeddings {
    transport: Transport,
    model: String,
    dimensions: usize,
}

/// Titan Embeddings Text request.
///
/// `dimensions` is only understood by Titan Text V2 (1024, 512 or 256).
#[derive(Serialize)]
struct TitanRequest<'a> {
    #[serde(rename = "inputText")]
    input_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct TitanResponse {
    embedding: Vec<f32>,
    #[serde(rename = "inputTextTokenCount", default)]
    input_text_token_count: usize,
}

impl BedrockEmbeddings {
    /// Create a provider from configuration.
    ///
    /// With an API key (`embeddings.api_key` or `AWS_BEARER_TOKEN_BEDROCK`)
    /// requests carry it as a bearer token. Otherwise the AWS default
    /// credential chain signs them: environment keys, shared profiles, SSO,
    /// web identity and instance or task roles.
    ///
    /// The region comes from `embeddings.region`, then the AWS region chain
    /// (`AWS_REGION`, profile), then us-west-2.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// HTTP client cannot be built.
    pub async fn new(config: &EmbeddingsConfig) -> Result<Self> {
        match configured_api_key(config) {
            Some(key) => Self::with_api_key(config, &key),
            None => {
                let sdk_config = load_sdk_config(config).await;
                Ok(Self::with_sdk_config(config, &sdk_config))
            }
        }
    }

    /// Provider signing requests with an already loaded AWS configuration.
    pub fn with_sdk_config(config: &EmbeddingsConfig, sdk_config: &SdkConfig) -> Self {
        Self {
            transport: Transport::Sdk(aws_sdk_bedrockruntime::Client::new(sdk_config)),
            model: config.model.clone(),
            dimensions: config.dimensions,
        }
    }

    /// Provider authenticating with a Bedrock API key.
    pub fn with_api_key(config: &EmbeddingsConfig, api_key: &str) -> Result<Self> {
        let region = config
            .region
            .clone()
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{region}.amazonaws.com"));

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let value = HeaderValue::from_str(&format!("Bearer {}", api_key.trim()))
            .map_err(|e| ProxyError::Configuration(format!("Invalid Bedrock API key: {}", e)))?;
        headers.insert(AUTHORIZATION, value);

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| {
                ProxyError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            transport: Transport::ApiKey {
                client,
                endpoint: format!(
                    "{}/model/{}/invoke",
                    base_url.trim_end_matches('/'),
                    encode_model_id(&config.model)
                ),
            },
            model: config.model.clone(),
            dimensions: config.dimensions,
        })
    }

    /// True when requests carry a bearer API key instead of SigV4 signatures.
    pub fn uses_api_key(&self) -> bool {
        matches!(self.transport, Transport::ApiKey { .. })
    }

    /// Invoke URL used with an API key; the SDK resolves its own endpoint.
    pub fn endpoint(&self) -> Option<&str> {
        match &self.transport {
            Transport::ApiKey { endpoint, .. } => Some(endpoint),
            Transport::Sdk(_) => None,
        }
    }

    fn supports_dimensions(&self) -> bool {
        self.model == DEFAULT_EMBEDDING_MODEL
    }

    async fn invoke_sdk(
        &self,
        client: &aws_sdk_bedrockruntime::Client,
        payload: Vec<u8>,
    ) -> Result<TitanResponse> {
        let output = client
            .invoke_model()
            .model_id(&self.model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(payload))
            .send()
            .await
            .map_err(|e| {
                ProxyError::Embedding(format!(
                    "Bedrock InvokeModel failed: {}",
                    DisplayErrorContext(&e)
                ))
            })?;

        parse_response(output.body().as_ref())
    }

    async fn invoke_with_key(
        &self,
        client: &reqwest::Client,
        endpoint: &str,
        payload: Vec<u8>,
    ) -> Result<TitanResponse> {
        let response = client
            .post(endpoint)
            .body(payload)
            .send()
            .await
            .map_err(|e| ProxyError::Embedding(format!("Bedrock request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ProxyError::Embedding(format!(
                "Bedrock InvokeModel failed with status {}: {}",
                status, body
            )));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| ProxyError::Embedding(format!("Failed to read Bedrock response: {}", e)))?;
        parse_response(&body)
    }
}

fn configured_api_key(config: &EmbeddingsConfig) -> Option<String> {
    config
        .api_key
        .clone()
        .or_else(|| std::env::var("AWS_BEARER_TOKEN_BEDROCK").ok())
        .filter(|k| !k.trim().is_empty())
}

/// Load the AWS configuration for the default credential chain.
///
/// Retries are disabled; a failed field is left without an embedding.
async fn load_sdk_config(config: &EmbeddingsConfig) -> SdkConfig {
    let region = RegionProviderChain::first_try(config.region.clone().map(Region::new))
        .or_default_provider()
        .or_else(Region::new(DEFAULT_REGION));

    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(region)
        .retry_config(RetryConfig::disabled())
        .timeout_config(
            TimeoutConfig::builder()
                .operation_timeout(config.timeout)
                .build(),
        );

    if let Some(endpoint) = &config.base_url {
        loader = loader.endpoint_url(endpoint);
    }

    loader.load().await
}

fn parse_response(body: &[u8]) -> Result<TitanResponse> {
    serde_json::from_slice(body)
        .map_err(|e| ProxyError::Embedding(format!("Failed to parse Bedrock response: {}", e)))
}

/// Percent-encode the characters Bedrock model ids may carry (`:` in versions).
fn encode_model_id(model: &str) -> String {
    model.replace(':', "%3A").replace('/', "%2F")
}

#[async_trait]
impl EmbeddingProvider for BedrockEmbeddings {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = TitanRequest {
            input_text: text,
            dimensions: self.supports_dimensions().then_some(self.dimensions),
        };
        let payload = serde_json::to_vec(&request)?;

        let parsed = match &self.transport {
            Transport::Sdk(client) => self.invoke_sdk(client, payload).await?,
            Transport::ApiKey { client, endpoint } => {
                self.invoke_with_key(client, endpoint, payload).await?
            }
        };

        tracing::trace!(
            model = %self.model,
            tokens = parsed.input_text_token_count,
            "bedrock embedding generated"
        );

        Ok(parsed.embedding)
    }

    fn dimension(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}
