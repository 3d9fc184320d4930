use cardstream_core::{
    Fields,
    signature::{MerchantSecret, sign_fields},
};
use http::header::CONTENT_TYPE;
use url::Url;

use crate::{concepts::GatewayClient, config::GatewayConfig, errors::GatewayClientError};

/// A gateway client that posts form-encoded requests over HTTP.
#[derive(Debug, Clone)]
pub struct HttpGatewayClient {
    pub endpoint: Url,
    pub secret: MerchantSecret,
    pub client: reqwest::Client,
}

impl HttpGatewayClient {
    pub fn new(endpoint: Url, secret: MerchantSecret) -> Self {
        HttpGatewayClient {
            endpoint,
            secret,
            client: reqwest::Client::new(),
        }
    }

    /// A client for the configured direct endpoint with the configured
    /// request timeout.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayClientError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(HttpGatewayClient {
            endpoint: config.direct_endpoint(),
            secret: config.secret.clone(),
            client,
        })
    }

    /// Posts to `endpoint` instead, such as a 3-D Secure test gateway.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }
}

impl GatewayClient for HttpGatewayClient {
    type Error = GatewayClientError;

    async fn direct_request(&self, request: Fields) -> Result<Fields, Self::Error> {
        let body = sign_fields(request, &self.secret).to_query();

        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %self.endpoint, "Posting direct request to gateway");

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            #[cfg(feature = "tracing")]
            tracing::warn!(%status, "Gateway answered with an error status");

            return Err(GatewayClientError::HttpStatus(status));
        }

        let fields = Fields::parse(&response.text().await?);
        if fields.is_empty() {
            return Err(GatewayClientError::EmptyResponse);
        }
        Ok(fields)
    }
}
