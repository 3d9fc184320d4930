//! Gateway configuration.
//!
//! A [`GatewayConfig`] can be built in code, deserialised with serde, or read
//! from `CARDSTREAM_*` environment variables with [`GatewayConfig::from_env`].

use std::{str::FromStr, sync::LazyLock, time::Duration};

use bon::Builder;
use cardstream_core::{integration::IntegrationType, signature::MerchantSecret};
use regex::Regex;
use serde::Deserialize;
use url::Url;
use url_macro::url;

use crate::errors::ConfigError;

pub const ENV_MERCHANT_ID: &str = "CARDSTREAM_MERCHANT_ID";
pub const ENV_SECRET: &str = "CARDSTREAM_SECRET";
pub const ENV_GATEWAY_URL: &str = "CARDSTREAM_GATEWAY_URL";
pub const ENV_INTEGRATION_TYPE: &str = "CARDSTREAM_INTEGRATION_TYPE";
pub const ENV_REDIRECT_URL: &str = "CARDSTREAM_REDIRECT_URL";
pub const ENV_FORM_RESPONSIVE: &str = "CARDSTREAM_FORM_RESPONSIVE";
pub const ENV_COUNTRY_CODE: &str = "CARDSTREAM_COUNTRY_CODE";
pub const ENV_CURRENCY_CODE: &str = "CARDSTREAM_CURRENCY_CODE";
pub const ENV_WALLETS_ENABLED: &str = "CARDSTREAM_WALLETS_ENABLED";
pub const ENV_ORDER_STATUS: &str = "CARDSTREAM_ORDER_STATUS";
pub const ENV_SUCCESSFUL_STATUS: &str = "CARDSTREAM_SUCCESSFUL_STATUS";
pub const ENV_UNSUCCESSFUL_STATUS: &str = "CARDSTREAM_UNSUCCESSFUL_STATUS";
pub const ENV_GATEWAY_NAME: &str = "CARDSTREAM_GATEWAY_NAME";
pub const ENV_REQUEST_TIMEOUT: &str = "CARDSTREAM_REQUEST_TIMEOUT_SECS";

static GATEWAY_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://[a-z0-9.\-]+(?::\d+)?(?:/[a-z0-9_\-]+)+/?$")
        .expect("gateway url pattern is valid")
});

pub fn hosted_endpoint() -> Url {
    url!("https://gateway.cardstream.com/hosted/")
}

pub fn hosted_modal_endpoint() -> Url {
    url!("https://gateway.cardstream.com/hosted/modal/")
}

pub fn direct_endpoint() -> Url {
    url!("https://gateway.cardstream.com/direct/")
}

pub fn threeds_v2_hosted_endpoint() -> Url {
    url!("https://test.3ds-pit.com/hosted/")
}

pub fn threeds_v2_direct_endpoint() -> Url {
    url!("https://test.3ds-pit.com/direct/")
}

/// Normalises a configured gateway URL.
///
/// Values that are not `http(s)://host/path` fall back to the default
/// endpoint for the integration. `http` is upgraded to `https` and the path
/// always ends with `/`. A hosted integration pointed at a `/direct/` URL is
/// reset to the hosted endpoint.
pub fn normalize_gateway_url(raw: Option<&str>, integration: IntegrationType) -> Url {
    let fallback = if integration.is_direct() {
        direct_endpoint()
    } else {
        hosted_endpoint()
    };

    let Some(mut url) = raw
        .map(str::trim)
        .filter(|raw| GATEWAY_URL.is_match(raw))
        .and_then(|raw| Url::parse(raw).ok())
    else {
        return fallback;
    };

    if url.scheme() == "http" && url.set_scheme("https").is_err() {
        return fallback;
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    if integration.is_hosted() && url.path().to_ascii_lowercase().ends_with("/direct/") {
        return hosted_endpoint();
    }
    url
}

/// Merchant and storefront settings for one gateway account.
#[derive(Builder, Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Merchant account id issued by the gateway.
    #[builder(into)]
    pub merchant_id: String,
    /// Pre-shared signing key.
    pub secret: MerchantSecret,
    /// Gateway URL as configured. Use [`GatewayConfig::gateway_url`] for the
    /// normalised value.
    #[builder(into)]
    #[serde(default)]
    pub custom_gateway_url: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub integration_type: IntegrationType,
    /// The storefront URL the gateway and the ACS post back to.
    pub redirect_url: Url,
    /// Ask the hosted form to render responsively.
    #[builder(default)]
    #[serde(default)]
    pub form_responsive: bool,
    /// ISO-3166 numeric country code of the merchant.
    #[builder(into, default = String::from("826"))]
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// ISO-4217 numeric currency code sent with every sale.
    #[builder(into, default = String::from("826"))]
    #[serde(default = "default_currency_code")]
    pub currency_code: String,
    /// Offer stored wallets to logged-in customers on the modal form.
    #[builder(default)]
    #[serde(default)]
    pub wallets_enabled: bool,
    /// Order status while a payment is in progress.
    #[builder(into, default = String::from("pending_payment"))]
    #[serde(default = "default_order_status")]
    pub order_status: String,
    #[builder(into, default = String::from("processing"))]
    #[serde(default = "default_successful_status")]
    pub successful_status: String,
    #[builder(into, default = String::from("canceled"))]
    #[serde(default = "default_unsuccessful_status")]
    pub unsuccessful_status: String,
    /// Label shown on the hosted redirect button.
    #[builder(into, default = String::from("Cardstream"))]
    #[serde(default = "default_gateway_name")]
    pub gateway_name: String,
    #[builder(default = 30)]
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_country_code() -> String {
    "826".to_owned()
}

fn default_currency_code() -> String {
    "826".to_owned()
}

fn default_order_status() -> String {
    "pending_payment".to_owned()
}

fn default_successful_status() -> String {
    "processing".to_owned()
}

fn default_unsuccessful_status() -> String {
    "canceled".to_owned()
}

fn default_gateway_name() -> String {
    "Cardstream".to_owned()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl GatewayConfig {
    /// Reads the configuration from `CARDSTREAM_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let redirect_url = required(&lookup, ENV_REDIRECT_URL)?;
        let redirect_url = Url::parse(&redirect_url).map_err(|_| ConfigError::Invalid {
            name: ENV_REDIRECT_URL,
            value: redirect_url,
        })?;

        Ok(GatewayConfig::builder()
            .merchant_id(required(&lookup, ENV_MERCHANT_ID)?)
            .secret(MerchantSecret::new(required(&lookup, ENV_SECRET)?)?)
            .maybe_custom_gateway_url(optional(&lookup, ENV_GATEWAY_URL))
            .maybe_integration_type(parsed(&lookup, ENV_INTEGRATION_TYPE)?)
            .redirect_url(redirect_url)
            .maybe_form_responsive(flag(&lookup, ENV_FORM_RESPONSIVE)?)
            .maybe_country_code(optional(&lookup, ENV_COUNTRY_CODE))
            .maybe_currency_code(optional(&lookup, ENV_CURRENCY_CODE))
            .maybe_wallets_enabled(flag(&lookup, ENV_WALLETS_ENABLED)?)
            .maybe_order_status(optional(&lookup, ENV_ORDER_STATUS))
            .maybe_successful_status(optional(&lookup, ENV_SUCCESSFUL_STATUS))
            .maybe_unsuccessful_status(optional(&lookup, ENV_UNSUCCESSFUL_STATUS))
            .maybe_gateway_name(optional(&lookup, ENV_GATEWAY_NAME))
            .maybe_request_timeout_secs(parsed(&lookup, ENV_REQUEST_TIMEOUT)?)
            .build())
    }

    /// The normalised gateway URL.
    pub fn gateway_url(&self) -> Url {
        normalize_gateway_url(self.custom_gateway_url.as_deref(), self.integration_type)
    }

    /// Where the hosted payment form is posted.
    pub fn hosted_endpoint(&self) -> Url {
        match self.integration_type {
            IntegrationType::HostedModal => self
                .gateway_url()
                .join("modal/")
                .unwrap_or_else(|_| hosted_modal_endpoint()),
            IntegrationType::HostedThreeDsV2 => threeds_v2_hosted_endpoint(),
            _ => self.gateway_url(),
        }
    }

    /// Where server-to-server requests are posted.
    ///
    /// Hosted integrations use the `/direct/` sibling of their hosted URL, or
    /// the default direct endpoint when the URL has no `/hosted/` segment.
    pub fn direct_endpoint(&self) -> Url {
        match self.integration_type {
            IntegrationType::DirectThreeDsV2 | IntegrationType::HostedThreeDsV2 => {
                threeds_v2_direct_endpoint()
            }
            IntegrationType::Direct => self.gateway_url(),
            _ => {
                let mut url = self.gateway_url();
                let Some(at) = url.path().to_ascii_lowercase().rfind("/hosted/") else {
                    return direct_endpoint();
                };
                let path = format!("{}/direct/", &url.path()[..at]);
                url.set_path(&path);
                url
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn optional(lookup: &impl Fn(&str) -> Option<String>, name: &'static str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn required(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<String, ConfigError> {
    optional(lookup, name).ok_or(ConfigError::Missing(name))
}

fn parsed<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    optional(lookup, name)
        .map(|value| {
            value
                .parse()
                .map_err(|_| ConfigError::Invalid { name, value })
        })
        .transpose()
}

fn flag(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<bool>, ConfigError> {
    optional(lookup, name)
        .map(|value| match value.to_ascii_lowercase().as_str() {
            "y" | "yes" | "true" | "1" | "on" => Ok(true),
            "n" | "no" | "false" | "0" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid { name, value }),
        })
        .transpose()
}
