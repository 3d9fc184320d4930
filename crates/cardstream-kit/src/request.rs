//! Request builders.
//!
//! Every outbound message is a [`Fields`] map. The functions here only
//! assemble fields; signing happens when the map is dispatched.

use std::net::IpAddr;

use bon::Builder;
use cardstream_core::{Fields, Result, amount::MinorAmount, integration::IntegrationType};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{card::CardDetails, config::GatewayConfig, wallet::WalletDirective};

pub const ACTION_SALE: &str = "SALE";
/// Transaction type for e-commerce sales.
pub const TYPE_ECOMMERCE: &str = "1";

/// Billing details of an order.
#[derive(Builder, Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingAddress {
    #[builder(into)]
    pub name: Option<String>,
    #[builder(into)]
    pub email: Option<String>,
    #[builder(into)]
    pub telephone: Option<String>,
    #[builder(into)]
    pub street_line_1: Option<String>,
    #[builder(into)]
    pub street_line_2: Option<String>,
    #[builder(into)]
    pub city: Option<String>,
    #[builder(into)]
    pub region: Option<String>,
    #[builder(into)]
    pub country_id: Option<String>,
    #[builder(into)]
    pub postcode: Option<String>,
}

impl BillingAddress {
    /// Street lines, city and region each followed by `",\n"`, then the
    /// country. Empty parts are skipped.
    pub fn formatted(&self) -> String {
        let mut address = String::new();
        for part in [
            &self.street_line_1,
            &self.street_line_2,
            &self.city,
            &self.region,
        ]
        .into_iter()
        .flatten()
        .filter(|part| !part.is_empty())
        {
            address.push_str(part);
            address.push_str(",\n");
        }
        if let Some(country) = self.country_id.as_deref() {
            address.push_str(country);
        }
        address
    }
}

/// The parts of an order a sale request needs.
#[derive(Builder, Debug, Clone)]
pub struct OrderSnapshot {
    /// Storefront order number, sent as `orderRef` with a `#` prefix.
    #[builder(into)]
    pub increment_id: String,
    pub base_total_due: Decimal,
    #[builder(into)]
    pub currency_code: String,
    #[builder(default)]
    pub billing: BillingAddress,
}

/// Who is paying.
#[derive(Builder, Debug, Clone, Default)]
pub struct CustomerContext {
    #[builder(into)]
    pub session_id: Option<String>,
    pub remote_addr: Option<IpAddr>,
    /// Email of the logged-in customer account, if any.
    #[builder(into)]
    pub customer_email: Option<String>,
}

impl CustomerContext {
    pub fn is_logged_in(&self) -> bool {
        self.customer_email.is_some()
    }
}

/// Accept headers of the shopper's browser, forwarded on direct requests.
#[derive(Builder, Debug, Clone, Default)]
pub struct DeviceHeaders {
    #[builder(into)]
    pub accept: Option<String>,
    #[builder(into)]
    pub accept_encoding: Option<String>,
    #[builder(into)]
    pub accept_language: Option<String>,
    #[builder(into)]
    pub accept_charset: Option<String>,
}

impl DeviceHeaders {
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert_opt("deviceAcceptContent", self.accept.as_deref());
        fields.insert_opt("deviceAcceptEncoding", self.accept_encoding.as_deref());
        fields.insert_opt("deviceAcceptLanguage", self.accept_language.as_deref());
        fields.insert_opt("deviceAcceptCharset", self.accept_charset.as_deref());
        fields
    }
}

/// Browser data for 3-D Secure v2 on the hosted form.
///
/// Most values come from cookies set by the checkout page's script, the
/// rest from request headers.
#[derive(Builder, Debug, Clone, Default)]
pub struct BrowserInfo {
    #[builder(into)]
    pub user_agent: Option<String>,
    #[builder(into)]
    pub accept: Option<String>,
    #[builder(into)]
    pub language: Option<String>,
    pub remote_addr: Option<IpAddr>,
    pub java_enabled: Option<bool>,
    pub screen_depth: Option<u32>,
    pub screen_width: Option<u32>,
    pub screen_height: Option<u32>,
    /// Offset from UTC in minutes.
    pub time_zone: Option<i32>,
    /// Device fingerprint from the `identity` cookie.
    #[builder(into)]
    pub identity: Option<String>,
    #[builder(default)]
    pub device: DeviceHeaders,
}

impl BrowserInfo {
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new().with("threeDSVersion", "2");
        fields.insert_opt("browserAcceptHeader", self.accept.as_deref());
        fields.insert_opt("browserIPAddress", self.remote_addr.map(|addr| addr.to_string()));
        fields.insert_opt("browserJavaEnabled", self.java_enabled.map(|java| java.to_string()));
        fields.insert_opt("browserLanguage", self.language.as_deref());
        fields.insert_opt("browserScreenColorDepth", self.screen_depth.map(|v| v.to_string()));
        fields.insert_opt("browserScreenHeight", self.screen_height.map(|v| v.to_string()));
        fields.insert_opt("browserScreenWidth", self.screen_width.map(|v| v.to_string()));
        fields.insert_opt("browserTimeZone", self.time_zone.map(|v| v.to_string()));
        fields.insert_opt("deviceIdentity", self.identity.as_deref());
        fields.insert("deviceChannel", "browser");
        fields.insert("deviceTimeZone", "0");
        fields.insert("deviceCapabilities", "");
        fields.insert("deviceScreenResolution", "1x1x1");
        fields.extend(self.device.to_fields());
        fields.insert_opt("browserUserAgent", self.user_agent.as_deref());
        fields
    }
}

/// A fresh token for `transactionUnique`.
pub fn transaction_unique() -> String {
    Uuid::new_v4().simple().to_string()
}

/// The sale fields shared by hosted and direct requests.
pub fn base_sale_request(
    config: &GatewayConfig,
    order: &OrderSnapshot,
    customer: &CustomerContext,
    wallet: &WalletDirective,
) -> Result<Fields> {
    let amount = MinorAmount::from_major(order.base_total_due, &order.currency_code)?;
    let billing = &order.billing;

    let mut fields = Fields::new()
        .with("merchantID", &config.merchant_id)
        .with("amount", amount.to_string())
        .with("transactionUnique", transaction_unique())
        .with("orderRef", format!("#{}", order.increment_id))
        .with("countryCode", &config.country_code)
        .with("currencyCode", &config.currency_code)
        .with("customerName", billing.name.clone().unwrap_or_default())
        .with("customerAddress", billing.formatted())
        .with("customerEmail", billing.email.clone().unwrap_or_default());
    fields.insert_opt("customerSessionID", customer.session_id.as_deref());
    if let Some(IpAddr::V4(addr)) = customer.remote_addr {
        fields.insert("remoteAddress", addr.to_string());
    }
    fields.insert("action", ACTION_SALE);
    fields.insert("type", TYPE_ECOMMERCE);
    fields.insert_opt("customerPhone", billing.telephone.as_deref().filter(|v| !v.is_empty()));
    fields.insert_opt("customerPostCode", billing.postcode.as_deref().filter(|v| !v.is_empty()));

    if config.integration_type == IntegrationType::HostedModal {
        fields.extend(wallet.to_fields());
    }

    Ok(fields)
}

/// A sale request for the hosted payment form.
pub fn hosted_request(
    config: &GatewayConfig,
    order: &OrderSnapshot,
    customer: &CustomerContext,
    wallet: &WalletDirective,
    browser: Option<&BrowserInfo>,
) -> Result<Fields> {
    let mut fields = base_sale_request(config, order, customer, wallet)?;
    fields.insert("redirectURL", config.redirect_url.as_str());
    fields.insert("callbackURL", config.redirect_url.as_str());
    fields.insert("formResponsive", if config.form_responsive { "Y" } else { "N" });

    if config.integration_type == IntegrationType::HostedThreeDsV2 {
        fields.insert("threeDSRedirectURL", config.redirect_url.as_str());
        if let Some(browser) = browser {
            fields.extend(browser.to_fields());
        }
    }

    Ok(fields)
}

/// A server-to-server sale request carrying card details.
///
/// `browser_info` holds the `browserInfo[...]` fields posted by the checkout
/// page and is merged in flat.
pub fn direct_request(
    config: &GatewayConfig,
    order: &OrderSnapshot,
    customer: &CustomerContext,
    device: &DeviceHeaders,
    browser_info: Option<&Fields>,
    card: &CardDetails,
) -> Result<Fields> {
    let mut fields = base_sale_request(config, order, customer, &WalletDirective::Disabled)?;
    fields.extend(device.to_fields());
    if let Some(browser_info) = browser_info {
        fields.extend(browser_info.clone());
    }
    fields.extend(card.to_fields());
    fields.insert("threeDSRedirectURL", config.redirect_url.as_str());
    Ok(fields)
}

/// Continues a 3-D Secure v1 transaction with the ACS result.
pub fn threeds_v1_continuation(
    config: &GatewayConfig,
    xref: &str,
    md: &str,
    pares: &str,
    pareq: Option<&str>,
) -> Fields {
    let mut fields = Fields::new()
        .with("action", ACTION_SALE)
        .with("merchantID", &config.merchant_id)
        .with("xref", xref)
        .with("threeDSMD", md)
        .with("threeDSPaRes", pares);
    fields.insert_opt("threeDSPaReq", pareq);
    fields
}

/// Continues a 3-D Secure v2 transaction with the fields the ACS posted.
pub fn threeds_v2_continuation(config: &GatewayConfig, threeds_ref: &str, response: Fields) -> Fields {
    Fields::new()
        .with("merchantID", &config.merchant_id)
        .with("action", ACTION_SALE)
        .with("threeDSRef", threeds_ref)
        .with("threeDSResponse", response)
}
