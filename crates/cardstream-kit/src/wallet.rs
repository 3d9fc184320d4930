//! Stored customer wallets.
//!
//! The gateway can keep a customer's cards in a wallet and hand back a
//! `walletID`. The storefront remembers these per merchant account and
//! customer email so returning customers get their wallet on the modal form.

use std::convert::Infallible;

use cardstream_core::{Fields, integration::IntegrationType};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::{concepts::WalletStore, config::GatewayConfig, request::CustomerContext};

pub const WALLET_ID_FIELD: &str = "walletID";

/// A gateway-issued wallet id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletId(pub String);

impl WalletId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WalletId {
    fn from(value: &str) -> Self {
        WalletId(value.to_owned())
    }
}

impl From<String> for WalletId {
    fn from(value: String) -> Self {
        WalletId(value)
    }
}

/// What a sale request says about wallets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletDirective {
    /// Wallets are not offered.
    Disabled,
    /// Open the customer's existing wallet.
    Use(WalletId),
    /// Ask the gateway to create a wallet for the customer.
    Store,
}

impl WalletDirective {
    pub fn to_fields(&self) -> Fields {
        let fields = match self {
            WalletDirective::Disabled => return Fields::new(),
            WalletDirective::Use(wallet) => Fields::new().with(WALLET_ID_FIELD, wallet.as_str()),
            WalletDirective::Store => Fields::new().with("walletStore", "Y"),
        };
        fields.with("walletEnabled", "Y").with("walletRequired", "Y")
    }
}

/// Wallets apply to logged-in customers on the modal form when enabled.
pub fn wallets_apply(config: &GatewayConfig, customer_email: Option<&str>) -> bool {
    config.wallets_enabled
        && config.integration_type == IntegrationType::HostedModal
        && customer_email.is_some_and(|email| !email.is_empty())
}

/// Decides the wallet fields of a sale request.
pub async fn wallet_directive<W: WalletStore>(
    store: &W,
    config: &GatewayConfig,
    customer: &CustomerContext,
) -> Result<WalletDirective, W::Error> {
    let email = customer.customer_email.as_deref();
    let Some(email) = email.filter(|_| wallets_apply(config, email)) else {
        return Ok(WalletDirective::Disabled);
    };

    Ok(match store.find(&config.merchant_id, email).await? {
        Some(wallet) => WalletDirective::Use(wallet),
        None => WalletDirective::Store,
    })
}

/// Records the `walletID` of a gateway response for the customer.
///
/// Runs for every trusted response, including declines, since the wallet
/// exists once the gateway has issued it. Returns whether a row was added.
pub async fn remember_wallet<W: WalletStore>(
    store: &W,
    config: &GatewayConfig,
    customer_email: Option<&str>,
    response: &Fields,
) -> Result<bool, W::Error> {
    let (Some(email), Some(wallet)) = (customer_email, response.get_non_empty(WALLET_ID_FIELD))
    else {
        return Ok(false);
    };
    if !wallets_apply(config, Some(email)) {
        return Ok(false);
    }

    let wallet = WalletId::from(wallet);
    if store.contains(&config.merchant_id, email, &wallet).await? {
        return Ok(false);
    }
    store.insert(&config.merchant_id, email, wallet).await?;

    #[cfg(feature = "tracing")]
    tracing::debug!(merchant_id = %config.merchant_id, "Stored new customer wallet");

    Ok(true)
}

/// Wallet rows kept in memory, keyed by merchant id and customer email.
#[derive(Debug, Default)]
pub struct InMemoryWalletStore {
    rows: DashMap<(String, String), Vec<WalletId>>,
}

impl InMemoryWalletStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WalletStore for InMemoryWalletStore {
    type Error = Infallible;

    async fn find(&self, merchant_id: &str, email: &str) -> Result<Option<WalletId>, Self::Error> {
        Ok(self
            .rows
            .get(&(merchant_id.to_owned(), email.to_owned()))
            .and_then(|wallets| wallets.first().cloned()))
    }

    async fn contains(
        &self,
        merchant_id: &str,
        email: &str,
        wallet: &WalletId,
    ) -> Result<bool, Self::Error> {
        Ok(self
            .rows
            .get(&(merchant_id.to_owned(), email.to_owned()))
            .is_some_and(|wallets| wallets.contains(wallet)))
    }

    async fn insert(&self, merchant_id: &str, email: &str, wallet: WalletId) -> Result<(), Self::Error> {
        self.rows
            .entry((merchant_id.to_owned(), email.to_owned()))
            .or_default()
            .push(wallet);
        Ok(())
    }
}
