//! Seams to the outside world.
//!
//! The gateway, and the storefront tables this kit writes to, are reached
//! through these traits so integrations can swap in their own transport or
//! persistence.

use cardstream_core::Fields;

use crate::wallet::WalletId;

/// Sends signed server-to-server requests to the gateway.
pub trait GatewayClient {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Signs `request`, posts it and returns the parsed response fields.
    ///
    /// The response is returned as received; verifying its signature is the
    /// caller's job.
    fn direct_request(
        &self,
        request: Fields,
    ) -> impl Future<Output = Result<Fields, Self::Error>> + Send;
}

/// Persistence for customer wallet ids.
pub trait WalletStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The first wallet stored for the customer.
    fn find(
        &self,
        merchant_id: &str,
        email: &str,
    ) -> impl Future<Output = Result<Option<WalletId>, Self::Error>> + Send;

    fn contains(
        &self,
        merchant_id: &str,
        email: &str,
        wallet: &WalletId,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    fn insert(
        &self,
        merchant_id: &str,
        email: &str,
        wallet: WalletId,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
