//! # Cardstream Checkout
//!
//! The storefront side of a Cardstream payment: renders the hosted payment
//! form or sends direct card requests, walks the shopper through 3-D Secure,
//! and records the outcome on the order.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use cardstream_checkout::{
//!     orders::InMemoryOrderStore, processor::Checkout, session::InMemorySessionStore,
//! };
//! use cardstream_kit::{
//!     config::GatewayConfig, gateway_client::HttpGatewayClient, wallet::InMemoryWalletStore,
//! };
//!
//! let config = GatewayConfig::from_env()?;
//! let checkout = Checkout::builder()
//!     .client(HttpGatewayClient::from_config(&config)?)
//!     .wallets(InMemoryWalletStore::new())
//!     .orders(InMemoryOrderStore::new())
//!     .config(config)
//!     .build();
//!
//! let app = cardstream_checkout::axum::router(
//!     Arc::new(checkout),
//!     Arc::new(InMemorySessionStore::new()),
//! );
//! ```
//!
//! ## Modules
//!
//! - [`processor`]: [`Checkout`](processor::Checkout), the process endpoint and refunds.
//! - [`orders`]: Orders, their payment records and the [`OrderStore`](orders::OrderStore) seam.
//! - [`session`]: Per-shopper state carried between the steps of a payment.
//! - [`errors`]: [`CheckoutError`](errors::CheckoutError).
//! - `axum`: An axum router for the process endpoint (feature `axum`).
//!
//! ## Payment Flow
//!
//! [`Checkout::process`](processor::Checkout::process) handles every request to the
//! process endpoint:
//!
//! 1. **Hosted start**: A `GET` with a placed order and no gateway response renders
//!    the self-submitting hosted form.
//! 2. **Direct step**: With a direct integration, card details, 3-D Secure v1
//!    callbacks (`MD`/`PaRes`) and v2 callbacks (`threeDSMethodData`/`cres`) are
//!    turned into a signed gateway request.
//! 3. **Interpret**: The gateway's response is verified and classified.
//! 4. **Act**: Approvals invoice the order, 3-D Secure challenges render the ACS
//!    form, and anything else records the failure and returns the shopper to the cart.

pub mod errors;
pub mod orders;
pub mod processor;
pub mod session;

#[cfg(feature = "axum")]
pub mod axum;
