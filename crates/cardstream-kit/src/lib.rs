//! # Cardstream Kit
//!
//! Everything a storefront needs to take card payments through the
//! Cardstream gateway, without tying it to any particular web framework.
//!
//! ## Modules
//!
//! - [`config`]: merchant configuration and gateway endpoints
//! - [`request`]: building sale and 3-D Secure continuation requests
//! - [`gateway_client`]: signed form posts to the direct API (feature `gateway-client`)
//! - [`interpreter`]: verifying and classifying gateway responses
//! - [`wallet`]: remembering gateway wallets for returning customers
//! - [`forms`]: HTML that hands the shopper over to the gateway or the ACS
//! - [`refund`]: cancelling, reducing or refunding a sale
//!
//! ## Flow
//!
//! 1. Build a sale with [`request::hosted_request`] or [`request::direct_request`]
//! 2. Sign it and render a [`forms`] fragment, or send it with a [`concepts::GatewayClient`]
//! 3. Pass whatever comes back to [`interpreter::interpret`]
//! 4. On a 3-D Secure challenge, forward the shopper with [`forms::silent_post`]
//!    and continue with the matching `threeds_*_continuation` request

pub mod card;
pub mod concepts;
pub mod config;
pub mod errors;
pub mod forms;
pub mod interpreter;
pub mod refund;
pub mod request;
pub mod wallet;

#[cfg(feature = "gateway-client")]
pub mod gateway_client;

pub use cardstream_core as protocol;
