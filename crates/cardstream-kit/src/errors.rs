use cardstream_core::Error;

/// Errors raised while loading a [`GatewayConfig`](crate::config::GatewayConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required setting is absent or empty.
    #[error("Missing configuration value: {0}")]
    Missing(&'static str),

    /// A setting is present but cannot be parsed.
    #[error("Invalid configuration value for {name}: {value}")]
    Invalid { name: &'static str, value: String },

    #[error(transparent)]
    Protocol(#[from] Error),
}

/// Errors raised by [`HttpGatewayClient`](crate::gateway_client::HttpGatewayClient).
#[cfg(feature = "gateway-client")]
#[derive(Debug, thiserror::Error)]
pub enum GatewayClientError {
    #[error("HTTP request error: {0}")]
    HttpRequestError(#[from] reqwest::Error),

    #[error("Gateway responded with HTTP status {0}")]
    HttpStatus(http::StatusCode),

    #[error("Gateway returned an empty response")]
    EmptyResponse,
}

/// Errors raised while refunding a transaction.
#[derive(Debug, thiserror::Error)]
pub enum RefundError<E: std::error::Error + 'static> {
    /// The transport failed.
    #[error("Gateway request failed: {0}")]
    Client(#[source] E),

    /// The gateway response could not be trusted or read.
    #[error(transparent)]
    Protocol(#[from] Error),

    /// The gateway answered with a non-zero response code.
    #[error("Gateway rejected the {action} request ({code}): {message}")]
    Rejected {
        action: &'static str,
        code: i64,
        message: String,
    },

    /// The original transaction cannot be refunded in its current state.
    #[error("Transaction in the wrong state for refund: {0}")]
    WrongState(String),

    /// More was requested than the transaction received.
    #[error("Refund amount {requested} exceeds the amount received {received}")]
    ExceedsReceived { requested: u64, received: u64 },
}
