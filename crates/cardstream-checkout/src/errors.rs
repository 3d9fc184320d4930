use cardstream_kit::{errors::RefundError, protocol::Error as ProtocolError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while processing a checkout.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The gateway response could not be trusted or read, or a request could
    /// not be built.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Gateway request failed: {0}")]
    Gateway(#[source] BoxError),

    #[error("Order store error: {0}")]
    OrderStore(#[source] BoxError),

    #[error("Wallet store error: {0}")]
    WalletStore(#[source] BoxError),

    #[error("Order {0} not found")]
    OrderNotFound(String),

    /// The session has no placed order waiting for payment.
    #[error("No order is awaiting payment in this session")]
    NoPendingOrder,

    /// A value a 3-D Secure step depends on is missing from the session.
    #[error("Missing {0} from the checkout session")]
    MissingSessionState(&'static str),

    #[error("Invalid card details: {}", .0.join(", "))]
    InvalidCard(Vec<&'static str>),

    /// The posted data matches none of the expected direct flow steps.
    #[error("Something went wrong with processing direct request, please check the posted data")]
    InvalidRequest,

    #[error(
        "Sorry, we are unable to process this order (reason: {message}). Please correct any faults and try again."
    )]
    Declined { code: i64, message: String },

    #[error("The refund action is not available")]
    RefundNotAvailable,

    #[error("Refund failed: {0}")]
    Refund(#[source] BoxError),
}

impl CheckoutError {
    pub fn gateway(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CheckoutError::Gateway(Box::new(err))
    }

    pub fn order_store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CheckoutError::OrderStore(Box::new(err))
    }

    pub fn wallet_store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CheckoutError::WalletStore(Box::new(err))
    }

    /// Whether the failure means inbound data could not be trusted.
    pub fn is_untrusted(&self) -> bool {
        matches!(self, CheckoutError::Protocol(err) if err.is_signature_error())
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<RefundError<E>> for CheckoutError {
    fn from(err: RefundError<E>) -> Self {
        CheckoutError::Refund(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
