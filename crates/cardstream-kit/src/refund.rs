//! Refunds.
//!
//! The gateway refunds differently depending on where the original sale is
//! in its life cycle: an uncaptured sale is cancelled or its capture amount
//! reduced, a settled sale is refunded with `REFUND_SALE`.

use cardstream_core::{
    Fields,
    amount::MinorAmount,
    codes::ResponseCode,
    signature::{MerchantSecret, verify},
};

use crate::{concepts::GatewayClient, errors::RefundError};

/// A completed refund.
#[derive(Debug, Clone)]
pub struct RefundResult {
    /// The action that was performed: `CANCEL`, `CAPTURE` or `REFUND_SALE`.
    pub action: &'static str,
    /// Human-readable summary for order notes.
    pub message: String,
    pub response: Fields,
}

/// Refunds `amount` of the transaction identified by `xref`.
pub async fn refund<C: GatewayClient>(
    client: &C,
    merchant_id: &str,
    secret: &MerchantSecret,
    xref: &str,
    amount: MinorAmount,
) -> Result<RefundResult, RefundError<C::Error>> {
    let query = Fields::new()
        .with("merchantID", merchant_id)
        .with("xref", xref)
        .with("action", "QUERY");
    let transaction = send(client, secret, "QUERY", query).await?;

    let received: MinorAmount = transaction
        .get_non_empty("amountReceived")
        .unwrap_or("0")
        .parse()?;
    if amount > received {
        return Err(RefundError::ExceedsReceived {
            requested: amount.0,
            received: received.0,
        });
    }

    let state = transaction.get_str("state").unwrap_or_default().to_owned();
    let base = Fields::new()
        .with("merchantID", merchant_id)
        .with("xref", xref);

    let (action, request) = match state.as_str() {
        "approved" | "captured" if amount == received => ("CANCEL", base.with("action", "CANCEL")),
        "approved" | "captured" => {
            let remaining = received.saturating_sub(amount);
            (
                "CAPTURE",
                base.with("action", "CAPTURE")
                    .with("amount", remaining.to_string()),
            )
        }
        "accepted" => (
            "REFUND_SALE",
            base.with("action", "REFUND_SALE")
                .with("amount", amount.to_string()),
        ),
        _ => return Err(RefundError::WrongState(state)),
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(action, %xref, %state, "Refunding transaction");

    let response = send(client, secret, action, request).await?;
    let message = match action {
        "CANCEL" => "Transaction cancelled".to_owned(),
        "CAPTURE" => format!("Capture amount reduced by {amount}"),
        _ => format!("Refund of {amount} successful"),
    };

    Ok(RefundResult {
        action,
        message,
        response,
    })
}

async fn send<C: GatewayClient>(
    client: &C,
    secret: &MerchantSecret,
    action: &'static str,
    request: Fields,
) -> Result<Fields, RefundError<C::Error>> {
    let response = client
        .direct_request(request)
        .await
        .map_err(RefundError::Client)?;
    verify(&response, secret)?;

    match ResponseCode::from_fields(&response)? {
        ResponseCode::Approved => Ok(response),
        code => Err(RefundError::Rejected {
            action,
            code: code.code(),
            message: response
                .get_str("responseMessage")
                .unwrap_or_default()
                .to_owned(),
        }),
    }
}
