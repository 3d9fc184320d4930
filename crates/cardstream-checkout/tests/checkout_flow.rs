mod common;

use std::str::FromStr;

use cardstream_checkout::{
    errors::CheckoutError,
    orders::TransactionKind,
    processor::{FAILURE_MESSAGE, FAILURE_PATH, ProcessRequest, ProcessResult, RedirectStyle, SUCCESS_PATH},
    session::{CheckoutSession, SessionMessage, THREEDS_REF_COOKIE, XREF_COOKIE},
};
use cardstream_kit::{
    concepts::WalletStore,
    protocol::{Fields, integration::IntegrationType},
};
use common::*;
use http::Method;
use rust_decimal::Decimal;

fn session_with_order() -> CheckoutSession {
    let mut session = CheckoutSession::new("sess-1");
    session.last_real_order_id = Some(ORDER.to_owned());
    session
}

fn post(fields: Fields) -> ProcessRequest {
    ProcessRequest::builder().method(Method::POST).fields(fields).build()
}

fn page(result: ProcessResult) -> String {
    match result {
        ProcessResult::Page(html) => html,
        other => panic!("expected a page, got {other:?}"),
    }
}

fn card_submission() -> Fields {
    Fields::new()
        .with("cardNumber", "4012 0010 3714 1112")
        .with("cardCVV", "083")
        .with("cardExpiryMonth", "12")
        .with("cardExpiryYear", "2030")
        .with(
            "browserInfo",
            Fields::new()
                .with("deviceChannel", "browser")
                .with("deviceScreenResolution", "1920x1080x24"),
        )
}

#[tokio::test]
async fn hosted_get_renders_signed_payment_form() {
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::default());
    let mut session = session_with_order();

    let html = page(checkout.process(ProcessRequest::default(), &mut session).await);

    assert!(html.contains(r#"action="https://gateway.cardstream.com/hosted/""#));
    assert!(html.contains(r##"name="orderRef" value="#000000042""##));
    assert!(html.contains(r#"name="amount" value="1001""#));
    assert!(html.contains(r#"name="customerSessionID" value="sess-1""#));
    assert!(html.contains(r#"name="signature""#));
    assert!(!html.contains("walletEnabled"));

    let order = checkout.orders.get(ORDER).unwrap();
    assert_eq!(order.status, "pending_payment");
}

#[tokio::test]
async fn embedded_get_renders_iframe_form() {
    let checkout = checkout(IntegrationType::HostedEmbedded, ScriptedGateway::default());
    let mut session = session_with_order();

    let html = page(checkout.process(ProcessRequest::default(), &mut session).await);

    assert!(html.contains("<iframe"));
    assert!(html.contains(r#"target="paymentgatewayframe""#));
}

#[tokio::test]
async fn hosted_get_without_order_fails() {
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::default());
    let mut session = CheckoutSession::new("sess-1");

    let result = checkout.process(ProcessRequest::default(), &mut session).await;

    assert_eq!(result.redirect_path(), Some(FAILURE_PATH));
    assert_eq!(session.messages, vec![SessionMessage::Error(FAILURE_MESSAGE.to_owned())]);
}

#[tokio::test]
async fn approved_callback_invoices_order() {
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::default());
    let mut session = CheckoutSession::new("sess-1");
    session.has_quote = true;

    let result = checkout.process(post(approved()), &mut session).await;

    assert_eq!(
        result,
        ProcessResult::Redirect {
            path: SUCCESS_PATH,
            style: RedirectStyle::Location
        }
    );

    let order = checkout.orders.get(ORDER).unwrap();
    assert_eq!(order.status, "processing");
    assert_eq!(order.total_paid, Some(Decimal::from_str("10.01").unwrap()));
    assert_eq!(order.invoices.len(), 1);
    assert_eq!(order.invoices[0].transaction_id, "22010112ZZ01TF02");
    assert_eq!(order.payment.last_trans_id.as_deref(), Some("22010112ZZ01TF02"));
    assert_eq!(order.transactions[0].kind, TransactionKind::Capture);
    assert_eq!(order.transactions[0].comment, "The authorized amount is GBP 10.01.");

    let note = &order.last_note().unwrap().comment;
    assert!(note.starts_with("Payment Successful<br/><br/>Amount Received: 10.01"));
    assert!(note.contains("CV2 Check: matched"));
    assert!(!note.contains("3D Secure"));

    assert!(!session.has_quote);
    assert_eq!(session.last_real_order_id.as_deref(), Some(ORDER));
    assert_eq!(session.last_order_id, Some(7));
    assert_eq!(session.last_quote_id, Some(3));
}

#[tokio::test]
async fn repeated_callback_invoices_once() {
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::default());
    let mut session = CheckoutSession::new("sess-1");

    checkout.process(post(approved()), &mut session).await;
    let result = checkout.process(post(approved()), &mut session).await;

    assert_eq!(result.redirect_path(), Some(SUCCESS_PATH));
    let order = checkout.orders.get(ORDER).unwrap();
    assert_eq!(order.invoices.len(), 1);
    assert_eq!(order.history.len(), 1);
}

#[tokio::test]
async fn declined_callback_cancels_order() {
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::default());
    let mut session = CheckoutSession::new("sess-1");

    let result = checkout.process(post(declined()), &mut session).await;

    assert_eq!(result.redirect_path(), Some(FAILURE_PATH));
    assert_eq!(session.messages, vec![SessionMessage::Error(FAILURE_MESSAGE.to_owned())]);

    let order = checkout.orders.get(ORDER).unwrap();
    assert_eq!(order.status, "canceled");
    assert_eq!(
        order.last_note().unwrap().comment,
        "Payment Unsuccessful<br/><br/>Message: CARD DECLINED<br/>xref: 22010112ZZ01TF03<br/>"
    );
    assert!(order.invoices.is_empty());
}

#[tokio::test]
async fn forged_callback_leaves_order_alone() {
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::default());
    let mut session = CheckoutSession::new("sess-1");

    let mut forged = approved();
    forged.insert("amountReceived", "1");
    let result = checkout.process(post(forged), &mut session).await;

    assert_eq!(result.redirect_path(), Some(FAILURE_PATH));
    let order = checkout.orders.get(ORDER).unwrap();
    assert_eq!(order.status, "pending");
    assert!(order.history.is_empty());
    assert!(order.total_paid.is_none());
}

#[tokio::test]
async fn oversized_currency_exponent_fails_cleanly() {
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::default());
    let mut session = CheckoutSession::new("sess-1");

    let response = signed(approval_fields().with("currencyExponent", "29"));
    let result = checkout.process(post(response), &mut session).await;

    assert_eq!(result.redirect_path(), Some(FAILURE_PATH));
    let order = checkout.orders.get(ORDER).unwrap();
    assert!(order.total_paid.is_none());
    assert!(order.invoices.is_empty());
}

#[tokio::test]
async fn unsigned_decline_is_not_recorded() {
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::default());
    let mut session = CheckoutSession::new("sess-1");

    let mut unsigned = declined();
    unsigned.remove("signature");
    checkout.process(post(unsigned), &mut session).await;

    assert_eq!(checkout.orders.get(ORDER).unwrap().status, "pending");
}

#[tokio::test]
async fn redirect_style_follows_caller() {
    let checkout_page = checkout(IntegrationType::Hosted, ScriptedGateway::default());
    let mut session = CheckoutSession::new("sess-1");
    let request = ProcessRequest::builder()
        .method(Method::POST)
        .fields(approved())
        .ajax()
        .build();
    let result = checkout_page.process(request, &mut session).await;
    assert_eq!(
        result,
        ProcessResult::Redirect {
            path: SUCCESS_PATH,
            style: RedirectStyle::Json
        }
    );

    let embedded = checkout(IntegrationType::HostedEmbedded, ScriptedGateway::default());
    let result = embedded.process(post(declined()), &mut session).await;
    assert_eq!(
        result,
        ProcessResult::Redirect {
            path: FAILURE_PATH,
            style: RedirectStyle::TopWindow
        }
    );
}

#[tokio::test]
async fn direct_payment_with_3ds_v2_challenge() {
    let challenge = signed(
        Fields::new()
            .with("responseCode", "65802")
            .with("responseMessage", "3DS AUTHENTICATION REQUIRED")
            .with("orderRef", format!("#{ORDER}"))
            .with("xref", "X-1")
            .with("threeDSVersion", "2.1.0")
            .with("threeDSRef", "REF-1")
            .with("threeDSURL", "https://acs.example.com/v2")
            .with("threeDSRequest", Fields::new().with("threeDSMethodData", "abc")),
    );
    let gateway = ScriptedGateway::replying([challenge, approved()]);
    let checkout = checkout(IntegrationType::Direct, gateway);
    let mut session = session_with_order();

    let html = page(checkout.process(post(card_submission()), &mut session).await);

    assert!(html.contains(r#"action="https://acs.example.com/v2""#));
    assert!(html.contains(r#"name="threeDSMethodData" value="abc""#));
    assert!(html.contains(r#"target="_self""#));
    assert_eq!(session.threeds_ref.as_deref(), Some("REF-1"));
    assert_eq!(session.xref.as_deref(), Some("X-1"));
    let cookies = session.take_cookies();
    assert!(cookies.iter().any(|c| c.name == THREEDS_REF_COOKIE && c.value == "REF-1" && c.max_age_secs == 315));
    assert!(cookies.iter().any(|c| c.name == XREF_COOKIE && c.value == "X-1"));

    let sale = &checkout.client.sent()[0];
    assert_eq!(sale.get_str("action"), Some("SALE"));
    assert_eq!(sale.get_str("cardNumber"), Some("4012001037141112"));
    assert_eq!(sale.get_str("cardExpiryYear"), Some("30"));
    assert_eq!(sale.get_str("deviceChannel"), Some("browser"));
    assert_eq!(
        sale.get_str("threeDSRedirectURL"),
        Some("https://shop.example.com/paymentgateway/order/process/")
    );
    assert!(!sale.contains_key("browserInfo"));

    let result = checkout
        .process(post(Fields::new().with("cres", "xyz")), &mut session)
        .await;

    assert_eq!(result.redirect_path(), Some(SUCCESS_PATH));
    let continuation = &checkout.client.sent()[1];
    assert_eq!(continuation.get_str("threeDSRef"), Some("REF-1"));
    assert_eq!(
        continuation.get_map("threeDSResponse").and_then(|r| r.get_str("cres")),
        Some("xyz")
    );
    assert_eq!(checkout.orders.get(ORDER).unwrap().status, "processing");
}

#[tokio::test]
async fn direct_payment_with_3ds_v1_challenge() {
    let challenge = signed(
        Fields::new()
            .with("responseCode", "65802")
            .with("xref", "X-9")
            .with("threeDSVersion", "1.0.2")
            .with("threeDSACSURL", "https://acs.example.com/v1")
            .with("threeDSMD", "md-1")
            .with("threeDSPaReq", "pareq-1"),
    );
    let gateway = ScriptedGateway::replying([challenge, approved()]);
    let checkout = checkout(IntegrationType::Direct, gateway);
    let mut session = session_with_order();

    let html = page(checkout.process(post(card_submission()), &mut session).await);

    assert!(html.contains("Your transaction requires 3D Secure Authentication"));
    assert!(html.contains(r#"name="PaReq" value="pareq-1""#));
    assert!(html.contains(
        r#"name="TermUrl" value="https://shop.example.com/paymentgateway/order/process/""#
    ));

    let callback = Fields::new().with("MD", "md-1").with("PaRes", "pares-1");
    let result = checkout.process(post(callback), &mut session).await;

    assert_eq!(result.redirect_path(), Some(SUCCESS_PATH));
    let continuation = &checkout.client.sent()[1];
    assert_eq!(continuation.get_str("xref"), Some("X-9"));
    assert_eq!(continuation.get_str("threeDSMD"), Some("md-1"));
    assert_eq!(continuation.get_str("threeDSPaRes"), Some("pares-1"));
}

#[tokio::test]
async fn v2_callback_needs_session_reference() {
    let checkout = checkout(IntegrationType::Direct, ScriptedGateway::default());
    let mut session = session_with_order();

    let result = checkout
        .process(post(Fields::new().with("cres", "xyz")), &mut session)
        .await;

    assert_eq!(result.redirect_path(), Some(FAILURE_PATH));
    assert!(checkout.client.sent().is_empty());
}

#[tokio::test]
async fn direct_rejects_unexpected_posts() {
    let checkout = checkout(IntegrationType::Direct, ScriptedGateway::default());
    let mut session = session_with_order();

    let result = checkout
        .process(post(Fields::new().with("foo", "bar")), &mut session)
        .await;
    assert_eq!(result.redirect_path(), Some(FAILURE_PATH));

    let mut incomplete = card_submission();
    incomplete.remove("cardCVV");
    let result = checkout.process(post(incomplete), &mut session).await;
    assert_eq!(result.redirect_path(), Some(FAILURE_PATH));

    assert!(checkout.client.sent().is_empty());
    assert_eq!(checkout.orders.get(ORDER).unwrap().status, "pending");
}

#[tokio::test]
async fn direct_decline_cancels_order() {
    let checkout = checkout(IntegrationType::Direct, ScriptedGateway::replying([declined()]));
    let mut session = session_with_order();

    let result = checkout.process(post(card_submission()), &mut session).await;

    assert_eq!(result.redirect_path(), Some(FAILURE_PATH));
    assert_eq!(checkout.orders.get(ORDER).unwrap().status, "canceled");
}

#[tokio::test]
async fn modal_payment_stores_and_reuses_wallet() {
    let checkout = checkout(IntegrationType::HostedModal, ScriptedGateway::default());
    let mut session = CheckoutSession::new("sess-1");
    session.customer_email = Some("jane@example.com".to_owned());

    let response = signed(approval_fields().with("walletID", "W-1"));
    checkout.process(post(response), &mut session).await;

    let stored = checkout
        .wallets
        .find(MERCHANT_ID, "jane@example.com")
        .await
        .unwrap();
    assert_eq!(stored.as_ref().map(|w| w.as_str()), Some("W-1"));

    session.last_real_order_id = Some(ORDER.to_owned());
    let html = page(checkout.process(ProcessRequest::default(), &mut session).await);
    assert!(html.contains(r#"action="https://gateway.cardstream.com/hosted/modal/""#));
    assert!(html.contains(r#"name="walletID" value="W-1""#));
}

#[tokio::test]
async fn refund_of_settled_sale() {
    let query = signed(
        Fields::new()
            .with("responseCode", "0")
            .with("xref", "22010112ZZ01TF02")
            .with("state", "accepted")
            .with("amountReceived", "1001"),
    );
    let refunded = signed(Fields::new().with("responseCode", "0").with("xref", "R-1"));
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::replying([query, refunded]));
    let mut session = CheckoutSession::new("sess-1");
    checkout.process(post(approved()), &mut session).await;

    let order = checkout
        .refund(ORDER, Decimal::from_str("5.00").unwrap())
        .await
        .unwrap();

    assert_eq!(order.status, "closed");
    assert_eq!(order.last_note().unwrap().comment, "Refund of 500 successful");
    assert_eq!(order.payment.transaction_id.as_deref(), Some("R-1"));
    assert_eq!(order.payment.parent_transaction_id.as_deref(), Some("22010112ZZ01TF02"));
    assert!(order.payment.is_transaction_closed);
    assert_eq!(order.transactions.last().unwrap().kind, TransactionKind::Refund);

    let sent = checkout.client.sent();
    assert_eq!(sent[0].get_str("action"), Some("QUERY"));
    assert_eq!(sent[1].get_str("action"), Some("REFUND_SALE"));
    assert_eq!(sent[1].get_str("amount"), Some("500"));
}

#[tokio::test]
async fn refund_needs_a_paid_order() {
    let checkout = checkout(IntegrationType::Hosted, ScriptedGateway::default());

    let err = checkout
        .refund(ORDER, Decimal::from_str("5.00").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::RefundNotAvailable));

    let mut session = CheckoutSession::new("sess-1");
    checkout.process(post(approved()), &mut session).await;
    let err = checkout
        .refund(ORDER, Decimal::from_str("20.00").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::RefundNotAvailable));
    assert!(checkout.client.sent().is_empty());
}
