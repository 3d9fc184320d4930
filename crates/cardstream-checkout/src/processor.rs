use std::net::IpAddr;

use bon::Builder;
use cardstream_kit::{
    card::CardDetails,
    concepts::{GatewayClient, WalletStore},
    config::GatewayConfig,
    forms::{self, escape_html},
    interpreter::{
        self, Approval, Challenge, GatewayOutcome, InboundKind, describe_authentication,
        describe_enrolment,
    },
    protocol::{
        Error as ProtocolError, Fields, amount::MinorAmount, integration::IntegrationType,
        signature::sign_fields,
    },
    refund,
    request::{self, BrowserInfo, DeviceHeaders},
    wallet::{remember_wallet, wallet_directive},
};
use http::Method;
use rust_decimal::Decimal;

use crate::{
    errors::{CheckoutError, Result},
    orders::{Invoice, Order, OrderStore, TransactionKind, TransactionRecord},
    session::CheckoutSession,
};

/// Where the shopper goes after a successful payment.
pub const SUCCESS_PATH: &str = "checkout/onepage/success";
/// Where the shopper goes after a failed payment.
pub const FAILURE_PATH: &str = "checkout/cart";
pub const FAILURE_MESSAGE: &str =
    "Something went wrong with the payment, we were not able to process it, please contact support.";
/// Status given to an order once it has been refunded.
pub const REFUNDED_STATUS: &str = "closed";

/// An inbound request to the process endpoint.
#[derive(Builder, Debug, Clone, Default)]
pub struct ProcessRequest {
    #[builder(default)]
    pub method: Method,
    /// Posted form fields, or query fields for `GET`.
    #[builder(default)]
    pub fields: Fields,
    #[builder(default)]
    pub device: DeviceHeaders,
    pub browser: Option<BrowserInfo>,
    pub remote_addr: Option<IpAddr>,
    /// The request was made by the checkout page's script.
    #[builder(default, with = || true)]
    pub ajax: bool,
}

/// How a redirect is delivered to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectStyle {
    /// `{"success":"true","path":...}` for script callers.
    Json,
    /// A script that navigates the top window, leaving the iframe.
    TopWindow,
    /// A plain HTTP redirect.
    Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessResult {
    /// HTML to send back as-is.
    Page(String),
    /// Send the shopper to a storefront path.
    Redirect {
        path: &'static str,
        style: RedirectStyle,
    },
}

impl ProcessResult {
    pub fn redirect_path(&self) -> Option<&'static str> {
        match self {
            ProcessResult::Redirect { path, .. } => Some(*path),
            ProcessResult::Page(_) => None,
        }
    }
}

/// The storefront side of a payment.
///
/// Builds and dispatches gateway requests for the session's order, walks the
/// shopper through 3-D Secure, and applies the outcome to the order.
#[derive(Builder, Debug)]
pub struct Checkout<C: GatewayClient, W: WalletStore, O: OrderStore> {
    pub config: GatewayConfig,
    /// Client for server-to-server requests.
    pub client: C,
    pub wallets: W,
    pub orders: O,
}

impl<C, W, O> Checkout<C, W, O>
where
    C: GatewayClient + Sync,
    W: WalletStore + Sync,
    O: OrderStore + Sync,
{
    /// Handles a request to the process endpoint.
    ///
    /// Every failure is reported to the shopper as a session message with a
    /// redirect to the cart.
    pub async fn process(
        &self,
        request: ProcessRequest,
        session: &mut CheckoutSession,
    ) -> ProcessResult {
        if self.starts_hosted_payment(&request, session) {
            return match self.start_hosted(&request, session).await {
                Ok(page) => ProcessResult::Page(page),
                Err(err) => self.fail(err, None, &request, session).await,
            };
        }

        let response = if self.config.integration_type.is_direct() {
            match self.direct_step(&request, session).await {
                Ok(response) => response,
                Err(err) => return self.fail(err, None, &request, session).await,
            }
        } else {
            request.fields.clone()
        };

        match self.process_response(&response, &request, session).await {
            Ok(result) => result,
            Err(err) => self.fail(err, Some(&response), &request, session).await,
        }
    }

    fn starts_hosted_payment(&self, request: &ProcessRequest, session: &CheckoutSession) -> bool {
        self.config.integration_type.is_hosted()
            && request.method == Method::GET
            && !session.has_quote
            && session.last_real_order_id.is_some()
            && !request.fields.contains_key("responseCode")
    }

    /// Renders the hosted payment form for the session's last order.
    pub async fn start_hosted(
        &self,
        request: &ProcessRequest,
        session: &mut CheckoutSession,
    ) -> Result<String> {
        let order = self.capture_order(session).await?;
        let customer = session.customer_context(request.remote_addr);
        let wallet = wallet_directive(&self.wallets, &self.config, &customer)
            .await
            .map_err(CheckoutError::wallet_store)?;

        let fields = request::hosted_request(
            &self.config,
            &order.snapshot(),
            &customer,
            &wallet,
            request.browser.as_ref(),
        )?;
        let signed = sign_fields(fields, &self.config.secret);
        let endpoint = self.config.hosted_endpoint();

        #[cfg(feature = "tracing")]
        tracing::debug!(order = %order.increment_id, %endpoint, "Rendering hosted payment form");

        Ok(match self.config.integration_type {
            IntegrationType::HostedEmbedded => forms::embedded_form(&endpoint, &signed),
            _ => forms::hosted_redirect_form(&endpoint, &signed, &self.config.gateway_name),
        })
    }

    /// Marks the session's last order as awaiting payment.
    async fn capture_order(&self, session: &CheckoutSession) -> Result<Order> {
        let increment_id = session
            .last_real_order_id
            .as_deref()
            .ok_or(CheckoutError::NoPendingOrder)?;
        let mut order = self.load_order(increment_id).await?;

        order.email_sent = false;
        order.status = self.config.order_status.clone();
        self.orders
            .save(&order)
            .await
            .map_err(CheckoutError::order_store)?;
        Ok(order)
    }

    /// Builds and sends the direct request matching the inbound fields.
    async fn direct_step(
        &self,
        request: &ProcessRequest,
        session: &mut CheckoutSession,
    ) -> Result<Fields> {
        let fields = &request.fields;
        let outbound = match interpreter::classify_inbound(fields) {
            InboundKind::ThreeDsV1Callback => {
                let xref = session
                    .xref
                    .as_deref()
                    .ok_or(CheckoutError::MissingSessionState("xref"))?;
                request::threeds_v1_continuation(
                    &self.config,
                    xref,
                    fields.get_str("MD").unwrap_or_default(),
                    fields.get_str("PaRes").unwrap_or_default(),
                    fields.get_str("PaReq"),
                )
            }
            InboundKind::ThreeDsV2Callback => {
                let threeds_ref = session
                    .threeds_ref
                    .as_deref()
                    .ok_or(CheckoutError::MissingSessionState("threeDSRef"))?;
                request::threeds_v2_continuation(&self.config, threeds_ref, fields.clone())
            }
            InboundKind::CardSubmission if request.method == Method::POST => {
                let card = CardDetails::from_fields(fields)
                    .validate()
                    .map_err(CheckoutError::InvalidCard)?;
                let order = self.capture_order(session).await?;
                let customer = session.customer_context(request.remote_addr);
                let outbound = request::direct_request(
                    &self.config,
                    &order.snapshot(),
                    &customer,
                    &request.device,
                    fields.get_map("browserInfo"),
                    &card,
                )?;

                let response = self.send(outbound).await?;
                if let Some(xref) = response.get_non_empty("xref") {
                    session.remember_xref(xref);
                }
                return Ok(response);
            }
            _ => return Err(CheckoutError::InvalidRequest),
        };

        self.send(outbound).await
    }

    async fn send(&self, fields: Fields) -> Result<Fields> {
        self.client
            .direct_request(fields)
            .await
            .map_err(CheckoutError::gateway)
    }

    /// Verifies a gateway response and acts on it.
    pub async fn process_response(
        &self,
        response: &Fields,
        request: &ProcessRequest,
        session: &mut CheckoutSession,
    ) -> Result<ProcessResult> {
        let outcome = interpreter::interpret(response, &self.config.secret)?;
        remember_wallet(
            &self.wallets,
            &self.config,
            session.customer_email.as_deref(),
            response,
        )
        .await
        .map_err(CheckoutError::wallet_store)?;

        match outcome {
            GatewayOutcome::ThreeDsRequired(challenge) => Ok(self.challenge_page(challenge, session)),
            GatewayOutcome::Approved(approval) => {
                self.on_successful_transaction(&approval, session).await?;
                session.has_quote = false;
                Ok(self.redirect(SUCCESS_PATH, request))
            }
            GatewayOutcome::Declined(decline) => Err(CheckoutError::Declined {
                code: decline.code,
                message: decline.message,
            }),
        }
    }

    /// Forwards the shopper to the issuer's ACS.
    fn challenge_page(&self, challenge: Challenge, session: &mut CheckoutSession) -> ProcessResult {
        if let Some(threeds_ref) = challenge.threeds_ref.as_deref() {
            session.remember_threeds_ref(threeds_ref);
        }
        if let Some(xref) = challenge.xref.as_deref() {
            session.remember_xref(xref);
        }

        let request = &challenge.acs_request;
        let page = match (request.get_str("MD"), request.get_str("PaReq")) {
            (Some(md), Some(pareq)) if !challenge.version.is_v2() => forms::threeds_v1_form(
                &challenge.acs_url,
                md,
                pareq,
                request
                    .get_str("TermUrl")
                    .unwrap_or(self.config.redirect_url.as_str()),
            ),
            _ => forms::silent_post(&challenge.acs_url, request, "_self"),
        };
        ProcessResult::Page(page)
    }

    /// Records an approved payment on its order.
    ///
    /// Orders already in the successful status are left untouched, so a
    /// repeated callback does not invoice twice.
    pub async fn on_successful_transaction(
        &self,
        approval: &Approval,
        session: &mut CheckoutSession,
    ) -> Result<()> {
        let increment_id = approval
            .increment_id()
            .ok_or(ProtocolError::MissingField("orderRef"))?;
        let mut order = self.load_order(increment_id).await?;
        let status = &self.config.successful_status;

        if &order.status != status {
            let amount = approval.amount_received.to_major(approval.currency_exponent)?;
            order.add_status_to_history(status, success_note(approval)?);

            if order.total_qty > 0 {
                order.invoices.push(Invoice {
                    transaction_id: approval.xref.clone(),
                    total_qty: order.total_qty,
                    captured_online: true,
                });
            }

            order.total_paid = Some(amount);
            order.base_total_paid = Some(amount);
            order.payment.last_trans_id = Some(approval.xref.clone());
            order.payment.transaction_id = Some(approval.xref.clone());
            order.payment.parent_transaction_id = None;
            order.payment.is_transaction_closed = false;
            order.payment.raw_details = Some(approval.raw.clone());
            order.transactions.push(TransactionRecord {
                transaction_id: approval.xref.clone(),
                kind: TransactionKind::Capture,
                comment: format!(
                    "The authorized amount is {} {}.",
                    order.base_currency_code,
                    approval.amount_major()?
                ),
                raw_details: approval.raw.clone(),
            });

            self.orders
                .save(&order)
                .await
                .map_err(CheckoutError::order_store)?;

            #[cfg(feature = "tracing")]
            tracing::info!(order = %order.increment_id, xref = %approval.xref, "Payment captured");
        }

        session.set_last_order(&order);
        Ok(())
    }

    /// Records a failed payment on its order, when the data names one.
    pub async fn on_failed_transaction(&self, data: &Fields) -> Result<()> {
        let (Some(order_ref), Some(code)) = (data.get_str("orderRef"), data.get_str("responseCode"))
        else {
            return Ok(());
        };
        let mut order = self.load_order(order_ref.trim_start_matches('#')).await?;
        let status = &self.config.unsuccessful_status;

        if &order.status != status {
            let note = format!(
                "{}<br/><br/>Message: {}<br/>xref: {}<br/>",
                outcome_headline(code),
                escape_html(data.get_str("responseMessage").unwrap_or_default()),
                escape_html(data.get_str("xref").unwrap_or_default()),
            );
            order.add_status_to_history(status, note);

            #[cfg(feature = "tracing")]
            tracing::info!(order = %order.increment_id, code, "Payment failed");
        }
        self.orders
            .save(&order)
            .await
            .map_err(CheckoutError::order_store)
    }

    async fn fail(
        &self,
        err: CheckoutError,
        data: Option<&Fields>,
        request: &ProcessRequest,
        session: &mut CheckoutSession,
    ) -> ProcessResult {
        #[cfg(feature = "tracing")]
        tracing::error!(error = %err, "Payment processing failed");

        session.add_error(FAILURE_MESSAGE);

        if let Some(data) = data.filter(|_| !err.is_untrusted()) {
            if let Err(_err) = self.on_failed_transaction(data).await {
                #[cfg(feature = "tracing")]
                tracing::error!(error = %_err, "Failed to record the failed payment");
            }
        }

        self.redirect(FAILURE_PATH, request)
    }

    fn redirect(&self, path: &'static str, request: &ProcessRequest) -> ProcessResult {
        let style = if request.ajax {
            RedirectStyle::Json
        } else if self.config.integration_type == IntegrationType::HostedEmbedded {
            RedirectStyle::TopWindow
        } else {
            RedirectStyle::Location
        };
        ProcessResult::Redirect { path, style }
    }

    async fn load_order(&self, increment_id: &str) -> Result<Order> {
        self.orders
            .load_by_increment_id(increment_id)
            .await
            .map_err(CheckoutError::order_store)?
            .ok_or_else(|| CheckoutError::OrderNotFound(increment_id.to_owned()))
    }

    /// Refunds `amount` of an order's captured payment.
    pub async fn refund(&self, increment_id: &str, amount: Decimal) -> Result<Order> {
        let mut order = self.load_order(increment_id).await?;
        let paid = order.total_paid.unwrap_or_default();
        let xref = order
            .payment
            .last_trans_id
            .clone()
            .ok_or(CheckoutError::RefundNotAvailable)?;
        if amount <= Decimal::ZERO || amount > paid {
            return Err(CheckoutError::RefundNotAvailable);
        }

        let minor = MinorAmount::from_major(amount, &order.base_currency_code)?;
        let result = refund::refund(
            &self.client,
            &self.config.merchant_id,
            &self.config.secret,
            &xref,
            minor,
        )
        .await?;

        let refund_xref = result
            .response
            .get_non_empty("xref")
            .unwrap_or(xref.as_str())
            .to_owned();
        order.add_status_to_history(REFUNDED_STATUS, result.message.clone());
        order.payment.transaction_id = Some(refund_xref.clone());
        order.payment.parent_transaction_id = Some(xref);
        order.payment.is_transaction_closed = true;
        order.transactions.push(TransactionRecord {
            transaction_id: refund_xref,
            kind: TransactionKind::Refund,
            comment: result.message,
            raw_details: result.response,
        });
        self.orders
            .save(&order)
            .await
            .map_err(CheckoutError::order_store)?;

        Ok(order)
    }
}

fn outcome_headline(code: &str) -> &'static str {
    if code.trim() == "0" {
        "Payment Successful"
    } else {
        "Payment Unsuccessful"
    }
}

/// The status history note for an approved payment.
pub fn success_note(approval: &Approval) -> Result<String> {
    let check = |value: &Option<String>| escape_html(value.as_deref().unwrap_or("Unknown"));
    let mut note = format!(
        "{}<br/><br/>Amount Received: {}<br/><br/>Message: {}<br/>xref: {}<br/>\
         CV2 Check: {}<br/>addressCheck: {}<br/>postcodeCheck: {}<br/>",
        outcome_headline("0"),
        approval.amount_major()?,
        escape_html(&approval.message),
        escape_html(&approval.xref),
        check(&approval.cv2_check),
        check(&approval.address_check),
        check(&approval.postcode_check),
    );

    if let Some(enrolled) = approval.three_ds_enrolled.as_deref() {
        note.push_str(&format!(
            "<br />3D Secure enrolled check outcome: \"{}\"",
            describe_enrolment(Some(enrolled))
        ));
    }
    if let Some(authenticated) = approval.three_ds_authenticated.as_deref() {
        note.push_str(&format!(
            "<br />3D Secure authenticated check outcome: \"{}\"",
            describe_authentication(Some(authenticated))
        ));
    }
    Ok(note)
}
