//! Turning gateway responses into outcomes.
//!
//! Every response is verified against the merchant secret before any field
//! of it is trusted. The response code then decides between an approval, a
//! 3-D Secure challenge and a decline.

use cardstream_core::{
    Error, Fields, Result,
    amount::{MAX_CURRENCY_EXPONENT, MinorAmount, currency_exponent},
    codes::ResponseCode,
    signature::{MerchantSecret, verify},
};

use crate::card::{CARD_CVV, CARD_EXPIRY_MONTH, CARD_EXPIRY_YEAR, CARD_NUMBER};

const CARD_FIELDS: [&str; 4] = [CARD_NUMBER, CARD_EXPIRY_MONTH, CARD_EXPIRY_YEAR, CARD_CVV];

/// 3-D Secure protocol version as a number, `"2.1.0"` is `210`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ThreeDsVersion(pub u32);

impl ThreeDsVersion {
    pub const V1: ThreeDsVersion = ThreeDsVersion(100);

    /// Parses a dotted version. Missing or unreadable versions count as v1.
    pub fn parse(value: Option<&str>) -> Self {
        let digits: String = value
            .unwrap_or_default()
            .chars()
            .filter(char::is_ascii_digit)
            .collect();
        match digits.parse::<u32>() {
            Ok(version) if digits.len() == 1 => ThreeDsVersion(version * 100),
            Ok(version) if version > 0 => ThreeDsVersion(version),
            _ => ThreeDsVersion::V1,
        }
    }

    pub fn is_v2(&self) -> bool {
        self.0 >= 200
    }
}

/// An approved sale.
#[derive(Debug, Clone)]
pub struct Approval {
    pub order_ref: Option<String>,
    pub xref: String,
    pub amount_received: MinorAmount,
    pub currency_exponent: u32,
    pub message: String,
    pub cv2_check: Option<String>,
    pub address_check: Option<String>,
    pub postcode_check: Option<String>,
    pub three_ds_enrolled: Option<String>,
    pub three_ds_authenticated: Option<String>,
    pub wallet_id: Option<String>,
    pub raw: Fields,
}

impl Approval {
    /// The order number without its `#` prefix.
    pub fn increment_id(&self) -> Option<&str> {
        self.order_ref.as_deref().map(strip_order_ref)
    }

    /// The received amount in major units with the currency's decimals.
    pub fn amount_major(&self) -> Result<String> {
        self.amount_received.to_major_string(self.currency_exponent)
    }
}

/// The issuer wants the shopper to authenticate before the sale continues.
#[derive(Debug, Clone)]
pub struct Challenge {
    pub version: ThreeDsVersion,
    pub order_ref: Option<String>,
    pub xref: Option<String>,
    /// Reference for continuing a v2 transaction.
    pub threeds_ref: Option<String>,
    /// Where the shopper's browser must post `acs_request`.
    pub acs_url: String,
    pub acs_request: Fields,
    pub raw: Fields,
}

/// A declined or failed sale.
#[derive(Debug, Clone)]
pub struct Decline {
    pub code: i64,
    pub message: String,
    pub order_ref: Option<String>,
    pub xref: Option<String>,
    pub raw: Fields,
}

impl Decline {
    pub fn increment_id(&self) -> Option<&str> {
        self.order_ref.as_deref().map(strip_order_ref)
    }
}

#[derive(Debug, Clone)]
pub enum GatewayOutcome {
    Approved(Approval),
    ThreeDsRequired(Challenge),
    Declined(Decline),
}

impl GatewayOutcome {
    pub fn is_approved(&self) -> bool {
        matches!(self, GatewayOutcome::Approved(_))
    }

    pub fn as_approved(&self) -> Option<&Approval> {
        match self {
            GatewayOutcome::Approved(approval) => Some(approval),
            _ => None,
        }
    }

    pub fn as_challenge(&self) -> Option<&Challenge> {
        match self {
            GatewayOutcome::ThreeDsRequired(challenge) => Some(challenge),
            _ => None,
        }
    }

    pub fn as_declined(&self) -> Option<&Decline> {
        match self {
            GatewayOutcome::Declined(decline) => Some(decline),
            _ => None,
        }
    }
}

/// Verifies and classifies a gateway response.
pub fn interpret(fields: &Fields, secret: &MerchantSecret) -> Result<GatewayOutcome> {
    if let Err(err) = verify(fields, secret) {
        #[cfg(feature = "tracing")]
        tracing::warn!(error = %err, "Rejected gateway response");

        return Err(err);
    }

    let text = |key: &str| fields.get_non_empty(key).map(str::to_owned);
    let order_ref = text("orderRef");
    let xref = text("xref");
    let message = text("responseMessage").unwrap_or_default();

    match ResponseCode::from_fields(fields)? {
        ResponseCode::Approved => {
            let amount_received = fields
                .get_non_empty("amountReceived")
                .or_else(|| fields.get_non_empty("amount"))
                .ok_or(Error::MissingField("amountReceived"))?
                .parse::<MinorAmount>()?;
            let currency_exponent = match fields.get_non_empty("currencyExponent") {
                Some(exponent) => exponent
                    .parse::<u32>()
                    .ok()
                    .filter(|exponent| *exponent <= MAX_CURRENCY_EXPONENT)
                    .ok_or_else(|| Error::InvalidField {
                        field: "currencyExponent",
                        value: exponent.to_owned(),
                    })?,
                None => fields
                    .get_non_empty("currencyCode")
                    .map(currency_exponent)
                    .unwrap_or(2),
            };

            Ok(GatewayOutcome::Approved(Approval {
                order_ref,
                xref: xref.ok_or(Error::MissingField("xref"))?,
                amount_received,
                currency_exponent,
                message,
                cv2_check: text("cv2Check"),
                address_check: text("addressCheck"),
                postcode_check: text("postcodeCheck"),
                three_ds_enrolled: text("threeDSEnrolled"),
                three_ds_authenticated: text("threeDSAuthenticated"),
                wallet_id: text("walletID"),
                raw: fields.clone(),
            }))
        }
        ResponseCode::ThreeDsRequired => {
            let version = ThreeDsVersion::parse(fields.get_str("threeDSVersion"));
            let (acs_url, acs_request) = match fields.get_non_empty("threeDSURL") {
                Some(url) => (
                    url.to_owned(),
                    fields.get_map("threeDSRequest").cloned().unwrap_or_default(),
                ),
                None => {
                    let url = fields
                        .get_non_empty("threeDSACSURL")
                        .ok_or(Error::MissingField("threeDSURL"))?;
                    let mut request = Fields::new();
                    request.insert_opt("MD", fields.get_str("threeDSMD"));
                    request.insert_opt("PaReq", fields.get_str("threeDSPaReq"));
                    (url.to_owned(), request)
                }
            };

            #[cfg(feature = "tracing")]
            tracing::debug!(version = version.0, "Gateway requires 3-D Secure authentication");

            Ok(GatewayOutcome::ThreeDsRequired(Challenge {
                version,
                order_ref,
                xref,
                threeds_ref: text("threeDSRef"),
                acs_url,
                acs_request,
                raw: fields.clone(),
            }))
        }
        ResponseCode::Declined(code) => Ok(GatewayOutcome::Declined(Decline {
            code,
            message,
            order_ref,
            xref,
            raw: fields.clone(),
        })),
    }
}

/// What an inbound request to the storefront process endpoint carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    /// The ACS posted a v1 authentication result.
    ThreeDsV1Callback,
    /// The ACS posted a v2 method or challenge result.
    ThreeDsV2Callback,
    /// The checkout page posted card details.
    CardSubmission,
    /// The gateway posted a transaction result.
    GatewayResponse,
    Unknown,
}

pub fn classify_inbound(fields: &Fields) -> InboundKind {
    if fields.contains_key("MD") && fields.contains_key("PaRes") {
        InboundKind::ThreeDsV1Callback
    } else if fields.contains_key("threeDSMethodData") || fields.contains_key("cres") {
        InboundKind::ThreeDsV2Callback
    } else if CARD_FIELDS.iter().all(|key| fields.contains_key(key))
        && fields.contains_key("browserInfo")
    {
        InboundKind::CardSubmission
    } else if fields.contains_key("responseCode") {
        InboundKind::GatewayResponse
    } else {
        InboundKind::Unknown
    }
}

pub fn describe_enrolment(code: Option<&str>) -> &'static str {
    match code {
        Some("Y") => "Enrolled.",
        Some("N") => "Not Enrolled.",
        Some("U") => "Unable To Verify.",
        Some("E") => "Error Verifying Enrolment.",
        _ => "Integration unable to determine enrolment status.",
    }
}

pub fn describe_authentication(code: Option<&str>) -> &'static str {
    match code {
        Some("Y") => "Authentication Successful",
        Some("N") => "Not Authenticated",
        Some("U") => "Unable To Authenticate",
        Some("A") => "Attempted Authentication",
        Some("E") => "Error Checking Authentication",
        _ => "Integration unable to determine authentication status.",
    }
}

fn strip_order_ref(order_ref: &str) -> &str {
    order_ref.trim().trim_start_matches('#')
}
