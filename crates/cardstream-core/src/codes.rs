//! Gateway response codes.

use std::{fmt, str::FromStr};

use crate::{
    errors::{Error, Result},
    fields::Fields,
};

/// The transaction was approved.
pub const APPROVED: i64 = 0;
/// The card issuer requires 3-D Secure authentication before authorising.
pub const THREE_DS_REQUIRED: i64 = 65802;
/// Local code used when a gateway message fails signature verification.
pub const SIGNATURE_VERIFY_FAILED: i64 = 66343;

/// Field name of the response code.
pub const RESPONSE_CODE_FIELD: &str = "responseCode";

/// Outcome class of a gateway response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    Approved,
    ThreeDsRequired,
    Declined(i64),
}

impl ResponseCode {
    pub fn from_code(code: i64) -> Self {
        match code {
            APPROVED => ResponseCode::Approved,
            THREE_DS_REQUIRED => ResponseCode::ThreeDsRequired,
            other => ResponseCode::Declined(other),
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            ResponseCode::Approved => APPROVED,
            ResponseCode::ThreeDsRequired => THREE_DS_REQUIRED,
            ResponseCode::Declined(code) => *code,
        }
    }

    pub fn is_approved(&self) -> bool {
        matches!(self, ResponseCode::Approved)
    }

    /// Reads the `responseCode` field of a response.
    pub fn from_fields(fields: &Fields) -> Result<Self> {
        fields
            .get_str(RESPONSE_CODE_FIELD)
            .ok_or(Error::MissingField(RESPONSE_CODE_FIELD))?
            .parse()
    }
}

impl FromStr for ResponseCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(ResponseCode::from_code)
            .map_err(|_| Error::InvalidField {
                field: RESPONSE_CODE_FIELD,
                value: s.to_owned(),
            })
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
