//! Card details collected by a direct integration.

use std::fmt;

use cardstream_core::Fields;

pub const CARD_NUMBER: &str = "cardNumber";
pub const CARD_CVV: &str = "cardCVV";
pub const CARD_EXPIRY_MONTH: &str = "cardExpiryMonth";
pub const CARD_EXPIRY_YEAR: &str = "cardExpiryYear";

/// Card data as entered by the shopper. `Debug` output is masked.
#[derive(Clone, PartialEq, Eq)]
pub struct CardDetails {
    pub number: String,
    pub cvv: String,
    pub expiry_month: String,
    pub expiry_year: String,
}

impl CardDetails {
    /// Reads the card fields of a submitted form. Absent fields are empty.
    pub fn from_fields(fields: &Fields) -> Self {
        let read = |key| fields.get_str(key).unwrap_or_default().trim().to_owned();
        CardDetails {
            number: read(CARD_NUMBER),
            cvv: read(CARD_CVV),
            expiry_month: read(CARD_EXPIRY_MONTH),
            expiry_year: read(CARD_EXPIRY_YEAR),
        }
    }

    /// Checks presence and expiry formats.
    ///
    /// The year must have 2 or 4 digits and is normalised to 2, the month
    /// must have 2 digits. On failure the names of the offending fields are
    /// returned.
    pub fn validate(mut self) -> Result<Self, Vec<&'static str>> {
        let mut invalid = Vec::new();

        for (name, value) in [
            (CARD_NUMBER, &self.number),
            (CARD_CVV, &self.cvv),
            (CARD_EXPIRY_MONTH, &self.expiry_month),
            (CARD_EXPIRY_YEAR, &self.expiry_year),
        ] {
            if value.is_empty() {
                invalid.push(name);
            }
        }

        let all_digits = |value: &str| value.bytes().all(|b| b.is_ascii_digit());

        if !self.expiry_year.is_empty() {
            match self.expiry_year.len() {
                4 if all_digits(&self.expiry_year) => {
                    self.expiry_year = self.expiry_year[2..].to_owned();
                }
                2 if all_digits(&self.expiry_year) => {}
                _ => invalid.push(CARD_EXPIRY_YEAR),
            }
        }

        if !self.expiry_month.is_empty()
            && (self.expiry_month.len() != 2 || !all_digits(&self.expiry_month))
        {
            invalid.push(CARD_EXPIRY_MONTH);
        }

        if invalid.is_empty() {
            Ok(self)
        } else {
            Err(invalid)
        }
    }

    /// Card number with all spaces removed.
    pub fn compact_number(&self) -> String {
        self.number.chars().filter(|c| *c != ' ').collect()
    }

    /// The last four digits of the card number.
    pub fn last_four(&self) -> String {
        let digits = self.compact_number();
        let start = digits.len().saturating_sub(4);
        digits.get(start..).unwrap_or_default().to_owned()
    }

    pub fn to_fields(&self) -> Fields {
        Fields::new()
            .with(CARD_NUMBER, self.compact_number())
            .with(CARD_EXPIRY_MONTH, &self.expiry_month)
            .with(CARD_EXPIRY_YEAR, &self.expiry_year)
            .with(CARD_CVV, &self.cvv)
    }
}

impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &format_args!("**** {}", self.last_four()))
            .field("cvv", &"***")
            .field("expiry_month", &self.expiry_month)
            .field("expiry_year", &self.expiry_year)
            .finish()
    }
}
