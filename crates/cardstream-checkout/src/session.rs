//! Checkout session state carried between requests.
//!
//! The hosted form and the 3-D Secure steps bounce the shopper between the
//! storefront, the gateway and the issuer. Whatever must survive those hops
//! lives in a [`CheckoutSession`], which the processor reads and updates
//! explicitly.

use std::net::IpAddr;

use cardstream_kit::request::CustomerContext;
use dashmap::DashMap;
use uuid::Uuid;

use crate::orders::Order;

pub const XREF_COOKIE: &str = "xref";
pub const THREEDS_REF_COOKIE: &str = "threeDSRef";
/// Lifetime of the 3-D Secure cookies.
pub const THREEDS_COOKIE_MAX_AGE_SECS: u64 = 315;

/// A message to show the shopper on the next page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionMessage {
    Error(String),
}

/// A cookie the response must set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieUpdate {
    pub name: &'static str,
    pub value: String,
    pub max_age_secs: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CheckoutSession {
    pub session_id: String,
    /// Increment id of the order placed last in this session.
    pub last_real_order_id: Option<String>,
    /// Whether a cart (quote) is still active.
    pub has_quote: bool,
    /// Email of the logged-in customer, if any.
    pub customer_email: Option<String>,
    pub xref: Option<String>,
    pub threeds_ref: Option<String>,
    pub last_success_quote_id: Option<u64>,
    pub last_quote_id: Option<u64>,
    pub last_order_id: Option<u64>,
    pub messages: Vec<SessionMessage>,
    pub cookies: Vec<CookieUpdate>,
}

impl CheckoutSession {
    pub fn new(session_id: impl Into<String>) -> Self {
        CheckoutSession {
            session_id: session_id.into(),
            ..Default::default()
        }
    }

    /// A session with a fresh random id.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().simple().to_string())
    }

    pub fn is_logged_in(&self) -> bool {
        self.customer_email.is_some()
    }

    pub fn remember_xref(&mut self, xref: &str) {
        self.xref = Some(xref.to_owned());
        self.set_cookie(XREF_COOKIE, xref);
    }

    pub fn remember_threeds_ref(&mut self, threeds_ref: &str) {
        self.threeds_ref = Some(threeds_ref.to_owned());
        self.set_cookie(THREEDS_REF_COOKIE, threeds_ref);
    }

    /// Marks `order` as the session's last completed order.
    pub fn set_last_order(&mut self, order: &Order) {
        self.last_success_quote_id = order.quote_id;
        self.last_quote_id = order.quote_id;
        self.last_order_id = Some(order.id);
        self.last_real_order_id = Some(order.increment_id.clone());
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.messages.push(SessionMessage::Error(message.into()));
    }

    /// Takes the cookie updates accumulated while handling a request.
    pub fn take_cookies(&mut self) -> Vec<CookieUpdate> {
        std::mem::take(&mut self.cookies)
    }

    pub fn customer_context(&self, remote_addr: Option<IpAddr>) -> CustomerContext {
        CustomerContext {
            session_id: Some(self.session_id.clone()),
            remote_addr,
            customer_email: self.customer_email.clone(),
        }
    }

    fn set_cookie(&mut self, name: &'static str, value: &str) {
        self.cookies.retain(|cookie| cookie.name != name);
        self.cookies.push(CookieUpdate {
            name,
            value: value.to_owned(),
            max_age_secs: THREEDS_COOKIE_MAX_AGE_SECS,
        });
    }
}

/// Sessions kept in memory, keyed by session id.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: DashMap<String, CheckoutSession>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored session, or a new empty one with the given id.
    pub fn load(&self, session_id: &str) -> CheckoutSession {
        self.sessions
            .get(session_id)
            .map(|session| session.clone())
            .unwrap_or_else(|| CheckoutSession::new(session_id))
    }

    pub fn save(&self, mut session: CheckoutSession) {
        session.cookies.clear();
        self.sessions.insert(session.session_id.clone(), session);
    }
}
