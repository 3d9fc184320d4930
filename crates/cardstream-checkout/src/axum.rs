//! axum integration for the process endpoint.
//!
//! The router owns request decoding (form body or query string, headers,
//! cookies, peer address), session loading and saving, and turns a
//! [`ProcessResult`] into an HTTP response.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json, Router,
    body::to_bytes,
    extract::{ConnectInfo, Request, State},
    http::{
        HeaderMap, HeaderValue, Method, StatusCode,
        header::{
            ACCEPT, ACCEPT_CHARSET, ACCEPT_ENCODING, ACCEPT_LANGUAGE, COOKIE, SET_COOKIE,
            USER_AGENT,
        },
    },
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use cardstream_kit::{
    concepts::{GatewayClient, WalletStore},
    forms::top_redirect_script,
    protocol::{Fields, fields::encode_component, signature::verify},
    request::{BrowserInfo, DeviceHeaders},
};
use serde_json::json;

use crate::{
    orders::OrderStore,
    processor::{Checkout, ProcessRequest, ProcessResult, RedirectStyle},
    session::{
        CheckoutSession, CookieUpdate, InMemorySessionStore, THREEDS_REF_COOKIE, XREF_COOKIE,
    },
};

pub const PROCESS_PATH: &str = "/paymentgateway/order/process/";
pub const SESSION_COOKIE: &str = "CHECKOUT_SESSION";
/// Field the gateway echoes back with the shopper's session id.
pub const SESSION_FIELD: &str = "customerSessionID";
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared state of the checkout routes.
pub struct CheckoutState<C: GatewayClient, W: WalletStore, O: OrderStore> {
    pub checkout: Arc<Checkout<C, W, O>>,
    pub sessions: Arc<InMemorySessionStore>,
}

impl<C: GatewayClient, W: WalletStore, O: OrderStore> Clone for CheckoutState<C, W, O> {
    fn clone(&self) -> Self {
        CheckoutState {
            checkout: self.checkout.clone(),
            sessions: self.sessions.clone(),
        }
    }
}

/// A router serving `GET` and `POST` on [`PROCESS_PATH`].
pub fn router<C, W, O>(
    checkout: Arc<Checkout<C, W, O>>,
    sessions: Arc<InMemorySessionStore>,
) -> Router
where
    C: GatewayClient + Send + Sync + 'static,
    W: WalletStore + Send + Sync + 'static,
    O: OrderStore + Send + Sync + 'static,
{
    Router::new()
        .route(
            PROCESS_PATH,
            get(process::<C, W, O>).post(process::<C, W, O>),
        )
        .with_state(CheckoutState { checkout, sessions })
}

async fn process<C, W, O>(State(state): State<CheckoutState<C, W, O>>, request: Request) -> Response
where
    C: GatewayClient + Send + Sync + 'static,
    W: WalletStore + Send + Sync + 'static,
    O: OrderStore + Send + Sync + 'static,
{
    let (parts, body) = request.into_parts();
    let fields = if parts.method == Method::POST {
        match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(body) => Fields::parse(&String::from_utf8_lossy(&body)),
            Err(_) => return StatusCode::PAYLOAD_TOO_LARGE.into_response(),
        }
    } else {
        Fields::parse(parts.uri.query().unwrap_or_default())
    };

    let headers = &parts.headers;
    let mut session = load_session(&state, &fields, headers);
    let remote_addr = parts
        .extensions
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let request = ProcessRequest {
        method: parts.method.clone(),
        device: device_headers(headers),
        browser: Some(browser_info(headers, remote_addr)),
        remote_addr,
        ajax: is_ajax(headers),
        fields,
    };

    let result = state.checkout.process(request, &mut session).await;

    let mut cookies = vec![session_cookie(&session.session_id)];
    cookies.extend(session.take_cookies().iter().map(reference_cookie));
    state.sessions.save(session);

    let mut response = into_response(result);
    for cookie in cookies {
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }
    response
}

/// Finds the shopper's session.
///
/// A signed gateway callback names the session in `customerSessionID`, which
/// takes precedence over the cookie since the callback may arrive without
/// the shopper's cookies.
fn load_session<C: GatewayClient, W: WalletStore, O: OrderStore>(
    state: &CheckoutState<C, W, O>,
    fields: &Fields,
    headers: &HeaderMap,
) -> CheckoutSession {
    let posted = fields
        .get_non_empty(SESSION_FIELD)
        .filter(|_| verify(fields, &state.checkout.config.secret).is_ok())
        .map(str::to_owned);

    let mut session = match posted.or_else(|| cookie(headers, SESSION_COOKIE)) {
        Some(session_id) => state.sessions.load(&session_id),
        None => CheckoutSession::generate(),
    };

    if session.xref.is_none() {
        session.xref = cookie(headers, XREF_COOKIE);
    }
    if session.threeds_ref.is_none() {
        session.threeds_ref = cookie(headers, THREEDS_REF_COOKIE);
    }
    session
}

fn into_response(result: ProcessResult) -> Response {
    match result {
        ProcessResult::Page(html) => Html(html).into_response(),
        ProcessResult::Redirect { path, style } => {
            let location = format!("/{path}");
            match style {
                RedirectStyle::Json => Json(json!({ "success": "true", "path": location })).into_response(),
                RedirectStyle::TopWindow => Html(top_redirect_script(&location)).into_response(),
                RedirectStyle::Location => Redirect::to(&location).into_response(),
            }
        }
    }
}

fn session_cookie(session_id: &str) -> String {
    format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; Secure; SameSite=None",
        encode_component(session_id)
    )
}

fn reference_cookie(update: &CookieUpdate) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=None",
        update.name,
        encode_component(&update.value),
        update.max_age_secs
    )
}

/// Reads a cookie from the request, form-decoding its value.
pub fn cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .map(|pair| Fields::parse(pair.trim()))
        .find_map(|pair| pair.get_non_empty(name).map(str::to_owned))
}

fn header(headers: &HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
}

fn is_ajax(headers: &HeaderMap) -> bool {
    header(headers, "x-requested-with").is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"))
}

fn device_headers(headers: &HeaderMap) -> DeviceHeaders {
    DeviceHeaders {
        accept: header(headers, ACCEPT),
        accept_encoding: header(headers, ACCEPT_ENCODING),
        accept_language: header(headers, ACCEPT_LANGUAGE),
        accept_charset: header(headers, ACCEPT_CHARSET),
    }
}

/// Browser details from request headers and the cookies the checkout page's
/// script sets.
fn browser_info(headers: &HeaderMap, remote_addr: Option<std::net::IpAddr>) -> BrowserInfo {
    let number = |name| cookie(headers, name).and_then(|value| value.parse().ok());
    BrowserInfo {
        user_agent: header(headers, USER_AGENT),
        accept: header(headers, ACCEPT),
        language: cookie(headers, "language"),
        remote_addr,
        java_enabled: cookie(headers, "java").map(|value| value == "true" || value == "1"),
        screen_depth: number("screen_depth"),
        screen_width: number("screen_width"),
        screen_height: number("screen_height"),
        time_zone: cookie(headers, "timezone").and_then(|value| value.parse().ok()),
        identity: cookie(headers, "identity"),
        device: device_headers(headers),
    }
}
