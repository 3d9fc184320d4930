use std::{str::FromStr, sync::Arc};

use axum::{
    Router,
    extract::State,
    http::{HeaderMap, header},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use cardstream_checkout::{
    axum::{PROCESS_PATH, SESSION_COOKIE, cookie, router},
    orders::{InMemoryOrderStore, Order},
    processor::Checkout,
    session::{CheckoutSession, InMemorySessionStore, SessionMessage},
};
use cardstream_kit::{
    config::GatewayConfig, forms::escape_html, gateway_client::HttpGatewayClient,
    request::BillingAddress, wallet::InMemoryWalletStore,
};
use rust_decimal::Decimal;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

const DEMO_ORDER: &str = "000000001";

/// Places the demo order into the shopper's session and starts payment.
async fn place_order(
    State(sessions): State<Arc<InMemorySessionStore>>,
    headers: HeaderMap,
) -> Response {
    let mut session = match cookie(&headers, SESSION_COOKIE) {
        Some(session_id) => sessions.load(&session_id),
        None => CheckoutSession::generate(),
    };
    session.last_real_order_id = Some(DEMO_ORDER.to_owned());
    session.has_quote = false;
    let set_cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; Secure; SameSite=None",
        session.session_id
    );
    sessions.save(session);

    ([(header::SET_COOKIE, set_cookie)], Redirect::to(PROCESS_PATH)).into_response()
}

/// Shows and clears the session's messages.
async fn outcome(
    State(sessions): State<Arc<InMemorySessionStore>>,
    headers: HeaderMap,
) -> Html<String> {
    let Some(session_id) = cookie(&headers, SESSION_COOKIE) else {
        return Html("<p>No checkout session.</p>".to_owned());
    };
    let mut session = sessions.load(&session_id);
    let messages: String = session
        .messages
        .drain(..)
        .map(|SessionMessage::Error(text)| format!("<p class=\"error\">{}</p>", escape_html(&text)))
        .collect();
    let order = session.last_real_order_id.clone().unwrap_or_default();
    sessions.save(session);

    Html(format!("<h1>Order {}</h1>{messages}", escape_html(&order)))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = GatewayConfig::from_env().expect("Gateway configuration is incomplete");
    tracing::info!(
        merchant_id = %config.merchant_id,
        integration = %config.integration_type,
        "Using gateway at {}",
        config.gateway_url()
    );

    let mut order = Order::new(
        1,
        DEMO_ORDER,
        Decimal::from_str("10.01").expect("valid amount"),
        "GBP",
    );
    order.billing = BillingAddress::builder()
        .name("Jane Doe")
        .email("jane@example.com")
        .street_line_1("16 Test Street")
        .city("Testville")
        .country_id("GB")
        .postcode("TE15 5ST")
        .build();

    let checkout = Checkout::builder()
        .client(HttpGatewayClient::from_config(&config).expect("Failed to build gateway client"))
        .wallets(InMemoryWalletStore::new())
        .orders(InMemoryOrderStore::with_orders([order]))
        .config(config)
        .build();
    let sessions = Arc::new(InMemorySessionStore::new());

    let storefront = Router::new()
        .route("/checkout/place-order", get(place_order))
        .route("/checkout/onepage/success", get(outcome))
        .route("/checkout/cart", get(outcome))
        .with_state(sessions.clone());

    let app = router(Arc::new(checkout), sessions)
        .merge(storefront)
        .layer(TraceLayer::new_for_http());

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16 integer");
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], port).into();

    tracing::info!("Starting storefront on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .expect("Server failed");
}
