#![allow(dead_code)]

use std::{collections::VecDeque, io, str::FromStr, sync::Mutex};

use cardstream_checkout::{
    orders::{InMemoryOrderStore, Order},
    processor::Checkout,
};
use cardstream_kit::{
    concepts::GatewayClient,
    config::GatewayConfig,
    protocol::{
        Fields,
        integration::IntegrationType,
        signature::{MerchantSecret, sign_fields},
    },
    wallet::InMemoryWalletStore,
};
use rust_decimal::Decimal;
use url_macro::url;

pub const SECRET: &str = "Circle4Take40Idea";
pub const MERCHANT_ID: &str = "100001";
pub const ORDER: &str = "000000042";

/// Replies with queued responses and records what it was sent.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Fields>>,
    pub requests: Mutex<Vec<Fields>>,
}

impl ScriptedGateway {
    pub fn replying(replies: impl IntoIterator<Item = Fields>) -> Self {
        ScriptedGateway {
            replies: Mutex::new(replies.into_iter().collect()),
            requests: Mutex::default(),
        }
    }

    pub fn sent(&self) -> Vec<Fields> {
        self.requests.lock().unwrap().clone()
    }
}

impl GatewayClient for ScriptedGateway {
    type Error = io::Error;

    async fn direct_request(&self, request: Fields) -> Result<Fields, Self::Error> {
        self.requests.lock().unwrap().push(request);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| io::Error::other("no scripted reply"))
    }
}

pub type TestCheckout = Checkout<ScriptedGateway, InMemoryWalletStore, InMemoryOrderStore>;

pub fn secret() -> MerchantSecret {
    MerchantSecret::new(SECRET).unwrap()
}

pub fn config(integration: IntegrationType) -> GatewayConfig {
    GatewayConfig::builder()
        .merchant_id(MERCHANT_ID)
        .secret(secret())
        .redirect_url(url!("https://shop.example.com/paymentgateway/order/process/"))
        .integration_type(integration)
        .wallets_enabled(true)
        .build()
}

pub fn order() -> Order {
    let mut order = Order::new(7, ORDER, Decimal::from_str("10.01").unwrap(), "GBP");
    order.quote_id = Some(3);
    order
}

pub fn checkout(integration: IntegrationType, gateway: ScriptedGateway) -> TestCheckout {
    Checkout::builder()
        .config(config(integration))
        .client(gateway)
        .wallets(InMemoryWalletStore::new())
        .orders(InMemoryOrderStore::with_orders([order()]))
        .build()
}

pub fn signed(fields: Fields) -> Fields {
    sign_fields(fields, &secret())
}

pub fn approval_fields() -> Fields {
    Fields::new()
        .with("responseCode", "0")
        .with("responseMessage", "AUTHCODE:123456")
        .with("orderRef", format!("#{ORDER}"))
        .with("xref", "22010112ZZ01TF02")
        .with("amountReceived", "1001")
        .with("currencyCode", "826")
        .with("cv2Check", "matched")
        .with("addressCheck", "matched")
        .with("postcodeCheck", "matched")
}

pub fn approved() -> Fields {
    signed(approval_fields())
}

pub fn declined() -> Fields {
    signed(
        Fields::new()
            .with("responseCode", "5")
            .with("responseMessage", "CARD DECLINED")
            .with("orderRef", format!("#{ORDER}"))
            .with("xref", "22010112ZZ01TF03"),
    )
}
