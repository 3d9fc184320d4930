//! The storefront's order records, as far as payments touch them.

use std::convert::Infallible;

use cardstream_kit::{
    protocol::Fields,
    request::{BillingAddress, OrderSnapshot},
};
use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A note in the order's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusHistoryEntry {
    pub status: String,
    pub comment: String,
}

/// An invoice registered against a captured payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub transaction_id: String,
    pub total_qty: u32,
    pub captured_online: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    Capture,
    Refund,
}

/// A payment transaction recorded on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub kind: TransactionKind,
    pub comment: String,
    pub raw_details: Fields,
}

/// Payment details of an order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRecord {
    /// The gateway xref of the latest transaction.
    pub last_trans_id: Option<String>,
    pub transaction_id: Option<String>,
    pub parent_transaction_id: Option<String>,
    /// Raw gateway response of the latest transaction.
    pub raw_details: Option<Fields>,
    pub is_transaction_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    /// Customer-facing order number.
    pub increment_id: String,
    pub quote_id: Option<u64>,
    pub status: String,
    pub email_sent: bool,
    pub base_total_due: Decimal,
    pub base_currency_code: String,
    pub billing: BillingAddress,
    /// Number of items on the order; zero means nothing to invoice.
    pub total_qty: u32,
    pub total_paid: Option<Decimal>,
    pub base_total_paid: Option<Decimal>,
    pub payment: PaymentRecord,
    pub history: Vec<StatusHistoryEntry>,
    pub invoices: Vec<Invoice>,
    pub transactions: Vec<TransactionRecord>,
}

impl Order {
    pub fn new(
        id: u64,
        increment_id: impl Into<String>,
        base_total_due: Decimal,
        base_currency_code: impl Into<String>,
    ) -> Self {
        Order {
            id,
            increment_id: increment_id.into(),
            quote_id: None,
            status: "pending".to_owned(),
            email_sent: false,
            base_total_due,
            base_currency_code: base_currency_code.into(),
            billing: BillingAddress::default(),
            total_qty: 1,
            total_paid: None,
            base_total_paid: None,
            payment: PaymentRecord::default(),
            history: Vec::new(),
            invoices: Vec::new(),
            transactions: Vec::new(),
        }
    }

    /// Sets the status and records the note.
    pub fn add_status_to_history(&mut self, status: &str, comment: impl Into<String>) {
        self.status = status.to_owned();
        self.history.push(StatusHistoryEntry {
            status: status.to_owned(),
            comment: comment.into(),
        });
    }

    pub fn snapshot(&self) -> OrderSnapshot {
        OrderSnapshot::builder()
            .increment_id(self.increment_id.clone())
            .base_total_due(self.base_total_due)
            .currency_code(self.base_currency_code.clone())
            .billing(self.billing.clone())
            .build()
    }

    pub fn last_note(&self) -> Option<&StatusHistoryEntry> {
        self.history.last()
    }
}

/// Where orders are loaded from and saved to.
pub trait OrderStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load_by_increment_id(
        &self,
        increment_id: &str,
    ) -> impl Future<Output = Result<Option<Order>, Self::Error>> + Send;

    fn save(&self, order: &Order) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

/// Orders kept in memory, keyed by increment id.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: DashMap<String, Order>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let store = Self::new();
        for order in orders {
            store.orders.insert(order.increment_id.clone(), order);
        }
        store
    }

    pub fn get(&self, increment_id: &str) -> Option<Order> {
        self.orders.get(increment_id).map(|order| order.clone())
    }
}

impl OrderStore for InMemoryOrderStore {
    type Error = Infallible;

    async fn load_by_increment_id(&self, increment_id: &str) -> Result<Option<Order>, Self::Error> {
        Ok(self.get(increment_id))
    }

    async fn save(&self, order: &Order) -> Result<(), Self::Error> {
        self.orders.insert(order.increment_id.clone(), order.clone());
        Ok(())
    }
}
