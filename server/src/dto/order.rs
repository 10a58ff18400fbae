use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::dto::{invalid_field, validation_result};
use crate::models::order::{Item, Order};
use crate::utils::error::AppResult;

pub const PAYMENT_METHODS: [&str; 3] = ["bca", "bri", "bni"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceOrderRequest {
    pub payment_method: String,
    pub event_id: String,
    pub show_id: String,
    pub ticket_stock_id: String,
    pub quantity: i64,
}

impl PlaceOrderRequest {
    pub fn validate(&self) -> AppResult<()> {
        let mut messages = Vec::new();

        if !PAYMENT_METHODS.contains(&self.payment_method.as_str()) {
            messages.push(invalid_field("payment_method", &self.payment_method));
        }
        for (field, value) in [
            ("event_id", &self.event_id),
            ("show_id", &self.show_id),
            ("ticket_stock_id", &self.ticket_stock_id),
        ] {
            if value.trim().is_empty() {
                messages.push(invalid_field(field, value));
            }
        }
        // One ticket per order.
        if self.quantity != 1 {
            messages.push(invalid_field("quantity", self.quantity));
        }

        validation_result(messages)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemResponse {
    pub order_id: String,
    pub ticket_stock_id: String,
    pub show_id: String,
    pub event_id: String,
    pub event_name: String,
    pub show_venue: String,
    pub tier: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub quantity: i64,
}

impl From<&Item> for ItemResponse {
    fn from(item: &Item) -> Self {
        Self {
            order_id: item.order_id.clone(),
            ticket_stock_id: item.ticket_stock_id.clone(),
            show_id: item.show_id.clone(),
            event_id: item.event_id.clone(),
            event_name: item.event_name.clone(),
            show_venue: item.show_venue.clone(),
            tier: item.tier.clone(),
            price: item.price,
            quantity: item.quantity,
        }
    }
}

/// Wire form of an order. Also the payload of the expiry task and of the
/// `order-paid` stream entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderResponse {
    pub id: String,
    pub payment_method: String,
    pub transaction_id: Option<String>,
    pub virtual_account: Option<String>,
    pub status: String,
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub service_charge_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount_percentage: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub service_charge: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub discount: Decimal,
    pub items: Vec<ItemResponse>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Order> for OrderResponse {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id.clone(),
            payment_method: order.payment_method.clone(),
            transaction_id: order.transaction_id.clone(),
            virtual_account: order.virtual_account.clone(),
            status: order.status.as_str().to_string(),
            customer_id: order.customer_id,
            customer_name: order.customer_name.clone(),
            customer_email: order.customer_email.clone(),
            tax_percentage: order.tax_percentage,
            service_charge_percentage: order.service_charge_percentage,
            discount_percentage: order.discount_percentage,
            service_charge: order.service_charge,
            tax: order.tax,
            discount: order.discount,
            items: order.items.iter().map(ItemResponse::from).collect(),
            subtotal: order.subtotal,
            total_amount: order.total_amount,
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

/// Webhook body sent by the payment gateway.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentNotificationEvent {
    pub transaction_id: String,
    pub transaction_status: String,
    pub order_id: String,
}

impl PaymentNotificationEvent {
    pub fn is_settlement(&self) -> bool {
        self.transaction_status == "settlement"
    }
}

/// Expiry callback body. The scheduler sends a whole [`OrderResponse`]; only
/// these two fields are read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpireOrderEvent {
    pub id: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
}
