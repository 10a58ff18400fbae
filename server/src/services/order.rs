use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use reqwest::Method;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::clients::payment::{ChargeRequest, PaymentGateway};
use crate::clients::publisher::{EventPublisher, TOPIC_ORDER_PAID};
use crate::clients::scheduler::{HttpTask, TaskScheduler};
use crate::dto::order::{
    ExpireOrderEvent, OrderResponse, PaymentNotificationEvent, PlaceOrderRequest,
};
use crate::dto::page::PageRequest;
use crate::models::account::Account;
use crate::models::order::{Item, Order, OrderStatus, Pricing, ORDER_ID_PREFIX};
use crate::services::sales_rule::{check_entitlement, SalesRules};
use crate::services::with_timeout;
use crate::store::{CatalogStore, Database, InventoryStore, OrderStore};
use crate::utils::error::{AppError, AppResult};
use crate::utils::id::timestamp_with_prefix;
use crate::utils::response::PageMeta;

pub const EXPIRE_ORDER_QUEUE: &str = "expire-order";
pub const EXPIRE_ORDER_PATH: &str = "/tm-order/v1/customerapp/orders/on-expire";

#[derive(Debug, Clone)]
pub struct OrderSettings {
    /// Budget for each workflow invocation.
    pub timeout: Duration,
    /// Public origin the expiry callback is sent to.
    pub base_url: String,
    pub order_expire: chrono::Duration,
    pub service_charge_percentage: Decimal,
    pub tax_percentage: Decimal,
    pub utc_offset: FixedOffset,
}

pub struct OrderService {
    db: Arc<dyn Database>,
    payment: Arc<dyn PaymentGateway>,
    scheduler: Arc<dyn TaskScheduler>,
    publisher: Arc<dyn EventPublisher>,
    rules: SalesRules,
    settings: OrderSettings,
}

impl OrderService {
    pub fn new(
        db: Arc<dyn Database>,
        payment: Arc<dyn PaymentGateway>,
        scheduler: Arc<dyn TaskScheduler>,
        publisher: Arc<dyn EventPublisher>,
        settings: OrderSettings,
    ) -> Self {
        Self {
            db,
            payment,
            scheduler,
            publisher,
            rules: SalesRules::new(settings.utc_offset),
            settings,
        }
    }

    pub async fn place_order(
        &self,
        account: &Account,
        request: PlaceOrderRequest,
    ) -> AppResult<OrderResponse> {
        let order = with_timeout(self.settings.timeout, self.place(account, request)).await?;
        // Outside the budget: a committed order always gets its expiry task.
        self.schedule_expiry(&order).await;

        Ok(order)
    }

    async fn place(&self, account: &Account, request: PlaceOrderRequest) -> AppResult<OrderResponse> {
        request.validate()?;

        let now = Utc::now();
        let mut uow = self.db.begin().await?;

        self.rules.check(&mut *uow, &request.event_id, now).await?;
        check_entitlement(&mut *uow, &request.event_id, account.id).await?;

        let event = uow.find_event(&request.event_id).await?;
        let show = uow.find_show(&request.show_id).await?;
        if show.event_id != event.id {
            return Err(AppError::ValidationError("invalid show id".to_string()));
        }

        // Held until commit or rollback, across the gateway call.
        let mut stock = uow
            .find_ticket_stock_for_update(&request.ticket_stock_id)
            .await?;
        if stock.show_id != show.id {
            return Err(AppError::ValidationError(
                "invalid ticket stock id".to_string(),
            ));
        }
        stock.reserve(request.quantity, now)?;

        let pricing = Pricing::compute(
            stock.price,
            request.quantity,
            self.settings.service_charge_percentage,
            self.settings.tax_percentage,
        );

        let order_id = timestamp_with_prefix(ORDER_ID_PREFIX, now);
        let mut order = Order {
            id: order_id.clone(),
            payment_method: request.payment_method.clone(),
            virtual_account: None,
            transaction_id: None,
            status: OrderStatus::WaitingForPayment,
            customer_id: account.id,
            customer_name: account.name.clone(),
            customer_email: account.email.clone(),
            tax_percentage: self.settings.tax_percentage,
            service_charge_percentage: self.settings.service_charge_percentage,
            discount_percentage: Decimal::ZERO,
            service_charge: Decimal::ZERO,
            tax: Decimal::ZERO,
            discount: Decimal::ZERO,
            items: vec![Item {
                id: 0,
                order_id,
                ticket_stock_id: stock.id.clone(),
                show_id: show.id.clone(),
                event_id: event.id.clone(),
                event_name: event.name.clone(),
                show_venue: show.venue.clone(),
                tier: stock.tier.clone(),
                price: stock.price,
                quantity: request.quantity,
            }],
            subtotal: Decimal::ZERO,
            total_amount: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        };
        order.apply_pricing(&pricing);

        let charge = self
            .payment
            .charge(&ChargeRequest::bank_transfer(
                &order.payment_method,
                &order.id,
                pricing.gross_amount()?,
            ))
            .await?;
        order.transaction_id = Some(charge.transaction_id);
        order.virtual_account = Some(charge.virtual_account);

        uow.update_ticket_stock(&stock).await?;
        uow.save_order(&order).await?;
        uow.commit().await.map_err(|e| {
            // The charge above already went through.
            error!(
                order_id = %order.id,
                transaction_id = ?order.transaction_id,
                error = %e,
                "Order charged but not committed"
            );
            e
        })?;

        info!(
            order_id = %order.id,
            event_id = %event.id,
            ticket_stock_id = %stock.id,
            customer_id = account.id,
            total_amount = %order.total_amount,
            "Order placed"
        );

        Ok(OrderResponse::from(&order))
    }

    /// Best effort: the order is already durable.
    async fn schedule_expiry(&self, order: &OrderResponse) {
        let body = match serde_json::to_vec(order) {
            Ok(body) => body,
            Err(e) => {
                error!(order_id = %order.id, error = %e, "Failed to encode expiry task");
                return;
            }
        };

        let task = HttpTask {
            url: format!(
                "{}{}",
                self.settings.base_url.trim_end_matches('/'),
                EXPIRE_ORDER_PATH
            ),
            method: Method::POST,
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body,
        };
        let expire_at = order.created_at + self.settings.order_expire;

        if let Err(e) = self
            .scheduler
            .schedule_at(EXPIRE_ORDER_QUEUE, task, expire_at)
            .await
        {
            error!(order_id = %order.id, error = %e, "Failed to schedule order expiry");
        }
    }

    pub async fn on_payment_notification(&self, event: PaymentNotificationEvent) -> AppResult<()> {
        with_timeout(self.settings.timeout, self.settle(event)).await
    }

    async fn settle(&self, event: PaymentNotificationEvent) -> AppResult<()> {
        if !event.is_settlement() {
            info!(
                order_id = %event.order_id,
                transaction_status = %event.transaction_status,
                "Ignoring non-settlement notification"
            );
            return Ok(());
        }

        let mut uow = self.db.begin().await?;
        let mut order = uow.find_order(&event.order_id).await?;

        if !order.mark_paid(Utc::now()) {
            uow.rollback().await?;
            info!(
                order_id = %order.id,
                status = order.status.as_str(),
                "Order already settled or expired"
            );
            return Ok(());
        }

        order.items = uow.find_order_items(&order.id).await?;
        uow.update_order_status(&order).await?;
        uow.commit().await?;

        info!(
            order_id = %order.id,
            transaction_id = %event.transaction_id,
            "Order paid"
        );

        self.publish_paid(&order).await;
        Ok(())
    }

    /// Best effort: the publisher owns redelivery.
    async fn publish_paid(&self, order: &Order) {
        let key = order.transaction_id.clone().unwrap_or_default();
        let payload = match serde_json::to_vec(&OrderResponse::from(order)) {
            Ok(payload) => payload,
            Err(e) => {
                error!(order_id = %order.id, error = %e, "Failed to encode paid order");
                return;
            }
        };

        if let Err(e) = self
            .publisher
            .publish(TOPIC_ORDER_PAID, &key, &[], &payload)
            .await
        {
            error!(order_id = %order.id, error = %e, "Failed to publish paid order");
        }
    }

    pub async fn on_expire_order(&self, event: ExpireOrderEvent) -> AppResult<()> {
        with_timeout(self.settings.timeout, self.expire(event)).await
    }

    async fn expire(&self, event: ExpireOrderEvent) -> AppResult<()> {
        let mut uow = self.db.begin().await?;
        let mut order = uow.find_order(&event.id).await?;

        if !order.mark_expired(Utc::now()) {
            uow.rollback().await?;
            if order.status == OrderStatus::Paid {
                info!(order_id = %order.id, "Paid order left untouched by expiry");
            } else {
                warn!(order_id = %order.id, "Order already expired");
            }
            return Ok(());
        }

        uow.update_order_status(&order).await?;
        uow.commit().await?;

        info!(
            order_id = %order.id,
            transaction_id = ?event.transaction_id,
            "Order expired"
        );
        Ok(())
    }

    pub async fn get_many_orders(
        &self,
        account: &Account,
        page: PageRequest,
    ) -> AppResult<(Vec<OrderResponse>, PageMeta)> {
        with_timeout(self.settings.timeout, self.list(account, page)).await
    }

    async fn list(
        &self,
        account: &Account,
        page: PageRequest,
    ) -> AppResult<(Vec<OrderResponse>, PageMeta)> {
        let (total, orders) = tokio::try_join!(
            self.db.count_orders(account.id),
            self.db.find_orders(account.id, page.offset(), page.limit()),
        )?;

        let mut responses = Vec::with_capacity(orders.len());
        for mut order in orders {
            order.items = self.db.find_order_items(&order.id).await?;
            responses.push(OrderResponse::from(&order));
        }

        let meta = PageMeta {
            page: page.page,
            size: page.size,
            total,
        };
        Ok((responses, meta))
    }
}
