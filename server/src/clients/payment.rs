use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::utils::error::{AppError, AppResult};

pub const PAYMENT_TYPE_BANK_TRANSFER: &str = "bank_transfer";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BankTransfer {
    pub bank: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionDetails {
    pub order_id: String,
    pub gross_amount: i64,
}

/// Body of a core API charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeRequest {
    pub payment_type: String,
    pub bank_transfer: BankTransfer,
    pub transaction_details: TransactionDetails,
}

impl ChargeRequest {
    pub fn bank_transfer(bank: &str, order_id: &str, gross_amount: i64) -> Self {
        Self {
            payment_type: PAYMENT_TYPE_BANK_TRANSFER.to_string(),
            bank_transfer: BankTransfer {
                bank: bank.to_string(),
            },
            transaction_details: TransactionDetails {
                order_id: order_id.to_string(),
                gross_amount,
            },
        }
    }
}

/// Accepted charge, reduced to what the order needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Charge {
    pub transaction_id: String,
    pub transaction_status: String,
    pub virtual_account: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Issues a single charge. Never retried by callers.
    async fn charge(&self, request: &ChargeRequest) -> AppResult<Charge>;
}

#[derive(Debug, Deserialize)]
struct VaNumber {
    va_number: String,
}

#[derive(Debug, Deserialize)]
struct MidtransChargeResponse {
    status_code: Option<String>,
    status_message: Option<String>,
    transaction_id: Option<String>,
    transaction_status: Option<String>,
    #[serde(default)]
    va_numbers: Vec<VaNumber>,
}

impl MidtransChargeResponse {
    fn into_charge(self) -> AppResult<Charge> {
        // Midtrans reports business failures with a 200 and a non-2xx status_code.
        if let Some(code) = &self.status_code {
            if !code.starts_with('2') {
                return Err(AppError::ExternalServiceError(format!(
                    "payment gateway rejected the charge: {} {}",
                    code,
                    self.status_message.unwrap_or_default()
                )));
            }
        }

        let transaction_id = self.transaction_id.ok_or_else(|| {
            AppError::ExternalServiceError(
                "payment gateway response has no transaction id".to_string(),
            )
        })?;

        let virtual_account = self
            .va_numbers
            .into_iter()
            .next()
            .map(|va| va.va_number)
            .ok_or_else(|| {
                AppError::ExternalServiceError(
                    "payment gateway response has no virtual account".to_string(),
                )
            })?;

        Ok(Charge {
            transaction_id,
            transaction_status: self.transaction_status.unwrap_or_default(),
            virtual_account,
        })
    }
}

/// Midtrans core API client.
#[derive(Clone, Debug)]
pub struct MidtransClient {
    base_url: String,
    /// Already base64 encoded `server_key:` credential.
    server_key: String,
    http_client: Client,
}

impl MidtransClient {
    pub fn new(base_url: impl Into<String>, server_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            server_key: server_key.into(),
            http_client: Client::new(),
        }
    }

    fn charge_url(&self) -> String {
        format!("{}/v2/charge", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl PaymentGateway for MidtransClient {
    async fn charge(&self, request: &ChargeRequest) -> AppResult<Charge> {
        let response = self
            .http_client
            .post(self.charge_url())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Basic {}", self.server_key))
            .json(request)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!("payment gateway unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalServiceError(format!(
                "payment gateway responded with {}: {}",
                status, body
            )));
        }

        let body: MidtransChargeResponse = response.json().await.map_err(|e| {
            AppError::ExternalServiceError(format!("invalid payment gateway response: {}", e))
        })?;

        let charge = body.into_charge()?;
        tracing::info!(
            order_id = %request.transaction_details.order_id,
            transaction_id = %charge.transaction_id,
            "Payment charged"
        );

        Ok(charge)
    }
}
