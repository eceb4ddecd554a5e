//! Mock crypto payments for premium plans.

use chrono::{DateTime, Utc};
use rocket::{get, post, serde::json::Json, FromForm, State};
use rocket_okapi::openapi;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use app::{payment, pricing};

use crate::{
    access,
    error::{self, JsonError, JsonResult},
    state::RocketState,
};

#[derive(Debug, Deserialize, JsonSchema)]
pub(super) struct CreatePaymentRequest {
    /// `monthly` or `yearly`.
    plan: Option<String>,
    /// `BTC`, `ETH` or `USDT`.
    currency: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub(super) struct CreatePaymentResponse {
    payment_id: Uuid,
    /// Wallet address to send the funds to.
    address: String,
    /// Amount to send, in units of the chosen currency.
    crypto_amount: f64,
    /// The payment can't be confirmed after this time.
    expires_at: DateTime<Utc>,
}

#[derive(FromForm, JsonSchema)]
pub(super) struct CheckPaymentQuery {
    #[field(name = "paymentId")]
    #[serde(rename = "paymentId")]
    payment_id: Option<String>,
}

#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
enum PaymentStatus {
    /// Waiting for the funds to arrive.
    Pending,
    /// Paid; the plan has been applied to the account.
    Confirmed,
    /// The payment window closed before the funds arrived.
    Expired,
}

#[derive(Debug, Serialize, JsonSchema)]
pub(super) struct CheckPaymentResponse {
    status: PaymentStatus,
    confirmations: u32,
}

impl CheckPaymentResponse {
    fn from_entity(payment: &payment::Payment) -> Self {
        Self {
            status: match payment.status {
                payment::Status::Pending => PaymentStatus::Pending,
                payment::Status::Confirmed { .. } => PaymentStatus::Confirmed,
                payment::Status::Expired => PaymentStatus::Expired,
            },
            confirmations: payment.confirmations(),
        }
    }
}

/// Error while creating or checking a payment.
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(super) enum Error {
    /// Unexpected error, please try again later.
    Unknown,
    /// Plan or currency missing from the request.
    MissingFields,
    /// The plan does not exist.
    UnknownPlan,
    /// The currency is not accepted.
    UnsupportedCurrency,
    /// Payments in this currency are temporarily unavailable.
    CurrencyUnavailable,
    /// The payment id is missing or malformed.
    InvalidPaymentId,
    /// No such payment for this user.
    PaymentNotFound,
}

fn map_error(e: payment::Error) -> JsonError<Error> {
    match e {
        payment::Error::Pricing(pricing::Error::UnknownPlan(plan)) => {
            error::bad_request(Error::UnknownPlan, format!("unknown plan {:?}", plan))
        }
        payment::Error::Pricing(pricing::Error::UnsupportedCurrency(currency)) => {
            error::bad_request(
                Error::UnsupportedCurrency,
                format!("unsupported currency {:?}", currency),
            )
        }
        payment::Error::Pricing(e @ pricing::Error::WalletNotConfigured(_)) => {
            log::error!("{}", e);
            error::internal_server_error(
                Error::CurrencyUnavailable,
                "payments in this currency are temporarily unavailable".to_owned(),
            )
        }
        payment::Error::NotFound => {
            error::not_found(Error::PaymentNotFound, "payment not found".to_owned())
        }
        payment::Error::ConcurrencyConflict(_) => error::concurrency_error(Error::Unknown),
        payment::Error::Database(e) => error::unexpected(Error::Unknown, e),
    }
}

/// Start a crypto payment for a premium plan.
#[openapi(tag = "Payments")]
#[post("/create-crypto-payment", data = "<req>")]
pub(super) async fn create(
    state: &State<RocketState>,
    req: Json<CreatePaymentRequest>,
    guard: access::UserGuard,
) -> JsonResult<CreatePaymentResponse, Error> {
    let (plan, currency) = match (req.plan.as_deref(), req.currency.as_deref()) {
        (Some(plan), Some(currency)) => (plan, currency),
        _ => {
            return Err(error::bad_request(
                Error::MissingFields,
                "plan and currency are required".to_owned(),
            ))
        }
    };
    let plan = pricing::Plan::from_str(plan).map_err(|e| map_error(e.into()))?;
    let currency = pricing::Currency::from_str(currency).map_err(|e| map_error(e.into()))?;
    payment::create(guard.grant(), &state.db, &state.wallets, plan, currency)
        .await
        .map(|payment| {
            Json(CreatePaymentResponse {
                payment_id: payment.id.0,
                address: payment.address,
                crypto_amount: payment.crypto_amount,
                expires_at: payment.expires,
            })
        })
        .map_err(map_error)
}

/// Check whether a payment has been confirmed. Confirmation applies the plan to the account
/// exactly once; checking again afterwards just reports the status.
#[openapi(tag = "Payments")]
#[get("/check-crypto-payment?<query..>")]
pub(super) async fn check(
    state: &State<RocketState>,
    guard: access::UserGuard,
    query: CheckPaymentQuery,
) -> JsonResult<CheckPaymentResponse, Error> {
    let id = query
        .payment_id
        .as_deref()
        .and_then(|id| Uuid::from_str(id.trim()).ok())
        .ok_or_else(|| {
            error::bad_request(
                Error::InvalidPaymentId,
                "paymentId must be a valid payment id".to_owned(),
            )
        })?;
    payment::check(guard.grant(), &state.db, payment::Id(id))
        .await
        .map(|payment| Json(CheckPaymentResponse::from_entity(&payment)))
        .map_err(map_error)
}
