//! Error taxonomy for the broker core.
//!
//! Every error carries a stable numeric code, an HTTP status, a
//! retryability flag, and a kind, so the boundary adapters can map it to
//! a response without inspecting the variant directly.

use std::borrow::Cow;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BrokerError>;

/// The eight error kinds named by the broker's error-handling design.
///
/// Numeric bands group codes by concern so new variants can be added
/// without renumbering neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation — 1000s
    UnknownIntentId = 1000,
    UnknownProviderId = 1001,
    UnknownCapability = 1002,
    InvalidBudget = 1003,
    InvalidDuration = 1004,
    InvalidFieldValue = 1005,

    // State — 1100s
    IntentNotOpen = 1100,
    BiddingAlreadyClosed = 1101,
    NotAssignedProvider = 1102,
    InvalidStateTransition = 1103,
    ProviderNotOnline = 1104,

    // Budget — 1200s
    BidExceedsBudget = 1200,
    InsufficientEscrow = 1201,
    ReputationBelowMinimum = 1202,

    // Verification — 1300s
    PaymentPayloadRejected = 1300,

    // Settlement — 1400s
    SettlementFailed = 1400,
    SettlementAlreadyInProgress = 1401,
    NoSettlementRecorded = 1402,

    // Timeout — 1500s
    BiddingDeadlineExceeded = 1500,
    ExecutionDeadlineExceeded = 1501,

    // Transport — 1600s
    SubscriberUnhealthy = 1600,

    // Infra — 1700s
    FacilitatorUnreachable = 1700,
    RegistryInconsistency = 1701,
    Internal = 1799,
}

impl ErrorCode {
    pub const fn numeric_code(self) -> u32 {
        self as u32
    }

    pub const fn http_status(self) -> StatusCode {
        use ErrorCode::*;
        match self {
            UnknownIntentId | UnknownProviderId | UnknownCapability => StatusCode::NOT_FOUND,
            InvalidBudget | InvalidDuration | InvalidFieldValue => StatusCode::UNPROCESSABLE_ENTITY,
            IntentNotOpen | BiddingAlreadyClosed | NotAssignedProvider
            | InvalidStateTransition | ProviderNotOnline => StatusCode::CONFLICT,
            BidExceedsBudget | InsufficientEscrow | ReputationBelowMinimum => {
                StatusCode::PAYMENT_REQUIRED
            }
            PaymentPayloadRejected => StatusCode::UNAUTHORIZED,
            SettlementFailed | NoSettlementRecorded => StatusCode::BAD_GATEWAY,
            SettlementAlreadyInProgress => StatusCode::TOO_MANY_REQUESTS,
            BiddingDeadlineExceeded | ExecutionDeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
            SubscriberUnhealthy => StatusCode::SERVICE_UNAVAILABLE,
            FacilitatorUnreachable | RegistryInconsistency | Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub const fn kind(self) -> ErrorKind {
        use ErrorCode::*;
        match self {
            UnknownIntentId | UnknownProviderId | UnknownCapability | InvalidBudget
            | InvalidDuration | InvalidFieldValue => ErrorKind::Validation,
            IntentNotOpen | BiddingAlreadyClosed | NotAssignedProvider
            | InvalidStateTransition | ProviderNotOnline => ErrorKind::State,
            BidExceedsBudget | InsufficientEscrow | ReputationBelowMinimum => ErrorKind::Budget,
            PaymentPayloadRejected => ErrorKind::Verification,
            SettlementFailed | SettlementAlreadyInProgress | NoSettlementRecorded => {
                ErrorKind::Settlement
            }
            BiddingDeadlineExceeded | ExecutionDeadlineExceeded => ErrorKind::Timeout,
            SubscriberUnhealthy => ErrorKind::Transport,
            FacilitatorUnreachable | RegistryInconsistency | Internal => ErrorKind::Infra,
        }
    }

    /// Infra errors are the only kind retried at the facilitator boundary.
    pub const fn is_retryable(self) -> bool {
        matches!(self.kind(), ErrorKind::Infra)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    State,
    Budget,
    Verification,
    Settlement,
    Timeout,
    Transport,
    Infra,
}

#[derive(Debug, Error)]
#[error("{user_message}")]
pub struct BrokerError {
    code: ErrorCode,
    user_message: Cow<'static, str>,
    internal_message: Option<String>,
}

impl BrokerError {
    pub fn new(code: ErrorCode, user_message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            user_message: user_message.into(),
            internal_message: None,
        }
    }

    pub fn with_internal(
        code: ErrorCode,
        user_message: impl Into<Cow<'static, str>>,
        internal: impl Into<String>,
    ) -> Self {
        Self {
            code,
            user_message: user_message.into(),
            internal_message: Some(internal.into()),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn user_message(&self) -> &str {
        &self.user_message
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    pub fn log(&self) {
        match self.code.kind() {
            ErrorKind::Infra => {
                tracing::warn!(code = ?self.code, internal = ?self.internal_message, "{}", self.user_message)
            }
            ErrorKind::Validation | ErrorKind::State | ErrorKind::Budget => {
                tracing::debug!(code = ?self.code, "{}", self.user_message)
            }
            _ => tracing::error!(code = ?self.code, internal = ?self.internal_message, "{}", self.user_message),
        }
        metrics::counter!("broker_errors_total", "code" => format!("{:?}", self.code)).increment(1);
    }

    // --- domain constructors -------------------------------------------------

    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, message)
    }

    pub fn unknown_intent(id: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::UnknownIntentId, format!("unknown intent '{id}'"))
    }

    pub fn unknown_provider(id: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::UnknownProviderId,
            format!("unknown provider '{id}'"),
        )
    }

    pub fn unknown_capability(cap: impl std::fmt::Display) -> Self {
        Self::new(
            ErrorCode::UnknownCapability,
            format!("capability '{cap}' is not recognized"),
        )
    }

    pub fn invalid_budget(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InvalidBudget, message)
    }

    pub fn invalid_duration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InvalidDuration, message)
    }

    pub fn intent_not_open() -> Self {
        Self::new(ErrorCode::IntentNotOpen, "intent is not open for bidding")
    }

    pub fn bidding_already_closed() -> Self {
        Self::new(ErrorCode::BiddingAlreadyClosed, "bidding has already closed")
    }

    pub fn not_assigned_provider() -> Self {
        Self::new(
            ErrorCode::NotAssignedProvider,
            "caller is not the assigned provider for this intent",
        )
    }

    pub fn invalid_state_transition(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::InvalidStateTransition, message)
    }

    pub fn provider_not_online() -> Self {
        Self::new(ErrorCode::ProviderNotOnline, "provider is not online")
    }

    pub fn bid_exceeds_budget() -> Self {
        Self::new(
            ErrorCode::BidExceedsBudget,
            "bid amount exceeds the intent's maximum budget",
        )
    }

    pub fn insufficient_escrow() -> Self {
        Self::new(ErrorCode::InsufficientEscrow, "no active escrow for intent")
    }

    pub fn reputation_below_minimum() -> Self {
        Self::new(
            ErrorCode::ReputationBelowMinimum,
            "provider reputation is below the intent's minimum",
        )
    }

    pub fn payment_payload_rejected(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::PaymentPayloadRejected, message)
    }

    pub fn settlement_failed(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorCode::SettlementFailed, message)
    }

    pub fn settlement_in_progress() -> Self {
        Self::new(
            ErrorCode::SettlementAlreadyInProgress,
            "a settlement is already in progress for this intent",
        )
    }

    pub fn no_settlement_recorded() -> Self {
        Self::new(ErrorCode::NoSettlementRecorded, "no settlement recorded for intent")
    }

    pub fn facilitator_unreachable(internal: impl Into<String>) -> Self {
        Self::with_internal(
            ErrorCode::FacilitatorUnreachable,
            "payment facilitator is unreachable",
            internal,
        )
    }

    pub fn internal(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::with_internal(ErrorCode::Internal, "internal error", message)
    }
}

impl IntoResponse for BrokerError {
    fn into_response(self) -> Response {
        self.log();
        let body = Json(serde_json::json!({
            "error": {
                "code": self.code,
                "message": self.user_message,
            }
        }));
        (self.http_status(), body).into_response()
    }
}
