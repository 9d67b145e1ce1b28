//! # Broker Core
//!
//! A decentralized intent-matching broker: clients post intents, providers
//! bid in a sealed-interval auction, the best bid wins, and settlement runs
//! against an escrowed micropayment with automatic failover on execution
//! failure.
//!
//! ## Architecture
//!
//! - **Domain** (`domain`): `Intent`, `Bid`, `Provider`, `EscrowEntry`,
//!   `PaymentSettlement`, and the minor-unit `MinorUnits` money type.
//! - **Scoring** (`scoring`): pure, weighted multi-signal bid scoring.
//! - **Provider Registry** (`registry`): concurrent provider directory with
//!   heartbeat liveness and reputation tracking.
//! - **Intent Engine** (`engine`): the per-intent lifecycle state machine —
//!   bidding, winner selection, execution, failover.
//! - **Payment Orchestrator** (`payment`): escrow creation, settlement, and
//!   refund against a pluggable payment facilitator.
//! - **Push** (`push`): room-based WebSocket fan-out with per-subscriber
//!   backpressure.
//! - **API** (`api`): the HTTP/WebSocket boundary tying the above together.

pub mod api;
pub mod clock;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod observability;
pub mod payment;
pub mod push;
pub mod registry;
pub mod scoring;

pub use error::{BrokerError, ErrorCode, ErrorKind, Result};

/// Re-export of the commonly used types, for `main.rs` and `broker-cli`.
pub mod prelude {
    pub use crate::clock::{self, Clock, SharedClock};
    pub use crate::config::Config;
    pub use crate::domain::{
        Bid, BidId, BidStatus, EscrowEntry, EscrowStatus, Intent, IntentCategory, IntentId,
        IntentResult, IntentStatus, MinorUnits, PaymentSettlement, Provider, ProviderId,
        ProviderStatus,
    };
    pub use crate::engine::{CreateIntentRequest, EngineConfig, IntentEngine, SubmitBidRequest};
    pub use crate::error::{BrokerError, ErrorCode, ErrorKind, Result};
    pub use crate::payment::{DemoFacilitator, PaymentConfig, PaymentFacilitator, PaymentOrchestrator};
    pub use crate::push::{PushConfig, PushLayer};
    pub use crate::registry::{ProviderRegistry, RegistryConfig};
    pub use crate::scoring::ScoreWeightTable;
}
