//! Conversation orchestrator for a storefront direct-message channel.
//!
//! This crate provides the [`Orchestrator`] type which takes inbound customer
//! messages from a [`MessageSource`], decides how to answer, records the
//! exchange and hands confirmed orders to the CRM.
//!
//! # Architecture
//!
//! ```text
//! InboundEvent (from message-listener)
//!          ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      ORCHESTRATOR                           │
//! │                                                             │
//! │  1. Dedup check (memory, then store) → duplicate: STOP      │
//! │         ↓                                                   │
//! │  2. Escalation phrase → ack reply + escalation alert        │
//! │         ↓                                                   │
//! │  3. Behavior rule → scripted reply (no generation call)     │
//! │         ↓                                                   │
//! │  4. Generate (catalog context + history) or fallback        │
//! │         ↓                                                   │
//! │  5. Store question + reply, linked both ways                │
//! │         ↓                                                   │
//! │  6. Send reply                                              │
//! │         ↓                                                   │
//! │  7. Unusual question / lead upsert / order push             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orchestrator::{MemorySource, Orchestrator, OrchestratorConfig, InboundEvent};
//!
//! let orchestrator = Orchestrator::new(
//!     OrchestratorConfig::from_env()?,
//!     database,
//!     Arc::new(brain),
//!     Arc::new(catalog),
//!     dispatcher,
//!     MemorySource::new(),
//! );
//!
//! let outcome = orchestrator
//!     .handle_event(InboundEvent::text("maria_shop_fan", "Є сукня Лілія в розмірі M?"))
//!     .await?;
//! ```

mod config;
mod context;
mod dedup;
mod error;
mod escalation;
mod leads;
mod markers;
pub mod order;
mod orchestrator;
mod responder;
mod rules;
mod source;

// Public exports
pub use config::{
    load_phrases_file, load_product_ids, OrchestratorConfig, OrchestratorConfigBuilder,
    DEFAULT_ESCALATION_PHRASES, DEFAULT_ESCALATION_REPLY, DEFAULT_FALLBACK_REPLY,
    DEFAULT_SYSTEM_PROMPT,
};
pub use context::{output_contract, Context};
pub use dedup::{DedupKey, Deduplicator};
pub use error::{ConfigError, OrchestratorError, PushStage};
pub use escalation::EscalationClassifier;
pub use leads::{extract_phone, LeadTracker};
pub use markers::{parse_reply, ConfirmedOrder, ParsedReply, ORDER_END, ORDER_START, UNUSUAL};
pub use order::{OrderPipeline, OrderPush, PushOutcome, VariantChoice};
pub use orchestrator::{Exchange, Orchestrator, ProcessOutcome, Route};
pub use responder::{GeneratedReply, GenerationInput, ReplySource, ResponseGenerator};
pub use rules::{find_rule, RuleMatch};
pub use source::{EventKind, InboundEvent, MemorySource, MessageSource};
