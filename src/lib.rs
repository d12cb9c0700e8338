//! Ledger-backed fungible token whose transfer primitive doubles as a
//! one-person-one-vote election record.
//!
//! Casting a vote moves exactly one token unit from the voter to the chosen
//! list account, and the same operation records the voter's participation so
//! that nobody votes twice in one election, or twice on one date across
//! elections. Token supply is conserved by construction: mint and burn
//! adjust balance and total supply together, and every other movement goes
//! through a single move primitive that only shuffles existing units.
//!
//! This crate is a contract core. The persistence substrate, caller identity
//! resolution and event channel all belong to the surrounding execution
//! harness and are consumed through the traits in [`context`]; in-memory
//! implementations for tests and local runs live in [`memory`].

pub mod config;
pub mod context;
pub mod election;
pub mod error;
pub mod event;
pub mod ledger;
pub mod memory;

pub use config::LedgerConfig;
pub use context::{composite_key, Caller, Context, EventSink, StateStore};
pub use election::{Election, ElectionEngine};
pub use error::{Error, Result};
pub use ledger::{Ledger, TokenLedger};
