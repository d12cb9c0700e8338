//! Event names and payloads emitted through the harness event channel.
//!
//! Payloads are JSON-encoded; field names are part of the wire contract
//! with off-band consumers.

use serde::Serialize;

use crate::context::EventSink;
use crate::error::Result;

pub const TRANSFER: &str = "Transfer";
pub const APPROVAL: &str = "Approval";
pub const ELECTION_REGISTERED: &str = "ElectionRegistered";
pub const VOTE_CAST: &str = "VoteCast";

/// Emitted on every successful transfer, including the unit transfer behind
/// a cast vote.
#[derive(Debug, Serialize)]
pub struct TransferEvent<'a> {
    pub from: &'a str,
    pub to: &'a str,
    pub value: u128,
}

/// Emitted when an owner sets a spender's allowance.
#[derive(Debug, Serialize)]
pub struct ApprovalEvent<'a> {
    pub owner: &'a str,
    pub spender: &'a str,
    pub value: u128,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionRegisteredEvent<'a> {
    pub election_id: &'a str,
    pub date: &'a str,
    pub finished: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCastEvent<'a> {
    pub election_id: &'a str,
    pub date: &'a str,
    pub list_account: &'a str,
}

/// JSON-encode `payload` and attach it to the current operation.
pub(crate) fn emit<T: Serialize>(
    events: &mut impl EventSink,
    name: &str,
    payload: &T,
) -> Result<()> {
    let bytes = serde_json::to_vec(payload).expect("serialisation is infallible");
    events.set_event(name, bytes)
}
