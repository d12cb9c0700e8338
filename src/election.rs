//! Election engine layered over the token ledger.
//!
//! Casting a vote is a unit token transfer with participation tracking on
//! top: a voter can appear at most once in any election's receipts, and at
//! most once across all elections sharing the same date. The engine composes
//! over the [`TokenLedger`] capability; the token movement itself always
//! goes through the ledger's single move path.

use std::collections::{HashMap, HashSet};

use log::{debug, info};

use crate::context::{Context, EventSink, StateStore};
use crate::error::{Error, Result};
use crate::event::{self, ElectionRegisteredEvent, VoteCastEvent};
use crate::ledger::TokenLedger;

/// A registered election and its receipts.
///
/// Records live in memory for the engine's lifetime; the surrounding
/// contract-state framework is responsible for persistence if it wants any.
#[derive(Debug, Clone)]
pub struct Election {
    id: String,
    date: String,
    finished: bool,
    /// Receipts in cast order.
    receipts: Vec<String>,
    /// The same voters, for constant-time duplicate checks.
    voters: HashSet<String>,
}

impl Election {
    fn new(id: &str, date: &str) -> Self {
        Self {
            id: id.to_string(),
            date: date.to_string(),
            finished: false,
            receipts: Vec::new(),
            voters: HashSet::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    /// Whether the election has been closed. One-way: nothing ever resets it.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Voter identities in the order their votes were cast.
    pub fn receipts(&self) -> &[String] {
        &self.receipts
    }

    fn has_voted(&self, voter: &str) -> bool {
        self.voters.contains(voter)
    }

    fn record_vote(&mut self, voter: String) {
        self.voters.insert(voter.clone());
        self.receipts.push(voter);
    }
}

/// The election engine. Owns the election records and a secondary index from
/// date to the voters who cast a vote on that date.
#[derive(Debug)]
pub struct ElectionEngine<L> {
    ledger: L,
    elections: HashMap<String, Election>,
    voters_by_date: HashMap<String, HashSet<String>>,
}

impl<L: TokenLedger> ElectionEngine<L> {
    pub fn new(ledger: L) -> Self {
        Self {
            ledger,
            elections: HashMap::new(),
            voters_by_date: HashMap::new(),
        }
    }

    /// The composed ledger capability.
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Register a new election for the given date.
    pub fn register_election<S: StateStore, E: EventSink>(
        &mut self,
        ctx: &mut Context<S, E>,
        election_id: &str,
        date: &str,
    ) -> Result<()> {
        self.ensure_ready(ctx)?;
        if election_id.is_empty() || date.is_empty() {
            return Err(Error::InvalidArguments(
                "election id and date are required".to_string(),
            ));
        }
        if self.elections.contains_key(election_id) {
            return Err(Error::ElectionAlreadyRegistered(election_id.to_string()));
        }

        let election = Election::new(election_id, date);
        event::emit(
            ctx.events,
            event::ELECTION_REGISTERED,
            &ElectionRegisteredEvent {
                election_id,
                date,
                finished: election.finished,
            },
        )?;
        self.elections.insert(election_id.to_string(), election);
        info!("registered election {election_id} for {date}");
        Ok(())
    }

    /// Close an election. Idempotent: closing an already-finished election
    /// leaves it unchanged.
    pub fn finish_election<S: StateStore, E: EventSink>(
        &mut self,
        ctx: &Context<S, E>,
        election_id: &str,
    ) -> Result<()> {
        self.ensure_ready(ctx)?;
        if election_id.is_empty() {
            return Err(Error::InvalidArguments("election id is required".to_string()));
        }
        let election = self
            .elections
            .get_mut(election_id)
            .ok_or_else(|| Error::ElectionNotFound(election_id.to_string()))?;
        election.finished = true;
        info!("election {election_id} finished");
        Ok(())
    }

    /// Cast the caller's vote: one token unit moves to the list account and
    /// the caller is appended to the election's receipts.
    ///
    /// The receipt is only written after the transfer has succeeded, so a
    /// voter without a token is not recorded and may retry once they hold
    /// one. Duplicate checks run per election, and per date across all
    /// elections sharing the supplied date.
    pub fn cast_vote<S: StateStore, E: EventSink>(
        &mut self,
        ctx: &mut Context<S, E>,
        election_id: &str,
        list_account: &str,
        date: &str,
    ) -> Result<()> {
        self.ensure_ready(ctx)?;
        if election_id.is_empty() || list_account.is_empty() {
            return Err(Error::InvalidArguments(
                "election id and list account are required".to_string(),
            ));
        }
        let voter = ctx.caller.id.clone();

        let election = self
            .elections
            .get_mut(election_id)
            .ok_or_else(|| Error::ElectionNotFound(election_id.to_string()))?;
        if election.has_voted(&voter) {
            return Err(Error::DuplicateVote(election_id.to_string()));
        }
        if self
            .voters_by_date
            .get(date)
            .is_some_and(|voters| voters.contains(&voter))
        {
            return Err(Error::DuplicateVoteForDate(date.to_string()));
        }

        // One token buys one vote. Nothing is recorded unless this lands.
        self.ledger.transfer(ctx, list_account, 1)?;

        // The date index is keyed by the election's stored date, which is
        // what the duplicate-by-date check compares against.
        self.voters_by_date
            .entry(election.date.clone())
            .or_default()
            .insert(voter.clone());
        debug!("vote by {voter} in election {election_id} for list {list_account}");
        election.record_vote(voter);

        event::emit(
            ctx.events,
            event::VOTE_CAST,
            &VoteCastEvent {
                election_id,
                date,
                list_account,
            },
        )
    }

    /// Look up a registered election.
    pub fn election(&self, election_id: &str) -> Option<&Election> {
        self.elections.get(election_id)
    }

    /// All registered elections, in no particular order.
    pub fn elections(&self) -> impl Iterator<Item = &Election> {
        self.elections.values()
    }

    /// The engine shares the ledger's readiness gate.
    fn ensure_ready<S: StateStore, E: EventSink>(&self, ctx: &Context<S, E>) -> Result<()> {
        if self.ledger.is_initialized(ctx)? {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::LedgerConfig;
    use crate::context::Caller;
    use crate::ledger::Ledger;
    use crate::memory::{MemEvents, MemStore};

    use super::*;

    const MINTER_ORG: &str = "Org1MSP";
    const VOTER_ORG: &str = "Org2MSP";

    fn ctx<'a>(
        store: &'a mut MemStore,
        events: &'a mut MemEvents,
        voter: &str,
    ) -> Context<'a, MemStore, MemEvents> {
        Context::new(store, events, Caller::new(voter, VOTER_ORG))
    }

    /// Engine over an initialised token, with one token transferred to each given voter.
    fn engine(
        store: &mut MemStore,
        events: &mut MemEvents,
        voters: &[&str],
    ) -> ElectionEngine<Ledger> {
        let ledger = Ledger::new(LedgerConfig::new([MINTER_ORG]));
        let mut c = Context::new(store, events, Caller::new("minter", MINTER_ORG));
        ledger
            .initialize(&mut c, "Ballot Nueva Esperanza", "BNE", "0")
            .unwrap();
        ledger.mint(&mut c, 1000).unwrap();
        for voter in voters {
            ledger.transfer(&mut c, voter, 1).unwrap();
        }
        ElectionEngine::new(ledger)
    }

    #[test]
    fn engine_shares_readiness_gate() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = ElectionEngine::new(Ledger::new(LedgerConfig::new([MINTER_ORG])));

        let mut c = ctx(&mut store, &mut events, "jose");
        assert!(matches!(
            engine.register_election(&mut c, "1", "30/04/2023"),
            Err(Error::NotInitialized)
        ));
        assert!(matches!(
            engine.cast_vote(&mut c, "1", "list-1", "30/04/2023"),
            Err(Error::NotInitialized)
        ));
    }

    #[test]
    fn register_election_rejects_duplicates() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &[]);

        let mut c = ctx(&mut store, &mut events, "admin");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();
        let err = engine
            .register_election(&mut c, "1", "01/05/2023")
            .unwrap_err();
        assert!(matches!(err, Error::ElectionAlreadyRegistered(id) if id == "1"));
        // First registration untouched.
        assert_eq!(engine.election("1").unwrap().date(), "30/04/2023");
    }

    #[test]
    fn register_election_requires_arguments() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &[]);

        let mut c = ctx(&mut store, &mut events, "admin");
        assert!(matches!(
            engine.register_election(&mut c, "", "30/04/2023"),
            Err(Error::InvalidArguments(_))
        ));
        assert!(matches!(
            engine.register_election(&mut c, "1", ""),
            Err(Error::InvalidArguments(_))
        ));
    }

    #[test]
    fn register_election_emits_event() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &[]);

        let mut c = ctx(&mut store, &mut events, "admin");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();

        let (name, payload) = events.last().unwrap();
        assert_eq!(name, event::ELECTION_REGISTERED);
        let payload: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "electionId": "1",
                "date": "30/04/2023",
                "finished": false,
            })
        );
    }

    #[test]
    fn finish_election_is_one_way_and_idempotent() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &[]);

        let mut c = ctx(&mut store, &mut events, "admin");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();
        assert!(!engine.election("1").unwrap().finished());

        engine.finish_election(&c, "1").unwrap();
        assert!(engine.election("1").unwrap().finished());
        engine.finish_election(&c, "1").unwrap();
        assert!(engine.election("1").unwrap().finished());

        let err = engine.finish_election(&c, "99").unwrap_err();
        assert!(matches!(err, Error::ElectionNotFound(id) if id == "99"));
    }

    #[test]
    fn vote_moves_one_token_and_records_receipt() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &["jose"]);

        let mut c = ctx(&mut store, &mut events, "jose");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();
        engine
            .cast_vote(&mut c, "1", "list-1", "30/04/2023")
            .unwrap();

        assert_eq!(engine.ledger().balance_of(&c, "jose").unwrap(), 0);
        assert_eq!(engine.ledger().balance_of(&c, "list-1").unwrap(), 1);
        assert_eq!(engine.election("1").unwrap().receipts(), ["jose"]);

        let (name, payload) = events.last().unwrap();
        assert_eq!(name, event::VOTE_CAST);
        let payload: serde_json::Value = serde_json::from_slice(payload).unwrap();
        assert_eq!(
            payload,
            serde_json::json!({
                "electionId": "1",
                "date": "30/04/2023",
                "listAccount": "list-1",
            })
        );
    }

    #[test]
    fn vote_requires_registered_election() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &["jose"]);

        let mut c = ctx(&mut store, &mut events, "jose");
        let err = engine
            .cast_vote(&mut c, "99", "list-1", "30/04/2023")
            .unwrap_err();
        assert!(matches!(err, Error::ElectionNotFound(id) if id == "99"));
    }

    #[test]
    fn vote_requires_arguments() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &["jose"]);

        let mut c = ctx(&mut store, &mut events, "jose");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();
        assert!(matches!(
            engine.cast_vote(&mut c, "", "list-1", "30/04/2023"),
            Err(Error::InvalidArguments(_))
        ));
        assert!(matches!(
            engine.cast_vote(&mut c, "1", "", "30/04/2023"),
            Err(Error::InvalidArguments(_))
        ));
    }

    #[test]
    fn second_vote_in_same_election_fails() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &["jose"]);

        let mut c = ctx(&mut store, &mut events, "jose");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();
        engine
            .cast_vote(&mut c, "1", "list-1", "30/04/2023")
            .unwrap();

        let err = engine
            .cast_vote(&mut c, "1", "list-2", "30/04/2023")
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateVote(id) if id == "1"));
        assert_eq!(engine.election("1").unwrap().receipts(), ["jose"]);
    }

    #[test]
    fn second_vote_on_same_date_fails_across_elections() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &["jose"]);

        let mut c = ctx(&mut store, &mut events, "jose");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();
        engine.register_election(&mut c, "2", "30/04/2023").unwrap();
        engine
            .cast_vote(&mut c, "1", "list-1", "30/04/2023")
            .unwrap();

        // Different election, same date.
        let err = engine
            .cast_vote(&mut c, "2", "list-1", "30/04/2023")
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateVoteForDate(date) if date == "30/04/2023"));
        assert!(engine.election("2").unwrap().receipts().is_empty());
    }

    #[test]
    fn votes_on_distinct_dates_are_independent() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &["jose", "maria"]);

        // Give jose a second token for the second election.
        let ledger = Ledger::new(LedgerConfig::new([MINTER_ORG]));
        let mut mint_ctx = Context::new(&mut store, &mut events, Caller::new("minter", MINTER_ORG));
        ledger.transfer(&mut mint_ctx, "jose", 1).unwrap();

        let mut c = ctx(&mut store, &mut events, "jose");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();
        engine.register_election(&mut c, "2", "01/05/2023").unwrap();
        engine
            .cast_vote(&mut c, "1", "list-1", "30/04/2023")
            .unwrap();
        engine
            .cast_vote(&mut c, "2", "list-1", "01/05/2023")
            .unwrap();
        assert_eq!(engine.election("2").unwrap().receipts(), ["jose"]);

        // A different voter is unaffected by jose's receipts.
        let mut c = ctx(&mut store, &mut events, "maria");
        engine
            .cast_vote(&mut c, "1", "list-2", "30/04/2023")
            .unwrap();
        assert_eq!(engine.election("1").unwrap().receipts(), ["jose", "maria"]);
    }

    #[test]
    fn failed_transfer_leaves_no_receipt() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        // jose holds no token.
        let mut engine = engine(&mut store, &mut events, &[]);

        let mut c = ctx(&mut store, &mut events, "jose");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();
        let err = engine
            .cast_vote(&mut c, "1", "list-1", "30/04/2023")
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds { .. }));
        assert!(engine.election("1").unwrap().receipts().is_empty());

        // Acquire a token and retry.
        let ledger = Ledger::new(LedgerConfig::new([MINTER_ORG]));
        let mut mint_ctx = Context::new(&mut store, &mut events, Caller::new("minter", MINTER_ORG));
        ledger.transfer(&mut mint_ctx, "jose", 1).unwrap();

        let mut c = ctx(&mut store, &mut events, "jose");
        engine
            .cast_vote(&mut c, "1", "list-1", "30/04/2023")
            .unwrap();
        assert_eq!(engine.election("1").unwrap().receipts(), ["jose"]);
    }

    #[test]
    fn finished_election_still_accepts_votes() {
        let (mut store, mut events) = (MemStore::new(), MemEvents::new());
        let mut engine = engine(&mut store, &mut events, &["jose"]);

        let mut c = ctx(&mut store, &mut events, "jose");
        engine.register_election(&mut c, "1", "30/04/2023").unwrap();
        engine.finish_election(&c, "1").unwrap();

        // The finished flag is an attribute, not a gate.
        engine
            .cast_vote(&mut c, "1", "list-1", "30/04/2023")
            .unwrap();
        assert_eq!(engine.election("1").unwrap().receipts(), ["jose"]);
    }
}
