//! Fungible token ledger over the key/value substrate.
//!
//! Balances, allowances and token metadata are persisted as UTF-8 decimal
//! strings; amounts are exact integers end to end, so the conservation
//! invariant (sum of balances == total supply) can never drift.

use log::{debug, info};

use crate::config::LedgerConfig;
use crate::context::{composite_key, Caller, Context, EventSink, StateStore};
use crate::error::{Error, Result};
use crate::event::{self, ApprovalEvent, TransferEvent};

const NAME_KEY: &str = "name";
const SYMBOL_KEY: &str = "symbol";
const DECIMALS_KEY: &str = "decimals";
const TOTAL_SUPPLY_KEY: &str = "totalSupply";
const BALANCE_PREFIX: &str = "balance";
const ALLOWANCE_PREFIX: &str = "allowance";

/// The slice of ledger capability other components compose over.
pub trait TokenLedger {
    /// Whether the token metadata has been set.
    fn is_initialized<S: StateStore, E: EventSink>(&self, ctx: &Context<S, E>) -> Result<bool>;

    /// Move `amount` units from the calling account to `to`.
    fn transfer<S: StateStore, E: EventSink>(
        &self,
        ctx: &mut Context<S, E>,
        to: &str,
        amount: u128,
    ) -> Result<()>;
}

/// The token ledger. Holds no state of its own; all balances live in the
/// substrate behind the per-invocation [`Context`].
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
}

impl Ledger {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }

    /// Set the token metadata. May only ever succeed once; every mutating
    /// operation fails until it has.
    pub fn initialize<S: StateStore, E: EventSink>(
        &self,
        ctx: &mut Context<S, E>,
        name: &str,
        symbol: &str,
        decimals: &str,
    ) -> Result<()> {
        if name.is_empty() || symbol.is_empty() || decimals.is_empty() {
            return Err(Error::InvalidArguments(
                "name, symbol and decimals are all required".to_string(),
            ));
        }
        if decimals.parse::<u32>().is_err() {
            return Err(Error::InvalidArguments(format!(
                "decimals {decimals:?} is not an unsigned integer"
            )));
        }
        // The name key doubles as the initialization marker.
        if ctx.store.get(NAME_KEY)?.is_some() {
            return Err(Error::AlreadyInitialized);
        }
        ctx.store.put(NAME_KEY, name.as_bytes().to_vec())?;
        ctx.store.put(SYMBOL_KEY, symbol.as_bytes().to_vec())?;
        ctx.store.put(DECIMALS_KEY, decimals.as_bytes().to_vec())?;
        info!("token initialised as {name} ({symbol}) with {decimals} decimals");
        Ok(())
    }

    pub(crate) fn ensure_initialized<S: StateStore, E: EventSink>(
        &self,
        ctx: &Context<S, E>,
    ) -> Result<()> {
        if ctx.store.get(NAME_KEY)?.is_some() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Create `amount` new units in the calling account. Restricted to the
    /// configured minter organisations.
    pub fn mint<S: StateStore, E: EventSink>(
        &self,
        ctx: &mut Context<S, E>,
        amount: u128,
    ) -> Result<()> {
        self.ensure_initialized(ctx)?;
        self.authorize_minter(&ctx.caller)?;
        require_positive(amount)?;

        let balance = self.balance_of(ctx, &ctx.caller.id)?;
        let supply = self.total_supply(ctx)?;
        let balance = balance.checked_add(amount).ok_or(Error::InvalidAmount)?;
        let supply = supply.checked_add(amount).ok_or(Error::InvalidAmount)?;

        put_amount(ctx.store, &balance_key(&ctx.caller.id), balance)?;
        put_amount(ctx.store, TOTAL_SUPPLY_KEY, supply)?;
        info!("minted {amount} to {}, supply now {supply}", ctx.caller.id);
        Ok(())
    }

    /// Destroy `amount` units from the calling account. Same authorisation
    /// as [`Ledger::mint`].
    pub fn burn<S: StateStore, E: EventSink>(
        &self,
        ctx: &mut Context<S, E>,
        amount: u128,
    ) -> Result<()> {
        self.ensure_initialized(ctx)?;
        self.authorize_minter(&ctx.caller)?;
        require_positive(amount)?;

        let balance = self.balance_of(ctx, &ctx.caller.id)?;
        if balance < amount {
            return Err(Error::InsufficientFunds { balance, amount });
        }
        let supply = self.total_supply(ctx)?;

        put_amount(ctx.store, &balance_key(&ctx.caller.id), balance - amount)?;
        put_amount(ctx.store, TOTAL_SUPPLY_KEY, supply - amount)?;
        info!(
            "burned {amount} from {}, supply now {}",
            ctx.caller.id,
            supply - amount
        );
        Ok(())
    }

    /// Transfer `amount` units from the calling account to `to`.
    pub fn transfer<S: StateStore, E: EventSink>(
        &self,
        ctx: &mut Context<S, E>,
        to: &str,
        amount: u128,
    ) -> Result<()> {
        self.ensure_initialized(ctx)?;
        let from = ctx.caller.id.clone();
        self.move_units(ctx, &from, to, amount)?;
        event::emit(
            ctx.events,
            event::TRANSFER,
            &TransferEvent {
                from: &from,
                to,
                value: amount,
            },
        )
    }

    /// Spend `amount` units of `from`'s balance on their behalf, within the
    /// allowance previously approved to the caller.
    pub fn transfer_from<S: StateStore, E: EventSink>(
        &self,
        ctx: &mut Context<S, E>,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<()> {
        self.ensure_initialized(ctx)?;
        let spender = ctx.caller.id.clone();
        let allowance = self.allowance(ctx, from, &spender)?;
        if allowance < amount {
            return Err(Error::InsufficientAllowance { allowance, amount });
        }
        // The move validates before it writes, so the allowance is only
        // decremented once the balances have actually changed hands.
        self.move_units(ctx, from, to, amount)?;
        put_amount(
            ctx.store,
            &composite_key(ALLOWANCE_PREFIX, &[from, &spender]),
            allowance - amount,
        )?;
        event::emit(
            ctx.events,
            event::TRANSFER,
            &TransferEvent {
                from,
                to,
                value: amount,
            },
        )
    }

    /// Set the caller's allowance for `spender`. Overwrites any previous
    /// value; zero revokes.
    pub fn approve<S: StateStore, E: EventSink>(
        &self,
        ctx: &mut Context<S, E>,
        spender: &str,
        amount: u128,
    ) -> Result<()> {
        self.ensure_initialized(ctx)?;
        if spender.is_empty() {
            return Err(Error::InvalidArguments("spender is required".to_string()));
        }
        let owner = ctx.caller.id.clone();
        put_amount(
            ctx.store,
            &composite_key(ALLOWANCE_PREFIX, &[&owner, spender]),
            amount,
        )?;
        debug!("{owner} allows {spender} to spend {amount}");
        event::emit(
            ctx.events,
            event::APPROVAL,
            &ApprovalEvent {
                owner: &owner,
                spender,
                value: amount,
            },
        )
    }

    /// The single path through which value ever moves between accounts.
    fn move_units<S: StateStore, E: EventSink>(
        &self,
        ctx: &mut Context<S, E>,
        from: &str,
        to: &str,
        amount: u128,
    ) -> Result<()> {
        if from == to {
            return Err(Error::SameAccount);
        }
        let from_balance = read_amount(ctx.store, &balance_key(from))?;
        if from_balance < amount {
            return Err(Error::InsufficientFunds {
                balance: from_balance,
                amount,
            });
        }
        let to_balance = read_amount(ctx.store, &balance_key(to))?;
        let to_balance = to_balance.checked_add(amount).ok_or(Error::InvalidAmount)?;

        // All reads and checks done; issue the writes.
        put_amount(ctx.store, &balance_key(from), from_balance - amount)?;
        put_amount(ctx.store, &balance_key(to), to_balance)?;
        debug!("moved {amount} from {from} to {to}");
        Ok(())
    }

    fn authorize_minter(&self, caller: &Caller) -> Result<()> {
        if self.config.may_mint(&caller.org) {
            Ok(())
        } else {
            Err(Error::Unauthorized(caller.org.clone()))
        }
    }

    /// Balance of `account`; zero if the account has never held units.
    pub fn balance_of<S: StateStore, E: EventSink>(
        &self,
        ctx: &Context<S, E>,
        account: &str,
    ) -> Result<u128> {
        read_amount(ctx.store, &balance_key(account))
    }

    /// Remaining allowance of `spender` over `owner`'s balance; zero if
    /// never approved.
    pub fn allowance<S: StateStore, E: EventSink>(
        &self,
        ctx: &Context<S, E>,
        owner: &str,
        spender: &str,
    ) -> Result<u128> {
        read_amount(ctx.store, &composite_key(ALLOWANCE_PREFIX, &[owner, spender]))
    }

    pub fn total_supply<S: StateStore, E: EventSink>(&self, ctx: &Context<S, E>) -> Result<u128> {
        read_amount(ctx.store, TOTAL_SUPPLY_KEY)
    }

    pub fn token_name<S: StateStore, E: EventSink>(&self, ctx: &Context<S, E>) -> Result<String> {
        read_metadata(ctx.store, NAME_KEY)
    }

    pub fn symbol<S: StateStore, E: EventSink>(&self, ctx: &Context<S, E>) -> Result<String> {
        read_metadata(ctx.store, SYMBOL_KEY)
    }

    pub fn decimals<S: StateStore, E: EventSink>(&self, ctx: &Context<S, E>) -> Result<String> {
        read_metadata(ctx.store, DECIMALS_KEY)
    }
}

impl TokenLedger for Ledger {
    fn is_initialized<S: StateStore, E: EventSink>(&self, ctx: &Context<S, E>) -> Result<bool> {
        Ok(ctx.store.get(NAME_KEY)?.is_some())
    }

    fn transfer<S: StateStore, E: EventSink>(
        &self,
        ctx: &mut Context<S, E>,
        to: &str,
        amount: u128,
    ) -> Result<()> {
        Ledger::transfer(self, ctx, to, amount)
    }
}

fn balance_key(account: &str) -> String {
    composite_key(BALANCE_PREFIX, &[account])
}

fn require_positive(amount: u128) -> Result<()> {
    if amount == 0 {
        Err(Error::InvalidAmount)
    } else {
        Ok(())
    }
}

/// Decode a persisted decimal integer; an absent key reads as zero.
fn read_amount(store: &impl StateStore, key: &str) -> Result<u128> {
    match store.get(key)? {
        Some(bytes) => std::str::from_utf8(&bytes)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::MalformedValue(key.to_string())),
        None => Ok(0),
    }
}

fn put_amount(store: &mut impl StateStore, key: &str, amount: u128) -> Result<()> {
    store.put(key, amount.to_string().into_bytes())
}

/// Metadata reads are only defined once the contract is initialised.
fn read_metadata(store: &impl StateStore, key: &str) -> Result<String> {
    let bytes = store.get(key)?.ok_or(Error::NotInitialized)?;
    String::from_utf8(bytes).map_err(|_| Error::MalformedValue(key.to_string()))
}
