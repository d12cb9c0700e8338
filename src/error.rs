use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a contract operation.
///
/// Every kind is terminal for the current operation: validation happens
/// before any write is issued, so no rollback is ever required. The kind,
/// not the message text, is the contract with the harness.
#[derive(Debug, Error)]
pub enum Error {
    #[error("contract has not been initialised")]
    NotInitialized,
    #[error("contract is already initialised")]
    AlreadyInitialized,
    #[error("invalid or missing arguments: {0}")]
    InvalidArguments(String),
    #[error("amount must be a positive integer")]
    InvalidAmount,
    #[error("sender and recipient are the same account")]
    SameAccount,
    #[error("insufficient funds: have {balance}, need {amount}")]
    InsufficientFunds { balance: u128, amount: u128 },
    #[error("insufficient allowance: have {allowance}, need {amount}")]
    InsufficientAllowance { allowance: u128, amount: u128 },
    #[error("organisation {0} is not authorised to mint or burn")]
    Unauthorized(String),
    #[error("election {0} is already registered")]
    ElectionAlreadyRegistered(String),
    #[error("election {0} does not exist")]
    ElectionNotFound(String),
    #[error("voter has already cast a vote in election {0}")]
    DuplicateVote(String),
    #[error("voter has already cast a vote on {0}")]
    DuplicateVoteForDate(String),
    #[error("value stored under {0} is not a decimal integer")]
    MalformedValue(String),
    #[error("state store: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Wrap a persistence-substrate failure.
    pub fn store(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Store(Box::new(err))
    }
}
