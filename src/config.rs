use serde::Deserialize;

/// Ledger configuration, supplied by the embedding harness at construction.
/// Deserializable so harnesses can load it from their own config source.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Organisations allowed to mint and burn tokens.
    minters: Vec<String>,
}

impl LedgerConfig {
    pub fn new(minters: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            minters: minters.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `org` may mint and burn.
    pub fn may_mint(&self, org: &str) -> bool {
        self.minters.iter().any(|minter| minter == org)
    }
}
