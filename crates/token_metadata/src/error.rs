use solana_program::pubkey::Pubkey;
use thiserror::Error;

/// Failures while locating or decoding token metadata.
///
/// None of these are fatal to a trading session; callers fall back to a
/// truncated address when a mint's metadata cannot be read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    #[error("invalid token metadata: {field} missing or truncated")]
    TruncatedMetadata { field: &'static str },

    #[error("malformed token2022 TLV: {0}")]
    TruncatedTlv(String),

    #[error("token2022 mint has no recognizable extension layout")]
    UnrecognizedAccountLayout,

    #[error("token metadata mint mismatch: expected {expected}, found {found}")]
    MintMismatch { expected: Pubkey, found: Pubkey },

    #[error("no Token-2022 TokenMetadata found")]
    MetadataNotFound,

    #[error("unsupported token program {0}")]
    UnsupportedTokenProgram(Pubkey),

    #[error("account {address} not owned by mpl-token-metadata (owner={owner})")]
    UnexpectedOwner { address: Pubkey, owner: Pubkey },

    #[error("account {0} not found")]
    AccountNotFound(Pubkey),

    #[error("failed to fetch account {address}: {reason}")]
    Fetch { address: Pubkey, reason: String },
}

pub type Result<T> = std::result::Result<T, MetadataError>;
