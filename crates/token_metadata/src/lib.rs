//! Token Metadata - name and symbol lookup for SPL mints
//!
//! Legacy SPL Token mints keep their metadata in a Metaplex PDA derived from
//! the mint. Token-2022 mints carry it in a TokenMetadata extension, either
//! inline or behind a MetadataPointer. The mint account's owner decides
//! which path is taken.

pub mod error;
pub mod metaplex;
mod reader;
pub mod source;
pub mod token2022;

#[cfg(test)]
mod test_utils;

use log::debug;
use solana_program::pubkey::Pubkey;

pub use error::{MetadataError, Result};
pub use source::{AccountData, AccountSource};

/// Metaplex token metadata program (devnet and mainnet)
pub const METAPLEX_PROGRAM_ID: Pubkey = solana_program::pubkey!("metaqbxxUerdq28cj1RbAWkYQm3ybzjb6a8bt518x1s");

/// Legacy SPL Token program
pub const TOKEN_PROGRAM_ID: Pubkey = solana_program::pubkey!("TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA");

/// SPL Token-2022 program
pub const TOKEN_2022_PROGRAM_ID: Pubkey = solana_program::pubkey!("TokenzQdBNbLqP5VEhdkAS6EPFLC1PuqfRbzi1pAp6Q");

/// Decoded display metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Token {
    pub name: String,
    pub symbol: String,
}

impl Token {
    /// Build from raw on-chain strings, stripping trailing NUL padding and
    /// surrounding whitespace.
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: trim_metadata(name),
            symbol: trim_metadata(symbol),
        }
    }
}

fn trim_metadata(s: &str) -> String {
    s.trim_end_matches('\0').trim().to_string()
}

/// Look up the name and symbol for `mint`.
pub fn token_metadata<S: AccountSource>(source: &S, mint: &Pubkey) -> Result<Token> {
    let account = source
        .fetch_account(mint)?
        .ok_or(MetadataError::AccountNotFound(*mint))?;
    debug!("Mint {} owned by {}", mint, account.owner);

    if account.owner == TOKEN_2022_PROGRAM_ID {
        token2022::token2022_metadata(source, mint, &account.data)
    } else if account.owner == TOKEN_PROGRAM_ID {
        metaplex::fetch_metaplex_metadata(source, mint)
    } else {
        Err(MetadataError::UnsupportedTokenProgram(account.owner))
    }
}
