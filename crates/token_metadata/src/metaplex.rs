//! Metaplex metadata accounts (legacy SPL Token mints)
//!
//! ```text
//! +------------+------------------------+------------+
//! | key (1)    | update_authority (32)  | mint (32)  |
//! +------------+------------------------+------------+
//! | name (borsh string) | symbol (borsh string) | uri ...
//! +---------------------+-----------------------+-------
//! ```
//!
//! Pre-v2 accounts nest name and symbol inside a `Data` struct, later ones
//! flatten it. Order and offsets are identical either way.

use log::debug;
use solana_program::pubkey::Pubkey;

use crate::error::{MetadataError, Result};
use crate::reader::ByteReader;
use crate::source::AccountSource;
use crate::{Token, METAPLEX_PROGRAM_ID};

/// key + update authority + mint
const HEADER_LEN: usize = 1 + 32 + 32;

/// PDA holding the Metaplex metadata for `mint`
pub fn metadata_address(mint: &Pubkey) -> Pubkey {
    let (address, _bump) = Pubkey::find_program_address(
        &[b"metadata", METAPLEX_PROGRAM_ID.as_ref(), mint.as_ref()],
        &METAPLEX_PROGRAM_ID,
    );
    address
}

/// Decode name and symbol from a Metaplex metadata account body.
pub fn decode_metaplex_metadata(data: &[u8]) -> Result<Token> {
    let mut r = ByteReader::new(data);
    r.bytes(HEADER_LEN)
        .ok_or(MetadataError::TruncatedMetadata { field: "header" })?;
    let name = r
        .borsh_string()
        .ok_or(MetadataError::TruncatedMetadata { field: "name" })?;
    let symbol = r
        .borsh_string()
        .ok_or(MetadataError::TruncatedMetadata { field: "symbol" })?;
    Ok(Token::new(&name, &symbol))
}

/// Fetch and decode the Metaplex metadata account derived from `mint`.
pub fn fetch_metaplex_metadata<S: AccountSource>(source: &S, mint: &Pubkey) -> Result<Token> {
    let pda = metadata_address(mint);
    debug!("Fetching Metaplex metadata {} for mint {}", pda, mint);

    let account = source
        .fetch_account(&pda)?
        .ok_or(MetadataError::AccountNotFound(pda))?;
    if account.owner != METAPLEX_PROGRAM_ID {
        return Err(MetadataError::UnexpectedOwner {
            address: pda,
            owner: account.owner,
        });
    }
    decode_metaplex_metadata(&account.data)
}
