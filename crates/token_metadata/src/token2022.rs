//! Token-2022 metadata extensions
//!
//! A Token-2022 mint is the 82 byte base mint followed by extension data.
//! There is no discriminator telling the two continuations apart, so both
//! are probed in order:
//!
//! ```text
//! padded:   | Mint (82) | zero padding (83) | AccountType = 1 | TLV entries ...
//! unpadded: | Mint (82) | AccountType = 1   | TLV entries ...
//!
//! TLV entry: | type u16 | length u16 | value [length] |
//! ```
//!
//! Type 19 is TokenMetadata, type 18 is MetadataPointer. A pointer is
//! followed once; a pointer found in the pointed-to account is ignored.

use log::debug;
use solana_program::pubkey::Pubkey;

use crate::error::{MetadataError, Result};
use crate::reader::ByteReader;
use crate::source::AccountSource;
use crate::Token;

pub const BASE_MINT_LEN: usize = 82;
pub const BASE_ACCOUNT_LEN: usize = 165;
const MINT_PADDING_LEN: usize = BASE_ACCOUNT_LEN - BASE_MINT_LEN;
const ACCOUNT_TYPE_MINT: u8 = 1;

pub const EXTENSION_UNINITIALIZED: u16 = 0;
pub const EXTENSION_METADATA_POINTER: u16 = 18;
pub const EXTENSION_TOKEN_METADATA: u16 = 19;

/// What a TLV scan turned up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TlvOutcome {
    Metadata(Token),
    Pointer(Pubkey),
}

/// Locate the TLV entries inside a Token-2022 mint account.
pub fn tlv_region(data: &[u8]) -> Result<&[u8]> {
    if data.len() <= BASE_MINT_LEN {
        return Err(MetadataError::UnrecognizedAccountLayout);
    }
    let rest = &data[BASE_MINT_LEN..];

    if rest.len() > MINT_PADDING_LEN
        && rest[..MINT_PADDING_LEN].iter().all(|b| *b == 0)
        && rest[MINT_PADDING_LEN] == ACCOUNT_TYPE_MINT
    {
        return Ok(&rest[MINT_PADDING_LEN + 1..]);
    }

    if rest[0] == ACCOUNT_TYPE_MINT {
        return Ok(&rest[1..]);
    }

    Err(MetadataError::UnrecognizedAccountLayout)
}

/// Walk TLV entries until TokenMetadata is found.
///
/// Returns the metadata pointer instead when the region holds a pointer but
/// no metadata, and `MetadataNotFound` when it holds neither.
pub fn scan_tlv_entries(tlv: &[u8], mint: &Pubkey) -> Result<TlvOutcome> {
    let mut r = ByteReader::new(tlv);
    let mut pointer = None;

    while r.remaining() > 0 {
        if r.remaining() < 4 {
            return Err(MetadataError::TruncatedTlv(format!(
                "truncated header ({} bytes remain)",
                r.remaining()
            )));
        }
        let (Some(ty), Some(len)) = (r.le16(), r.le16()) else {
            return Err(MetadataError::TruncatedTlv("unable to read header".to_string()));
        };
        if ty == EXTENSION_UNINITIALIZED {
            break;
        }
        let remaining = r.remaining();
        let value = r.bytes(usize::from(len)).ok_or_else(|| {
            MetadataError::TruncatedTlv(format!("length {} exceeds remaining {}", len, remaining))
        })?;

        match ty {
            EXTENSION_TOKEN_METADATA => {
                return decode_token_metadata(value, mint).map(TlvOutcome::Metadata);
            }
            EXTENSION_METADATA_POINTER => {
                if let Some(address) = decode_metadata_pointer(value) {
                    pointer = Some(address);
                }
            }
            _ => {}
        }
    }

    pointer
        .map(TlvOutcome::Pointer)
        .ok_or(MetadataError::MetadataNotFound)
}

/// Decode a TokenMetadata payload.
///
/// ```text
/// update_authority (32) | mint (32) | name | symbol | uri | u32 count | (key, value) * count
/// ```
///
/// Additional metadata pairs are read only to validate the payload.
pub fn decode_token_metadata(value: &[u8], mint: &Pubkey) -> Result<Token> {
    let mut r = ByteReader::new(value);
    r.bytes(32).ok_or(MetadataError::TruncatedMetadata {
        field: "update authority",
    })?;
    let found = r
        .pubkey()
        .ok_or(MetadataError::TruncatedMetadata { field: "mint" })?;
    if found != *mint {
        return Err(MetadataError::MintMismatch {
            expected: *mint,
            found,
        });
    }

    let name = r
        .borsh_string()
        .ok_or(MetadataError::TruncatedMetadata { field: "name" })?;
    let symbol = r
        .borsh_string()
        .ok_or(MetadataError::TruncatedMetadata { field: "symbol" })?;
    r.borsh_string()
        .ok_or(MetadataError::TruncatedMetadata { field: "uri" })?;

    let count = r.le32().ok_or(MetadataError::TruncatedMetadata {
        field: "additional metadata length",
    })?;
    for _ in 0..count {
        r.borsh_string().ok_or(MetadataError::TruncatedMetadata {
            field: "additional metadata key",
        })?;
        r.borsh_string().ok_or(MetadataError::TruncatedMetadata {
            field: "additional metadata value",
        })?;
    }

    Ok(Token::new(&name, &symbol))
}

/// Decode a MetadataPointer payload: authority (32) then metadata address
/// (32). The all-zero address means no pointer.
pub fn decode_metadata_pointer(value: &[u8]) -> Option<Pubkey> {
    let address = Pubkey::try_from(value.get(32..64)?).ok()?;
    if address == Pubkey::default() {
        return None;
    }
    Some(address)
}

/// Resolve metadata for a Token-2022 mint from its account bytes.
pub fn token2022_metadata<S: AccountSource>(source: &S, mint: &Pubkey, data: &[u8]) -> Result<Token> {
    let region = tlv_region(data)?;
    match scan_tlv_entries(region, mint)? {
        TlvOutcome::Metadata(token) => Ok(token),
        TlvOutcome::Pointer(pointer) => resolve_via_pointer(source, &pointer, mint),
    }
}

/// Follow a metadata pointer exactly once.
///
/// The target is read first as a bare TLV region and, when that finds no
/// metadata, as a bare TokenMetadata payload. Pointers inside the target
/// never trigger another fetch.
fn resolve_via_pointer<S: AccountSource>(source: &S, pointer: &Pubkey, mint: &Pubkey) -> Result<Token> {
    debug!("Following metadata pointer {} for mint {}", pointer, mint);
    let account = source
        .fetch_account(pointer)?
        .ok_or(MetadataError::AccountNotFound(*pointer))?;

    match scan_tlv_entries(&account.data, mint) {
        Ok(TlvOutcome::Metadata(token)) => Ok(token),
        Ok(TlvOutcome::Pointer(nested)) => {
            debug!("Ignoring nested metadata pointer {} in {}", nested, pointer);
            decode_token_metadata(&account.data, mint)
        }
        Err(MetadataError::MetadataNotFound) => decode_token_metadata(&account.data, mint),
        Err(e) => Err(e),
    }
}
