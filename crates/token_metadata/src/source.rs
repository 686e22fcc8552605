use solana_program::pubkey::Pubkey;

use crate::error::Result;

/// Raw account as returned by the ledger
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountData {
    pub owner: Pubkey,
    pub data: Vec<u8>,
}

/// Anything that can fetch account bytes by address.
///
/// `Ok(None)` means the account does not exist.
pub trait AccountSource {
    fn fetch_account(&self, address: &Pubkey) -> Result<Option<AccountData>>;
}

impl<S: AccountSource + ?Sized> AccountSource for &S {
    fn fetch_account(&self, address: &Pubkey) -> Result<Option<AccountData>> {
        (**self).fetch_account(address)
    }
}
