//! Account fixtures shared by the decoder tests

use std::cell::RefCell;
use std::collections::HashMap;

use solana_program::pubkey::Pubkey;

use crate::error::Result;
use crate::source::{AccountData, AccountSource};
use crate::token2022::{BASE_ACCOUNT_LEN, BASE_MINT_LEN};
use crate::TOKEN_2022_PROGRAM_ID;

/// In-memory ledger that records every address it is asked for
#[derive(Default)]
pub struct MockSource {
    accounts: HashMap<Pubkey, AccountData>,
    fetched: RefCell<Vec<Pubkey>>,
}

impl MockSource {
    pub fn insert(&mut self, address: Pubkey, data: Vec<u8>) {
        self.insert_owned(address, TOKEN_2022_PROGRAM_ID, data);
    }

    pub fn insert_owned(&mut self, address: Pubkey, owner: Pubkey, data: Vec<u8>) {
        self.accounts.insert(address, AccountData { owner, data });
    }

    pub fn fetched(&self) -> Vec<Pubkey> {
        self.fetched.borrow().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.borrow().len()
    }
}

impl AccountSource for MockSource {
    fn fetch_account(&self, address: &Pubkey) -> Result<Option<AccountData>> {
        self.fetched.borrow_mut().push(*address);
        Ok(self.accounts.get(address).cloned())
    }
}

fn borsh_string(out: &mut Vec<u8>, s: &str) {
    out.extend_from_slice(&(s.len() as u32).to_le_bytes());
    out.extend_from_slice(s.as_bytes());
}

/// Base mint record: no authority, supply 0, 9 decimals, initialized
fn base_mint() -> Vec<u8> {
    let mut data = vec![0u8; BASE_MINT_LEN];
    data[44] = 9;
    data[45] = 1;
    data
}

pub fn metaplex_account(name: &str, symbol: &str) -> Vec<u8> {
    let mut data = vec![4u8];
    data.extend_from_slice(&[7u8; 32]);
    data.extend_from_slice(&[9u8; 32]);
    borsh_string(&mut data, name);
    borsh_string(&mut data, symbol);
    borsh_string(&mut data, "https://example.com/meta.json");
    data
}

pub fn token_metadata_value(mint: &Pubkey, name: &str, symbol: &str, extra: &[(&str, &str)]) -> Vec<u8> {
    let mut value = vec![5u8; 32];
    value.extend_from_slice(mint.as_ref());
    borsh_string(&mut value, name);
    borsh_string(&mut value, symbol);
    borsh_string(&mut value, "https://example.com/token.json");
    value.extend_from_slice(&(extra.len() as u32).to_le_bytes());
    for (key, val) in extra {
        borsh_string(&mut value, key);
        borsh_string(&mut value, val);
    }
    value
}

pub fn pointer_value(address: &Pubkey) -> Vec<u8> {
    let mut value = vec![3u8; 32];
    value.extend_from_slice(address.as_ref());
    value
}

pub fn tlv_entry(ty: u16, value: &[u8]) -> Vec<u8> {
    let mut entry = ty.to_le_bytes().to_vec();
    entry.extend_from_slice(&(value.len() as u16).to_le_bytes());
    entry.extend_from_slice(value);
    entry
}

/// Mint promoted to account length: base, zero padding, account type, TLV
pub fn padded_mint(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut data = base_mint();
    data.resize(BASE_ACCOUNT_LEN, 0);
    data.push(1);
    data.extend(entries.iter().flatten());
    data
}

/// Base mint directly followed by the account type and TLV
pub fn unpadded_mint(entries: &[Vec<u8>]) -> Vec<u8> {
    let mut data = base_mint();
    data.push(1);
    data.extend(entries.iter().flatten());
    data
}
