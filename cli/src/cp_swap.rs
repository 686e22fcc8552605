//! CP-swap program bindings: discriminators, swap instructions, PDAs

use solana_sdk::{
    hash::hash,
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};

/// Seed of the vault and LP mint authority PDA
pub const AUTH_SEED: &[u8] = b"vault_and_lp_mint_auth_seed";

/// Anchor instruction discriminator: first 8 bytes of sha256("global:<name>")
pub fn instruction_discriminator(name: &str) -> [u8; 8] {
    sighash("global", name)
}

/// Anchor account discriminator: first 8 bytes of sha256("account:<Name>")
pub fn account_discriminator(name: &str) -> [u8; 8] {
    sighash("account", name)
}

fn sighash(namespace: &str, name: &str) -> [u8; 8] {
    let preimage = format!("{}:{}", namespace, name);
    let mut out = [0u8; 8];
    out.copy_from_slice(&hash(preimage.as_bytes()).to_bytes()[..8]);
    out
}

/// Authority that owns the pool vaults
pub fn authority_address(program_id: &Pubkey) -> Pubkey {
    Pubkey::find_program_address(&[AUTH_SEED], program_id).0
}

/// Accounts shared by both swap instructions, in program order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapAccounts {
    pub payer: Pubkey,
    pub authority: Pubkey,
    pub amm_config: Pubkey,
    pub pool_state: Pubkey,
    pub input_token_account: Pubkey,
    pub output_token_account: Pubkey,
    pub input_vault: Pubkey,
    pub output_vault: Pubkey,
    pub input_token_program: Pubkey,
    pub output_token_program: Pubkey,
    pub input_token_mint: Pubkey,
    pub output_token_mint: Pubkey,
    pub observation_state: Pubkey,
}

impl SwapAccounts {
    fn to_account_metas(&self) -> Vec<AccountMeta> {
        vec![
            AccountMeta::new_readonly(self.payer, true),
            AccountMeta::new_readonly(self.authority, false),
            AccountMeta::new_readonly(self.amm_config, false),
            AccountMeta::new(self.pool_state, false),
            AccountMeta::new(self.input_token_account, false),
            AccountMeta::new(self.output_token_account, false),
            AccountMeta::new(self.input_vault, false),
            AccountMeta::new(self.output_vault, false),
            AccountMeta::new_readonly(self.input_token_program, false),
            AccountMeta::new_readonly(self.output_token_program, false),
            AccountMeta::new_readonly(self.input_token_mint, false),
            AccountMeta::new_readonly(self.output_token_mint, false),
            AccountMeta::new(self.observation_state, false),
        ]
    }
}

fn swap_instruction(program_id: &Pubkey, name: &str, accounts: &SwapAccounts, first: u64, second: u64) -> Instruction {
    let mut data = Vec::with_capacity(24);
    data.extend_from_slice(&instruction_discriminator(name));
    data.extend_from_slice(&first.to_le_bytes());
    data.extend_from_slice(&second.to_le_bytes());

    Instruction {
        program_id: *program_id,
        accounts: accounts.to_account_metas(),
        data,
    }
}

/// Exact input, bounded output
pub fn swap_base_input(
    program_id: &Pubkey,
    accounts: &SwapAccounts,
    amount_in: u64,
    minimum_amount_out: u64,
) -> Instruction {
    swap_instruction(program_id, "swap_base_input", accounts, amount_in, minimum_amount_out)
}

/// Exact output, bounded input
pub fn swap_base_output(
    program_id: &Pubkey,
    accounts: &SwapAccounts,
    max_amount_in: u64,
    amount_out: u64,
) -> Instruction {
    swap_instruction(program_id, "swap_base_output", accounts, max_amount_in, amount_out)
}
