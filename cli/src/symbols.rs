//! Per-session mint <-> symbol directory

use std::collections::{BTreeMap, HashMap, HashSet};

use log::{debug, warn};
use solana_sdk::pubkey::Pubkey;
use token_metadata::{token_metadata, AccountSource};

use crate::client::Addr;
use crate::intent::IntentError;

/// Characters of the mint address used when a mint has no symbol
const FALLBACK_SYMBOL_LEN: usize = 4;

/// Uppercase a raw on-chain symbol and drop NULs and inner whitespace
pub fn normalize_symbol(raw: &str) -> String {
    raw.trim()
        .trim_matches('\0')
        .chars()
        .filter(|c| *c != ' ' && *c != '\t')
        .collect::<String>()
        .to_uppercase()
}

#[derive(Debug, Clone, Default)]
pub struct SymbolDirectory {
    mint_to_symbol: HashMap<Pubkey, String>,
    symbol_to_mint: BTreeMap<String, Pubkey>,
    /// Mints whose symbol is a fallback derived from the address
    unresolved: HashSet<Pubkey>,
}

impl SymbolDirectory {
    /// Look up metadata for every mint. Lookup failures are logged and the
    /// mint falls back to a symbol cut from its address.
    pub fn build<S: AccountSource>(source: &S, mints: &[Pubkey]) -> Self {
        let mut directory = Self::default();
        for mint in mints {
            let symbol = match token_metadata(source, mint) {
                Ok(token) => {
                    debug!("Mint {} is {} ({})", mint, token.symbol, token.name);
                    token.symbol
                }
                Err(e) => {
                    warn!("Failed to fetch metadata for mint {}: {}", Addr(mint), e);
                    String::new()
                }
            };
            directory.record(*mint, &symbol);
        }
        directory
    }

    /// Record the on-chain symbol for `mint`
    pub fn record(&mut self, mint: Pubkey, raw_symbol: &str) {
        let mut symbol = normalize_symbol(raw_symbol);
        if symbol.is_empty() {
            self.unresolved.insert(mint);
            symbol = normalize_symbol(&mint.to_string()[..FALLBACK_SYMBOL_LEN]);
        }
        self.symbol_to_mint.insert(symbol.clone(), mint);
        self.mint_to_symbol.insert(mint, symbol);
    }

    /// Bind a user-confirmed symbol to `mint`. The only way a mint leaves the
    /// unresolved set.
    pub fn map_symbol(&mut self, symbol: &str, mint: Pubkey) {
        let symbol = normalize_symbol(symbol);
        self.unresolved.remove(&mint);
        if let Some(previous) = self.mint_to_symbol.get(&mint) {
            if self.symbol_to_mint.get(previous) == Some(&mint) {
                self.symbol_to_mint.remove(previous);
            }
        }
        self.symbol_to_mint.insert(symbol.clone(), mint);
        self.mint_to_symbol.insert(mint, symbol);
    }

    pub fn symbol_for(&self, mint: &Pubkey) -> Option<&str> {
        self.mint_to_symbol.get(mint).map(String::as_str)
    }

    /// Symbol for display, or the truncated address when none is known
    pub fn display_symbol(&self, mint: &Pubkey) -> String {
        match self.symbol_for(mint) {
            Some(symbol) if !symbol.is_empty() => symbol.to_string(),
            _ => Addr(mint).to_string(),
        }
    }

    pub fn is_resolved(&self, mint: &Pubkey) -> bool {
        !self.unresolved.contains(mint)
    }

    /// The single unresolved mint, if exactly one exists
    pub fn unresolved_candidate(&self) -> Option<Pubkey> {
        let mut iter = self.unresolved.iter();
        match (iter.next(), iter.next()) {
            (Some(mint), None) => Some(*mint),
            _ => None,
        }
    }

    /// Known symbols, sorted
    pub fn available_symbols(&self) -> Vec<String> {
        self.symbol_to_mint.keys().cloned().collect()
    }

    pub fn mint_for_symbol(&self, symbol: &str) -> Result<Pubkey, IntentError> {
        let key = normalize_symbol(symbol);
        if key.is_empty() {
            return Err(IntentError::MalformedIntent(symbol.to_string()));
        }
        if let Some(mint) = self.symbol_to_mint.get(&key) {
            return Ok(*mint);
        }
        match self.unresolved_candidate() {
            Some(candidate_mint) => Err(IntentError::MissingSymbolMapping {
                symbol: key,
                candidate_mint,
            }),
            None => Err(IntentError::UnknownSymbol {
                symbol: key,
                available: self.available_symbols(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use token_metadata::{AccountData, MetadataError};

    /// Answers every fetch with "not found"
    struct EmptySource {
        fetched: RefCell<Vec<Pubkey>>,
    }

    impl AccountSource for EmptySource {
        fn fetch_account(&self, address: &Pubkey) -> token_metadata::Result<Option<AccountData>> {
            self.fetched.borrow_mut().push(*address);
            Ok(None)
        }
    }

    /// Answers every fetch with an RPC failure
    struct FailingSource;

    impl AccountSource for FailingSource {
        fn fetch_account(&self, address: &Pubkey) -> token_metadata::Result<Option<AccountData>> {
            Err(MetadataError::Fetch {
                address: *address,
                reason: "connection refused".to_string(),
            })
        }
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("  usdc "), "USDC");
        assert_eq!(normalize_symbol("W SOL\0\0"), "WSOL");
        assert_eq!(normalize_symbol("\tray\t"), "RAY");
        assert_eq!(normalize_symbol("\0\0"), "");
    }

    #[test]
    fn test_record_and_lookup() {
        let (sol, usdc) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut dir = SymbolDirectory::default();
        dir.record(sol, "sol");
        dir.record(usdc, "USDC\0");

        assert_eq!(dir.symbol_for(&sol), Some("SOL"));
        assert_eq!(dir.mint_for_symbol("usdc").unwrap(), usdc);
        assert_eq!(dir.available_symbols(), vec!["SOL", "USDC"]);
        assert!(dir.is_resolved(&usdc));
        assert_eq!(dir.unresolved_candidate(), None);
    }

    #[test]
    fn test_fallback_symbol_from_address() {
        let mint = Pubkey::new_unique();
        let mut dir = SymbolDirectory::default();
        dir.record(mint, "  ");

        let expected = mint.to_string()[..4].to_uppercase();
        assert_eq!(dir.symbol_for(&mint), Some(expected.as_str()));
        assert_eq!(dir.mint_for_symbol(&expected).unwrap(), mint);
        assert!(!dir.is_resolved(&mint));
        assert_eq!(dir.unresolved_candidate(), Some(mint));
    }

    #[test]
    fn test_unknown_symbol_vs_missing_mapping() {
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());

        let mut dir = SymbolDirectory::default();
        dir.record(a, "AAA");
        dir.record(b, "BBB");
        assert_eq!(
            dir.mint_for_symbol("CCC"),
            Err(IntentError::UnknownSymbol {
                symbol: "CCC".to_string(),
                available: vec!["AAA".to_string(), "BBB".to_string()],
            })
        );

        dir.record(b, "");
        assert_eq!(
            dir.mint_for_symbol("ccc"),
            Err(IntentError::MissingSymbolMapping {
                symbol: "CCC".to_string(),
                candidate_mint: b,
            })
        );

        // Two unresolved mints are ambiguous
        let mut both = SymbolDirectory::default();
        both.record(a, "");
        both.record(b, "");
        assert!(matches!(
            both.mint_for_symbol("CCC"),
            Err(IntentError::UnknownSymbol { .. })
        ));
    }

    #[test]
    fn test_map_symbol_resolves_candidate() {
        let (a, b) = (Pubkey::new_unique(), Pubkey::new_unique());
        let mut dir = SymbolDirectory::default();
        dir.record(a, "AAA");
        dir.record(b, "");

        let fallback = dir.symbol_for(&b).unwrap().to_string();

        dir.map_symbol("bonk", b);
        assert!(dir.is_resolved(&b));
        assert!(matches!(
            dir.mint_for_symbol(&fallback),
            Err(IntentError::UnknownSymbol { .. })
        ));
        assert_eq!(dir.available_symbols(), vec!["AAA", "BONK"]);
        assert_eq!(dir.unresolved_candidate(), None);
        assert_eq!(dir.mint_for_symbol("BONK").unwrap(), b);
        assert_eq!(dir.display_symbol(&b), "BONK");
    }

    #[test]
    fn test_display_symbol_falls_back_to_address() {
        let mint = Pubkey::new_unique();
        let dir = SymbolDirectory::default();
        assert_eq!(dir.display_symbol(&mint), Addr(&mint).to_string());
    }

    #[test]
    fn test_build_degrades_on_metadata_failure() {
        let mints = [Pubkey::new_unique(), Pubkey::new_unique()];

        let source = EmptySource {
            fetched: RefCell::new(Vec::new()),
        };
        let dir = SymbolDirectory::build(&source, &mints);
        assert_eq!(source.fetched.borrow().as_slice(), &mints);
        assert!(!dir.is_resolved(&mints[0]));
        assert!(!dir.is_resolved(&mints[1]));

        let dir = SymbolDirectory::build(&FailingSource, &mints);
        assert!(dir.symbol_for(&mints[0]).is_some());
        assert!(dir.symbol_for(&mints[1]).is_some());
        assert_eq!(dir.unresolved_candidate(), None);
    }
}
