//! Pool reports and swap summaries

use std::fmt::Write;

use amm_model::{to_display_string, BigUint, ReserveSnapshot};
use chrono::{DateTime, Utc};
use colored::Colorize;
use solana_sdk::{pubkey::Pubkey, signature::Signature};

use crate::client::Addr;
use crate::intent::{Direction, IntentError, ResolvedIntent};
use crate::pool::PoolInfo;
use crate::symbols::SymbolDirectory;

const COLUMN_WIDTH: usize = 28;

fn trim_fraction(formatted: &str) -> String {
    if !formatted.contains('.') {
        return formatted.to_string();
    }
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Fee rate in ppm as a percentage, e.g. `2500` -> `0.25%`
pub fn format_fee_rate(ppm: u64) -> String {
    // ppm / 1e6 * 100 == ppm / 1e4
    let formatted = to_display_string(Some(&BigUint::from(ppm)), 4, 6);
    format!("{}%", trim_fraction(&formatted))
}

pub fn format_percent(pct: f64) -> String {
    format!("{}%", trim_fraction(&format!("{:.6}", pct)))
}

/// Display precision follows the token decimals, clamped to [2, 8]
pub fn format_token_amount(amount: Option<&BigUint>, decimals: u8, symbol: &str) -> String {
    match amount {
        Some(amount) => {
            let precision = decimals.clamp(2, 8) as usize;
            format!("{} {}", to_display_string(Some(amount), decimals, precision), symbol)
        }
        None => "n/a".to_string(),
    }
}

pub fn format_lamports(lamports: u64) -> String {
    format!(
        "{} SOL",
        to_display_string(Some(&BigUint::from(lamports)), 9, 9)
    )
}

fn row(out: &mut String, label: &str, left: &str, right: &str) {
    row_styled(out, label, left, right, |cell| cell.to_string());
}

/// Cells are padded before `style` runs so escape codes never count
/// toward the column width.
fn row_styled(out: &mut String, label: &str, left: &str, right: &str, style: impl Fn(&str) -> String) {
    let label = format!("{:<12}", format!("{}:", label));
    let left = format!("{:<width$}", left, width = COLUMN_WIDTH);
    let _ = writeln!(out, "{} {} {}", label.bright_cyan(), style(&left), style(right));
}

/// Pool state plus the outcome of resolving one intent against it
pub struct PoolReport<'a> {
    pub pool: &'a PoolInfo,
    pub directory: &'a SymbolDirectory,
    pub reserves: &'a [ReserveSnapshot],
    pub slippage_pct: f64,
}

impl PoolReport<'_> {
    pub fn render(&self, outcome: Option<&Result<ResolvedIntent, IntentError>>) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{}",
            format!("=== CP-Swap Pool {} ===", Addr(&self.pool.address))
                .bright_green()
                .bold()
        );
        row(&mut out, "", "Token 0", "Token 1");

        let [mint0, mint1] = self.pool.mints();
        let symbol = |mint: &Pubkey| {
            let symbol = self.directory.display_symbol(mint);
            if self.directory.is_resolved(mint) {
                symbol
            } else {
                format!("{} (no metadata)", symbol)
            }
        };
        row(&mut out, "Symbol", &symbol(&mint0), &symbol(&mint1));
        row(&mut out, "Mint", &Addr(&mint0).to_string(), &Addr(&mint1).to_string());

        let cell = |idx: usize, f: &dyn Fn(&ReserveSnapshot) -> String| {
            self.reserves.get(idx).map(f).unwrap_or_else(|| "n/a".to_string())
        };
        let balance = |r: &ReserveSnapshot| {
            to_display_string(Some(&r.balance), r.decimals, r.decimals as usize)
        };
        let decimals = |r: &ReserveSnapshot| r.decimals.to_string();
        row(&mut out, "Balance", &cell(0, &balance), &cell(1, &balance));
        row(&mut out, "Decimals", &cell(0, &decimals), &cell(1, &decimals));

        let fee = format_fee_rate(self.pool.trade_fee_rate);
        row(&mut out, "Trade fee", &fee, &fee);
        row(&mut out, "Slippage", &format_percent(self.slippage_pct), "");

        match outcome {
            Some(Ok(intent)) => self.render_intent(&mut out, intent),
            Some(Err(e)) => {
                let _ = writeln!(out, "{} {}", "Intent:".bright_cyan(), format!("failed: {}", e).red());
            }
            None => {}
        }
        out
    }

    fn render_intent(&self, out: &mut String, intent: &ResolvedIntent) {
        let target = intent.target_leg();
        let counter = intent.counter_leg();
        let target_symbol = self.directory.display_symbol(&target.mint);
        let counter_symbol = self.directory.display_symbol(&counter.mint);

        let intent_text = format!(
            "{} {} {}",
            intent.instruction.verb, intent.instruction.amount, target_symbol
        );
        let counter_amount = format_token_amount(
            Some(&intent.amounts.quote_amount),
            counter.decimals,
            &counter_symbol,
        );
        let (counter_text, bound_label, bound) = match intent.instruction.direction {
            Direction::Sell => (
                format!("receiving {}", counter_amount),
                "Min out",
                intent.amounts.min_amount_out.as_ref(),
            ),
            Direction::Buy => (
                format!("paying {}", counter_amount),
                "Max in",
                intent.amounts.max_amount_in.as_ref(),
            ),
        };
        let bound_text = format_token_amount(bound, counter.decimals, &counter_symbol);

        let target_first = self.pool.leg_index(&target.mint) == Some(0);
        let (left, right) = if target_first {
            (intent_text.as_str(), counter_text.as_str())
        } else {
            (counter_text.as_str(), intent_text.as_str())
        };
        row_styled(out, "Intent", left, right, |cell| cell.bold().to_string());
        let _ = writeln!(out, "{} {}", format!("{}:", bound_label).bright_cyan(), bound_text);
    }
}

/// Outcome of a sent swap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxSummary {
    pub signature: Signature,
    pub status: String,
    pub block_time: Option<DateTime<Utc>>,
    pub fee_lamports: Option<u64>,
    pub paid: Option<BigUint>,
    pub paid_decimals: u8,
    pub paid_symbol: String,
    pub received: Option<BigUint>,
    pub received_decimals: u8,
    pub received_symbol: String,
}

impl TxSummary {
    pub fn render(&self, network: &str) -> String {
        let mut out = String::new();
        let status = if self.status.is_empty() {
            "PENDING".to_string()
        } else {
            self.status.to_uppercase()
        };
        let status = match status.as_str() {
            "FAILED" => status.red().bold(),
            "PENDING" => status.yellow(),
            _ => status.bright_green().bold(),
        };
        let fee = self
            .fee_lamports
            .filter(|fee| *fee > 0)
            .map(format_lamports)
            .unwrap_or_else(|| "n/a".to_string());

        let _ = writeln!(out, "{}", "=== Swap Result ===".bright_green().bold());
        let _ = writeln!(
            out,
            "{} {}",
            "Signature:".bright_cyan(),
            crate::client::format_signature(&self.signature, network)
        );
        let _ = writeln!(out, "{} {}", "Status:".bright_cyan(), status);
        let _ = writeln!(
            out,
            "{} {}",
            "Block time:".bright_cyan(),
            self.block_time
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| "n/a".to_string())
        );
        let _ = writeln!(
            out,
            "{} {}",
            "Paid:".bright_cyan(),
            format_token_amount(self.paid.as_ref(), self.paid_decimals, &self.paid_symbol)
        );
        let _ = writeln!(
            out,
            "{} {}",
            "Received:".bright_cyan(),
            format_token_amount(
                self.received.as_ref(),
                self.received_decimals,
                &self.received_symbol
            )
        );
        let _ = writeln!(out, "{} {}", "Fee:".bright_cyan(), fee);
        out
    }
}
