//! Terminal prompts and the interactive loop

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use colored::Colorize;

use crate::client::Addr;
use crate::intent::{IntentError, ResolvedIntent};
use crate::session::{Quote, Session};

/// Ask until the answer is yes or no. EOF is an error.
pub fn ask_yes_no<R: BufRead, W: Write>(input: &mut R, output: &mut W, question: &str) -> Result<bool> {
    loop {
        write!(output, "{} [y/n]: ", question)?;
        output.flush()?;

        let mut answer = String::new();
        if input.read_line(&mut answer).context("Failed to read answer")? == 0 {
            anyhow::bail!("No answer to: {}", question);
        }
        match answer.trim().to_lowercase().as_str() {
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            _ => writeln!(output, "Please answer y or n.")?,
        }
    }
}

/// Quote `line`. An unknown symbol with a single unresolved leg asks the
/// user to confirm the mapping and re-resolves once.
pub async fn quote_with_mapping<R: BufRead, W: Write>(
    session: &mut Session,
    line: &str,
    input: &mut R,
    output: &mut W,
) -> Result<Quote> {
    let quote = session.quote(line).await?;
    let mapping = match &quote.outcome {
        Err(IntentError::MissingSymbolMapping {
            symbol,
            candidate_mint,
        }) => Some((symbol.clone(), *candidate_mint)),
        _ => None,
    };
    let Some((symbol, mint)) = mapping else {
        return Ok(quote);
    };

    let question = format!(
        "Symbol {} is unknown. Map it to mint {} ({})?",
        symbol,
        mint,
        Addr(&mint)
    );
    if !ask_yes_no(input, output, &question)? {
        anyhow::bail!("Symbol {} remains unmapped; aborting", symbol);
    }
    session.map_symbol(&symbol, mint);
    session.quote(line).await
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Intent(String),
    Slippage(f64),
    Go,
    Help,
    Quit,
    Empty,
}

pub fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let command = match words.next().map(str::to_lowercase).as_deref() {
        None => Command::Empty,
        Some("quit") | Some("exit") | Some("q") => Command::Quit,
        Some("help") | Some("?") => Command::Help,
        Some("go") => Command::Go,
        Some("slippage") => {
            let value = words.next().context("Usage: slippage <percent>")?;
            let pct = value
                .trim_end_matches('%')
                .parse::<f64>()
                .with_context(|| format!("Invalid slippage: {}", value))?;
            Command::Slippage(pct)
        }
        Some(_) => Command::Intent(line.to_string()),
    };
    Ok(command)
}

fn print_help<W: Write>(output: &mut W) -> Result<()> {
    writeln!(output, "{}", "Commands:".bright_green().bold())?;
    writeln!(output, "  <verb> <amount> <symbol>  quote an intent (pay/sell/swap, buy/get)")?;
    writeln!(output, "  slippage <percent>        set slippage tolerance")?;
    writeln!(output, "  go                        send the last quoted swap")?;
    writeln!(output, "  quit                      leave")?;
    Ok(())
}

/// Line-oriented loop: quote intents against fresh reserves, send on `go`
pub async fn run_interactive<R: BufRead, W: Write>(
    session: &mut Session,
    input: &mut R,
    output: &mut W,
) -> Result<()> {
    print_help(output)?;
    let mut last: Option<ResolvedIntent> = None;

    loop {
        write!(output, "{} ", ">".bright_cyan())?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let command = match parse_command(&line) {
            Ok(command) => command,
            Err(e) => {
                writeln!(output, "{}", e.to_string().red())?;
                continue;
            }
        };
        match command {
            Command::Empty => {}
            Command::Quit => break,
            Command::Help => print_help(output)?,
            Command::Slippage(pct) => match session.set_slippage(pct) {
                Ok(()) => writeln!(output, "{} {}%", "Slippage set to".bright_cyan(), pct)?,
                Err(e) => writeln!(output, "{}", e.to_string().red())?,
            },
            Command::Go => {
                let Some(intent) = last.take() else {
                    writeln!(output, "{}", "No quoted swap to send".yellow())?;
                    continue;
                };
                if !ask_yes_no(input, output, &format!("Send swap \"{}\"?", intent.instruction))? {
                    writeln!(output, "{}", "Swap cancelled".dimmed())?;
                    continue;
                }
                match session.execute(&intent).await {
                    Ok(summary) => writeln!(output, "{}", summary.render(session.network()))?,
                    Err(e) => writeln!(output, "{} {:#}", "Swap failed:".red(), e)?,
                }
            }
            Command::Intent(text) => match quote_with_mapping(session, &text, input, output).await {
                Ok(quote) => {
                    writeln!(output, "{}", quote.report)?;
                    last = quote.outcome.ok();
                }
                Err(e) => {
                    writeln!(output, "{}", format!("{:#}", e).red())?;
                    last = None;
                }
            },
        }
    }
    Ok(())
}
