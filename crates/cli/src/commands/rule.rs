//! `chatforge rule`: evaluate a trigger rule.

use chatforge_rules::{RuleError, parse_rule};
use std::io::Read;
use std::path::PathBuf;

fn context_text(text: Option<String>, file: Option<PathBuf>) -> Result<String, Box<dyn std::error::Error>> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()).into());
    }
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

/// Parse and evaluate `expr` against `text`.
pub fn check(expr: &str, text: &str) -> Result<bool, RuleError> {
    let rule = parse_rule(expr)?;
    tracing::debug!(?rule, "Parsed rule");
    Ok(rule.evaluate(text))
}

pub fn run(expr: &str, text: Option<String>, file: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let context = context_text(text, file)?;
    match check(expr, &context) {
        Ok(true) => println!("✅ match"),
        Ok(false) => println!("❌ no match"),
        Err(e) => {
            let kind = if e.is_pattern_error() { "Pattern" } else { "Syntax" };
            println!("⚠️  {kind} error: {e}");
            return Err(e.into());
        }
    }
    Ok(())
}
