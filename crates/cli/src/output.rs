//! Output formatting utilities

use advisor_lib::predictor::Valuation;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table, or a notice when there are none
pub fn print_table<T: Tabled>(rows: Vec<T>, empty_message: &str) {
    if rows.is_empty() {
        print_warning(empty_message);
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a section heading
pub fn print_heading(title: &str) {
    println!("\n{}", title.bold().underline());
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Group the digits of a non-negative integer the Indian way: the last
/// three digits, then pairs (`12,34,56,789`)
fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - 3);

    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), tail)
}

/// Format a number with Indian digit grouping and `decimals` fraction digits
pub fn format_indian(value: f64, decimals: usize) -> String {
    if !value.is_finite() {
        return "-".to_string();
    }
    let formatted = format!("{:.*}", decimals, value.abs());
    let (whole, fraction) = match formatted.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (formatted.as_str(), None),
    };

    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };
    match fraction {
        Some(fraction) => format!("{}{}.{}", sign, group_indian(whole), fraction),
        None => format!("{}{}", sign, group_indian(whole)),
    }
}

/// Whole rupees, e.g. `₹12,34,567`
pub fn format_rupees(amount: f64) -> String {
    format!("₹{}", format_indian(amount, 0))
}

/// An amount given in lakhs, e.g. `₹1,250.00 L`
pub fn format_lakhs(lakhs: f64) -> String {
    format!("₹{} L", format_indian(lakhs, 2))
}

/// Format a fraction in [0, 1] as a percentage
pub fn format_probability(probability: f64) -> String {
    format!("{:.1}%", probability * 100.0)
}

/// Format a value that is already a percentage
pub fn format_pct(pct: f64) -> String {
    format!("{:.1}%", pct)
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "true" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "false" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color the investment verdict for a classifier label
pub fn color_verdict(label: u8, verdict: &str) -> String {
    if label == 1 {
        verdict.green().bold().to_string()
    } else {
        verdict.red().bold().to_string()
    }
}

pub fn color_valuation(valuation: Valuation) -> String {
    let text = valuation.describe();
    match valuation {
        Valuation::Undervalued => text.green().to_string(),
        Valuation::Overvalued => text.red().to_string(),
        Valuation::FairlyPriced => text.yellow().to_string(),
    }
}
