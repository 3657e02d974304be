//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a rounded table, or a note when there is nothing to show
pub fn print_table<T: Tabled>(items: &[T]) {
    if items.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(items).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "=".repeat(50));
}

pub fn format_currency(amount: f64) -> String {
    format!("${:.4}", amount)
}

pub fn format_watts(watts: f64) -> String {
    format!("{:.1} W", watts)
}

pub fn format_percent(fraction: f64) -> String {
    format!("{:.0}%", fraction * 100.0)
}

/// Color a [0, 1] score: green from 0.8, yellow from 0.6, red below
pub fn color_score(score: f64) -> String {
    let formatted = format!("{:.3}", score);
    if score >= 0.8 {
        formatted.green().to_string()
    } else if score >= 0.6 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

pub fn format_duration_secs(secs: u64) -> String {
    if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1.5), "$1.5000");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(0.8), "80%");
    }

    #[test]
    fn test_format_duration_secs() {
        assert_eq!(format_duration_secs(300), "5m");
        assert_eq!(format_duration_secs(90), "90s");
    }
}
