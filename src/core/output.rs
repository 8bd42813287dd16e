//! Unified output formatting utilities for consistent CLI presentation.
//!
//! # Design Principles
//! - **Consistent color scheme**: Red for errors, green for success, yellow for warnings
//! - **Standardized spacing**: Newline before each block of output

use colored::*;

/// Formats and prints an error message with consistent styling
///
/// # Format
/// ```text
///
/// ✕ Error: <message>
///
/// ```
pub fn print_error(message: &str) {
    println!("\n{} {}\n", "✕ Error:".red(), message.white());
}

/// Formats and prints a success message with consistent styling
///
/// # Colors
/// - Checkmark in green, message in white
pub fn print_success(message: &str) {
    println!("\n{} {}", "✓".green(), message.white());
}

pub fn print_warning(message: &str) {
    println!("\n{} {}", "!".yellow(), message.white());
}

/// Formats and prints an informational message with consistent styling
pub fn print_info(message: &str) {
    println!("\n{}\n", message.white());
}

/// Formats and prints a section header with consistent styling
///
/// # Format
/// ```text
///
/// <header>:
///
/// ```
pub fn print_section_header(header: &str) {
    println!("\n{}:\n", header.white());
}

/// One line per applied fix: `  ✓ key  detail` or `  ✕ key  error`
pub fn print_fix_line(key: &str, outcome: Result<&str, String>) {
    match outcome {
        Ok(detail) => println!("  {} {}  {}", "✓".green(), key.white(), detail.bright_black()),
        Err(error) => println!("  {} {}  {}", "✕".red(), key.white(), error.red()),
    }
}
