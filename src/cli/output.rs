//! CLI output formatting utilities.

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print one registered agent.
    pub fn agent_info(name: &str, agent_id: &str, model: &str, tools: &[&str]) {
        let tools = if tools.is_empty() {
            "no tools".to_string()
        } else {
            tools.join(", ")
        };
        println!(
            "  {} {} ({}, {}, {})",
            style("*").cyan(),
            style(name).bold(),
            style(agent_id).dim(),
            model,
            tools
        );
    }

    /// Print one stored session.
    pub fn session_info(title: &str, session_id: &str, runs: usize, updated: &str) {
        println!(
            "  {} {} ({}, {} runs, {})",
            style("*").cyan(),
            style(content_preview(title, 60)).bold(),
            style(session_id).dim(),
            runs,
            updated
        );
    }

    /// Print an agent answer.
    pub fn agent_reply(name: &str, content: &str) {
        println!("\n{} {}\n", style(format!("{}:", name)).cyan().bold(), content);
    }

    /// Dimmed text for secondary details.
    pub fn dim(msg: &str) -> String {
        style(msg).dim().to_string()
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(spinner_style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(spinner_style);
        }
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

/// Truncate content with ellipsis.
fn content_preview(content: &str, max_chars: usize) -> String {
    let content = content.replace('\n', " ");
    if content.chars().count() <= max_chars {
        content
    } else {
        let truncated: String = content.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}
