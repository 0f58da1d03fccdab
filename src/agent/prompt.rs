//! System message assembly.

use super::definition::AgentConfig;
use chrono::{DateTime, Local};

/// Instruction list for a run, with the lines contributed by the agent's flags.
pub fn build_instructions(config: &AgentConfig, now: DateTime<Local>) -> Vec<String> {
    let mut instructions = config.instructions.clone();

    if config.markdown {
        instructions.push("Use markdown to format your answers.".to_string());
    }
    if config.add_datetime_to_instructions {
        instructions.push(format!(
            "The current time is {}",
            now.format("%Y-%m-%d %H:%M:%S")
        ));
    }
    if config.add_name_to_instructions {
        instructions.push(format!("Your name is: {}.", config.name));
    }

    instructions
}

/// Render the system message: description, role, then instructions.
pub fn build_system_message(config: &AgentConfig, now: DateTime<Local>) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(description) = config.description.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("{}\n", description));
    }

    if !config.role.is_empty() {
        lines.push(format!("Your role is: {}\n", config.role));
    }

    let instructions = build_instructions(config, now);
    match instructions.len() {
        0 => {}
        1 => {
            lines.push("## Instructions".to_string());
            lines.push(instructions[0].clone());
            lines.push(String::new());
        }
        _ => {
            lines.push("## Instructions".to_string());
            lines.extend(instructions.iter().map(|i| format!("- {}", i)));
            lines.push(String::new());
        }
    }

    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 11, 5, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_flags_add_instructions() {
        let config = AgentConfig::new("Joke Agent", "joke-agent", "joke_agent")
            .with_instructions(["Be funny."])
            .with_display_flags();

        let instructions = build_instructions(&config, fixed_now());
        assert_eq!(
            instructions,
            vec![
                "Be funny.".to_string(),
                "Use markdown to format your answers.".to_string(),
                "The current time is 2024-11-05 09:30:00".to_string(),
                "Your name is: Joke Agent.".to_string(),
            ]
        );
    }

    #[test]
    fn test_no_flags_keeps_instructions() {
        let config = AgentConfig::new("A", "a", "a").with_instructions(["Only this."]);
        assert_eq!(build_instructions(&config, fixed_now()), vec!["Only this."]);
    }

    #[test]
    fn test_system_message_order() {
        let config = AgentConfig::new("Finance Agent", "finance-agent", "finance_agent")
            .with_role("Provide financial data")
            .with_description("You provide financial data.")
            .with_instructions(["Use tables.", "Cite sources."]);

        let message = build_system_message(&config, fixed_now());
        let description = message.find("You provide financial data.").unwrap();
        let role = message.find("Your role is: Provide financial data").unwrap();
        let header = message.find("## Instructions").unwrap();
        assert!(description < role && role < header);
        assert!(message.contains("- Use tables.\n- Cite sources."));
    }

    #[test]
    fn test_single_instruction_not_bulleted() {
        let config = AgentConfig::new("A", "a", "a").with_instructions(["Only this."]);
        let message = build_system_message(&config, fixed_now());
        assert_eq!(message, "## Instructions\nOnly this.");
    }
}
