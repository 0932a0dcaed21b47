//! Prompt and command-line construction.

use std::process::Stdio;

use tokio::process::Command;

use crate::AgentSettings;

/// The task title, followed by a blank line and the description when present.
pub fn build_prompt(title: &str, description: Option<&str>) -> String {
    match description.map(str::trim).filter(|d| !d.is_empty()) {
        Some(description) => format!("{title}\n\n{description}"),
        None => title.to_string(),
    }
}

/// Arguments passed to the agent program, excluding the program itself.
pub fn build_args(settings: &AgentSettings, prompt: &str) -> Vec<String> {
    let mut args = vec![
        "-p".to_string(),
        prompt.to_string(),
        "--model".to_string(),
        settings.model.clone(),
        "--output-format".to_string(),
    ];
    if settings.stream_progress {
        args.push("stream-json".to_string());
        args.push("--verbose".to_string());
    } else {
        args.push("json".to_string());
    }
    for capability in &settings.capabilities {
        args.push("--allowedTools".to_string());
        args.push(capability.tool_name());
    }
    args
}

/// Builds the child command: own process group, null stdin, piped output and
/// the scrubbed environment.
pub(crate) fn build_command(settings: &AgentSettings, prompt: &str) -> Command {
    let mut command = Command::new(&settings.program);
    command
        .args(build_args(settings, prompt))
        .current_dir(&settings.workdir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .process_group(0)
        .kill_on_drop(true);
    for var in &settings.stripped_env {
        command.env_remove(var);
    }
    command
}

#[cfg(test)]
mod tests {
    use std::ffi::OsStr;

    use super::*;
    use crate::Capability;

    #[test]
    fn prompt_is_title_then_description() {
        assert_eq!(build_prompt("Write X", None), "Write X");
        assert_eq!(build_prompt("Write X", Some("  ")), "Write X");
        assert_eq!(
            build_prompt("Write X", Some("in French")),
            "Write X\n\nin French"
        );
    }

    #[test]
    fn args_request_json_and_list_capabilities() {
        let mut settings = AgentSettings::new("/tmp");
        settings.capabilities = vec![Capability::FileRead, Capability::Shell {
            prefix: "uv run".into(),
        }];
        let args = build_args(&settings, "do it");
        assert_eq!(
            args,
            vec![
                "-p",
                "do it",
                "--model",
                "sonnet",
                "--output-format",
                "json",
                "--allowedTools",
                "Read",
                "--allowedTools",
                "Bash(uv run:*)",
            ]
        );
    }

    #[test]
    fn streaming_switches_output_format() {
        let mut settings = AgentSettings::new("/tmp");
        settings.capabilities.clear();
        settings.stream_progress = true;
        let args = build_args(&settings, "p");
        assert_eq!(&args[4..], ["--output-format", "stream-json", "--verbose"]);
    }

    #[test]
    fn stripped_variables_are_removed() {
        let mut settings = AgentSettings::new("/tmp");
        settings.stripped_env.push("TODOIST_API_TOKEN".into());
        let command = build_command(&settings, "p");
        let removed: Vec<&OsStr> = command
            .as_std()
            .get_envs()
            .filter(|(_, value)| value.is_none())
            .map(|(key, _)| key)
            .collect();
        for var in ["ANTHROPIC_API_KEY", "CLAUDECODE", "TODOIST_API_TOKEN"] {
            assert!(removed.contains(&OsStr::new(var)), "{var} not removed");
        }
    }
}
