//! Shell completion scripts.
//!
//! The clap command tree lives with the argument definitions in `main`, so
//! callers pass it in and this module only picks the shell and renders.

use crate::error::{AutoPrError, Result};
use clap::Command;
use clap_complete::{generate, Shell};

/// Shells accepted by `auto-pr completions`.
pub const SUPPORTED_SHELLS: &[&str] = &["bash", "zsh", "fish"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellType {
    Bash,
    Zsh,
    Fish,
}

impl ShellType {
    pub fn to_clap_shell(self) -> Shell {
        match self {
            ShellType::Bash => Shell::Bash,
            ShellType::Zsh => Shell::Zsh,
            ShellType::Fish => Shell::Fish,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ShellType::Bash => "bash",
            ShellType::Zsh => "zsh",
            ShellType::Fish => "fish",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "bash" => Ok(ShellType::Bash),
            "zsh" => Ok(ShellType::Zsh),
            "fish" => Ok(ShellType::Fish),
            other => Err(AutoPrError::Config(format!(
                "Unsupported shell: '{}'. Supported shells are: {}",
                other,
                SUPPORTED_SHELLS.join(", ")
            ))),
        }
    }
}

impl std::fmt::Display for ShellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the user's shell from the `$SHELL` environment variable.
pub fn detect_shell() -> Result<ShellType> {
    let shell_path = std::env::var("SHELL").map_err(|_| {
        AutoPrError::Config(
            "$SHELL is not set. Pass the shell explicitly, e.g. `auto-pr completions zsh`."
                .to_string(),
        )
    })?;
    parse_shell_from_path(&shell_path)
}

/// Shell type from a path such as `/usr/local/bin/fish`.
pub fn parse_shell_from_path(shell_path: &str) -> Result<ShellType> {
    let shell_name = std::path::Path::new(shell_path)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(shell_path);
    ShellType::from_name(shell_name)
}

/// Render the completion script for `cmd`.
pub fn generate_completion_script(shell: ShellType, cmd: &mut Command) -> String {
    let name = cmd.get_name().to_string();
    let mut buf = Vec::new();
    generate(shell.to_clap_shell(), cmd, name, &mut buf);
    String::from_utf8(buf).unwrap_or_default()
}

/// Print the completion script for `cmd` to stdout.
pub fn print_completion_script(shell: ShellType, cmd: &mut Command) {
    print!("{}", generate_completion_script(shell, cmd));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_cli() -> Command {
        Command::new("auto-pr")
            .subcommand(Command::new("merge-pr").arg(clap::Arg::new("yes").long("yes")))
            .subcommand(Command::new("status"))
    }

    #[test]
    fn test_shell_from_name() {
        assert_eq!(ShellType::from_name("bash").unwrap(), ShellType::Bash);
        assert_eq!(ShellType::from_name("ZSH").unwrap(), ShellType::Zsh);
        assert!(ShellType::from_name("powershell").is_err());
    }

    #[test]
    fn test_parse_shell_from_path() {
        assert_eq!(parse_shell_from_path("/bin/zsh").unwrap(), ShellType::Zsh);
        assert_eq!(
            parse_shell_from_path("/usr/local/bin/fish").unwrap(),
            ShellType::Fish
        );
        assert_eq!(parse_shell_from_path("bash").unwrap(), ShellType::Bash);

        let err = parse_shell_from_path("/bin/tcsh").unwrap_err();
        assert!(err.to_string().contains("tcsh"));
    }

    #[test]
    fn test_generated_script_mentions_subcommands() {
        for shell in [ShellType::Bash, ShellType::Zsh, ShellType::Fish] {
            let script = generate_completion_script(shell, &mut sample_cli());
            assert!(!script.is_empty(), "{} script is empty", shell);
            assert!(script.contains("merge-pr"), "{} script lacks merge-pr", shell);
        }
    }
}
