//! Interactive questions.
//!
//! Workflows ask through the [`Prompter`] trait so tests can script answers
//! and `--non-interactive` runs never block on stdin.

use std::io::{self, IsTerminal, Write};

use crate::output::{BOLD, CYAN, GRAY, GREEN, RESET, YELLOW};

pub trait Prompter {
    /// Whether a human can answer questions.
    fn is_interactive(&self) -> bool;

    /// Ask a yes/no question. Non-interactive prompters return `default`.
    fn confirm(&self, question: &str, default: bool) -> bool;

    /// Pick one of `options`, returning its index.
    fn select(&self, question: &str, options: &[&str], default: usize) -> usize;
}

/// Prompts on the terminal.
#[derive(Debug, Clone, Copy)]
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    /// Interactive only when stdin is a terminal and `non_interactive` is not set.
    pub fn new(non_interactive: bool) -> Self {
        Self {
            interactive: !non_interactive && io::stdin().is_terminal(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        if !self.interactive {
            return default;
        }
        confirm(question, default)
    }

    fn select(&self, question: &str, options: &[&str], default: usize) -> usize {
        if !self.interactive {
            return default;
        }
        select(question, options, default)
    }
}

/// Ask a yes/no question and return the user's choice
pub fn confirm(question: &str, default: bool) -> bool {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    print!("{CYAN}?{RESET} {} {GRAY}{}{RESET} ", question, hint);
    let _ = io::stdout().flush();

    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_err() {
        return default;
    }

    parse_confirm(&input, default)
}

fn parse_confirm(input: &str, default: bool) -> bool {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => true,
        "n" | "no" => false,
        _ => default,
    }
}

/// Ask user to select from a list of options
/// Returns the index of the selected option (0-based)
pub fn select(question: &str, options: &[&str], default: usize) -> usize {
    println!("{CYAN}?{RESET} {}", question);
    println!();

    for (i, option) in options.iter().enumerate() {
        let marker = if i == default {
            format!("{GREEN}>{RESET}")
        } else {
            " ".to_string()
        };
        println!("  {} {BOLD}{}{RESET}. {}", marker, i + 1, option);
    }

    loop {
        println!();
        print!("{GRAY}Enter choice [{}]:{RESET} ", default + 1);
        let _ = io::stdout().flush();

        let mut input = String::new();
        // EOF counts as accepting the default
        match io::stdin().read_line(&mut input) {
            Ok(0) | Err(_) => return default,
            Ok(_) => {}
        }

        match parse_choice(&input, options.len(), default) {
            Some(choice) => return choice,
            None => println!(
                "{YELLOW}Please enter a number between 1 and {}{RESET}",
                options.len()
            ),
        }
    }
}

fn parse_choice(input: &str, count: usize, default: usize) -> Option<usize> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Some(default);
    }
    match trimmed.parse::<usize>() {
        Ok(n) if n >= 1 && n <= count => Some(n - 1),
        _ => None,
    }
}
