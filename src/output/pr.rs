//! Pull request operation output.

use super::colors::*;

const BOX_INNER_WIDTH: usize = 56;

fn print_box(color: &str, icon: &str, title: &str) {
    let label = format!("  {} {}", icon, title);
    let padding = BOX_INNER_WIDTH.saturating_sub(label.chars().count());
    println!("{color}{BOLD}╔{}╗{RESET}", "═".repeat(BOX_INNER_WIDTH));
    println!("{color}{BOLD}║{}{}║{RESET}", label, " ".repeat(padding));
    println!("{color}{BOLD}╚{}╝{RESET}", "═".repeat(BOX_INNER_WIDTH));
}

/// Print a prominent success message for a created PR with its URL.
pub fn print_pr_created(number: u64, url: &str, draft: bool) {
    println!();
    let title = if draft {
        format!("Draft Pull Request #{} Created", number)
    } else {
        format!("Pull Request #{} Created", number)
    };
    print_box(GREEN, "✓", &title);
    println!();
    println!("{GREEN}{BOLD}  {}{RESET}", url);
    println!();
}

/// Print a prominent message when a PR already exists for the branch.
pub fn print_pr_already_exists(number: u64, url: &str) {
    println!();
    print_box(CYAN, "ℹ", &format!("Pull Request #{} Already Exists", number));
    println!();
    println!("{CYAN}{BOLD}  {}{RESET}", url);
    println!();
}

/// Print a prominent message when a PR description has been updated.
pub fn print_pr_updated(number: u64, url: &str) {
    println!();
    print_box(GREEN, "✓", &format!("Pull Request #{} Updated", number));
    println!();
    println!("{GREEN}{BOLD}  {}{RESET}", url);
    println!();
}

pub fn print_pr_merged(number: u64, method: &str, url: &str) {
    println!();
    print_box(GREEN, "✓", &format!("Pull Request #{} Merged ({})", number, method));
    println!();
    println!("{GREEN}{BOLD}  {}{RESET}", url);
    println!();
}

pub fn print_already_merged(number: u64) {
    println!("{GREEN}✓{RESET} PR #{} is already merged. Nothing to do.", number);
}

/// Print the prompt sent to the model (`--show-prompt`).
pub fn print_prompt(prompt: &str) {
    println!("{GRAY}──── prompt ────{RESET}");
    println!("{DIM}{}{RESET}", prompt);
    println!("{GRAY}────────────────{RESET}");
    println!();
}

/// Preview of a generated title and body.
pub fn print_generated_text(title: &str, body: &str) {
    println!();
    println!("{BLUE}Title:{RESET} {BOLD}{}{RESET}", title);
    if !body.is_empty() {
        println!();
        for line in body.lines() {
            println!("  {}", line);
        }
    }
    println!();
}

/// Preview of the merge commit message.
pub fn print_merge_message(title: &str, body: &str) {
    println!();
    println!("{BLUE}Merge commit:{RESET}");
    println!("  {BOLD}{}{RESET}", title);
    if !body.is_empty() {
        println!();
        for line in body.lines() {
            println!("  {GRAY}{}{RESET}", line);
        }
    }
    println!();
}

/// Print a success message when branch push completes.
pub fn print_push_success() {
    println!("{GREEN}Branch pushed successfully.{RESET}");
}

pub fn print_branch_created(branch: &str, base: &str) {
    println!(
        "{GREEN}Created branch{RESET} {CYAN}{}{RESET} from {GRAY}{}{RESET}",
        branch, base
    );
}
