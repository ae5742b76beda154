//! Post-processing of raw model output.

/// Prompt-template tags that sometimes leak into responses.
pub const XML_TAGS_TO_REMOVE: &[&str] = &[
    "<git-diff>",
    "</git-diff>",
    "<git_diff>",
    "</git_diff>",
    "<diff-stat>",
    "</diff-stat>",
    "<pr-context>",
    "</pr-context>",
    "<repository_context>",
    "</repository_context>",
    "<instructions>",
    "</instructions>",
    "<format>",
    "</format>",
    "<conventions>",
    "</conventions>",
    "<hint>",
    "</hint>",
    "<language_instructions>",
    "</language_instructions>",
];

/// Prefaces a model may put before the actual message.
pub const MESSAGE_INDICATORS: &[&str] = &[
    "# Your message:",
    "Your message:",
    "The message is:",
    "Here's the message:",
    "Final message:",
    "Message:",
    "# Message",
    "Your commit message:",
    "Here's the commit message:",
    "Commit message:",
    "Here's the PR description:",
    "PR description:",
];

/// Strip code fences, leaked tags and "Here's the message:" prefaces.
pub fn clean_message(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    for indicator in MESSAGE_INDICATORS {
        if let Some(idx) = text.find(indicator) {
            // Only treat it as a preface when it sits on its own leading line.
            let before = &text[..idx];
            if !before.contains('\n') || before.trim().is_empty() {
                text = text[idx + indicator.len()..].trim().to_string();
                break;
            }
        }
    }

    for tag in XML_TAGS_TO_REMOVE {
        text = text.replace(tag, "");
    }

    strip_code_fence(text.trim()).to_string()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let Some(rest) = rest.strip_suffix("```") else {
        return text;
    };
    // Drop the info string on the opening fence, e.g. ```markdown
    match rest.split_once('\n') {
        Some((info, body)) if !info.contains(' ') => body.trim(),
        _ => rest.trim(),
    }
}

/// First non-empty line is the title; the remainder is the body.
pub fn split_title_body(message: &str) -> (String, String) {
    let mut lines = message.trim().lines();
    let title = lines
        .by_ref()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default();
    let title = title
        .trim_start_matches('#')
        .trim()
        .trim_start_matches("Title:")
        .trim()
        .to_string();
    let body = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    (title, body)
}
