//! Org-mode project block and preview message formatting.

use std::collections::BTreeSet;

use crate::state::PendingProjectCapture;

/// Builds the org-mode project block: heading with tags, properties drawer,
/// optional description, optional SCHEDULED line, and `** TODO` starter
/// tasks. Always newline-terminated.
pub fn build_project_block(pending: &PendingProjectCapture) -> String {
    let title = if pending.title.trim().is_empty() {
        "Untitled Project"
    } else {
        pending.title.trim()
    };
    let tags: BTreeSet<String> = if pending.tags.is_empty() {
        BTreeSet::from(["project".to_string()])
    } else {
        pending
            .tags
            .iter()
            .map(|t| t.trim_matches([':', ' ']).to_string())
            .filter(|t| !t.is_empty())
            .collect()
    };
    let tag_suffix = format!(":{}:", tags.into_iter().collect::<Vec<_>>().join(":"));
    let now = chrono::Local::now();

    let mut lines = Vec::new();
    lines.push(format!("* {} {}", title, tag_suffix));
    lines.push(":PROPERTIES:".to_string());
    lines.push(format!(":ID:       {}", now.format("%Y%m%d%H%M%S")));
    lines.push(format!(":CREATED:  {}", now.format("[%Y-%m-%d %a %H:%M]")));
    lines.push(":END:".to_string());

    let description = pending.description.trim();
    if !description.is_empty() {
        lines.push(description.to_string());
    }
    let target_date = pending.target_date.trim();
    if !target_date.is_empty() {
        lines.push(format!("SCHEDULED: {}", target_date));
    }
    for task in &pending.initial_tasks {
        let task = task.trim();
        if !task.is_empty() {
            lines.push(format!("** TODO {}", task));
        }
    }
    format!("{}\n", lines.join("\n"))
}

/// Wraps the block in the confirmation message shown to the user.
pub fn build_preview_message(preview_block: &str) -> String {
    format!(
        "Here's the project preview. Shall I add it to inbox.org?\n\n```org\n{}\n```\nReply 'yes' to proceed, or edit details (description, tasks, date).",
        preview_block.trim_end_matches('\n')
    )
}
