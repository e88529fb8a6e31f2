//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::{EntryMatch, MergeReport};

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print search hits as a table (Website, Username, Description, Modified).
///
/// Passwords are never shown here; use `get` for that.
pub fn print_entries_table(matches: &[EntryMatch<'_>]) {
    if matches.is_empty() {
        info("No matching credentials.");
        tip("Run `passvault add <LABEL> <USERNAME>` to add one.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Website", "Username", "Description", "Modified"]);

    for hit in matches {
        for (i, cred) in hit.credentials.iter().enumerate() {
            let label = if i == 0 { hit.entry.label.clone() } else { String::new() };
            table.add_row(vec![
                label,
                cred.username.clone(),
                cred.description.clone(),
                cred.modified_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }
    }

    println!("{table}");
}

/// One-line summary of a merge.
pub fn merge_summary(report: &MergeReport) -> String {
    format!(
        "{} entries added, {} merged, {} accounts added, {} updated",
        report.entries_added, report.entries_merged, report.accounts_added, report.accounts_updated
    )
}
