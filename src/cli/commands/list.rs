//! `passvault list` — show entries and usernames (never passwords).

use crate::cli::output;
use crate::cli::{open_manager, Cli};
use crate::errors::Result;
use crate::vault::EntryMatch;

/// Execute the `list` command.
pub fn execute(cli: &Cli, query: Option<&str>) -> Result<()> {
    let manager = open_manager(cli)?;
    let matches: Vec<EntryMatch<'_>> = manager.find(query.unwrap_or(""))?.collect();

    output::print_entries_table(&matches);

    let vault = manager.vault()?;
    if query.is_some() {
        output::info(&format!(
            "{} of {} entries match",
            matches.len(),
            vault.len()
        ));
    } else if !vault.is_empty() {
        output::info(&format!(
            "{} entries, {} accounts",
            vault.len(),
            vault.account_count()
        ));
    }

    Ok(())
}
