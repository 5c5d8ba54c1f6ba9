use anyhow::Result;

use crate::cli::SummaryCommands;
use crate::commands::utils::format_timestamp;
use crate::output::{OutputFormat, json::print_json};
use mnemo_core::MemoryManager;

pub async fn run(manager: &MemoryManager, command: SummaryCommands, format: OutputFormat) -> Result<()> {
    match command {
        SummaryCommands::Show { user, session } => {
            let summary = manager.get_session_summary(&user, &session).await?;

            if format.is_json() {
                return print_json(&summary);
            }

            match summary {
                Some(summary) => {
                    println!("Session: {}", summary.session_id);
                    println!("Updated: {}", format_timestamp(summary.updated_at));
                    println!();
                    println!("{}", summary.summary);
                }
                None => println!("No summary yet for session {session}."),
            }
            Ok(())
        }
    }
}
