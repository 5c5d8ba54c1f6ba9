use anyhow::Result;
use comfy_table::Cell;
use serde_json::json;

use crate::cli::MessagesCommands;
use crate::commands::utils::{format_timestamp, preview_text};
use crate::output::{OutputFormat, json::print_json, table};
use mnemo_core::MemoryManager;

pub async fn run(manager: &MemoryManager, command: MessagesCommands, format: OutputFormat) -> Result<()> {
    match command {
        MessagesCommands::List {
            user,
            session,
            limit,
        } => {
            let messages = manager.get_messages(&user, &session, limit).await?;

            if format.is_json() {
                return print_json(&messages);
            }

            let mut table = table::new_table(vec!["Time", "Role", "Content"]);
            for message in &messages {
                table.add_row(vec![
                    Cell::new(format_timestamp(message.created_at)),
                    Cell::new(message.role.as_str()),
                    Cell::new(preview_text(&message.content, 100)),
                ]);
            }
            table::print_table(table)
        }
        MessagesCommands::Delete { user, session } => {
            let deleted = manager.delete_session_messages(&user, &session).await?;

            if format.is_json() {
                return print_json(&json!({ "session_id": session, "deleted": deleted }));
            }

            println!("Deleted {deleted} messages from session {session}.");
            Ok(())
        }
    }
}
