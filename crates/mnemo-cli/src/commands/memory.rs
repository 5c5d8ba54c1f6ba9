use anyhow::Result;
use comfy_table::Cell;
use mnemo_core::{MemoryManager, UserMemory};
use serde_json::json;

use crate::cli::MemoryCommands;
use crate::commands::utils::{format_timestamp, preview_text};
use crate::output::{OutputFormat, json::print_json, table};

pub async fn run(manager: &MemoryManager, command: MemoryCommands, format: OutputFormat) -> Result<()> {
    match command {
        MemoryCommands::List { user, limit } => list_memories(manager, &user, limit, format).await,
        MemoryCommands::Add { user, memory } => add_memory(manager, &user, &memory, format).await,
        MemoryCommands::Delete { user, id } => delete_memory(manager, &user, &id, format).await,
        MemoryCommands::Clear { user } => clear_memories(manager, &user, format).await,
        MemoryCommands::Search { user, query, limit } => {
            search_memories(manager, &user, &query, limit, format).await
        }
    }
}

async fn list_memories(
    manager: &MemoryManager,
    user: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let memories = manager.get_user_memories(user, limit).await?;

    if format.is_json() {
        return print_json(&memories);
    }

    if memories.is_empty() {
        println!("No memories stored for {user}.");
        return Ok(());
    }
    render_memories_table(&memories)
}

async fn add_memory(
    manager: &MemoryManager,
    user: &str,
    memory: &str,
    format: OutputFormat,
) -> Result<()> {
    let created = manager.add_user_memory(user, memory, None).await?;

    if format.is_json() {
        return print_json(&created);
    }

    println!("Added memory: {}", created.id);
    Ok(())
}

async fn delete_memory(
    manager: &MemoryManager,
    user: &str,
    id: &str,
    format: OutputFormat,
) -> Result<()> {
    let deleted = manager.delete_user_memory(user, id).await?;

    if format.is_json() {
        return print_json(&json!({ "id": id, "deleted": deleted }));
    }

    if deleted {
        println!("Deleted memory: {id}");
    } else {
        println!("Memory not found: {id}");
    }
    Ok(())
}

async fn clear_memories(manager: &MemoryManager, user: &str, format: OutputFormat) -> Result<()> {
    let deleted = manager.clear_user_memories(user).await?;

    if format.is_json() {
        return print_json(&json!({ "user_id": user, "deleted": deleted }));
    }

    println!("Deleted {deleted} memories for {user}.");
    Ok(())
}

async fn search_memories(
    manager: &MemoryManager,
    user: &str,
    query: &str,
    limit: Option<usize>,
    format: OutputFormat,
) -> Result<()> {
    let results = manager.search_user_memories(user, query, limit).await?;

    if format.is_json() {
        return print_json(&results);
    }

    for (index, memory) in results.iter().enumerate() {
        println!("{}. {}", index + 1, memory.id);
        println!("   Updated: {}", format_timestamp(memory.updated_at));
        println!("   {}", preview_text(&memory.memory, 120));
        println!();
    }
    if results.is_empty() {
        println!("No memories match \"{query}\".");
    }
    Ok(())
}

fn render_memories_table(memories: &[UserMemory]) -> Result<()> {
    let mut table = table::new_table(vec!["ID", "Updated", "Memory"]);

    for memory in memories {
        table.add_row(vec![
            Cell::new(&memory.id),
            Cell::new(format_timestamp(memory.updated_at)),
            Cell::new(preview_text(&memory.memory, 80)),
        ]);
    }

    table::print_table(table)
}
