//! Interactive chat loop.
//!
//! Each stdin line is processed as a user message, answered by the model with
//! the user's memories and the session summary as system context, and the
//! reply is processed as an assistant message.

use anyhow::Result;
use colored::Colorize;
use mnemo_ai::{CompletionRequest, LlmClient, Message};
use mnemo_core::{MemoryManager, SessionSummary, UserMemory};
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use crate::cli::ChatArgs;

const SYSTEM_PROMPT: &str = "You are a helpful assistant with long-term memory of the user.";

/// Recent messages replayed to the model on each turn.
const HISTORY_WINDOW: usize = 20;

pub async fn run(manager: &MemoryManager, llm: Arc<dyn LlmClient>, args: ChatArgs) -> Result<()> {
    let session = args
        .session
        .unwrap_or_else(|| format!("session-{}", chrono::Utc::now().format("%Y%m%d-%H%M%S")));
    println!(
        "{} user {} session {} (type /exit to quit)",
        "mnemo".bold(),
        args.user.cyan(),
        session.cyan()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".green().bold());
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "/exit" | "/quit") {
            break;
        }

        manager.process_user_message(&args.user, &session, line).await?;

        let request = build_request(manager, &args.user, &session).await?;
        let reply = match llm.complete(request).await {
            Ok(response) => response.text(),
            Err(e) => {
                warn!(error = %e, "Chat completion failed");
                eprintln!("{} {}", "Error:".red().bold(), e);
                continue;
            }
        };
        if reply.is_empty() {
            continue;
        }

        println!("{reply}");
        manager
            .process_assistant_message(&args.user, &session, &reply)
            .await?;
    }

    Ok(())
}

async fn build_request(
    manager: &MemoryManager,
    user: &str,
    session: &str,
) -> Result<CompletionRequest> {
    let memories = manager.get_user_memories(user, None).await?;
    let summary = manager.get_session_summary(user, session).await?;
    let history = manager.get_messages(user, session, Some(HISTORY_WINDOW)).await?;

    let mut messages = vec![Message::system(system_context(&memories, summary.as_ref()))];
    messages.extend(history.iter().map(Message::from));
    Ok(CompletionRequest::new(messages))
}

fn system_context(memories: &[UserMemory], summary: Option<&SessionSummary>) -> String {
    let mut context = SYSTEM_PROMPT.to_string();
    if !memories.is_empty() {
        context.push_str("\n\n## What you know about the user\n");
        for memory in memories {
            context.push_str("\n- ");
            context.push_str(&memory.memory);
        }
    }
    if let Some(summary) = summary.filter(|s| !s.summary.trim().is_empty()) {
        context.push_str("\n\n## Conversation so far\n\n");
        context.push_str(&summary.summary);
    }
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_without_memories_is_plain_prompt() {
        assert_eq!(system_context(&[], None), SYSTEM_PROMPT);
    }

    #[test]
    fn context_lists_memories_and_summary() {
        let memories = vec![
            UserMemory::new("alice", "likes tea"),
            UserMemory::new("alice", "lives in Oslo"),
        ];
        let summary = SessionSummary::new("s1", "alice", "Alice asked about travel.");

        let context = system_context(&memories, Some(&summary));
        assert!(context.contains("- likes tea\n- lives in Oslo"));
        assert!(context.ends_with("Alice asked about travel."));
    }
}
