use colored::Colorize;

pub fn handle_error(err: anyhow::Error) -> ! {
    eprintln!("{} {:#}", "Error:".red().bold(), err);

    let msg = err.to_string().to_lowercase();

    if msg.contains("api key not found") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Export your API key with:");
        eprintln!("  {} export OPENAI_API_KEY=<value>", "$".dimmed());
        eprintln!("  or add it under [api_keys] in ~/.config/mnemo/config.toml");
    }

    if msg.contains("database already open") || msg.contains("lock") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Another mnemo process is using this database. Close it and retry,");
        eprintln!("  or point --db-path at a different file.");
    }

    if msg.contains("connection refused") || msg.contains("network") {
        eprintln!("\n{}", "Suggestion:".yellow().bold());
        eprintln!("  Check your internet connection and try again.");
    }

    std::process::exit(1);
}
