//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - ask: Run one turn
//! - chat: Interactive conversation with one agent
//! - doctor: Validate configuration, credentials and backends
//! - secret: Store or remove credentials in the OS keychain

use anyhow::{Context, Result};
use serde_json::json;
use std::io::{ErrorKind, Write};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use sdk::errors::{CafeErrorExt, EngineError};

use crate::agent::{CafeAgent, EvidenceAggregator, TurnReply};
use crate::cli::SecretAction;
use crate::config::Config;
use crate::llm::{GenerationClient, LLMProvider, OllamaProvider};
use crate::secrets::{
    self, SecretCache, SecretManager, SecretString, GOOGLE_MAPS_API_KEY, OLLAMA_API_KEY,
};
use crate::tools::{GooglePlacesTool, WebSearchTool};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Wire the agent and its collaborators from configuration
///
/// # Errors
///
/// Fails when the Google Maps key cannot be resolved or an HTTP client
/// cannot be built.
pub fn build_agent(config: &Config) -> Result<CafeAgent> {
    let secrets = SecretCache::new(Arc::new(SecretManager::new(secrets::SERVICE_NAME)));

    let ollama_key = secrets
        .get_optional(OLLAMA_API_KEY)
        .context("Failed to read Ollama API key")?;
    let google_key = secrets.get_secret(GOOGLE_MAPS_API_KEY).with_context(|| {
        format!(
            "Set {} or run `cafe secret set {}`",
            SecretManager::env_var_name(GOOGLE_MAPS_API_KEY),
            GOOGLE_MAPS_API_KEY
        )
    })?;

    let provider = OllamaProvider::new(&config.llm, ollama_key).map_err(EngineError::from)?;
    let llm = GenerationClient::new(Arc::new(provider), config.llm.system_prompt.clone());

    let places = Arc::new(GooglePlacesTool::new(&config.places, google_key)?);
    let web = Arc::new(WebSearchTool::new(&config.web)?);

    let aggregator = EvidenceAggregator::new(places.clone(), places, web)
        .with_max_candidates(config.places.max_candidates)
        .with_concurrency(config.agent.concurrency);

    Ok(CafeAgent::new(llm, aggregator).with_follow_up_turns(config.agent.follow_up_turns))
}

/// User-facing description of a failed turn
pub fn error_hint(error: &anyhow::Error) -> String {
    match error.downcast_ref::<EngineError>() {
        Some(engine_error) => engine_error.user_hint().to_string(),
        None => secrets::scrub(&error.to_string()),
    }
}

/// Render a failed turn the way the chat loop shows it
pub fn render_turn_error(error: &anyhow::Error) -> String {
    format!("⚠️ 系統發生異常：{}", error_hint(error))
}

fn print_reply(reply: &TurnReply, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("{}", reply.answer);
            println!();
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(reply)?);
        }
    }
    Ok(())
}

fn print_turn_error(error: &anyhow::Error, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", render_turn_error(error)),
        OutputFormat::Json => {
            let output = json!({
                "status": "failed",
                "error": error_hint(error)
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Print the outcome of one turn; returns whether the turn succeeded.
///
/// A failure is logged and rendered here, so callers must not report it again.
pub fn report_turn(outcome: Result<TurnReply>, format: OutputFormat) -> Result<bool> {
    match outcome {
        Ok(reply) => {
            print_reply(&reply, format)?;
            Ok(true)
        }
        Err(e) => {
            tracing::error!("Turn failed: {}", secrets::scrub(&format!("{:#}", e)));
            print_turn_error(&e, format)?;
            Ok(false)
        }
    }
}

/// Run a single turn
///
/// A failed turn exits non-zero after its rendered message.
pub async fn handle_ask(
    utterance: String,
    config: &Config,
    format: OutputFormat,
) -> Result<ExitCode> {
    let mut agent = build_agent(config)?;

    if report_turn(agent.respond(&utterance).await, format)? {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Interactive conversation over stdin
pub async fn handle_chat(config: &Config, format: OutputFormat) -> Result<()> {
    let mut agent = build_agent(config)?;

    if let OutputFormat::Text = format {
        println!("☕ 咖啡廳探店小助手，輸入 exit 離開。");
    }

    run_chat_loop(&mut agent, BufReader::new(tokio::io::stdin()), format).await?;

    tracing::info!(
        "Chat ended after {} recorded searches",
        agent.memory().len()
    );
    Ok(())
}

/// Answer every line of `input` with one agent until `exit`, `quit` or EOF.
///
/// One agent serves the whole session, so follow-up questions see earlier
/// searches. A failed turn or an undecodable line is reported and the loop
/// continues.
pub async fn run_chat_loop<R>(agent: &mut CafeAgent, input: R, format: OutputFormat) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        eprint!("> ");
        std::io::stderr().flush().ok();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                tracing::warn!("Skipping unreadable input line: {}", e);
                eprintln!("⚠️ 無法讀取輸入，請重新輸入。");
                continue;
            }
            Err(e) => return Err(e).context("Failed to read input"),
        };

        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if utterance.eq_ignore_ascii_case("exit") || utterance.eq_ignore_ascii_case("quit") {
            break;
        }

        report_turn(agent.respond(utterance).await, format)?;
    }

    Ok(())
}

/// Run system diagnostics
///
/// Validates configuration and checks:
/// - Credentials (Google Maps required, Ollama optional)
/// - Ollama backend reachability
/// - Web search endpoint reachability
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Check 1: Configuration validation
    // Config is already validated when loaded
    checks.push(("Configuration", "Valid".to_string()));
    checks.push(("Model", config.llm.model.clone()));
    checks.push((
        "Candidates per search",
        config.places.max_candidates.to_string(),
    ));

    // Check 2: Credentials
    let manager = SecretManager::new(secrets::SERVICE_NAME);
    if manager.has_secret(GOOGLE_MAPS_API_KEY) {
        checks.push(("Google Maps API key", "Configured".to_string()));
    } else {
        checks.push(("Google Maps API key", "Missing".to_string()));
        issues.push(format!(
            "Google Maps API key not found. Set {} or run 'cafe secret set {}'.",
            SecretManager::env_var_name(GOOGLE_MAPS_API_KEY),
            GOOGLE_MAPS_API_KEY
        ));
    }

    let ollama_key = match manager.lookup(OLLAMA_API_KEY) {
        Ok(Some(key)) => {
            checks.push(("Ollama API key", "Configured".to_string()));
            Some(SecretString::new(key))
        }
        Ok(None) => {
            checks.push(("Ollama API key", "Not configured".to_string()));
            None
        }
        Err(e) => {
            checks.push(("Ollama API key", "Keychain error".to_string()));
            issues.push(format!("Cannot read keychain: {}", e));
            None
        }
    };

    // Check 3: Generation backend
    match OllamaProvider::new(&config.llm, ollama_key) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("Ollama", "Available".to_string()));
            } else {
                checks.push(("Ollama", "Not available".to_string()));
                issues.push(format!(
                    "Ollama is not reachable at {}. Start Ollama or fix llm.base_url.",
                    config.llm.base_url
                ));
            }
        }
        Err(e) => {
            checks.push(("Ollama", "Error".to_string()));
            issues.push(format!("Cannot initialize Ollama provider: {}", e));
        }
    }

    // Check 4: Web search endpoint
    match crate::tools::build_client(config.web.timeout_secs) {
        Ok(client) => match client.get(&config.web.base_url).send().await {
            Ok(_) => checks.push(("Web search", "Reachable".to_string())),
            Err(e) => {
                checks.push(("Web search", "Unreachable".to_string()));
                issues.push(format!(
                    "Web search endpoint {} is unreachable: {}",
                    config.web.base_url,
                    secrets::scrub(&e.to_string())
                ));
            }
        },
        Err(e) => {
            checks.push(("Web search", "Error".to_string()));
            issues.push(e.to_string());
        }
    }

    // Output results
    match format {
        OutputFormat::Text => {
            println!("Cafe Finder Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Store or remove a credential
pub async fn handle_secret(action: SecretAction, format: OutputFormat) -> Result<()> {
    let manager = SecretManager::new(secrets::SERVICE_NAME);

    let (key, status) = match action {
        SecretAction::Set { key } => {
            let value = manager.prompt_for_secret(&key)?;
            manager.set_secret(&key, &value)?;
            (key, "stored")
        }
        SecretAction::Delete { key } => {
            manager.delete_secret(&key)?;
            (key, "deleted")
        }
    };

    match format {
        OutputFormat::Text => println!("✓ Secret '{}' {}", key, status),
        OutputFormat::Json => {
            let output = json!({ "key": key, "status": status });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
