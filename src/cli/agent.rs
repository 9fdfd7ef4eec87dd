//! Agent commands
//!
//! finagent reputation [address]    - Reputation lookup, or an interactive session
//! finagent credential --email      - Issue a credential badge
//! finagent chat --strategy <kind>  - Chat with a strategy agent

use anyhow::Result;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::timeout;

use super::output::{self, OutputMode};
use crate::adapters::{AgentApiClient, ChatSocket};
use crate::assistant::ReputationAssistant;
use crate::config::AppConfig;
use crate::domain::display::{explorer_address_url, format_address};
use crate::domain::{ChatEvent, StrategyKind};

/// Chat replies stream in several frames; stop waiting after this much silence
const REPLY_IDLE: Duration = Duration::from_secs(3);

pub async fn lookup_reputation(config: &AppConfig, address: &str, mode: OutputMode) -> Result<()> {
    let client = AgentApiClient::from_config(&config.agent)?;
    let response = client.lookup_reputation(address).await?;
    match mode {
        OutputMode::Json => output::print_item(&response)?,
        OutputMode::Table => {
            println!("Reputation analysis for {}:\n{}", address.trim(), response.reputation)
        }
    }
    Ok(())
}

async fn prompt(label: &str) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(label.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}

/// Interactive reputation assistant reading addresses from stdin
pub async fn reputation_session(config: &AppConfig) -> Result<()> {
    let client = AgentApiClient::from_config(&config.agent)?;
    let mut assistant = ReputationAssistant::new(client);
    for line in assistant.transcript() {
        println!("agent> {}", line.text);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt("you> ").await?;
        let Some(input) = lines.next_line().await? else {
            break;
        };
        if let Some(reply) = assistant.ask(&input).await {
            println!("agent> {}", reply);
        }
    }
    Ok(())
}

pub async fn issue_credential(config: &AppConfig, email: &str, mode: OutputMode) -> Result<()> {
    let client = AgentApiClient::from_config(&config.agent)?;
    let credential = client.issue_credential(email).await?;
    match mode {
        OutputMode::Json => output::print_item(&credential)?,
        OutputMode::Table => {
            output::print_success("Credential issued");
            output::print_kv("Credential", &credential.credential_id);
            output::print_kv("Chain", &credential.on_chain.chain);
            output::print_kv(
                "Contract",
                &format_address(&credential.on_chain.contract_address),
            );
            output::print_kv(
                "Explorer",
                &explorer_address_url(
                    &config.explorer.base_url,
                    &credential.on_chain.contract_address,
                ),
            );
            if let Some(status) = credential.on_chain.status.as_deref() {
                output::print_kv("Status", status);
            }
        }
    }
    Ok(())
}

pub async fn chat(config: &AppConfig, strategy: &str) -> Result<()> {
    let kind: StrategyKind = strategy.parse()?;
    let mut socket = ChatSocket::connect(&config.agent.chat_ws_url).await?;
    println!("{}", kind.chat_title());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    'session: loop {
        prompt("you> ").await?;
        let Some(input) = lines.next_line().await? else {
            break;
        };
        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        socket.send_user(input).await?;
        while let Ok(event) = timeout(REPLY_IDLE, socket.next_event()).await {
            match event? {
                Some(ChatEvent::Content(text)) => println!("agent> {}", text),
                Some(ChatEvent::ToolCall(call)) => {
                    tracing::debug!("Tool call: {}", call);
                }
                None => {
                    output::print_warn("Chat channel closed");
                    break 'session;
                }
            }
        }
    }

    if let Err(e) = socket.close().await {
        tracing::debug!("Chat channel close: {}", e);
    }
    Ok(())
}
