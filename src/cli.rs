//! Local REPL mode: generate one sample report, then an interactive chat
//! loop on stdin. Meant for poking at prompts and parsing without the server.

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

use crate::api::AppState;
use crate::llm::Priority;
use crate::services::chat::ChatSession;
use crate::services::pipeline::GenerateRequest;

pub async fn run_repl(state: Arc<AppState>) {
    info!("🖥️ REPL mode: generating a sample report first");

    let request = GenerateRequest {
        client_id: Some(state.config.default_client_id.clone()),
        trading_date: Utc::now().date_naive().to_string(),
        market_data: json!({ "tickers": ["SMCI", "NVDA"] }),
        news_items: json!({}),
        macro_context: json!({}),
    };

    match state.pipeline.generate_daily(request, Priority::High).await {
        Ok(report) => {
            println!("{}", serde_json::to_string_pretty(&report).unwrap_or_default());
        }
        Err(e) => {
            error!("Sample report generation failed: {:?}", e);
        }
    }

    println!("\nChat with the briefing assistant. Type 'exit' to quit.");

    let mut session = ChatSession::new(state.config.chat_history_limit);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("you> ");
        use std::io::Write;
        let _ = std::io::stdout().flush();

        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("stdin read failed: {}", e);
                break;
            }
        };

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        match state.chat.reply(&mut session, message).await {
            Ok(response) => println!("assistant> {}\n", response),
            Err(e) => error!("Chat failed: {}", e),
        }
    }

    println!("Bye.");
}
