use clap::Parser;
use dotenv::dotenv;
use log::info;
use policy_chat_relay::cli::ClientArgs;
use policy_chat_relay::client::{ ChatSession, HttpRelayTransport, DEFAULT_GREETING };
use policy_chat_relay::models::chat::{ Role, Turn };
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{ AsyncBufReadExt, AsyncWriteExt, BufReader };

fn render(turn: &Turn) -> String {
    let speaker = match turn.role {
        Role::User => "You",
        Role::Assistant => "Tina",
    };
    format!("{}: {}\n", speaker, turn.text)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = ClientArgs::parse();

    let timeout = Duration::from_secs(args.timeout_secs);
    let transport = HttpRelayTransport::new(&args.relay_url, timeout)?;
    info!("Talking to {}", transport.endpoint());
    let session = ChatSession::new(Arc::new(transport), DEFAULT_GREETING).max_wait(timeout);

    let mut stdout = tokio::io::stdout();
    let mut shown = 0;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let conversation = session.conversation();
        for turn in &conversation.turns()[shown..] {
            stdout.write_all(render(turn).as_bytes()).await?;
        }
        shown = conversation.len();
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == "/quit" {
            break;
        }
        session.submit(&line).await;
    }

    Ok(())
}
