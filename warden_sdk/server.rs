use warden_io::tokio;
use warden_io::tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use warden_sdk::prelude::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    warden_logging::setup_log();
    let config = WardenConfig::from_env()?;
    log::info!(target: "warden", "Serving the ledger at {}", config.store.home.display());

    let warden = config.builder().build().await?;
    let _sweeper = warden.spawn_scheduler();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let output = match line.split_once(char::is_whitespace) {
            Some((actor, command)) => match parse_actor_id(actor) {
                Ok(actor) => render(&warden.dispatch(actor, command.trim()).await),
                Err(_) => format!("Invalid actor id: {actor}\n"),
            },
            None => "Expected: <actor_id> /command [argument]\n".to_string(),
        };

        stdout.write_all(output.as_bytes()).await?;
        stdout.flush().await?;
    }

    Ok(())
}

fn render(response: &Response) -> String {
    let mut output = String::new();
    let status = if response.ok { "ok" } else { "error" };
    for message in &response.messages {
        output.push_str(&format!("[{status}] {message}\n"));
    }

    if let Some(path) = response.attachment.as_ref() {
        output.push_str(&format!("[attachment] {}\n", path.display()));
    }

    output
}
