//! Line-oriented interactive client for poking a Fleetwire server.
//!
//! Reads one JSON request per line, sends it over a persistent
//! connection (so login state sticks), and prints the response:
//!
//! ```text
//! $ fleet-repl 127.0.0.1:63000
//! > {"name": "login", "email": "customer1@example.com", "password": "password"}
//! {"user":{"email":"customer1@example.com",...}}
//! > q
//! ```
//!
//! Pass `--length-prefixed` for servers framed that way (devices).

use fleetwire::prelude::*;
use fleetwire_client::{ClientError, Connection};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut addr = "127.0.0.1:63000".to_string();
    let mut framing = Framing::Newline;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--length-prefixed" => framing = Framing::LengthPrefixed,
            other => addr = other.to_string(),
        }
    }

    let mut conn = Connection::open(&addr, framing).await?;
    eprintln!("connected to {addr}; enter a JSON request per line, 'q' to exit");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"> ").await?;
    stdout.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            // fall through to the prompt
        } else if line.eq_ignore_ascii_case("q") {
            break;
        } else {
            match serde_json::from_str::<Request>(line) {
                Ok(request) => match conn.send(&request).await {
                    Ok(response) => {
                        let rendered = serde_json::to_string(&response)?;
                        stdout.write_all(rendered.as_bytes()).await?;
                        stdout.write_all(b"\n").await?;
                    }
                    Err(ClientError::Closed) => {
                        eprintln!("server closed the connection");
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                },
                Err(e) => eprintln!("not a valid request: {e}"),
            }
        }
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;
    }

    conn.close().await;
    Ok(())
}
