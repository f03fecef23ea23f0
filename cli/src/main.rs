use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use relay_core::chat::ChatRequest;
use serde_json::{Value, json};

#[derive(Parser)]
#[command(name = "relay", version, about = "Agent relay CLI: chat with backend agents through the gateway")]
struct Cli {
    /// Gateway base URL
    #[arg(long, env = "RELAY_GATEWAY_URL", default_value = "http://localhost:8080")]
    gateway_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health
    Health,
    /// Send one chat turn to an agent
    Chat {
        /// Agent identifier (e.g. "foncorp-travel-agent")
        #[arg(long, short = 'a', env = "RELAY_AGENT_ID")]
        agent: String,
        /// Session returned by a previous turn
        #[arg(long, short = 's')]
        session: Option<String>,
        /// JSON file holding prior turns, forwarded as `history`
        #[arg(long)]
        history_file: Option<PathBuf>,
        /// The message to send
        message: String,
    },
}

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

fn exit_error(message: &str, docs_hint: Option<&str>) -> ! {
    let mut err = json!({
        "error": "cli_error",
        "message": message
    });
    if let Some(hint) = docs_hint {
        err["docs_hint"] = json!(hint);
    }
    eprintln!("{}", serde_json::to_string_pretty(&err).unwrap_or_else(|_| err.to_string()));
    std::process::exit(1);
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    let gateway_url = cli.gateway_url.trim_end_matches('/');

    let result = match cli.command {
        Commands::Health => health(gateway_url).await,
        Commands::Chat {
            agent,
            session,
            history_file,
            message,
        } => {
            let history = match history_file.as_deref().map(load_history).transpose() {
                Ok(history) => history,
                Err(e) => exit_error(
                    &e,
                    Some("The history file must contain a JSON array of prior turns."),
                ),
            };
            let request = ChatRequest {
                message: Some(message),
                agent_id: Some(agent),
                session_id: session,
                history,
            };
            chat(gateway_url, &request).await
        }
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => exit_error(
            &e.to_string(),
            Some("Is the gateway running? Set --gateway-url or RELAY_GATEWAY_URL."),
        ),
    }
}

async fn health(gateway_url: &str) -> Result<bool, Box<dyn std::error::Error>> {
    let resp = client().get(format!("{gateway_url}/health")).send().await?;
    let ok = resp.status().is_success();
    let body: Value = resp.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    Ok(ok)
}

/// Print the gateway's reply; `Ok(false)` when the gateway answered with an error status.
async fn chat(gateway_url: &str, request: &ChatRequest) -> Result<bool, Box<dyn std::error::Error>> {
    let (status, body) = send_chat(&client(), gateway_url, request).await?;
    let pretty = serde_json::to_string_pretty(&body)?;
    if status.is_success() {
        println!("{pretty}");
        Ok(true)
    } else {
        eprintln!("{pretty}");
        Ok(false)
    }
}

async fn send_chat(
    client: &reqwest::Client,
    gateway_url: &str,
    request: &ChatRequest,
) -> Result<(reqwest::StatusCode, Value), reqwest::Error> {
    let resp = client
        .post(format!("{gateway_url}/"))
        .json(request)
        .send()
        .await?;
    let status = resp.status();
    let text = resp.text().await?;
    let body = serde_json::from_str(&text).unwrap_or_else(|_| json!({ "error": text }));
    Ok((status, body))
}

fn load_history(path: &Path) -> Result<Vec<Value>, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    serde_json::from_str(&data).map_err(|e| format!("Invalid history JSON in {}: {e}", path.display()))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn send_chat_posts_inbound_contract() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_json(json!({
                "message": "hello",
                "agentId": "foncorp-travel-agent",
                "sessionId": "s-1"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "hi there",
                "error": null,
                "session_id": "s-1"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest {
            message: Some("hello".to_string()),
            agent_id: Some("foncorp-travel-agent".to_string()),
            session_id: Some("s-1".to_string()),
            history: None,
        };
        let (status, body) = send_chat(&reqwest::Client::new(), &server.uri(), &request)
            .await
            .expect("gateway reachable");
        assert!(status.is_success());
        assert_eq!(body["response"], "hi there");
    }

    #[tokio::test]
    async fn send_chat_wraps_non_json_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let (status, body) = send_chat(&reqwest::Client::new(), &server.uri(), &ChatRequest::default())
            .await
            .expect("gateway reachable");
        assert_eq!(status.as_u16(), 502);
        assert_eq!(body, json!({"error": "Bad Gateway"}));
    }

    #[test]
    fn load_history_rejects_non_arrays() {
        let dir = std::env::temp_dir().join(format!("relay-cli-history-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("temp dir");
        let good = dir.join("good.json");
        let bad = dir.join("bad.json");
        std::fs::write(&good, r#"[{"role": "user", "text": "hi"}]"#).expect("write");
        std::fs::write(&bad, r#"{"role": "user"}"#).expect("write");

        assert_eq!(load_history(&good).expect("array parses").len(), 1);
        assert!(load_history(&bad).is_err());
        assert!(load_history(&dir.join("missing.json")).is_err());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
