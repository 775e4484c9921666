use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "netconf-cli")]
#[command(about = "Client for the NETCONF agent HTTP/JSON transport", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8830")]
    url: String,

    #[arg(long, default_value = "admin")]
    username: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Running configuration plus operational state
    Get {
        /// Path expression filter, e.g. "/top/interface[name='eth0']"
        #[arg(long, conflicts_with = "subtree")]
        xpath: Option<String>,
        /// JSON file holding a subtree filter (array of filter nodes)
        #[arg(long)]
        subtree: Option<PathBuf>,
    },
    /// Configuration of one datastore
    GetConfig {
        #[arg(long, default_value = "running")]
        source: String,
        #[arg(long, conflicts_with = "subtree")]
        xpath: Option<String>,
        #[arg(long)]
        subtree: Option<PathBuf>,
    },
    /// Apply a patch (JSON array of wire nodes)
    Edit {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, default_value = "running")]
        target: String,
        #[arg(long, default_value = "merge")]
        default_operation: String,
        /// Validate without committing
        #[arg(long)]
        test_only: bool,
    },
    /// Run a JSON array of RPC bodies in one session, in order
    Script {
        #[arg(long)]
        file: PathBuf,
    },
}

fn read_json(path: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

fn filter(xpath: Option<String>, subtree: Option<PathBuf>) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    Ok(match (xpath, subtree) {
        (Some(select), _) => Some(json!({"type": "xpath", "select": select})),
        (None, Some(path)) => Some(json!({"type": "subtree", "content": read_json(&path)?})),
        (None, None) => None,
    })
}

struct Session {
    client: reqwest::Client,
    base: String,
    id: u64,
    next_message: u64,
}

impl Session {
    async fn open(url: &str, username: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let client = reqwest::Client::new();
        let base = format!("{}/netconf/session", url.trim_end_matches('/'));
        let res = client
            .post(&base)
            .json(&json!({"username": username}))
            .send()
            .await?;
        let status = res.status();
        let hello: Value = res.json().await?;
        if !status.is_success() {
            return Err(format!("session refused ({}): {}", status, hello).into());
        }
        let id = hello["session-id"]
            .as_u64()
            .ok_or("hello reply without session-id")?;
        eprintln!("session {} opened", id);
        Ok(Self {
            client,
            base,
            id,
            next_message: 1,
        })
    }

    async fn rpc(&mut self, mut body: Value) -> Result<Value, Box<dyn std::error::Error>> {
        if let Some(obj) = body.as_object_mut() {
            obj.entry("message-id")
                .or_insert_with(|| Value::String(self.next_message.to_string()));
        }
        self.next_message += 1;
        let res = self
            .client
            .post(format!("{}/{}/rpc", self.base, self.id))
            .json(&body)
            .send()
            .await?;
        Ok(res.json().await?)
    }

    async fn close(self) -> Result<(), Box<dyn std::error::Error>> {
        self.client
            .delete(format!("{}/{}", self.base, self.id))
            .send()
            .await?;
        Ok(())
    }
}

fn print_reply(reply: &Value) -> Result<bool, Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(reply)?);
    Ok(reply.get("rpc-error").is_none())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut session = Session::open(&cli.url, &cli.username).await?;

    let mut ok = true;
    match cli.command {
        Commands::Get { xpath, subtree } => {
            let mut body = json!({"operation": "get"});
            if let Some(f) = filter(xpath, subtree)? {
                body["filter"] = f;
            }
            ok = print_reply(&session.rpc(body).await?)?;
        }
        Commands::GetConfig {
            source,
            xpath,
            subtree,
        } => {
            let mut body = json!({"operation": "get-config", "source": source});
            if let Some(f) = filter(xpath, subtree)? {
                body["filter"] = f;
            }
            ok = print_reply(&session.rpc(body).await?)?;
        }
        Commands::Edit {
            file,
            target,
            default_operation,
            test_only,
        } => {
            let mut body = json!({
                "operation": "edit-config",
                "target": target,
                "default-operation": default_operation,
                "config": read_json(&file)?,
            });
            if test_only {
                body["test-option"] = json!("test-only");
            }
            ok = print_reply(&session.rpc(body).await?)?;
        }
        Commands::Script { file } => {
            let Value::Array(rpcs) = read_json(&file)? else {
                return Err("script must be a JSON array of RPC bodies".into());
            };
            for body in rpcs {
                let reply = session.rpc(body).await?;
                if !print_reply(&reply)? {
                    ok = false;
                    break;
                }
            }
        }
    }

    session.close().await?;
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
