use clap::Parser;
use colored::Colorize;
use dotenv::dotenv;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use std::net::SocketAddr;
use tokio::net::TcpListener;

use docqa_agent::api;
use docqa_agent::commands::{CommandFlow, CommandHandler};
use docqa_agent::config::{AppConfig, Credentials};
use docqa_agent::workflow::{HostedServices, QaWorkflow};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Ask questions about a PDF document", long_about = None)]
struct Args {
    /// Serve the web form instead of the terminal prompt
    #[arg(long)]
    api: bool,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value = "8501")]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    colored::control::set_override(true);

    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = AppConfig::from_env();
    log::info!(
        "Using {} with top_k {} ({} MB upload limit)",
        config.vector_backend,
        config.top_k,
        config.max_upload_bytes / (1024 * 1024)
    );

    if args.api {
        run_api_server(&args, config).await
    } else {
        run_cli_mode(config).await
    }
}

async fn run_cli_mode(config: AppConfig) -> anyhow::Result<()> {
    let workflow = QaWorkflow::new(HostedServices::new(config));
    let mut command_handler = CommandHandler::new(workflow, Credentials::from_env());

    println!("{}", "Document Question-Answering App".bold().bright_cyan());
    if let Err(e) = command_handler.handle_command("help").await {
        println!("{}", e.red());
    }

    let mut rl = Editor::<(), DefaultHistory>::new()?;

    loop {
        match rl.readline("👤 ") {
            Ok(line) => {
                let input = line.trim();
                if !input.is_empty() {
                    let _ = rl.add_history_entry(input);
                }

                match command_handler.handle_command(input).await {
                    Ok(CommandFlow::Exit) => break,
                    Ok(CommandFlow::Continue) => {}
                    Err(e) => println!("{}", e.red()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("CTRL-C");
                break;
            }
            Err(ReadlineError::Eof) => {
                println!("CTRL-D");
                break;
            }
            Err(err) => {
                println!("Error: {:?}", err);
                break;
            }
        }
    }
    Ok(())
}

async fn run_api_server(args: &Args, config: AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;

    println!("Starting web form on http://{}", addr);

    let max_upload_bytes = config.max_upload_bytes;
    let session_idle = chrono::Duration::minutes(config.session_idle_minutes);
    let workflow = QaWorkflow::new(HostedServices::new(config));
    let app = api::create_api(workflow, Credentials::from_env(), max_upload_bytes, session_idle);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    println!("Ready to accept connections!");

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
