use clap::{Parser, Subcommand};
use dotenv::dotenv;
use relay_rs::relay::checkpoint::MemoryCheckpointStore;
use relay_rs::relay::router::build_default_workflow;
use relay_rs::relay::server;
use relay_rs::relay::state::{Message, StateUpdate};
use relay_rs::relay::step::RunContext;

use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single query through the workflow and print the reply
    Run {
        /// The user message
        #[arg(short, long)]
        message: String,
    },
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 10000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run { message } => {
            let store = Arc::new(MemoryCheckpointStore::new());
            let workflow = build_default_workflow(store)?;

            let ctx = RunContext::new();
            let initial = StateUpdate::message(Message::user(message));
            let state = workflow.run(initial, &ctx).await?;

            println!("{}", state.last_assistant_text().unwrap_or_default());
        }
        Commands::Serve { port } => {
            let store = Arc::new(MemoryCheckpointStore::new());
            let workflow = Arc::new(build_default_workflow(store)?);

            server::serve(workflow, port)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    Ok(())
}
