use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use taxplan::api::{ScenarioArgs, build_scenario, run_http_server, run_scenario};

#[derive(Parser, Debug)]
#[command(
    name = "taxplan",
    about = "Year-by-year US retirement tax and withdrawal projection"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON HTTP API.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one projection and print it as JSON.
    Project(ScenarioArgs),
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Project(args) => {
            let output = build_scenario(args)
                .and_then(|scenario| run_scenario(&scenario).map_err(|e| e.to_string()))
                .and_then(|response| {
                    serde_json::to_string_pretty(&response).map_err(|e| e.to_string())
                });
            match output {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error: {e}");
                    std::process::exit(2);
                }
            }
        }
    }
}
