use clap::{Parser, Subcommand};
use std::time::Duration;

use sku_feeder::net::client::send_line_timeout;
use sku_feeder::net::connection::TERMINATE_COMMAND;

#[derive(Parser)]
#[command(name = "feeder-client")]
#[command(about = "Send SKUs or commands to a running sku-feeder", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "127.0.0.1:3333")]
    addr: String,

    /// Seconds to wait for each reply.
    #[arg(short, long, default_value_t = 5)]
    timeout: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit SKUs, one connection each
    Send {
        #[arg(required = true)]
        skus: Vec<String>,
    },
    /// Ask the server to shut down
    Terminate,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let timeout = Duration::from_secs(cli.timeout);

    let lines = match cli.command {
        Commands::Send { skus } => skus,
        Commands::Terminate => vec![TERMINATE_COMMAND.to_string()],
    };

    for line in lines {
        let reply = send_line_timeout(cli.addr.as_str(), &line, timeout).await?;
        println!("{} -> {}", line, reply);
    }

    Ok(())
}
