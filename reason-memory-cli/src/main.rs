use clap::Parser;

use reason_memory_cli::cli::Cli;

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    match reason_memory_cli::run(cli).await {
        Ok(code) => std::process::ExitCode::from(code as u8),
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::ExitCode::from(reason_memory_cli::errors::EXIT_OTHER as u8)
        }
    }
}
