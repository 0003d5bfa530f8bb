//! relwatch: private-tracker release watcher.
//! Single-process binary: daemon (poll loop + UDS server) plus the CLI
//! subcommands that talk to it.

use clap::Parser;

mod cli;
mod client;
mod poll_loop;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    let socket_path = args.socket_path.unwrap_or_else(cli::default_socket_path);

    match args.command {
        cli::Command::Daemon(opts) => {
            let filter = std::env::var("RELWATCH_LOG")
                .or_else(|_| std::env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string());
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
                .init();

            tracing::info!("relwatch daemon starting");
            poll_loop::run_daemon(opts, &socket_path).await?;
        }
        cli::Command::Ls => client::cmd_ls(&socket_path).await?,
        cli::Command::Add { name, strict } => client::cmd_add(&socket_path, &name, strict).await?,
        cli::Command::Rm { name } => client::cmd_rm(&socket_path, &name).await?,
        cli::Command::Rename { old, new } => client::cmd_rename(&socket_path, &old, &new).await?,
        cli::Command::Strict { name, mode } => {
            client::cmd_strict(&socket_path, &name, mode.as_bool()).await?;
        }
        cli::Command::Creds { username, passkey } => {
            client::cmd_creds(&socket_path, &username, &passkey).await?;
        }
        cli::Command::Poll => client::cmd_poll(&socket_path).await?,
        cli::Command::Status => client::cmd_status(&socket_path).await?,
    }

    Ok(())
}
