use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::clients::config_server::ConfigServerClient;
use crate::infra::config::Config;
use crate::session::{Session, DEMO_QUERIES};

#[derive(Parser)]
#[command(name = "autosar-config-gateway")]
#[command(about = "Natural-language AUTOSAR configuration generator")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the configuration server
    Serve {
        /// Port to listen on (defaults to PORT or 5000)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// List the tools offered by a configuration server
    Tools {
        /// Server URL (defaults to AUTOSAR_SERVER_URL)
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Interpret and execute one or more natural-language requests
    Query {
        /// Requests, each processed as a separate query
        #[arg(required = true)]
        text: Vec<String>,
        #[arg(short, long)]
        url: Option<String>,
        /// Directory for generated .arxml files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Run the built-in demo requests
    Demo {
        #[arg(short, long)]
        url: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Interactive session reading requests from stdin
    Chat {
        #[arg(short, long)]
        url: Option<String>,
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
    /// Health check a configuration server
    Health {
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Validate configuration from the environment
    Config,
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();

    run_commands(cli.command, Config::from_env()).await
}

fn with_overrides(mut cfg: Config, url: Option<String>, output_dir: Option<PathBuf>) -> Config {
    if let Some(url) = url {
        cfg.server_url = url;
    }
    if let Some(dir) = output_dir {
        cfg.output_dir = dir;
    }
    cfg
}

pub async fn run_commands(command: Commands, cfg: Config) -> ExitCode {
    match command {
        Commands::Serve { port } => {
            let mut cfg = cfg;
            if let Some(p) = port {
                cfg.port = p;
            }
            match crate::infra::boot::run_server(&cfg).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("❌ Server failed: {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Tools { url } => match list_tools(&with_overrides(cfg, url, None)).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Could not list tools: {e}");
                ExitCode::FAILURE
            }
        },
        Commands::Query { text, url, output_dir } => {
            run_queries(&with_overrides(cfg, url, output_dir), &text).await
        }
        Commands::Demo { url, output_dir } => {
            let queries: Vec<String> = DEMO_QUERIES.iter().map(|q| q.to_string()).collect();
            run_queries(&with_overrides(cfg, url, output_dir), &queries).await
        }
        Commands::Chat { url, output_dir } => {
            let cfg = with_overrides(cfg, url, output_dir);
            let mut session = match Session::start(&cfg).await {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("❌ Session start failed: {e}");
                    return ExitCode::FAILURE;
                }
            };
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            match session.run_chat(stdin.lock(), &mut stdout).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    eprintln!("❌ {e}");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Health { url } => {
            let cfg = with_overrides(cfg, url, None);
            if ConfigServerClient::from_config(&cfg).health().await {
                println!("✅ Server at {} is healthy", cfg.server_url);
                ExitCode::SUCCESS
            } else {
                eprintln!("❌ Server at {} is unreachable", cfg.server_url);
                ExitCode::FAILURE
            }
        }
        Commands::Config => match cfg.validate() {
            Ok(()) => {
                println!("✅ Configuration is valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {e}");
                ExitCode::FAILURE
            }
        },
    }
}

async fn list_tools(cfg: &Config) -> anyhow::Result<()> {
    let tools = ConfigServerClient::from_config(cfg).list_tools().await?;
    println!("🔧 {} tools at {}:", tools.len(), cfg.server_url);
    for t in tools {
        let summary = t.description.lines().next().unwrap_or_default().trim().to_string();
        println!("  - {}: {}", t.name, summary);
    }
    Ok(())
}

/// Start a session and process `queries`; fails only if the session cannot start
/// or no query succeeded.
async fn run_queries(cfg: &Config, queries: &[String]) -> ExitCode {
    let mut session = match Session::start(cfg).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("❌ Session start failed: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut stdout = std::io::stdout();
    match session.run_batch(queries, &mut stdout).await {
        Ok(n) if n > 0 => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}
