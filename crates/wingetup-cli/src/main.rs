//! wingetup CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wingetup_cli::cmd;
use wingetup_cli::{Cli, Commands};
use wingetup_core::update::RunOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wingetup=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            checkver,
            all,
            output,
            github_output,
            github,
        } => match (all, checkver) {
            (Some(dir), _) => cmd::check::check_all(&dir, github.resolved_token()).await,
            (None, Some(path)) => {
                cmd::check::check(
                    &path,
                    output.as_deref(),
                    github_output.as_deref(),
                    github.resolved_token(),
                )
                .await
            }
            (None, None) => anyhow::bail!("a checkver file or --all <DIR> is required"),
        },
        Commands::Update {
            checkver,
            version_info,
            no_pr,
            fork_path,
            run,
        } => {
            let options = RunOptions {
                no_pr,
                fork_path,
                settings: run.settings(),
            };
            cmd::update::update(&checkver, &version_info, &options).await
        }
        Commands::Generate {
            config,
            version,
            installer_url,
            output_dir,
            github_output,
        } => {
            cmd::generate::generate(
                &config,
                &version,
                &installer_url,
                &output_dir,
                github_output.as_deref(),
            )
            .await
        }
        Commands::AddArch {
            checkver,
            output,
            github,
        } => cmd::add_arch::add_arch(&checkver, output.as_deref(), github.resolved_token()).await,
        Commands::New { dir } => cmd::new::new(&dir),
        Commands::Hash { files } => cmd::hash::hash(&files),
        Commands::Completions { shell } => {
            cmd::completions::completions(shell);
            Ok(())
        }
    }
}
