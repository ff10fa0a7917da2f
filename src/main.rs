use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use dah::config::Config;

#[derive(Debug, Parser)]
#[command(name = "dah", version, about = "Hosted DICOM viewer with a local directory host")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "dah.toml")]
    config: PathBuf,

    /// Directory of DICOM files to offer (overrides [local].data_dir)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for produced artifacts (overrides [local].output_dir)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = if cli.config.exists() {
        Config::load_from_file(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        Config::default()
    };
    if let Some(dir) = cli.data_dir {
        config.local.data_dir = dir;
    }
    if let Some(dir) = cli.output_dir {
        config.local.output_dir = dir;
    }

    dah::logging::init(&config)?;

    let report = dah::run(config).await?;
    if report.final_state != hosting::State::Exit {
        anyhow::bail!("application stopped in state {}", report.final_state);
    }
    Ok(())
}
