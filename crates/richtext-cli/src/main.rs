use anyhow::Result;
use log::LevelFilter;
use richtext_cli::{App, Command, Config};
use std::env;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout carries only sanitized output
    let mut logger = env_logger::Builder::from_default_env();
    if env::var_os("RUST_LOG").is_none() {
        logger.filter_level(LevelFilter::Warn);
        logger.filter_module("richtext", LevelFilter::Info);
        logger.filter_module("richtext_cli", LevelFilter::Info);
    }
    logger.init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("  caused by: {}", cause);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<()> {
    match Command::parse(env::args().skip(1))? {
        Command::Help => {
            println!("{}", richtext_cli::cli::USAGE);
            Ok(())
        }
        Command::Version => {
            println!("richtext-cli {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::InitConfig => {
            let path = Config::default().save().await?;
            println!("Wrote default configuration to {}", path.display());
            Ok(())
        }
        Command::Run(invocation) => {
            let config = Config::load().await?;
            let app = App::new(config);
            app.run(&invocation).await
        }
    }
}
