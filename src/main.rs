use anyhow::Result;
use clap::Parser;

use subdub::cli::commands::config::ConfigCommand;
use subdub::cli::commands::languages::LanguagesCommand;
use subdub::cli::commands::run::RunCommand;
use subdub::cli::commands::{show_how_to_get_started, Command};
use subdub::cli::{Cli, Commands};
use subdub::session::IntakeForm;
use subdub::{init_telemetry, ShutdownCoordinator, SubdubConfig};

fn load_config(cli: &Cli) -> Result<SubdubConfig> {
    SubdubConfig::load_env_file()?;
    let mut config = match &cli.config {
        Some(path) => SubdubConfig::load_from_file(path)?,
        None => SubdubConfig::load()?,
    };
    if cli.json_logs {
        config.observability.json_logs = true;
    }
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;
    init_telemetry(&config.observability)?;

    let result = tokio::runtime::Runtime::new()?.block_on(async {
        let result = match cli.command {
            None => show_how_to_get_started().await,
            Some(Commands::Run {
                email,
                video_url,
                subtitle_language,
                dubbing_language,
                full_name,
                password,
                signup_email,
                code,
                offline,
                tick_ms,
            }) => {
                let intake = IntakeForm::new(email, video_url).with_languages(subtitle_language, dubbing_language);
                RunCommand::new(config, intake)
                    .with_signup(full_name, password, signup_email)
                    .with_code(code)
                    .with_offline(offline)
                    .with_tick_ms(tick_ms)
                    .execute()
                    .await
            }
            Some(Commands::Languages) => LanguagesCommand::new().execute().await,
            Some(Commands::Config { save }) => ConfigCommand::new(config).with_save_path(save).execute().await,
        };
        ShutdownCoordinator::shutdown_all_services().await?;
        result
    });

    result
}
