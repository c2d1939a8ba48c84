//! `killer` - CLI for onboarding Killer players
//!
//! This binary scans player QR codes, registers names and photos, and
//! generates the codes handed out to players.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;

use killer::camera::open_default;
use killer::cli::{Cli, Command, ConfigCommand, GenerateCommand, RegisterCommand, SessionCommand};
use killer::qr;
use killer::registry::RegistryOptions;
use killer::session::load_player_data;
use killer::{init_logging, Config, Killer, PlayerRegistry, RegistrationState, TerminalOperator};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config_path = cli.config;
    match cli.command {
        // Reports problems with the file itself instead of failing to load it.
        Command::Config(config_cmd) => handle_config(config_path, config_cmd),
        Command::Register(register_cmd) => {
            handle_register(Config::load_from(config_path)?, &register_cmd).await
        }
        Command::Generate(generate_cmd) => {
            handle_generate(Config::load_from(config_path)?, &generate_cmd)
        }
        Command::Session(session_cmd) => {
            handle_session(Config::load_from(config_path)?, &session_cmd).await
        }
    }
}

async fn handle_register(
    mut config: Config,
    cmd: &RegisterCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(frames) = &cmd.frames {
        config.camera.frames_dir = Some(frames.clone());
    }
    config.validate()?;

    let camera = open_default(&config.camera);
    let operator = TerminalOperator::new()?;
    let mut registry = PlayerRegistry::new(camera, operator, RegistryOptions::from(&config));
    let state = registry.run().await;
    // Leave raw mode before printing the summary.
    drop(registry);

    match state? {
        RegistrationState::Done(registration) => {
            println!("Registered {}", registration.identifier);
            println!("  Name:  {}", registration.name);
            match &registration.photo {
                Some(photo) => println!("  Photo: {}", photo.display()),
                None => println!("  Photo: none"),
            }
        }
        RegistrationState::Failed(reason) => {
            println!("Registration did not complete: {reason:?}");
        }
        other => println!("Registration stopped in state {other:?}"),
    }
    Ok(())
}

fn handle_generate(
    mut config: Config,
    cmd: &GenerateCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    cmd.apply_to(&mut config.qr);
    config.validate()?;

    let options = config.qr.options();
    print!("{}", qr::render_terminal(&config.qr.payload, &options)?);

    if let Some(output) = &config.qr.output {
        let image = qr::generate(&config.qr.payload, &options)?;
        qr::save_png(&image, output)?;
        println!("Saved QR code to {}", output.display());
    }
    Ok(())
}

async fn handle_session(
    mut config: Config,
    cmd: &SessionCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(players) = cmd.players {
        config.session.players = players;
    }
    if let Some(frames) = &cmd.frames {
        config.camera.frames_dir = Some(frames.clone());
    }

    let roster = cmd
        .roster
        .clone()
        .or_else(|| config.session.roster_path.clone())
        .ok_or("no roster given; pass --roster or set session.roster_path")?;
    let mut session = Killer::with_player_data(config.session.players, load_player_data(roster)?)?;
    config.validate()?;

    let camera = open_default(&config.camera);
    let operator = TerminalOperator::new()?;
    let mut registry = PlayerRegistry::new(camera, operator, RegistryOptions::from(&config));
    let added = registry.enroll(&mut session).await;
    drop(registry);
    let added = added?;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(session.players())?);
    } else {
        println!(
            "Session: {added} added, {}/{} players",
            session.players().len(),
            session.amount_players()
        );
        for player in session.players() {
            println!(
                "  {:<16} {} ({})",
                player.id,
                player.name,
                player.registered_at.format("%H:%M:%S")
            );
        }
    }
    Ok(())
}

fn handle_config(
    config_path: Option<PathBuf>,
    cmd: ConfigCommand,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = Config::read_from(config_path)?;
            if let Err(e) = config.validate() {
                eprintln!("Warning: {e}");
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Session]");
                println!("  Players:            {}", config.session.players);
                println!(
                    "  Roster:             {}",
                    display_optional(config.session.roster_path.as_deref())
                );
                println!();
                println!("[Camera]");
                println!("  Device index:       {}", config.camera.device_index);
                println!("  Frame interval ms:  {}", config.camera.frame_interval_ms);
                println!(
                    "  Frames directory:   {}",
                    display_optional(config.camera.frames_dir.as_deref())
                );
                println!();
                println!("[Registry]");
                println!(
                    "  Photo directory:    {}",
                    config.registry.photo_dir.display()
                );
                println!();
                println!("[QR]");
                println!("  Payload:            {}", config.qr.payload);
                println!(
                    "  Version:            {}",
                    config
                        .qr
                        .version
                        .map_or_else(|| "auto".to_string(), |v| v.to_string())
                );
                println!("  Fit:                {}", config.qr.fit);
                println!("  Error correction:   {:?}", config.qr.error_correction);
                println!("  Box size:           {}", config.qr.box_size);
                println!("  Border:             {}", config.qr.border);
            }
        }
        ConfigCommand::Path => {
            let path = config_path.unwrap_or_else(Config::default_config_path);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn display_optional(path: Option<&std::path::Path>) -> String {
    path.map_or_else(|| "(none)".to_string(), |p| p.display().to_string())
}
