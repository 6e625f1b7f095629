// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{error::Error, path::PathBuf, sync::Arc};

use clap::{crate_version, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use rgbw::{
    channel::Color,
    config,
    controller::{keyboard, Controller},
};

const SYSTEMD_SERVICE: &str = r#"
[Unit]
Description=RGB+W fixture controller

[Service]
Type=simple
Restart=on-failure
EnvironmentFile=-/etc/default/rgbw
ExecStart=/usr/local/bin/rgbw start "$RGBW_CONFIG"

[Install]
WantedBy=multi-user.target
Alias=rgbw.service
"#;

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "A controller for RGB+W lighting fixtures."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start will open the fixture and read commands from the keyboard.
    Start {
        /// The path to the fixture config.
        config_path: String,
    },
    /// Verifies a fixture config without opening any outputs.
    Verify {
        /// The path to the fixture config.
        config_path: String,
    },
    /// Prints a systemd service definition to stdout.
    Systemd {},
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start { config_path } => {
            let fixture = Arc::new(config::init_fixture(&PathBuf::from(config_path))?);
            let mut controller =
                Controller::new(fixture.clone(), Arc::new(keyboard::Driver::new()));

            tokio::select! {
                result = controller.join() => {
                    result?;
                    fixture.destroy();
                }
                result = tokio::signal::ctrl_c() => {
                    result?;
                    info!("Interrupted, shutting down.");
                    fixture.destroy();
                    // The keyboard driver is blocked reading stdin and would keep the
                    // runtime from shutting down.
                    std::process::exit(0);
                }
            }
        }
        Commands::Verify { config_path } => {
            let config = config::Fixture::deserialize(&PathBuf::from(&config_path))?;
            let timing = config.timing()?;

            println!("Fixture {} ({}):", config.name(), config_path);
            for (color, props) in Color::ALL.into_iter().zip(config.properties()) {
                if props.max_brightness == 0 {
                    return Err(format!("{}: maximum brightness must be at least 1", color).into());
                }
                let kind = props
                    .kind
                    .map_or("from output".to_string(), |kind| kind.to_string());
                println!(
                    "- {} = {}, max {}, initial {}",
                    color.label(),
                    kind,
                    props.max_brightness,
                    props.brightness
                );
            }
            println!(
                "Effects: pulse step {:?} x {}, blink period {:?}",
                timing.pulse_step, timing.pulse_steps, timing.blink_period
            );
            println!(
                "Suspend/resume: {}",
                if config.suspend_resume() {
                    "enabled"
                } else {
                    "disabled"
                }
            );
        }
        Commands::Systemd {} => {
            println!("{}", SYSTEMD_SERVICE)
        }
    }

    Ok(())
}
