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
use std::{fmt::Write as _, io, str::FromStr, sync::Arc};

use tokio::{
    sync::{
        mpsc::{self, Sender},
        oneshot,
    },
    task::{JoinError, JoinHandle},
};
use tracing::{debug, error, info, span, warn, Instrument, Level};

use crate::{
    channel::{Color, CHANNEL_COUNT},
    effect::{parse_toggle, EffectKind, PulseArg},
    error::{Error, Result},
    fixture::Fixture,
};

pub mod keyboard;

const RGBW_VALUES: &str = "rgbw_values";
const SHOW: &str = "show";
const PER_COLOR_MAX_VALUE: &str = "per_color_max_value";
const MAX: &str = "max";
const RGBW_TYPES: &str = "rgbw_types";
const TYPES: &str = "types";
const PULSE: &str = "pulse";
const SUSPEND: &str = "suspend";
const RESUME: &str = "resume";
const QUIT: &str = "quit";
const EXIT: &str = "exit";
const VALUE_SUFFIX: &str = "_value";

/// Commands accepted by the controller. Each mirrors a fixture attribute: naming an
/// attribute reads it, naming it with an argument writes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Reports the HTML code and the brightness of every channel.
    ShowValues,

    /// Sets the channels from an HTML color code.
    SetHtml(String),

    /// Reports the brightness of a single channel.
    ShowChannel(Color),

    /// Sets the brightness of a single channel.
    SetChannel(Color, u32),

    /// Reports the kind of every channel.
    ShowTypes,

    /// Reports the maximum brightness of every channel.
    ShowMax,

    /// Starts pulsing a color, or stops the pulse.
    Pulse(PulseArg),

    /// Turns blink, heartbeat or rainbow on or off.
    Toggle(EffectKind, bool),

    /// Darkens the outputs.
    Suspend,

    /// Restores the outputs.
    Resume,

    /// Stops the controller.
    Quit,
}

impl FromStr for Command {
    type Err = Error;

    fn from_str(s: &str) -> Result<Command> {
        let s = s.trim();
        let (name, argument) = match s.split_once(char::is_whitespace) {
            Some((name, argument)) => (name, Some(argument.trim())),
            None => (s, None),
        };
        let name = name.to_ascii_lowercase();

        let no_argument = |command: Command| match argument {
            None => Ok(command),
            Some(_) => Err(Error::InvalidFormat(format!("{} takes no argument", name))),
        };
        let required = || {
            argument.ok_or_else(|| Error::InvalidFormat(format!("{} needs an argument", name)))
        };

        match name.as_str() {
            RGBW_VALUES | SHOW => match argument {
                Some(code) => Ok(Command::SetHtml(code.to_string())),
                None => Ok(Command::ShowValues),
            },
            PER_COLOR_MAX_VALUE | MAX => no_argument(Command::ShowMax),
            RGBW_TYPES | TYPES => no_argument(Command::ShowTypes),
            PULSE => Ok(Command::Pulse(required()?.parse()?)),
            SUSPEND => no_argument(Command::Suspend),
            RESUME => no_argument(Command::Resume),
            QUIT | EXIT => no_argument(Command::Quit),
            other => {
                if let Ok(kind) = other.parse::<EffectKind>() {
                    return Ok(Command::Toggle(kind, parse_toggle(required()?)?));
                }

                let color = other
                    .strip_suffix(VALUE_SUFFIX)
                    .unwrap_or(other)
                    .parse::<Color>()
                    .map_err(|_| Error::InvalidFormat(format!("unknown command {:?}", other)))?;
                match argument {
                    Some(value) => Ok(Command::SetChannel(color, parse_brightness(value)?)),
                    None => Ok(Command::ShowChannel(color)),
                }
            }
        }
    }
}

/// Parses a brightness value. Decimal and `0x` prefixed hex are accepted.
pub fn parse_brightness(s: &str) -> Result<u32> {
    let s = s.trim();
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.map_err(|_| Error::InvalidFormat(format!("{:?} is not a brightness value", s)))
}

/// Executes a command against the fixture, returning the report to show the user.
/// Commands that change the fixture report nothing.
pub fn execute(fixture: &Fixture, command: &Command) -> Result<String> {
    match command {
        Command::ShowValues => {
            let mut report = format!("HTML Code (#RRGGBBWW) = {}\n", fixture.get_html());
            let brightness = fixture.brightness();
            for color in Color::ALL {
                // Writing to a String cannot fail.
                let _ = writeln!(report, "{} = {}", color.label(), brightness[color.index()]);
            }
            Ok(report)
        }
        Command::SetHtml(code) => fixture.set_html(code).map(|_| String::new()),
        Command::ShowChannel(color) => Ok(format!("{}\n", fixture.get_channel(*color))),
        Command::SetChannel(color, brightness) => fixture
            .set_channel(*color, *brightness)
            .map(|_| String::new()),
        Command::ShowTypes => Ok(per_color(fixture.get_types())),
        Command::ShowMax => Ok(per_color(fixture.get_max())),
        Command::Pulse(arg) => fixture.pulse(*arg).map(|_| String::new()),
        Command::Toggle(kind, on) => fixture.toggle(*kind, *on).map(|_| String::new()),
        Command::Suspend => fixture.suspend().map(|_| String::new()),
        Command::Resume => fixture.resume().map(|_| String::new()),
        Command::Quit => Ok(String::new()),
    }
}

/// Renders one `Color = value` line per channel.
fn per_color<T: std::fmt::Display>(values: [T; CHANNEL_COUNT]) -> String {
    let mut report = String::new();
    for (color, value) in Color::ALL.into_iter().zip(values) {
        let _ = writeln!(report, "{} = {}", color.label(), value);
    }
    report
}

/// A command from a driver along with where to send the result.
#[derive(Debug)]
pub struct Request {
    pub command: Command,
    pub reply: oneshot::Sender<Result<String>>,
}

pub trait Driver: Send + Sync + 'static {
    fn monitor_events(&self, events_tx: Sender<Request>) -> JoinHandle<io::Result<()>>;
}

/// Drives a fixture from the commands of a driver.
pub struct Controller {
    handle: JoinHandle<()>,
}

impl Controller {
    /// Creates a new controller with the given driver.
    pub fn new(fixture: Arc<Fixture>, driver: Arc<dyn Driver>) -> Controller {
        let span = span!(Level::INFO, "controller");
        Controller {
            handle: tokio::spawn(Controller::handle_requests(fixture, driver).instrument(span)),
        }
    }

    /// Join will block until the controller finishes.
    pub async fn join(&mut self) -> std::result::Result<(), JoinError> {
        (&mut self.handle).await
    }

    /// Executes the commands coming from the driver until it closes or asks to quit.
    async fn handle_requests(fixture: Arc<Fixture>, driver: Arc<dyn Driver>) {
        let (events_tx, mut events_rx) = mpsc::channel(1);
        let join_handle = driver.monitor_events(events_tx);

        info!(fixture = fixture.name(), "Controller started.");

        while let Some(request) = events_rx.recv().await {
            info!(command = ?request.command, "Received command.");
            let quit = request.command == Command::Quit;

            // Stopping an effect waits for its timer, so run commands off the runtime.
            let command = request.command;
            let result = {
                let fixture = fixture.clone();
                tokio::task::spawn_blocking(move || execute(&fixture, &command)).await
            };
            let result = match result {
                Ok(result) => result,
                Err(e) => {
                    error!(err = %e, "Command task failed");
                    continue;
                }
            };

            match &result {
                Err(e) if e.is_refusal() => info!(err = %e, "Command refused."),
                Err(e) => warn!(err = %e, "Command failed."),
                Ok(_) => {}
            }
            if request.reply.send(result).is_err() {
                debug!("Driver stopped waiting for the reply");
            }

            if quit {
                break;
            }
        }

        info!("Controller closing.");
        // Unblocks a driver waiting to send or waiting on a reply that will never come.
        drop(events_rx);
        match join_handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!("Event monitor failed: {}", e),
            Err(e) => error!("Error waiting for event monitor to stop: {}", e),
        }
    }
}
