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
use std::io;

use tokio::{
    sync::{mpsc::Sender, oneshot},
    task::JoinHandle,
};
use tracing::{info, span, warn, Level};

use super::{Command, Request};

const PROMPT: &str = "Command (RGBW_values [#RRGGBB[WW]], <color>_value [N], \
    per_color_max_value, RGBW_types, pulse <color>|stop, blink|heartbeat|rainbow 0|1, \
    suspend, resume, quit): ";

/// A driver that reads commands from the keyboard.
pub struct Driver {}

impl Driver {
    pub fn new() -> Driver {
        Driver {}
    }

    /// Handles one line of input. Returns false once the session is over.
    fn monitor_io<R, W>(
        events_tx: &Sender<Request>,
        mut reader: R,
        mut writer: W,
    ) -> io::Result<bool>
    where
        R: io::BufRead,
        W: io::Write,
    {
        write!(writer, "{}", PROMPT)?;
        writer.flush()?;
        let mut input: String = String::default();
        if reader.read_line(&mut input)? == 0 {
            info!("Keyboard input closed.");
            return Ok(false);
        }
        if input.trim().is_empty() {
            return Ok(true);
        }

        let command = match input.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                warn!(input = input.trim(), err = %e, "Unrecognized input");
                writeln!(writer, "Error: {}", e)?;
                return Ok(true);
            }
        };
        let quit = command == Command::Quit;

        let (reply_tx, reply_rx) = oneshot::channel();
        events_tx
            .blocking_send(Request {
                command,
                reply: reply_tx,
            })
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

        match reply_rx.blocking_recv() {
            Ok(Ok(report)) => writer.write_all(report.as_bytes())?,
            Ok(Err(e)) => writeln!(writer, "Error: {}", e)?,
            // The controller is gone.
            Err(_) => return Ok(false),
        }
        writer.flush()?;
        Ok(!quit)
    }
}

impl Default for Driver {
    fn default() -> Self {
        Driver::new()
    }
}

impl super::Driver for Driver {
    fn monitor_events(&self, events_tx: Sender<Request>) -> JoinHandle<io::Result<()>> {
        tokio::task::spawn_blocking(move || {
            let span = span!(Level::INFO, "keyboard driver");
            let _enter = span.enter();

            info!("Keyboard driver started.");

            while Self::monitor_io(&events_tx, io::stdin().lock(), io::stdout())? {}
            Ok(())
        })
    }
}
