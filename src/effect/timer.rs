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
use std::{
    io,
    sync::Arc,
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, span, warn, Level};

use super::EffectKind;

/// Represents the current wake state.
#[derive(PartialEq)]
enum WakeState {
    Armed,
    Stopped,
}

/// Lets the owner of a timer thread interrupt its sleep.
#[derive(Clone)]
struct Waker {
    state: Arc<Mutex<WakeState>>,
    condvar: Arc<Condvar>,
}

impl Waker {
    fn new() -> Waker {
        Waker {
            state: Arc::new(Mutex::new(WakeState::Armed)),
            condvar: Arc::new(Condvar::new()),
        }
    }

    /// Sleeps for the given delay. Returns true if the timer was stopped instead.
    fn sleep(&self, delay: Duration) -> bool {
        let deadline = Instant::now() + delay;
        let mut state = self.state.lock();
        while *state == WakeState::Armed {
            if self.condvar.wait_until(&mut state, deadline).timed_out() {
                break;
            }
        }
        *state == WakeState::Stopped
    }

    fn stop(&self) {
        let mut state = self.state.lock();
        if *state == WakeState::Armed {
            *state = WakeState::Stopped;
            self.condvar.notify_all();
        }
    }
}

/// A thread that runs an effect's tick handler until it declines to re-arm or the
/// timer is stopped. The tick returns the delay until the next tick, or `None` to exit.
pub(crate) struct EffectTimer {
    kind: EffectKind,
    waker: Waker,
    handle: JoinHandle<()>,
}

impl EffectTimer {
    /// Arms the timer. The first tick fires after `first`.
    pub(crate) fn spawn<F>(
        kind: EffectKind,
        first: Duration,
        mut tick: F,
    ) -> io::Result<EffectTimer>
    where
        F: FnMut() -> Option<Duration> + Send + 'static,
    {
        let waker = Waker::new();
        let handle = {
            let waker = waker.clone();
            thread::Builder::new()
                .name(format!("rgbw-{}", kind))
                .spawn(move || {
                    let span = span!(Level::INFO, "effect timer", effect = kind.name());
                    let _enter = span.enter();

                    let mut delay = first;
                    let mut ticks: u64 = 0;
                    while !waker.sleep(delay) {
                        match tick() {
                            Some(next) => delay = next,
                            None => break,
                        }
                        ticks += 1;
                    }
                    debug!(ticks, "Effect timer exited.");
                })?
        };

        Ok(EffectTimer {
            kind,
            waker,
            handle,
        })
    }

    /// Interrupts any pending sleep and waits for the thread to exit. A tick that is
    /// already running completes first.
    pub(crate) fn stop(self) {
        self.waker.stop();
        if self.handle.join().is_err() {
            warn!(effect = self.kind.name(), "Effect timer thread panicked");
        }
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
