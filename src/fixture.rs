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

//! The fixture: four channels, the running effect and the locking that keeps command
//! callers, effect timers and teardown apart.
//!
//! Locking: `ops` guards the backend against teardown and is always taken first. Any
//! path that touches the backend holds it. `update_lock` serializes pushes into the
//! backend and is only ever taken while `ops` is held. `state` is innermost and is
//! never held while waiting on either of the others. Long waits (draining a stopped
//! effect, the rainbow settle) happen with no lock held.

use std::{
    sync::{Arc, Weak},
    thread,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::{
    backend::Backend,
    channel::{Channel, ChannelKind, ChannelProperties, Color, CHANNEL_COUNT},
    effect::{self, timer::EffectTimer, Effect, EffectKind, PulseArg, Timing, INITIAL_ARM},
    error::{Error, Result},
    html,
};


/// Options that shape a fixture's behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    /// Effect timing.
    pub timing: Timing,
    /// Whether suspend and resume darken and restore the outputs.
    pub suspend_resume: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            timing: Timing::default(),
            suspend_resume: true,
        }
    }
}

/// The brightness snapshot taken when an effect starts.
#[derive(Debug, Clone, Copy)]
struct Saved {
    kind: EffectKind,
    values: [u32; CHANNEL_COUNT],
}

struct State {
    channels: [Channel; CHANNEL_COUNT],
    effect: Effect,
    /// Present from an effect's start until its stop has restored the values.
    saved: Option<Saved>,
    /// Bumped on every effect start so a stale timer can recognize itself.
    generation: u64,
}

impl State {
    /// The effect that blocks other commands: the running one, or the one whose stop is
    /// still draining.
    fn busy(&self) -> Option<EffectKind> {
        self.effect.kind().or(self.saved.map(|saved| saved.kind))
    }

    fn brightness(&self) -> [u32; CHANNEL_COUNT] {
        self.channels.map(|channel| channel.brightness())
    }
}

struct Shared {
    name: String,
    options: Options,
    /// The ops lock. `None` once the fixture has been destroyed.
    ops: Mutex<Option<Arc<dyn Backend>>>,
    update_lock: Mutex<()>,
    state: RwLock<State>,
    timer: Mutex<Option<EffectTimer>>,
    listeners: Mutex<Vec<Sender<[u32; CHANNEL_COUNT]>>>,
}

/// An RGB+W fixture.
pub struct Fixture {
    shared: Arc<Shared>,
}

impl Fixture {
    /// Creates a fixture with the given channel properties (ordered red, green, blue,
    /// white) and pushes the initial state to the backend.
    pub fn new(
        name: &str,
        props: [ChannelProperties; CHANNEL_COUNT],
        backend: Arc<dyn Backend>,
        options: Options,
    ) -> Result<Fixture> {
        debug!(fixture = name, "Registering fixture");

        let mut channels = Vec::with_capacity(CHANNEL_COUNT);
        for (color, props) in Color::ALL.into_iter().zip(props) {
            if props.max_brightness == 0 {
                return Err(Error::InvalidValue(format!(
                    "{}: maximum brightness of {} must be at least 1",
                    name, color
                )));
            }
            let kind = match props.kind {
                Some(kind) => {
                    if kind != backend.kind(color) {
                        warn!(
                            fixture = name,
                            %color,
                            configured = %kind,
                            backend = %backend.kind(color),
                            "Channel kind does not match the backend"
                        );
                    }
                    kind
                }
                None => {
                    warn!(fixture = name, %color, "Invalid rgbw type, using the backend's kind");
                    backend.kind(color)
                }
            };
            if props.brightness > props.max_brightness {
                warn!(
                    fixture = name,
                    %color,
                    brightness = props.brightness,
                    max_brightness = props.max_brightness,
                    "Initial brightness exceeds maximum, clamping"
                );
            }
            channels.push(Channel::new(props.brightness, props.max_brightness, kind));
        }
        let channels: [Channel; CHANNEL_COUNT] = channels
            .try_into()
            .map_err(|_| Error::InvalidValue("expected four channels".to_string()))?;

        let shared = Arc::new(Shared {
            name: name.to_string(),
            options,
            ops: Mutex::new(Some(backend)),
            update_lock: Mutex::new(()),
            state: RwLock::new(State {
                channels,
                effect: Effect::None,
                saved: None,
                generation: 0,
            }),
            timer: Mutex::new(None),
            listeners: Mutex::new(Vec::new()),
        });

        {
            let ops = shared.ops.lock();
            if let Some(backend) = ops.as_ref() {
                if let Err(e) = shared.update(backend.as_ref()) {
                    warn!(fixture = name, err = %e, "Unable to push initial state");
                }
            }
        }

        info!(fixture = name, "Fixture registered.");
        Ok(Fixture { shared })
    }

    /// Gets the fixture name.
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Gets the brightness of a channel.
    pub fn get_channel(&self, color: Color) -> u32 {
        self.shared.state.read().channels[color.index()].brightness()
    }

    /// Gets the brightness of all channels.
    pub fn brightness(&self) -> [u32; CHANNEL_COUNT] {
        self.shared.state.read().brightness()
    }

    /// Gets the brightness of all channels as `#rrggbbww`.
    pub fn get_html(&self) -> String {
        html::format(&self.brightness())
    }

    /// Gets the kind of every channel.
    pub fn get_types(&self) -> [ChannelKind; CHANNEL_COUNT] {
        self.shared.state.read().channels.map(|channel| channel.kind())
    }

    /// Gets the maximum brightness of every channel.
    pub fn get_max(&self) -> [u32; CHANNEL_COUNT] {
        self.shared
            .state
            .read()
            .channels
            .map(|channel| channel.max_brightness())
    }

    /// Gets the running effect.
    pub fn effect(&self) -> Effect {
        self.shared.state.read().effect
    }

    /// Gets the kind of the running effect, if any.
    pub fn active_effect(&self) -> Option<EffectKind> {
        self.shared.state.read().effect.kind()
    }

    /// Gets the brightness snapshot of the running effect, if any.
    pub fn saved(&self) -> Option<[u32; CHANNEL_COUNT]> {
        self.shared.state.read().saved.map(|saved| saved.values)
    }

    /// Returns true if the outputs are suspended.
    pub fn is_suspended(&self) -> bool {
        self.shared
            .state
            .read()
            .channels
            .iter()
            .any(|channel| channel.is_suspended())
    }

    /// Returns true if the fixture has been destroyed.
    pub fn is_destroyed(&self) -> bool {
        self.shared.ops.lock().is_none()
    }

    /// Subscribes to change events. Each accepted command sends the resulting
    /// brightness of all channels.
    pub fn subscribe(&self) -> Receiver<[u32; CHANNEL_COUNT]> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.shared.listeners.lock().push(tx);
        rx
    }

    /// Sets the brightness of a single channel. Refused while an effect is running.
    pub fn set_channel(&self, color: Color, brightness: u32) -> Result<()> {
        let shared = &self.shared;
        let ops = shared.ops.lock();
        {
            if ops.is_none() {
                return Err(Error::BackendAbsent);
            }
            let mut state = shared.state.write();
            shared.refuse_if_busy(&state)?;
            state.channels[color.index()].set_brightness(brightness)?;
            debug!(fixture = shared.name.as_str(), %color, brightness, "Set brightness");
        }
        let result = shared.update_with(&ops);
        drop(ops);

        shared.notify();
        result
    }

    /// Sets the channels from an HTML color code, `#RRGGBB` or `#RRGGBBWW`. White is left
    /// unchanged by the short form. Refused while an effect is running.
    pub fn set_html(&self, code: &str) -> Result<()> {
        let shared = &self.shared;
        let color = html::parse(code)?;

        let ops = shared.ops.lock();
        if ops.is_none() {
            return Err(Error::BackendAbsent);
        }
        {
            let mut state = shared.state.write();
            shared.refuse_if_busy(&state)?;

            let values = color.channels(state.channels[Color::White.index()].brightness());
            for (channel, value) in state.channels.iter().zip(values) {
                if value > channel.max_brightness() {
                    return Err(Error::InvalidValue(format!(
                        "{} exceeds maximum brightness {}",
                        value,
                        channel.max_brightness()
                    )));
                }
            }
            for (color, (channel, value)) in
                Color::ALL.into_iter().zip(state.channels.iter_mut().zip(values))
            {
                debug!(
                    fixture = shared.name.as_str(),
                    %color,
                    brightness = value,
                    "Set brightness"
                );
                channel.set_brightness_saturating(value);
            }
        }
        let result = shared.update_with(&ops);
        drop(ops);

        shared.notify();
        result
    }

    /// Starts pulsing a single color.
    pub fn start_pulse(&self, color: Color) -> Result<()> {
        self.start_effect(Effect::Pulse { color })
    }

    pub fn start_blink(&self) -> Result<()> {
        self.start_effect(Effect::Blink { phase: 0 })
    }

    pub fn start_heartbeat(&self) -> Result<()> {
        self.start_effect(Effect::Heartbeat { phase: 0 })
    }

    pub fn start_rainbow(&self) -> Result<()> {
        self.start_effect(Effect::Rainbow { phase: 0 })
    }

    /// Applies a pulse control argument: a color starts pulsing, `stop` stops it.
    pub fn pulse(&self, arg: PulseArg) -> Result<()> {
        match arg {
            PulseArg::Start(color) => self.start_pulse(color),
            PulseArg::Stop => self.stop_effect_kind(EffectKind::Pulse),
        }
    }

    /// Turns blink, heartbeat or rainbow on or off.
    pub fn toggle(&self, kind: EffectKind, on: bool) -> Result<()> {
        match (kind, on) {
            (_, false) => self.stop_effect_kind(kind),
            (EffectKind::Pulse, true) => Err(Error::InvalidFormat(
                "pulse needs a color to start".to_string(),
            )),
            (kind, true) => self.start_effect(Effect::start(kind, Color::Red)),
        }
    }

    /// Starts an effect. Refused if any effect is already running. The current
    /// brightness is saved and restored when the effect stops.
    pub fn start_effect(&self, effect: Effect) -> Result<()> {
        let Some(kind) = effect.kind() else {
            return self.stop_effect();
        };
        let shared = &self.shared;

        let ops = shared.ops.lock();
        let Some(backend) = ops.as_ref() else {
            return Err(Error::BackendAbsent);
        };

        let generation = {
            let mut guard = shared.state.write();
            let state = &mut *guard;
            shared.refuse_if_busy(state)?;

            state.saved = Some(Saved {
                kind,
                values: state.brightness(),
            });
            state.effect = effect;
            state.generation += 1;
            effect::enter(&state.effect, &mut state.channels);
            state.generation
        };
        info!(fixture = shared.name.as_str(), effect = %kind, "Effect started.");

        let result = shared.update(backend.as_ref());

        // Armed while ops is held so a concurrent stop always finds this timer.
        let weak = Arc::downgrade(&self.shared);
        let timer = EffectTimer::spawn(kind, INITIAL_ARM, move || {
            Shared::tick(&weak, kind, generation)
        });
        let stale = match timer {
            Ok(timer) => shared.timer.lock().replace(timer),
            Err(e) => {
                error!(err = %e, effect = %kind, "Unable to start effect timer");
                {
                    let mut state = shared.state.write();
                    state.effect = Effect::None;
                    if let Some(saved) = state.saved.take() {
                        for (channel, value) in state.channels.iter_mut().zip(saved.values) {
                            channel.set_brightness_saturating(value);
                            channel.cntr = 0;
                        }
                    }
                }
                let _ = shared.update(backend.as_ref());
                return Err(Error::Io(e));
            }
        };
        drop(ops);

        // A stale timer belongs to an effect that is already cleared, so it exits on
        // its next wake.
        if let Some(stale) = stale {
            stale.stop();
        }

        if kind == EffectKind::Rainbow {
            shared.settle();
        }

        shared.notify();
        result
    }

    /// Stops the running effect, if any, and restores the brightness saved when it
    /// started. Stopping with no effect running does nothing.
    pub fn stop_effect(&self) -> Result<()> {
        self.stop(None)
    }

    /// Stops the given effect. Refused if a different effect is running.
    pub fn stop_effect_kind(&self, kind: EffectKind) -> Result<()> {
        self.stop(Some(kind))
    }

    fn stop(&self, kind: Option<EffectKind>) -> Result<()> {
        let shared = &self.shared;

        let stopped = {
            let mut state = shared.state.write();
            match state.effect.kind() {
                // Either nothing runs, or another caller's stop is already draining.
                None => return Ok(()),
                Some(active) if kind.is_some_and(|kind| kind != active) => {
                    info!(
                        fixture = shared.name.as_str(),
                        effect = %active,
                        "{} is currently active, stop it first...",
                        active
                    );
                    return Err(Error::EffectActive(active));
                }
                Some(active) => {
                    state.effect = Effect::None;
                    active
                }
            }
        };

        // Wait for the last tick to drain. No lock is held here.
        let timer = shared.timer.lock().take();
        if let Some(timer) = timer {
            timer.stop();
        }

        let ops = shared.ops.lock();
        {
            let mut state = shared.state.write();
            if let Some(saved) = state.saved.take() {
                for (channel, value) in state.channels.iter_mut().zip(saved.values) {
                    channel.set_brightness_saturating(value);
                    channel.cntr = 0;
                }
            }
        }
        info!(fixture = shared.name.as_str(), effect = %stopped, "Effect stopped.");

        let result = shared.update_with(&ops);
        drop(ops);

        if stopped == EffectKind::Rainbow {
            shared.settle();
        }

        shared.notify();
        result
    }

    /// Darkens every output without forgetting the channel state.
    pub fn suspend(&self) -> Result<()> {
        self.set_suspended(true)
    }

    /// Restores the outputs after a suspend.
    pub fn resume(&self) -> Result<()> {
        self.set_suspended(false)
    }

    fn set_suspended(&self, suspended: bool) -> Result<()> {
        let shared = &self.shared;
        let ops = shared.ops.lock();
        if ops.is_none() {
            return Err(Error::BackendAbsent);
        }
        if !shared.options.suspend_resume {
            debug!(fixture = shared.name.as_str(), "Suspend/resume is disabled");
            return Ok(());
        }

        {
            let mut state = shared.state.write();
            for channel in state.channels.iter_mut() {
                channel.set_suspended(suspended);
            }
        }
        info!(fixture = shared.name.as_str(), suspended, "Suspend state changed.");
        shared.update_with(&ops)
    }

    /// Detaches the backend and stops any running effect. After this returns the
    /// backend sees no further writes. Calling it again does nothing.
    pub fn destroy(&self) {
        let shared = &self.shared;
        let detached = shared.ops.lock().take().is_some();

        {
            let mut state = shared.state.write();
            state.effect = Effect::None;
            // Nothing is pushed any more, but the getters report the pre-effect values.
            if let Some(saved) = state.saved.take() {
                for (channel, value) in state.channels.iter_mut().zip(saved.values) {
                    channel.set_brightness_saturating(value);
                    channel.cntr = 0;
                }
            }
        }
        let timer = shared.timer.lock().take();
        if let Some(timer) = timer {
            timer.stop();
        }
        shared.listeners.lock().clear();

        if detached {
            info!(fixture = shared.name.as_str(), "Fixture unregistered.");
        }
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl Shared {
    /// Refuses a command while an effect is running or draining.
    fn refuse_if_busy(&self, state: &State) -> Result<()> {
        match state.busy() {
            Some(active) => {
                info!(
                    fixture = self.name.as_str(),
                    effect = %active,
                    "{} is currently active, stop it first...",
                    active
                );
                Err(Error::EffectActive(active))
            }
            None => Ok(()),
        }
    }

    /// Pushes the channel state to the backend if it is still present. Must be called
    /// with the ops guard.
    fn update_with(&self, ops: &Option<Arc<dyn Backend>>) -> Result<()> {
        match ops.as_ref() {
            Some(backend) => self.update(backend.as_ref()),
            None => Err(Error::BackendAbsent),
        }
    }

    /// Pushes every channel to the backend in channel order. A suspended channel is
    /// pushed as off. Failures are logged, the remaining channels are still pushed and
    /// the first failure is returned.
    fn update(&self, backend: &dyn Backend) -> Result<()> {
        let _update = self.update_lock.lock();
        let channels = self.state.read().channels;

        let mut result = Ok(());
        for (color, channel) in Color::ALL.into_iter().zip(channels) {
            if let Err(e) =
                backend.apply(color, channel.output_brightness(), channel.max_brightness())
            {
                error!(
                    fixture = self.name.as_str(),
                    %color,
                    err = %e,
                    "Error applying brightness"
                );
                if result.is_ok() {
                    result = Err(Error::Io(e));
                }
            }
        }
        result
    }

    /// One effect tick. Returns the delay until the next tick, or `None` if the effect
    /// has been stopped, replaced, or the backend is gone.
    fn tick(weak: &Weak<Shared>, kind: EffectKind, generation: u64) -> Option<Duration> {
        let shared = weak.upgrade()?;
        let ops = shared.ops.lock();
        let backend = ops.as_ref()?;

        let current = |state: &State| {
            state.generation == generation && state.effect.kind() == Some(kind)
        };

        let next = {
            let mut guard = shared.state.write();
            let state = &mut *guard;
            if !current(state) {
                return None;
            }
            let saved = state
                .saved
                .map(|saved| saved.values)
                .unwrap_or_else(|| state.brightness());
            effect::advance(
                &mut state.effect,
                &mut state.channels,
                &saved,
                &shared.options.timing,
            )?
        };

        if let Err(e) = shared.update(backend.as_ref()) {
            warn!(effect = %kind, err = %e, "Effect tick could not update outputs");
        }

        let rearm = current(&shared.state.read());
        rearm.then_some(next)
    }

    /// Lets a rainbow change land, then pushes the state once more.
    fn settle(&self) {
        thread::sleep(self.options.timing.settle());
        let ops = self.ops.lock();
        if let Some(backend) = ops.as_ref() {
            if let Err(e) = self.update(backend.as_ref()) {
                warn!(err = %e, "Unable to push settled state");
            }
        }
    }

    /// Sends the current brightness to every subscriber, dropping closed ones.
    fn notify(&self) {
        let values = self.state.read().brightness();
        self.listeners
            .lock()
            .retain(|listener| listener.send(values).is_ok());
    }
}
