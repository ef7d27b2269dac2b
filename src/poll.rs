use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    balboa::{Button, CommandEncoder, CommandError, FrameError, PanelFrame, StatusSnapshot},
    cloud::{Transport, TransportError},
    status::{setpoint_raw, DeviceEvent, StatusModel},
};

/// How often the spa is polled. The cloud API only refreshes PanelUpdate every so often, so
/// only a handful of intervals are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display, strum::EnumIter)]
pub enum PollInterval {
    #[strum(serialize = "1m")]
    OneMinute,
    #[strum(serialize = "5m")]
    FiveMinutes,
    #[strum(serialize = "10m")]
    TenMinutes,
    #[strum(serialize = "15m")]
    FifteenMinutes,
    #[strum(serialize = "30m")]
    ThirtyMinutes,
}

impl PollInterval {
    pub fn duration(self) -> Duration {
        let minutes = match self {
            PollInterval::OneMinute => 1,
            PollInterval::FiveMinutes => 5,
            PollInterval::TenMinutes => 10,
            PollInterval::FifteenMinutes => 15,
            PollInterval::ThirtyMinutes => 30,
        };
        Duration::from_secs(minutes * 60)
    }
}

impl Default for PollInterval {
    fn default() -> Self {
        PollInterval::FiveMinutes
    }
}

#[derive(Error, Debug)]
pub enum PollError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),

    #[error("command error: {0}")]
    Command(#[from] CommandError),
}

/// Temperature to stand in for an unknown reading in `frame`. A reading taken in another
/// scale is never carried.
pub fn carried_temperature(last: &StatusSnapshot, frame: &PanelFrame) -> Option<f64> {
    if last.temperature_scale != frame.temperature_scale() {
        return None;
    }
    last.actual_temperature
}

/// Host side of the integration: owns the last known snapshot, which supplies the
/// temperature carried over when the panel reports it as unknown.
pub struct Poller<T> {
    transport: T,
    model: StatusModel,
    encoder: Option<CommandEncoder>,
    last: Option<StatusSnapshot>,
}

impl<T: Transport<Error = TransportError>> Poller<T> {
    pub fn new(transport: T, model: StatusModel) -> Self {
        Self {
            transport,
            model,
            encoder: None,
            last: None,
        }
    }

    /// Last snapshot that decoded successfully
    pub fn last_snapshot(&self) -> Option<&StatusSnapshot> {
        self.last.as_ref()
    }

    fn encoder(&mut self) -> Result<CommandEncoder, TransportError> {
        if let Some(encoder) = &self.encoder {
            return Ok(encoder.clone());
        }
        let encoder = CommandEncoder::new(self.transport.device_id()?);
        self.encoder = Some(encoder.clone());
        Ok(encoder)
    }

    /// Fetches and decodes one frame. On failure the last snapshot is left untouched.
    pub fn poll(&mut self) -> Result<&StatusSnapshot, PollError> {
        let encoder = self.encoder()?;
        let raw = self.transport.fetch_frame(&encoder.panel_update())?;
        let frame = PanelFrame::new(raw)?;

        let previous = self
            .last
            .as_ref()
            .and_then(|last| carried_temperature(last, &frame));

        let snapshot = frame.decode(previous);
        debug!(?snapshot, "decoded panel update");
        Ok(&*self.last.insert(snapshot))
    }

    pub fn poll_events(&mut self) -> Result<Vec<DeviceEvent>, PollError> {
        self.poll()?;
        Ok(self
            .last
            .as_ref()
            .map(|snapshot| self.model.events(snapshot))
            .unwrap_or_default())
    }

    pub fn press(&mut self, button: Button) -> Result<(), PollError> {
        let encoder = self.encoder()?;
        info!(%button, id = button.id(), "pressing button");
        self.transport.send(&encoder.press(button))?;
        Ok(())
    }

    /// Sets the target temperature, given in the spa's display scale
    pub fn set_temperature(&mut self, setpoint: f64) -> Result<(), PollError> {
        let scale = match self.last.as_ref().map(|last| last.temperature_scale) {
            Some(scale) => scale,
            None => self.poll()?.temperature_scale,
        };
        let raw = setpoint_raw(setpoint, scale)?;

        let encoder = self.encoder()?;
        info!(setpoint, %scale, raw, "setting temperature");
        self.transport.send(&encoder.set_temperature(raw))?;
        Ok(())
    }

    /// Polls every `interval` until the transport runs out of input. Failed cycles are logged
    /// and skipped.
    pub fn run(
        &mut self,
        interval: Duration,
        mut on_events: impl FnMut(&[DeviceEvent]),
    ) -> Result<(), PollError> {
        loop {
            match self.poll_events() {
                Ok(events) => on_events(&events),
                Err(PollError::Transport(TransportError::EOF)) => return Ok(()),
                Err(err) => warn!(%err, "skipping poll cycle"),
            }
            std::thread::sleep(interval);
        }
    }
}
