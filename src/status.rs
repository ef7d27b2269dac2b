use std::fmt;

use serde::Serialize;

use crate::{
    balboa::{Accessory, CommandError, PumpState, StatusSnapshot, TemperatureScale},
    config::SpaConfiguration,
};

/// A logical device exposed to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub enum Device {
    // The spa itself, presented as a thermostat
    Spa,
    Accessory(Accessory),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Spa => write!(f, "spa"),
            Device::Accessory(accessory) => write!(f, "{}", accessory),
        }
    }
}

impl From<Device> for String {
    fn from(device: Device) -> Self {
        device.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventValue {
    Number(f64),
    Text(String),
    Bool(bool),
}

/// One attribute update for one device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEvent {
    pub device: Device,
    pub name: &'static str,
    pub value: EventValue,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<TemperatureScale>,
}

impl DeviceEvent {
    fn new(device: Device, name: &'static str, value: EventValue) -> Self {
        Self {
            device,
            name,
            value,
            unit: None,
        }
    }

    fn text(device: Device, name: &'static str, value: impl ToString) -> Self {
        Self::new(device, name, EventValue::Text(value.to_string()))
    }

    fn switch(accessory: Accessory, on: bool) -> Self {
        Self::text(Device::Accessory(accessory), "switch", if on { "on" } else { "off" })
    }

    fn temperature(name: &'static str, value: f64, scale: TemperatureScale) -> Self {
        Self {
            unit: Some(scale),
            ..Self::new(Device::Spa, name, EventValue::Number(value))
        }
    }
}

/// Maps snapshots to the events of the devices a spa has installed
#[derive(Debug, Clone)]
pub struct StatusModel {
    config: SpaConfiguration,
}

impl StatusModel {
    pub fn new(config: SpaConfiguration) -> Self {
        Self { config }
    }

    pub fn devices(&self) -> impl Iterator<Item = Device> + '_ {
        std::iter::once(Device::Spa).chain(self.config.installed().map(Device::Accessory))
    }

    /// Every field is emitted on every call, whether it changed or not
    pub fn events(&self, snapshot: &StatusSnapshot) -> Vec<DeviceEvent> {
        let mut events = self.spa_events(snapshot);
        for accessory in self.config.installed() {
            events.extend(accessory_events(accessory, snapshot));
        }
        events
    }

    fn spa_events(&self, snapshot: &StatusSnapshot) -> Vec<DeviceEvent> {
        let scale = snapshot.temperature_scale;
        let spa = Device::Spa;

        let mut events = Vec::with_capacity(10);
        if let Some(actual) = snapshot.actual_temperature {
            events.push(DeviceEvent::temperature("temperature", actual, scale));
        }
        events.push(DeviceEvent::temperature(
            "heatingSetpoint",
            snapshot.target_temperature,
            scale,
        ));
        events.push(DeviceEvent::text(
            spa,
            "thermostatOperatingState",
            if snapshot.is_heating { "heating" } else { "idle" },
        ));
        events.push(DeviceEvent::text(spa, "heatMode", snapshot.heat_mode));
        events.push(DeviceEvent::text(
            spa,
            "temperatureRange",
            snapshot.heating_intensity,
        ));
        events.push(DeviceEvent::text(spa, "filterMode", snapshot.filter_mode));
        events.push(DeviceEvent::text(
            spa,
            "accessibilityType",
            snapshot.accessibility_type,
        ));
        events.push(DeviceEvent::text(spa, "wifiState", snapshot.wifi_state));
        events.push(DeviceEvent::text(
            spa,
            "pumpStatus",
            snapshot.pump_state_status,
        ));
        events.push(DeviceEvent::text(spa, "time", snapshot.formatted_time()));
        events
    }
}

fn accessory_events(accessory: Accessory, snapshot: &StatusSnapshot) -> Vec<DeviceEvent> {
    let pump = |n: usize| {
        let state = snapshot.pump(n).unwrap_or(PumpState::Off);
        vec![
            DeviceEvent::switch(accessory, state != PumpState::Off),
            DeviceEvent::text(Device::Accessory(accessory), "speed", state),
        ]
    };
    let switch = |on: Option<bool>| vec![DeviceEvent::switch(accessory, on.unwrap_or(false))];

    match accessory {
        Accessory::Pump1 => pump(1),
        Accessory::Pump2 => pump(2),
        Accessory::Pump3 => pump(3),
        Accessory::Pump4 => pump(4),
        Accessory::Pump5 => pump(5),
        Accessory::Pump6 => pump(6),
        Accessory::Light1 => switch(snapshot.light(1)),
        Accessory::Light2 => switch(snapshot.light(2)),
        Accessory::Mister => switch(Some(snapshot.mister)),
        Accessory::Aux1 => switch(snapshot.aux(1)),
        Accessory::Aux2 => switch(snapshot.aux(2)),
        // Blower state is decoded but no device consumes it yet
        Accessory::Blower => Vec::new(),
    }
}

/// Converts a display setpoint to the value the panel expects (half degrees for Celsius)
pub fn setpoint_raw(display: f64, scale: TemperatureScale) -> Result<u8, CommandError> {
    let raw = match scale {
        TemperatureScale::Celsius => display * 2.0,
        TemperatureScale::Fahrenheit => display,
    }
    .round();

    // 255 is reserved for "unknown"
    if !raw.is_finite() || !(0.0..=254.0).contains(&raw) {
        return Err(CommandError::TemperatureOutOfRange(display));
    }
    Ok(raw as u8)
}
