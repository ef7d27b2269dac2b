use super::{
    AccessibilityType, BlowerState, FilterMode, HeatMode, HeatingIntensity, PumpState,
    PumpStateStatus, StatusSnapshot, TemperatureScale, WifiState,
};
use bitfield::bitfield;
use bytes::Bytes;
use thiserror::Error;

/// Shortest PanelUpdate frame that covers every field we read (offsets 0 through 26)
pub const MIN_FRAME_LEN: usize = 27;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("panel frame too short: got {0} bytes, need at least 27")]
    TooShort(usize),

    #[error("panel frame is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
}

bitfield! {
    // Byte 13
    pub struct DisplayFlags(u8);
    impl Debug;
    pub celsius, _ : 0;
    pub clock_24h, _ : 1;
    pub u8, filter_raw, _ : 3, 2;
    pub u8, accessibility_raw, _ : 5, 4;
}

bitfield! {
    // Byte 14
    pub struct HeaterFlags(u8);
    impl Debug;
    pub high_range, _ : 2;
    pub u8, heating_raw, _ : 5, 4;
}

bitfield! {
    // Byte 15
    pub struct PumpBank(u8);
    impl Debug;
    pub u8, pump1_raw, _ : 1, 0;
    pub u8, pump2_raw, _ : 3, 2;
    pub u8, pump3_raw, _ : 5, 4;
    pub u8, pump4_raw, _ : 7, 6;
}

bitfield! {
    // Byte 16
    pub struct PumpWifi(u8);
    impl Debug;
    pub u8, pump5_raw, _ : 1, 0;
    pub u8, pump6_raw, _ : 3, 2;
    pub u8, wifi_raw, _ : 7, 4;
}

bitfield! {
    // Byte 17
    pub struct BlowerFlags(u8);
    impl Debug;
    pub u8, blower_raw, _ : 3, 2;
}

bitfield! {
    // Byte 18
    pub struct LightFlags(u8);
    impl Debug;
    pub u8, light1_raw, _ : 1, 0;
    pub u8, light2_raw, _ : 3, 2;
}

bitfield! {
    // Byte 19
    pub struct ExtraFlags(u8);
    impl Debug;
    pub mister, _ : 0;
    pub aux1, _ : 3;
    pub aux2, _ : 4;
}

/// A PanelUpdate frame whose length has already been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelFrame(Bytes);

impl PanelFrame {
    const ACTUAL_TEMP: usize = 6;
    const HOUR: usize = 7;
    const MINUTE: usize = 8;
    const HEAT_MODE: usize = 9;
    const DISPLAY: usize = 13;
    const HEATER: usize = 14;
    const PUMPS: usize = 15;
    const PUMPS_WIFI: usize = 16;
    const BLOWER: usize = 17;
    const LIGHTS: usize = 18;
    const EXTRAS: usize = 19;
    const TARGET_TEMP: usize = 24;

    // Reported when the panel hasn't measured the water yet
    const TEMP_UNKNOWN: u8 = 255;

    // Heat modes
    const HEAT_READY: u8 = 0;
    const HEAT_REST: u8 = 1;
    const HEAT_READY_IN_REST: u8 = 2;

    // Filter cycles (byte 13, bits 3..2)
    const FILTER_1: u8 = 0b01;
    const FILTER_2: u8 = 0b10;
    const FILTER_BOTH: u8 = 0b11;

    // Panel lockout (byte 13, bits 5..4)
    const ACCESS_PUMP_LIGHT: u8 = 0b01;
    const ACCESS_NONE: u8 = 0b10;
    const ACCESS_NONE_ALT: u8 = 0b11;

    // Two-bit pump codes
    const PUMP_LOW: u8 = 0b01;
    const PUMP_HIGH: u8 = 0b10;

    // Blower (byte 17, bits 3..2)
    const BLOWER_LOW: u8 = 0b01;
    const BLOWER_MEDIUM: u8 = 0b10;
    const BLOWER_HIGH: u8 = 0b11;

    // Wifi module (byte 16, bits 7..4)
    const WIFI_OK: u8 = 0;
    const WIFI_NOT_COMMUNICATING: u8 = 1;
    const WIFI_STARTUP: u8 = 2;
    const WIFI_PRIME: u8 = 3;
    const WIFI_HOLD: u8 = 4;
    const WIFI_PANEL: u8 = 5;

    pub fn new(raw: impl Into<Bytes>) -> Result<Self, FrameError> {
        let raw = raw.into();
        if raw.len() < MIN_FRAME_LEN {
            return Err(FrameError::TooShort(raw.len()));
        }
        Ok(Self(raw))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    fn byte(&self, offset: usize) -> u8 {
        // Every offset we read is below MIN_FRAME_LEN, which `new` checked
        self.0[offset]
    }

    pub fn display(&self) -> DisplayFlags {
        DisplayFlags(self.byte(Self::DISPLAY))
    }

    pub fn heater(&self) -> HeaterFlags {
        HeaterFlags(self.byte(Self::HEATER))
    }

    pub fn pump_bank(&self) -> PumpBank {
        PumpBank(self.byte(Self::PUMPS))
    }

    pub fn pump_wifi(&self) -> PumpWifi {
        PumpWifi(self.byte(Self::PUMPS_WIFI))
    }

    pub fn blower_flags(&self) -> BlowerFlags {
        BlowerFlags(self.byte(Self::BLOWER))
    }

    pub fn light_flags(&self) -> LightFlags {
        LightFlags(self.byte(Self::LIGHTS))
    }

    pub fn extra_flags(&self) -> ExtraFlags {
        ExtraFlags(self.byte(Self::EXTRAS))
    }

    pub fn temperature_scale(&self) -> TemperatureScale {
        if self.display().celsius() {
            TemperatureScale::Celsius
        } else {
            TemperatureScale::Fahrenheit
        }
    }

    pub fn heat_mode(&self) -> HeatMode {
        match self.byte(Self::HEAT_MODE) {
            Self::HEAT_READY => HeatMode::Ready,
            Self::HEAT_REST => HeatMode::Rest,
            Self::HEAT_READY_IN_REST => HeatMode::ReadyInRest,
            _ => HeatMode::None,
        }
    }

    pub fn filter_mode(&self) -> FilterMode {
        match self.display().filter_raw() {
            Self::FILTER_1 => FilterMode::Filter1,
            Self::FILTER_2 => FilterMode::Filter2,
            Self::FILTER_BOTH => FilterMode::Filter1And2,
            _ => FilterMode::Off,
        }
    }

    pub fn accessibility_type(&self) -> AccessibilityType {
        match self.display().accessibility_raw() {
            Self::ACCESS_PUMP_LIGHT => AccessibilityType::PumpLight,
            Self::ACCESS_NONE | Self::ACCESS_NONE_ALT => AccessibilityType::None,
            _ => AccessibilityType::All,
        }
    }

    pub fn heating_intensity(&self) -> HeatingIntensity {
        if self.heater().high_range() {
            HeatingIntensity::High
        } else {
            HeatingIntensity::Low
        }
    }

    pub fn is_heating(&self) -> bool {
        self.heater().heating_raw() != 0
    }

    pub fn pumps(&self) -> [PumpState; 6] {
        let bank = self.pump_bank();
        let rest = self.pump_wifi();
        [
            bank.pump1_raw(),
            bank.pump2_raw(),
            bank.pump3_raw(),
            bank.pump4_raw(),
            rest.pump5_raw(),
            rest.pump6_raw(),
        ]
        .map(pump_state)
    }

    pub fn blower(&self) -> BlowerState {
        match self.blower_flags().blower_raw() {
            Self::BLOWER_LOW => BlowerState::Low,
            Self::BLOWER_MEDIUM => BlowerState::Medium,
            Self::BLOWER_HIGH => BlowerState::High,
            _ => BlowerState::Off,
        }
    }

    pub fn wifi_state(&self) -> WifiState {
        match self.pump_wifi().wifi_raw() {
            Self::WIFI_OK => WifiState::Ok,
            Self::WIFI_NOT_COMMUNICATING => WifiState::SpaNotCommunicating,
            Self::WIFI_STARTUP => WifiState::Startup,
            Self::WIFI_PRIME => WifiState::Prime,
            Self::WIFI_HOLD => WifiState::Hold,
            Self::WIFI_PANEL => WifiState::Panel,
            _ => WifiState::Unknown,
        }
    }

    // Compares whole bytes 15 and 16, so a non-OK wifi state also counts as pump activity
    pub fn pump_state_status(&self) -> PumpStateStatus {
        let idle = self.byte(Self::PUMPS) == 0
            && self.byte(Self::PUMPS_WIFI) == 0
            && self.blower_flags().blower_raw() == 0;

        if self.is_heating() {
            PumpStateStatus::LowHeat
        } else if idle {
            PumpStateStatus::Off
        } else {
            PumpStateStatus::Low
        }
    }

    /// Decodes the frame. `previous_actual_temperature` (in the frame's own scale) stands in
    /// for the water temperature when the panel reports it as unknown.
    pub fn decode(&self, previous_actual_temperature: Option<f64>) -> StatusSnapshot {
        let scale = self.temperature_scale();

        // Celsius values travel in half degrees
        let to_display = |raw: f64| match scale {
            TemperatureScale::Celsius => raw / 2.0,
            TemperatureScale::Fahrenheit => raw,
        };
        let to_raw = |display: f64| match scale {
            TemperatureScale::Celsius => display * 2.0,
            TemperatureScale::Fahrenheit => display,
        };

        let actual_raw = match self.byte(Self::ACTUAL_TEMP) {
            Self::TEMP_UNKNOWN => previous_actual_temperature.map(to_raw),
            raw => Some(raw as f64),
        };

        let lights = self.light_flags();
        let extras = self.extra_flags();

        StatusSnapshot {
            temperature_scale: scale,
            actual_temperature: actual_raw.map(to_display),
            target_temperature: to_display(self.byte(Self::TARGET_TEMP) as f64),
            hour: self.byte(Self::HOUR),
            minute: self.byte(Self::MINUTE),
            is_24_hour_time: self.display().clock_24h(),
            heat_mode: self.heat_mode(),
            is_heating: self.is_heating(),
            heating_intensity: self.heating_intensity(),
            filter_mode: self.filter_mode(),
            accessibility_type: self.accessibility_type(),
            pumps: self.pumps(),
            blower: self.blower(),
            lights: [lights.light1_raw() != 0, lights.light2_raw() != 0],
            mister: extras.mister(),
            aux: [extras.aux1(), extras.aux2()],
            wifi_state: self.wifi_state(),
            pump_state_status: self.pump_state_status(),
        }
    }
}

fn pump_state(raw: u8) -> PumpState {
    match raw {
        PanelFrame::PUMP_LOW => PumpState::Low,
        PanelFrame::PUMP_HIGH => PumpState::High,
        _ => PumpState::Off,
    }
}

/// Decodes raw PanelUpdate bytes into a snapshot
pub fn decode(
    raw: &[u8],
    previous_actual_temperature: Option<f64>,
) -> Result<StatusSnapshot, FrameError> {
    let frame = PanelFrame::new(Bytes::copy_from_slice(raw))?;
    Ok(frame.decode(previous_actual_temperature))
}

/// Decodes the base64 text returned by the cloud API
pub fn decode_base64(
    text: &str,
    previous_actual_temperature: Option<f64>,
) -> Result<StatusSnapshot, FrameError> {
    let raw = base64::decode(text.trim())?;
    decode(&raw, previous_actual_temperature)
}
