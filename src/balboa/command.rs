use std::{fmt, str::FromStr};

use super::Accessory;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommandError {
    #[error("temperature {0} is out of range for the panel")]
    TemperatureOutOfRange(f64),

    #[error("unknown button: {0:?}")]
    UnknownButton(String),
}

/// A control that can be pressed through the `Button` request target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Accessory(Accessory),
    // Toggles between the low and high temperature ranges
    TempRange,
    // Toggles between Ready and Rest
    HeatMode,
}

impl Button {
    pub fn id(&self) -> u8 {
        match self {
            Button::Accessory(accessory) => match accessory {
                Accessory::Pump1 => 4,
                Accessory::Pump2 => 5,
                Accessory::Pump3 => 6,
                Accessory::Pump4 => 7,
                Accessory::Pump5 => 8,
                Accessory::Pump6 => 9,
                Accessory::Light1 => 17,
                Accessory::Light2 => 18,
                Accessory::Blower => 12,
                Accessory::Mister => 14,
                Accessory::Aux1 => 22,
                Accessory::Aux2 => 23,
            },
            Button::TempRange => 80,
            Button::HeatMode => 81,
        }
    }
}

impl From<Accessory> for Button {
    fn from(accessory: Accessory) -> Self {
        Button::Accessory(accessory)
    }
}

impl FromStr for Button {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "temp-range" => Button::TempRange,
            "heat-mode" => Button::HeatMode,
            other => Button::Accessory(
                Accessory::from_str(other).map_err(|_| CommandError::UnknownButton(other.into()))?,
            ),
        })
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Button::Accessory(accessory) => write!(f, "{}", accessory),
            Button::TempRange => write!(f, "temp-range"),
            Button::HeatMode => write!(f, "heat-mode"),
        }
    }
}

/// An XML request body ready to be posted to the cloud API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody(String);

impl RequestBody {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Builds request envelopes addressed to one spa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEncoder {
    device_id: String,
}

impl CommandEncoder {
    const TARGET_BUTTON: &'static str = "Button";
    const TARGET_SET_TEMP: &'static str = "SetTemp";
    const PANEL_UPDATE_FILE: &'static str = "PanelUpdate.txt";

    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
        }
    }

    pub fn button_press(&self, button_id: u8) -> RequestBody {
        self.device_request(Self::TARGET_BUTTON, &button_id.to_string())
    }

    pub fn press(&self, button: Button) -> RequestBody {
        self.button_press(button.id())
    }

    /// `raw` is in the panel's own units: half degrees for Celsius spas
    pub fn set_temperature(&self, raw: u8) -> RequestBody {
        self.device_request(Self::TARGET_SET_TEMP, &raw.to_string())
    }

    /// Requests the current PanelUpdate file, whose contents are a base64 frame
    pub fn panel_update(&self) -> RequestBody {
        RequestBody(format!(
            concat!(
                r#"<sci_request version="1.0"><file_system cache="false">"#,
                r#"<targets><device id="{}"/></targets>"#,
                r#"<commands><get_file path="{}"/></commands>"#,
                r#"</file_system></sci_request>"#,
            ),
            self.device_id,
            Self::PANEL_UPDATE_FILE
        ))
    }

    fn device_request(&self, target: &str, data: &str) -> RequestBody {
        RequestBody(format!(
            concat!(
                r#"<sci_request version="1.0"><data_service>"#,
                r#"<targets><device id="{}"/></targets>"#,
                r#"<requests><device_request target_name="{}">{}</device_request></requests>"#,
                r#"</data_service></sci_request>"#,
            ),
            self.device_id, target, data
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    const DEVICE: &str = "00000000-00000000-001527FF-FF09818B";

    #[test]
    fn test_button_ids() {
        let ids: Vec<u8> = Accessory::iter().map(|a| Button::from(a).id()).collect();
        assert_eq!(ids, vec![4, 5, 6, 7, 8, 9, 17, 18, 12, 14, 22, 23]);
        assert_eq!(Button::TempRange.id(), 80);
        assert_eq!(Button::HeatMode.id(), 81);
    }

    #[test]
    fn test_parse_button() {
        assert_eq!(
            "light2".parse::<Button>().unwrap(),
            Button::Accessory(Accessory::Light2)
        );
        assert_eq!("heat-mode".parse::<Button>().unwrap(), Button::HeatMode);
        assert_eq!(
            "jets".parse::<Button>(),
            Err(CommandError::UnknownButton("jets".into()))
        );

        for accessory in Accessory::iter() {
            let button = Button::from(accessory);
            assert_eq!(button.to_string().parse::<Button>().unwrap(), button);
        }
    }

    #[test]
    fn test_button_press() {
        let body = CommandEncoder::new(DEVICE).press(Accessory::Pump2.into());
        assert_eq!(
            body.as_str(),
            concat!(
                r#"<sci_request version="1.0"><data_service><targets>"#,
                r#"<device id="00000000-00000000-001527FF-FF09818B"/></targets>"#,
                r#"<requests><device_request target_name="Button">5</device_request></requests>"#,
                r#"</data_service></sci_request>"#
            )
        );
    }

    #[test]
    fn test_set_temperature() {
        let body = CommandEncoder::new("spa").set_temperature(80);
        assert_eq!(
            body.to_string(),
            r#"<sci_request version="1.0"><data_service><targets><device id="spa"/></targets><requests><device_request target_name="SetTemp">80</device_request></requests></data_service></sci_request>"#
        );
    }

    #[test]
    fn test_panel_update() {
        let body = CommandEncoder::new("spa").panel_update();
        assert_eq!(
            body.into_string(),
            r#"<sci_request version="1.0"><file_system cache="false"><targets><device id="spa"/></targets><commands><get_file path="PanelUpdate.txt"/></commands></file_system></sci_request>"#
        );
    }
}
