pub mod balboa;
pub mod cloud;
pub mod config;
pub mod poll;
pub mod status;

pub use balboa::{decode, decode_base64, StatusSnapshot};
pub use config::SpaConfiguration;
pub use poll::{carried_temperature, PollInterval, Poller};
pub use status::{DeviceEvent, StatusModel};
