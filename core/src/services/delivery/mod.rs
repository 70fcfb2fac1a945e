//! Delivery port: the send contract every channel adapter implements

mod mock;
mod traits;

pub use mock::{RecordingDeliveryPort, SentMessage};
pub use traits::{DeliveryPort, DeliveryRegistry, OtpMessage};
