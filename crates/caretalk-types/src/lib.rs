pub mod api;
pub mod models;

pub use models::{ChannelRecord, ChannelState, Device, MessageRecord, Platform, Role, UserRecord};
