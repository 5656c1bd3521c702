pub mod channel;
pub mod error;
pub mod registry;

pub use channel::{Channel, ChannelRegistry};
pub use error::ChannelError;
pub use registry::{MemoryChannel, MemoryRegistry};
