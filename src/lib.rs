pub mod activation;
pub mod clock;
pub mod config;
pub mod error;
pub mod hairpin;
pub mod loss;
pub mod nfq_message;
pub mod pending_packet;
pub mod queue;
pub mod trace;

pub use activation::Activation;
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use error::{Error, Result};
pub use loss::DropPolicy;
pub use queue::{LinkQueue, NO_DEADLINE, PacketSink};
