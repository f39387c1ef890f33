//! Ingestion pipeline
//!
//! Everything downstream of the transport runs inside one coordinator task:
//! - control messages configure the decoder and answer pings
//! - media fragments are demuxed and gated on the first keyframe
//! - decoded frames go to the render sink and feed the statistics
//!
//! The session state machine decides when to reconnect; the coordinator
//! resets per-connection state every time the transport closes.

pub mod clock;
pub mod coordinator;
pub mod stage;
pub mod state;
pub mod stats;
pub mod types;

pub use clock::MediaClock;
pub use coordinator::ViewerCoordinator;
pub use stage::PipelineStage;
pub use state::SessionState;
pub use stats::{StatsAggregator, StatsSnapshot};
pub use types::{EncodedUnit, StreamConfig, Timestamp};
