//! Client module: protocol connection and live-stream demultiplexer.

pub mod connection;
pub mod demuxer;
pub mod status;
pub mod subscription;

pub use connection::{ConnectionListener, ConnectionState, HtspConnection, MessageConsumer};
pub use demuxer::{DemuxRead, HtspDemuxer, Packet};
pub use subscription::{Subscription, SubscriptionWeight};
