//! HTSP client core.
//!
//! Two tightly coupled pieces: [`HtspConnection`], which owns the network
//! link, performs the handshake, frames and dispatches protocol messages,
//! and correlates requests with responses; and [`HtspDemuxer`], which
//! consumes one subscription's asynchronous push messages and exposes a
//! pull-based packet interface with seek/speed/abort control.
//!
//! Retry and backoff policy deliberately lives outside this crate: the
//! connection reports failures through [`ConnectionListener`] and never
//! reconnects on its own.

pub mod client;
pub mod config;
pub mod error;

pub use client::connection::{
    ConnectionListener, ConnectionState, HtspConnection, MessageConsumer,
};
pub use client::demuxer::{DemuxRead, HtspDemuxer, Packet, StreamInfo, StreamTimes};
pub use client::status::{
    DescrambleInfo, QueueStatus, SignalStatus, SourceInfo, TimeshiftStatus,
};
pub use client::subscription::{Subscription, SubscriptionWeight};
pub use config::HtspConfig;
pub use error::{HtspError, Result};
