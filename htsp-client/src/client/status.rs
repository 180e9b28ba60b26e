//! Status snapshots pushed by the server for an active subscription.
//!
//! Each value object is overwritten in place by its corresponding
//! asynchronous message; readers observe the latest value only.

use serde::{Deserialize, Serialize};

use htsp_protocol::HtsMsg;

/// Where the current stream originates (`sourceinfo` of `subscriptionStart`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub adapter: String,
    pub mux: String,
    pub network: String,
    pub provider: String,
    pub service: String,
}

impl SourceInfo {
    pub fn from_msg(msg: &HtsMsg) -> Self {
        Self {
            adapter: msg.get_str("adapter").unwrap_or_default().to_string(),
            mux: msg.get_str("mux").unwrap_or_default().to_string(),
            network: msg.get_str("network").unwrap_or_default().to_string(),
            provider: msg.get_str("provider").unwrap_or_default().to_string(),
            service: msg.get_str("service").unwrap_or_default().to_string(),
        }
    }
}

/// Frontend signal quality (`signalStatus`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalStatus {
    /// Frontend status string, e.g. "GOOD".
    pub status: String,
    pub snr: u32,
    pub signal: u32,
    pub ber: u32,
    pub unc: u32,
}

impl SignalStatus {
    pub fn from_msg(msg: &HtsMsg) -> Self {
        Self {
            status: msg.get_str("feStatus").unwrap_or_default().to_string(),
            snr: msg.get_u32("feSNR").unwrap_or(0),
            signal: msg.get_u32("feSignal").unwrap_or(0),
            ber: msg.get_u32("feBER").unwrap_or(0),
            unc: msg.get_u32("feUNC").unwrap_or(0),
        }
    }
}

/// Server-side timeshift buffer state (`timeshiftStatus`).
///
/// `shift` is the current displacement behind the live position and
/// `start`/`end` bound the shift buffer, all in microseconds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeshiftStatus {
    pub full: bool,
    pub shift: i64,
    pub start: i64,
    pub end: i64,
}

impl TimeshiftStatus {
    pub fn from_msg(msg: &HtsMsg) -> Self {
        Self {
            full: msg.get_u32("full").unwrap_or(0) != 0,
            shift: msg.get_s64("shift").unwrap_or(0),
            start: msg.get_s64("start").unwrap_or(0),
            end: msg.get_s64("end").unwrap_or(0),
        }
    }
}

/// Conditional-access state (`descrambleInfo`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescrambleInfo {
    pub pid: u32,
    pub caid: u32,
    pub provid: u32,
    pub ecm_time: u32,
    pub hops: u32,
    pub card_system: String,
    pub reader: String,
    pub from: String,
    pub protocol: String,
}

impl DescrambleInfo {
    pub fn from_msg(msg: &HtsMsg) -> Self {
        Self {
            pid: msg.get_u32("pid").unwrap_or(0),
            caid: msg.get_u32("caid").unwrap_or(0),
            provid: msg.get_u32("provid").unwrap_or(0),
            ecm_time: msg.get_u32("ecmtime").unwrap_or(0),
            hops: msg.get_u32("hops").unwrap_or(0),
            card_system: msg.get_str("cardsystem").unwrap_or_default().to_string(),
            reader: msg.get_str("reader").unwrap_or_default().to_string(),
            from: msg.get_str("from").unwrap_or_default().to_string(),
            protocol: msg.get_str("protocol").unwrap_or_default().to_string(),
        }
    }
}

/// Server-side packet queue state (`queueStatus`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    pub packets: u32,
    pub bytes: u32,
    pub delay: u32,
    pub b_drops: u32,
    pub p_drops: u32,
    pub i_drops: u32,
}

impl QueueStatus {
    pub fn from_msg(msg: &HtsMsg) -> Self {
        Self {
            packets: msg.get_u32("packets").unwrap_or(0),
            bytes: msg.get_u32("bytes").unwrap_or(0),
            delay: msg.get_u32("delay").unwrap_or(0),
            b_drops: msg.get_u32("Bdrops").unwrap_or(0),
            p_drops: msg.get_u32("Pdrops").unwrap_or(0),
            i_drops: msg.get_u32("Idrops").unwrap_or(0),
        }
    }

    /// Total packets the server dropped before transmission.
    pub fn drops(&self) -> u32 {
        self.b_drops + self.p_drops + self.i_drops
    }
}
