//! Live-stream demultiplexer.
//!
//! One instance per active subscription. The receive loop feeds it
//! asynchronous messages through [`MessageConsumer`]; a media-pipeline
//! consumer pulls packets out with [`read`](HtspDemuxer::read). The
//! demuxer's lock is independent of the connection lock and is only held
//! for the duration of one state update, bounding receive-loop latency.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use log::{debug, info, trace, warn};
use parking_lot::{Condvar, Mutex};

use htsp_protocol::{method, HtsMsg, HtsValue};

use crate::client::connection::{HtspConnection, MessageConsumer};
use crate::client::status::{
    DescrambleInfo, QueueStatus, SignalStatus, SourceInfo, TimeshiftStatus,
};
use crate::client::subscription::{Subscription, SubscriptionWeight};
use crate::error::{HtspError, Result};

/// Upper bound on buffered packets; the oldest are dropped beyond this so
/// a slow consumer never stalls the receive loop.
const PACKET_QUEUE_LIMIT: usize = 2000;

/// Playback displacement below which a timeshifted stream still counts as
/// real-time, in microseconds.
const REALTIME_SHIFT_LIMIT: i64 = 10_000_000;

/// Normal playback speed; 0 is paused.
const SPEED_NORMAL: i32 = 1000;

/// One decoded elementary-stream packet.
#[derive(Debug, Clone)]
pub struct Packet {
    pub stream_index: u32,
    pub frame_type: u32,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub payload: Bytes,
}

/// Result of one [`HtspDemuxer::read`] call.
#[derive(Debug)]
pub enum DemuxRead {
    Packet(Packet),
    EndOfStream,
}

/// Per-elementary-stream metadata as last announced by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamInfo {
    pub index: u32,
    /// Codec name, e.g. "H264" or "AC3".
    pub codec: String,
    pub language: String,
    pub width: u32,
    pub height: u32,
    pub channels: u32,
    pub rate: u32,
}

/// Start/end/PTS bounds of the timeshift buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamTimes {
    /// Wall-clock start of the stream, unix seconds.
    pub start_time: i64,
    pub pts_start: i64,
    /// Earliest seekable position, microseconds.
    pub pts_begin: i64,
    /// Latest position, microseconds.
    pub pts_end: i64,
}

struct DemuxState {
    subscription: Subscription,
    /// An `open` call is waiting for `subscriptionStart` to assign the id.
    opening: bool,
    streams: Vec<StreamInfo>,
    stream_stat: HashMap<u32, u64>,
    queue: VecDeque<Packet>,
    eos: bool,
    /// Bumped on every flush; lets a waiting seek distinguish its
    /// acknowledgement from stale wakeups.
    generation: u64,
    seeking: bool,
    seek_result: Option<i64>,
    source_info: SourceInfo,
    signal: SignalStatus,
    timeshift: TimeshiftStatus,
    descramble: DescrambleInfo,
    queue_status: QueueStatus,
    requested_speed: i32,
    actual_speed: i32,
}

impl DemuxState {
    fn new() -> Self {
        Self {
            subscription: Subscription::default(),
            opening: false,
            streams: Vec::new(),
            stream_stat: HashMap::new(),
            queue: VecDeque::new(),
            eos: false,
            generation: 0,
            seeking: false,
            seek_result: None,
            source_info: SourceInfo::default(),
            signal: SignalStatus::default(),
            timeshift: TimeshiftStatus::default(),
            descramble: DescrambleInfo::default(),
            queue_status: QueueStatus::default(),
            requested_speed: SPEED_NORMAL,
            actual_speed: SPEED_NORMAL,
        }
    }

    /// Does this message belong to our active subscription?
    fn is_current(&self, msg: &HtsMsg) -> bool {
        self.subscription.active
            && msg.get_u32("subscriptionId") == Some(self.subscription.id)
    }
}

/// Demultiplexer for one live channel subscription.
pub struct HtspDemuxer {
    conn: Arc<HtspConnection>,
    state: Mutex<DemuxState>,
    queue_cond: Condvar,
    start_cond: Condvar,
    seek_cond: Condvar,
    last_use: AtomicI64,
    start_time: AtomicI64,
    profile: Mutex<Option<String>>,
}

impl HtspDemuxer {
    /// Create a demuxer and register it for the connection's asynchronous
    /// dispatch.
    pub fn new(conn: Arc<HtspConnection>) -> Arc<Self> {
        let profile = conn.config().streaming_profile.clone();
        let demuxer = Arc::new(Self {
            conn: Arc::clone(&conn),
            state: Mutex::new(DemuxState::new()),
            queue_cond: Condvar::new(),
            start_cond: Condvar::new(),
            seek_cond: Condvar::new(),
            last_use: AtomicI64::new(0),
            start_time: AtomicI64::new(0),
            profile: Mutex::new(profile),
        });
        conn.register_consumer(&(Arc::clone(&demuxer) as Arc<dyn MessageConsumer>));
        demuxer
    }

    /// Subscribe to a channel and block until the server's
    /// `subscriptionStart` arrives with this subscription's identifier.
    pub fn open(&self, channel_id: u32, weight: SubscriptionWeight) -> Result<()> {
        info!("opening subscription to channel {}", channel_id);
        {
            let mut state = self.state.lock();
            *state = DemuxState::new();
            state.subscription.channel_id = channel_id;
            state.subscription.weight = weight;
            state.opening = true;
        }
        self.start_time.store(0, Ordering::SeqCst);
        self.touch();

        let mut msg = HtsMsg::new();
        msg.put_u32("channelId", channel_id);
        msg.put_u32("weight", weight as u32);
        if let Some(profile) = self.profile.lock().clone() {
            msg.put_str("profile", &profile);
        }

        if let Err(e) = self.conn.send_and_wait(method::SUBSCRIBE, msg) {
            self.state.lock().opening = false;
            return Err(match e {
                HtspError::Server(reason) => HtspError::SubscriptionFailed(reason),
                other => other,
            });
        }

        let deadline = Instant::now() + self.conn.config().response_timeout;
        let mut state = self.state.lock();
        while state.opening && !state.subscription.active && !state.eos {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.start_cond.wait_for(&mut state, deadline - now);
        }
        state.opening = false;

        if state.subscription.active {
            info!(
                "subscription {} started for channel {}",
                state.subscription.id, channel_id
            );
            Ok(())
        } else if state.eos {
            Err(HtspError::ConnectionLost)
        } else {
            warn!("channel {}: no subscriptionStart before deadline", channel_id);
            Err(HtspError::Timeout)
        }
    }

    /// Unsubscribe, release buffered packets and mark end-of-stream.
    pub fn close(&self) {
        let (active, id) = {
            let state = self.state.lock();
            (state.subscription.active, state.subscription.id)
        };
        if active {
            let mut msg = HtsMsg::new();
            msg.put_u32("subscriptionId", id);
            // Fire and forget; a dead connection must not make close block.
            if let Err(e) = self.conn.send_message0(method::UNSUBSCRIBE, msg) {
                debug!("unsubscribe not sent: {}", e);
            }
        }

        let mut state = self.state.lock();
        state.subscription.active = false;
        state.streams.clear();
        self.abort_locked(&mut state);
    }

    /// Block until a packet is queued or the stream is aborted; packets
    /// come back in FIFO order.
    pub fn read(&self) -> DemuxRead {
        let mut state = self.state.lock();
        loop {
            if let Some(pkt) = state.queue.pop_front() {
                drop(state);
                self.touch();
                return DemuxRead::Packet(pkt);
            }
            if state.eos {
                return DemuxRead::EndOfStream;
            }
            self.queue_cond.wait(&mut state);
        }
    }

    /// Drop every buffered packet.
    pub fn flush(&self) {
        let mut state = self.state.lock();
        Self::flush_locked(&mut state);
    }

    fn flush_locked(state: &mut DemuxState) {
        state.queue.clear();
        state.generation = state.generation.wrapping_add(1);
    }

    /// Drop the oldest packets until the queue is back under its bound.
    pub fn trim(&self) {
        let mut state = self.state.lock();
        Self::trim_locked(&mut state);
    }

    fn trim_locked(state: &mut DemuxState) {
        let excess = state.queue.len().saturating_sub(PACKET_QUEUE_LIMIT);
        if excess > 0 {
            state.queue.drain(..excess);
            warn!("queue over limit, dropped {} oldest packets", excess);
        }
    }

    /// Mark the stream unusable and wake any blocked caller.
    pub fn abort(&self) {
        let mut state = self.state.lock();
        self.abort_locked(&mut state);
    }

    fn abort_locked(&self, state: &mut DemuxState) {
        state.eos = true;
        state.queue.clear();
        state.seeking = false;
        self.queue_cond.notify_all();
        self.start_cond.notify_all();
        self.seek_cond.notify_all();
    }

    /// Seek to `time` (microseconds). Flushes the local queue and waits
    /// for the server's `subscriptionSkip` acknowledgement; the returned
    /// position is the server's, which may differ from the request.
    pub fn seek(&self, time: i64, backwards: bool) -> Result<i64> {
        let id = {
            let mut state = self.state.lock();
            if !state.subscription.active || state.eos {
                return Err(HtspError::ConnectionLost);
            }
            state.seeking = true;
            state.seek_result = None;
            state.subscription.id
        };
        debug!("seeking to {} (backwards: {})", time, backwards);

        let mut msg = HtsMsg::new();
        msg.put_u32("subscriptionId", id);
        msg.put_s64("time", time);
        msg.put_u32("absolute", 1);
        if backwards {
            msg.put_u32("backward", 1);
        }

        if let Err(e) = self.conn.send_and_wait(method::SUBSCRIPTION_SEEK, msg) {
            self.state.lock().seeking = false;
            return Err(e);
        }

        // Everything queued so far predates the acknowledgement.
        self.flush();

        let deadline = Instant::now() + self.conn.config().response_timeout;
        let mut state = self.state.lock();
        while state.seeking && !state.eos {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            self.seek_cond.wait_for(&mut state, deadline - now);
        }
        let result = state.seek_result.take();
        state.seeking = false;

        match result {
            Some(pts) => Ok(pts),
            None if state.eos => Err(HtspError::ConnectionLost),
            None => Err(HtspError::Timeout),
        }
    }

    /// Request a playback speed change (1000 = normal, 0 = pause). The
    /// acknowledged speed from the `subscriptionSpeed` push is
    /// authoritative and may differ from the request.
    pub fn speed(&self, speed: i32) -> Result<()> {
        let id = {
            let mut state = self.state.lock();
            if !state.subscription.active {
                return Err(HtspError::SubscriptionFailed("not subscribed".to_string()));
            }
            state.requested_speed = speed;
            state.subscription.id
        };

        let mut msg = HtsMsg::new();
        msg.put_u32("subscriptionId", id);
        msg.put_s64("speed", (speed / 10) as i64);
        self.conn.send_and_wait(method::SUBSCRIPTION_SPEED, msg)?;
        Ok(())
    }

    /// Re-prioritize the live subscription.
    pub fn weight(&self, weight: SubscriptionWeight) -> Result<()> {
        let id = {
            let mut state = self.state.lock();
            if !state.subscription.active {
                return Err(HtspError::SubscriptionFailed("not subscribed".to_string()));
            }
            state.subscription.weight = weight;
            state.subscription.id
        };

        let mut msg = HtsMsg::new();
        msg.put_u32("subscriptionId", id);
        msg.put_u32("weight", weight as u32);
        self.conn
            .send_message0(method::SUBSCRIPTION_CHANGE_WEIGHT, msg)
    }

    /// After re-registration, re-subscribe if a subscription was active.
    /// Called by the orchestration layer, never automatically.
    pub fn connected(&self) -> Result<()> {
        let (was_active, channel_id, weight) = {
            let state = self.state.lock();
            (
                state.subscription.active || state.subscription.channel_id != 0,
                state.subscription.channel_id,
                state.subscription.weight,
            )
        };
        if !was_active {
            return Ok(());
        }
        info!("re-subscribing to channel {}", channel_id);
        self.open(channel_id, weight)
    }

    /// Profile to request with future subscriptions.
    pub fn set_streaming_profile(&self, profile: &str) {
        *self.profile.lock() = Some(profile.to_string());
    }

    // ------------------------------------------------------------------
    // Read-only state
    // ------------------------------------------------------------------

    pub fn subscription_id(&self) -> u32 {
        self.state.lock().subscription.id
    }

    pub fn channel_id(&self) -> u32 {
        self.state.lock().subscription.channel_id
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().subscription.active
    }

    /// Unix timestamp of the last successful read or status update.
    pub fn last_use(&self) -> i64 {
        self.last_use.load(Ordering::SeqCst)
    }

    /// Paused according to the last acknowledged speed.
    pub fn is_paused(&self) -> bool {
        self.state.lock().actual_speed == 0
    }

    /// Last acknowledged playback speed.
    pub fn current_speed(&self) -> i32 {
        self.state.lock().actual_speed
    }

    /// Whether the stream is currently time-shifted.
    pub fn is_timeshifting(&self) -> bool {
        let state = self.state.lock();
        state.subscription.active && state.timeshift.shift != 0
    }

    /// Strictly real-time: not displaced more than a few seconds behind
    /// the live position.
    pub fn is_realtime(&self) -> bool {
        let state = self.state.lock();
        state.subscription.active && state.timeshift.shift.abs() < REALTIME_SHIFT_LIMIT
    }

    pub fn stream_times(&self) -> StreamTimes {
        let state = self.state.lock();
        StreamTimes {
            start_time: self.start_time.load(Ordering::SeqCst),
            pts_start: 0,
            pts_begin: state.timeshift.start,
            pts_end: state.timeshift.end,
        }
    }

    pub fn current_streams(&self) -> Vec<StreamInfo> {
        self.state.lock().streams.clone()
    }

    pub fn current_source_info(&self) -> SourceInfo {
        self.state.lock().source_info.clone()
    }

    pub fn current_signal(&self) -> SignalStatus {
        self.state.lock().signal.clone()
    }

    pub fn current_descramble_info(&self) -> DescrambleInfo {
        self.state.lock().descramble.clone()
    }

    pub fn current_queue_status(&self) -> QueueStatus {
        self.state.lock().queue_status.clone()
    }

    fn touch(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        self.last_use.store(now, Ordering::SeqCst);
    }

    // ------------------------------------------------------------------
    // Asynchronous message handlers, invoked from the receive loop
    // ------------------------------------------------------------------

    fn parse_mux_packet(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        if !state.is_current(msg) || state.eos {
            return;
        }
        let Some(index) = msg.get_u32("stream") else {
            warn!("muxpkt without stream index");
            return;
        };

        let pkt = Packet {
            stream_index: index,
            frame_type: msg.get_u32("frametype").unwrap_or(0),
            pts: msg.get_s64("pts"),
            dts: msg.get_s64("dts"),
            duration: msg.get_s64("duration").unwrap_or(0),
            payload: msg.get_bin("payload").cloned().unwrap_or_else(Bytes::new),
        };

        *state.stream_stat.entry(index).or_insert(0) += 1;
        state.queue.push_back(pkt);
        Self::trim_locked(&mut state);
        self.queue_cond.notify_one();
    }

    fn parse_subscription_start(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        let Some(id) = msg.get_u32("subscriptionId") else {
            warn!("subscriptionStart without subscriptionId");
            return;
        };

        if state.opening && !state.subscription.active {
            // The server assigns the identifier; adopt it.
            state.subscription.id = id;
            state.subscription.active = true;
        } else if !state.is_current(msg) {
            return;
        }

        // The stream set is replaced wholesale, never patched.
        state.streams = parse_streams(msg);
        state.stream_stat.clear();
        if let Some(source) = msg.get_map("sourceinfo") {
            state.source_info = SourceInfo::from_msg(source);
        }
        debug!(
            "subscription {}: {} streams announced",
            state.subscription.id,
            state.streams.len()
        );

        if self.start_time.load(Ordering::SeqCst) == 0 {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs() as i64)
                .unwrap_or(0);
            self.start_time.store(now, Ordering::SeqCst);
        }
        self.start_cond.notify_all();
        drop(state);
        self.touch();
    }

    fn parse_subscription_stop(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        if !state.is_current(msg) {
            return;
        }
        info!(
            "subscription {} stopped by server ({})",
            state.subscription.id,
            msg.get_str("status").unwrap_or("no status")
        );
        state.subscription.active = false;
        state.streams.clear();
        self.abort_locked(&mut state);
    }

    fn parse_subscription_skip(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        if !state.is_current(msg) || !state.seeking {
            return;
        }
        // Packets queued before the acknowledgement predate the seek.
        Self::flush_locked(&mut state);
        state.seek_result = if msg.get_u32("error").unwrap_or(0) != 0 {
            None
        } else {
            msg.get_s64("time")
        };
        state.seeking = false;
        self.seek_cond.notify_all();
    }

    fn parse_subscription_speed(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        if !state.is_current(msg) {
            return;
        }
        if let Some(speed) = msg.get_s64("speed") {
            // Wire units are a tenth of ours.
            state.actual_speed = (speed as i32) * 10;
            trace!("subscription {} speed {}", state.subscription.id, state.actual_speed);
        }
    }

    fn parse_subscription_grace(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        if !state.is_current(msg) {
            return;
        }
        if let Some(grace) = msg.get_u32("graceTimeout") {
            info!(
                "subscription {}: grace period {}s",
                state.subscription.id, grace
            );
            state.subscription.grace_timeout = grace;
        }
    }

    fn parse_queue_status(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        if !state.is_current(msg) {
            return;
        }
        let status = QueueStatus::from_msg(msg);
        if status.drops() > state.queue_status.drops() {
            warn!(
                "server dropped packets: B={} P={} I={}",
                status.b_drops, status.p_drops, status.i_drops
            );
        }
        state.queue_status = status;
        drop(state);
        self.touch();
    }

    fn parse_signal_status(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        if !state.is_current(msg) {
            return;
        }
        state.signal = SignalStatus::from_msg(msg);
        drop(state);
        self.touch();
    }

    fn parse_timeshift_status(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        if !state.is_current(msg) {
            return;
        }
        state.timeshift = TimeshiftStatus::from_msg(msg);
        drop(state);
        self.touch();
    }

    fn parse_descramble_info(&self, msg: &HtsMsg) {
        let mut state = self.state.lock();
        if !state.is_current(msg) {
            return;
        }
        state.descramble = DescrambleInfo::from_msg(msg);
        drop(state);
        self.touch();
    }
}

impl MessageConsumer for HtspDemuxer {
    fn on_message(&self, name: &str, msg: &HtsMsg) {
        match name {
            method::MUXPKT => self.parse_mux_packet(msg),
            method::SUBSCRIPTION_START => self.parse_subscription_start(msg),
            method::SUBSCRIPTION_STOP => self.parse_subscription_stop(msg),
            method::SUBSCRIPTION_SKIP => self.parse_subscription_skip(msg),
            method::SUBSCRIPTION_SPEED => self.parse_subscription_speed(msg),
            method::SUBSCRIPTION_GRACE => self.parse_subscription_grace(msg),
            method::QUEUE_STATUS => self.parse_queue_status(msg),
            method::SIGNAL_STATUS => self.parse_signal_status(msg),
            method::TIMESHIFT_STATUS => self.parse_timeshift_status(msg),
            method::DESCRAMBLE_INFO => self.parse_descramble_info(msg),
            _ => {}
        }
    }

    fn on_connection_lost(&self) {
        debug!("connection lost, aborting stream");
        self.abort();
    }
}

fn parse_streams(msg: &HtsMsg) -> Vec<StreamInfo> {
    let Some(items) = msg.get_list("streams") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            HtsValue::Map(m) => Some(StreamInfo {
                index: m.get_u32("index")?,
                codec: m.get_str("type").unwrap_or_default().to_string(),
                language: m.get_str("language").unwrap_or_default().to_string(),
                width: m.get_u32("width").unwrap_or(0),
                height: m.get_u32("height").unwrap_or(0),
                channels: m.get_u32("channels").unwrap_or(0),
                rate: m.get_u32("rate").unwrap_or(0),
            }),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::connection::{ConnectionListener, ConnectionState};
    use crate::config::HtspConfig;

    struct NullListener;

    impl ConnectionListener for NullListener {
        fn on_state_change(&self, _: ConnectionState, _: ConnectionState, _: &str) {}
    }

    /// Demuxer wired to an unstarted connection, with an active
    /// subscription faked in so the push handlers accept messages.
    fn active_demuxer(subscription_id: u32) -> Arc<HtspDemuxer> {
        let conn = HtspConnection::new(HtspConfig::default(), Arc::new(NullListener));
        let demuxer = HtspDemuxer::new(conn);
        {
            let mut state = demuxer.state.lock();
            state.subscription.id = subscription_id;
            state.subscription.channel_id = 1;
            state.subscription.active = true;
        }
        demuxer
    }

    fn mux_packet(subscription_id: u32, stream: u32, pts: i64) -> HtsMsg {
        let mut msg = HtsMsg::method(method::MUXPKT);
        msg.put_u32("subscriptionId", subscription_id);
        msg.put_u32("stream", stream);
        msg.put_s64("pts", pts);
        msg.put_s64("dts", pts);
        msg.put_s64("duration", 40_000);
        msg.put_bin("payload", Bytes::from_static(b"\x00\x00\x01"));
        msg
    }

    #[test]
    fn test_packets_delivered_in_order() {
        let demuxer = active_demuxer(7);
        for pts in [100, 200, 300] {
            demuxer.on_message(method::MUXPKT, &mux_packet(7, 1, pts));
        }
        for expected in [100, 200, 300] {
            match demuxer.read() {
                DemuxRead::Packet(pkt) => assert_eq!(pkt.pts, Some(expected)),
                DemuxRead::EndOfStream => panic!("unexpected end of stream"),
            }
        }
    }

    #[test]
    fn test_foreign_subscription_ignored() {
        let demuxer = active_demuxer(7);
        demuxer.on_message(method::MUXPKT, &mux_packet(8, 1, 100));
        assert!(demuxer.state.lock().queue.is_empty());
    }

    #[test]
    fn test_trim_bounds_queue() {
        let demuxer = active_demuxer(7);
        for pts in 0..(PACKET_QUEUE_LIMIT as i64 + 50) {
            demuxer.on_message(method::MUXPKT, &mux_packet(7, 1, pts));
        }
        let state = demuxer.state.lock();
        assert_eq!(state.queue.len(), PACKET_QUEUE_LIMIT);
        // The oldest packets were dropped, not the newest.
        assert_eq!(state.queue.front().unwrap().pts, Some(50));
    }

    #[test]
    fn test_abort_wakes_blocked_reader() {
        let demuxer = active_demuxer(7);
        let reader = {
            let demuxer = Arc::clone(&demuxer);
            std::thread::spawn(move || demuxer.read())
        };
        // Give the reader time to block.
        std::thread::sleep(std::time::Duration::from_millis(50));
        demuxer.abort();
        match reader.join().unwrap() {
            DemuxRead::EndOfStream => {}
            DemuxRead::Packet(_) => panic!("expected end of stream"),
        }
    }

    #[test]
    fn test_subscription_start_adopts_server_id() {
        let conn = HtspConnection::new(HtspConfig::default(), Arc::new(NullListener));
        let demuxer = HtspDemuxer::new(conn);
        {
            let mut state = demuxer.state.lock();
            state.subscription.channel_id = 5;
            state.opening = true;
        }

        let mut stream = HtsMsg::new();
        stream.put_u32("index", 1);
        stream.put_str("type", "H264");
        stream.put_str("language", "eng");
        let mut msg = HtsMsg::method(method::SUBSCRIPTION_START);
        msg.put_u32("subscriptionId", 101);
        msg.put_list("streams", vec![HtsValue::Map(stream)]);
        demuxer.on_message(method::SUBSCRIPTION_START, &msg);

        assert!(demuxer.is_active());
        assert_eq!(demuxer.subscription_id(), 101);
        let streams = demuxer.current_streams();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].codec, "H264");
    }

    #[test]
    fn test_stream_set_replaced_wholesale() {
        let demuxer = active_demuxer(7);

        let mut video = HtsMsg::new();
        video.put_u32("index", 1);
        video.put_str("type", "H264");
        let mut audio = HtsMsg::new();
        audio.put_u32("index", 2);
        audio.put_str("type", "AC3");
        let mut first = HtsMsg::method(method::SUBSCRIPTION_START);
        first.put_u32("subscriptionId", 7);
        first.put_list("streams", vec![HtsValue::Map(video), HtsValue::Map(audio)]);
        demuxer.on_message(method::SUBSCRIPTION_START, &first);
        assert_eq!(demuxer.current_streams().len(), 2);

        let mut video2 = HtsMsg::new();
        video2.put_u32("index", 1);
        video2.put_str("type", "HEVC");
        let mut second = HtsMsg::method(method::SUBSCRIPTION_START);
        second.put_u32("subscriptionId", 7);
        second.put_list("streams", vec![HtsValue::Map(video2)]);
        demuxer.on_message(method::SUBSCRIPTION_START, &second);

        let streams = demuxer.current_streams();
        assert_eq!(streams.len(), 1);
        assert_eq!(streams[0].codec, "HEVC");
    }

    #[test]
    fn test_skip_ack_flushes_queue_and_resolves_seek() {
        let demuxer = active_demuxer(7);
        for pts in [100, 200] {
            demuxer.on_message(method::MUXPKT, &mux_packet(7, 1, pts));
        }
        demuxer.state.lock().seeking = true;

        let mut skip = HtsMsg::method(method::SUBSCRIPTION_SKIP);
        skip.put_u32("subscriptionId", 7);
        skip.put_s64("time", 4200);
        skip.put_u32("absolute", 1);
        demuxer.on_message(method::SUBSCRIPTION_SKIP, &skip);

        let state = demuxer.state.lock();
        assert!(state.queue.is_empty(), "pre-seek packets must be discarded");
        assert!(!state.seeking);
        assert_eq!(state.seek_result, Some(4200));
    }

    #[test]
    fn test_speed_ack_is_authoritative() {
        let demuxer = active_demuxer(7);
        assert!(!demuxer.is_paused());

        let mut speed = HtsMsg::method(method::SUBSCRIPTION_SPEED);
        speed.put_u32("subscriptionId", 7);
        speed.put_s64("speed", 0);
        demuxer.on_message(method::SUBSCRIPTION_SPEED, &speed);

        assert!(demuxer.is_paused());
        assert_eq!(demuxer.current_speed(), 0);
    }

    #[test]
    fn test_timeshift_classification() {
        let demuxer = active_demuxer(7);
        assert!(!demuxer.is_timeshifting());
        assert!(demuxer.is_realtime());

        let mut status = HtsMsg::method(method::TIMESHIFT_STATUS);
        status.put_u32("subscriptionId", 7);
        status.put_u32("full", 0);
        status.put_s64("shift", 30_000_000);
        status.put_s64("start", 1_000_000);
        status.put_s64("end", 31_000_000);
        demuxer.on_message(method::TIMESHIFT_STATUS, &status);

        assert!(demuxer.is_timeshifting());
        assert!(!demuxer.is_realtime());
        let times = demuxer.stream_times();
        assert_eq!(times.pts_begin, 1_000_000);
        assert_eq!(times.pts_end, 31_000_000);
    }

    #[test]
    fn test_stop_push_ends_stream() {
        let demuxer = active_demuxer(7);
        demuxer.on_message(method::MUXPKT, &mux_packet(7, 1, 100));

        let mut stop = HtsMsg::method(method::SUBSCRIPTION_STOP);
        stop.put_u32("subscriptionId", 7);
        stop.put_str("status", "subscriptionOverridden");
        demuxer.on_message(method::SUBSCRIPTION_STOP, &stop);

        assert!(!demuxer.is_active());
        match demuxer.read() {
            DemuxRead::EndOfStream => {}
            DemuxRead::Packet(_) => panic!("expected end of stream"),
        }
    }

    #[test]
    fn test_status_snapshots_overwritten() {
        let demuxer = active_demuxer(7);

        let mut signal = HtsMsg::method(method::SIGNAL_STATUS);
        signal.put_u32("subscriptionId", 7);
        signal.put_str("feStatus", "GOOD");
        signal.put_u32("feSNR", 28);
        demuxer.on_message(method::SIGNAL_STATUS, &signal);
        assert_eq!(demuxer.current_signal().status, "GOOD");
        assert_eq!(demuxer.current_signal().snr, 28);

        let mut signal2 = HtsMsg::method(method::SIGNAL_STATUS);
        signal2.put_u32("subscriptionId", 7);
        signal2.put_str("feStatus", "WEAK");
        demuxer.on_message(method::SIGNAL_STATUS, &signal2);
        assert_eq!(demuxer.current_signal().status, "WEAK");
        // Fields absent from the new push reset; no partial patching.
        assert_eq!(demuxer.current_signal().snr, 0);
    }
}
