use std::collections::VecDeque;

use serde::Serialize;

use crate::protocol::MessageId;

/// Frames kept in the byte history
pub const HISTORY_FRAMES: usize = 100;

/// Packet and byte counters for one direction
#[derive(Debug, Clone, Default, Serialize)]
pub struct TrafficCounters {
    pub packets_total: u64,
    pub bytes_total: u64,
    pub packets_last_frame: u32,
    pub bytes_last_frame: u32,
    #[serde(skip)]
    packets_this_frame: u32,
    #[serde(skip)]
    bytes_this_frame: u32,
}

impl TrafficCounters {
    fn record(&mut self, bytes: usize) {
        self.packets_total += 1;
        self.bytes_total += bytes as u64;
        self.packets_this_frame += 1;
        self.bytes_this_frame = self.bytes_this_frame.saturating_add(bytes as u32);
    }

    fn roll(&mut self) -> u32 {
        self.packets_last_frame = self.packets_this_frame;
        self.bytes_last_frame = self.bytes_this_frame;
        self.packets_this_frame = 0;
        self.bytes_this_frame = 0;
        self.bytes_last_frame
    }
}

/// Network statistics of a session
#[derive(Debug, Clone, Default, Serialize)]
pub struct NetStatistics {
    pub sent: TrafficCounters,
    pub received: TrafficCounters,
    /// Bytes sent per frame, oldest first
    pub sent_history: VecDeque<u32>,
    /// Bytes received per frame, oldest first
    pub received_history: VecDeque<u32>,
    /// Packets dropped because they failed to parse
    pub dropped_packets: u64,
    #[serde(skip)]
    last_sent: Option<MessageId>,
    #[serde(skip)]
    last_received: Option<MessageId>,
}

impl NetStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self, id: MessageId, bytes: usize) {
        self.sent.record(bytes);
        self.last_sent = Some(id);
    }

    pub fn record_received(&mut self, id: MessageId, bytes: usize) {
        self.received.record(bytes);
        self.last_received = Some(id);
    }

    pub fn record_dropped(&mut self) {
        self.dropped_packets += 1;
    }

    pub fn last_sent(&self) -> Option<MessageId> {
        self.last_sent
    }

    pub fn last_received(&self) -> Option<MessageId> {
        self.last_received
    }

    /// Close the current frame and push its byte counts into the history
    pub fn new_frame(&mut self) {
        let sent = self.sent.roll();
        let received = self.received.roll();
        push_bounded(&mut self.sent_history, sent);
        push_bounded(&mut self.received_history, received);
    }
}

fn push_bounded(history: &mut VecDeque<u32>, value: u32) {
    if history.len() == HISTORY_FRAMES {
        history.pop_front();
    }
    history.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roll() {
        let mut stats = NetStatistics::new();
        stats.record_sent(MessageId::PlayerSync, 40);
        stats.record_sent(MessageId::Heartbeat, 13);
        stats.record_received(MessageId::HeartbeatResponse, 21);
        stats.new_frame();

        assert_eq!(stats.sent.packets_total, 2);
        assert_eq!(stats.sent.bytes_last_frame, 53);
        assert_eq!(stats.received.packets_last_frame, 1);
        assert_eq!(stats.sent_history.back(), Some(&53));
        assert_eq!(stats.last_sent(), Some(MessageId::Heartbeat));

        stats.new_frame();
        assert_eq!(stats.sent.bytes_last_frame, 0);
        assert_eq!(stats.sent.bytes_total, 53);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut stats = NetStatistics::new();
        for i in 0..(HISTORY_FRAMES + 20) {
            stats.record_sent(MessageId::PlayerSync, i);
            stats.new_frame();
        }
        assert_eq!(stats.sent_history.len(), HISTORY_FRAMES);
        assert_eq!(stats.sent_history.front(), Some(&20));
    }

    #[test]
    fn test_serializes_to_json() {
        let mut stats = NetStatistics::new();
        stats.record_received(MessageId::ObjectSync, 64);
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["received"]["packets_total"], 1);
        assert_eq!(json["received"]["bytes_total"], 64);
    }
}
