//! # Session State Machine
//!
//! Connection presence for a single-client session.
//!
//! ```text
//!            valid packet from X
//!   Idle ───────────────────────────▶ Connected(X)
//!    ▲                                  │  packet from X: clock reset
//!    │  no packet from X for timeout    │  packet from Y: discarded
//!    └──────────────────────────────────┘
//! ```
//!
//! Time is passed in explicitly so the machine can be driven by a synthetic
//! clock.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Default inactivity timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Live connection bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Connection {
    /// Accepted sender.
    pub peer: SocketAddr,
    /// When the first packet arrived.
    pub connected_at: Instant,
    /// When the last packet from `peer` arrived.
    pub last_receive: Instant,
    /// Packets accepted from `peer`.
    pub packets: u64,
    /// Polls since the last accepted packet.
    pub polls_since_receive: u64,
}

/// Connection presence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Waiting for a phone.
    #[default]
    Idle,
    /// Peer set, timeout clock running.
    Connected(Connection),
}

/// Result of offering a packet to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First packet: the sender became the peer.
    Connected,
    /// Packet from the current peer.
    Accepted,
    /// Packet from another address while connected.
    Rejected,
}

/// Emitted when a connection times out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disconnect {
    /// Peer that went silent.
    pub peer: SocketAddr,
    /// Silence that triggered the timeout.
    pub idle: Duration,
    /// Polls per second during the silence.
    pub listen_rate: f64,
    /// Packets accepted over the connection.
    pub packets: u64,
    /// Connection lifetime up to the last packet.
    pub duration: Duration,
}

/// Single-client session state machine.
#[derive(Debug, Clone)]
pub struct Session {
    state: SessionState,
    timeout: Duration,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Session {
    /// Creates an idle session.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: SessionState::Idle,
            timeout,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Inactivity timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Current peer, if connected.
    #[must_use]
    pub fn peer(&self) -> Option<SocketAddr> {
        match self.state {
            SessionState::Idle => None,
            SessionState::Connected(connection) => Some(connection.peer),
        }
    }

    /// Whether a peer is set.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(self.state, SessionState::Connected(_))
    }

    /// Whether a packet from `from` would be discarded.
    #[must_use]
    pub fn is_foreign(&self, from: SocketAddr) -> bool {
        matches!(self.peer(), Some(peer) if peer != from)
    }

    /// Offers a valid packet from `from` received at `now`.
    ///
    /// Connects when idle, resets the clock for the peer, and leaves the
    /// state untouched for anyone else.
    pub fn admit(&mut self, from: SocketAddr, now: Instant) -> Admission {
        if let SessionState::Connected(connection) = &mut self.state {
            if connection.peer != from {
                return Admission::Rejected;
            }
            connection.last_receive = now;
            connection.packets += 1;
            connection.polls_since_receive = 0;
            return Admission::Accepted;
        }

        self.state = SessionState::Connected(Connection {
            peer: from,
            connected_at: now,
            last_receive: now,
            packets: 1,
            polls_since_receive: 0,
        });
        Admission::Connected
    }

    /// Counts one poll of the socket.
    pub fn record_poll(&mut self) {
        if let SessionState::Connected(connection) = &mut self.state {
            connection.polls_since_receive += 1;
        }
    }

    /// Drops the peer if it has been silent for at least the timeout.
    pub fn check_timeout(&mut self, now: Instant) -> Option<Disconnect> {
        let SessionState::Connected(connection) = self.state else {
            return None;
        };

        let idle = now.saturating_duration_since(connection.last_receive);
        if idle < self.timeout {
            return None;
        }

        self.state = SessionState::Idle;

        let secs = idle.as_secs_f64();
        let listen_rate = if secs > 0.0 {
            connection.polls_since_receive as f64 / secs
        } else {
            0.0
        };

        Some(Disconnect {
            peer: connection.peer,
            idle,
            listen_rate,
            packets: connection.packets,
            duration: connection
                .last_receive
                .saturating_duration_since(connection.connected_at),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phone() -> SocketAddr {
        "192.168.1.20:50000".parse().unwrap()
    }

    fn intruder() -> SocketAddr {
        "192.168.1.66:50000".parse().unwrap()
    }

    #[test]
    fn test_starts_idle() {
        let session = Session::default();
        assert_eq!(*session.state(), SessionState::Idle);
        assert_eq!(session.peer(), None);
        assert_eq!(session.timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_first_packet_connects() {
        let mut session = Session::default();
        let t0 = Instant::now();

        assert_eq!(session.admit(phone(), t0), Admission::Connected);
        assert!(session.is_connected());
        assert_eq!(session.peer(), Some(phone()));
    }

    #[test]
    fn test_peer_packet_resets_clock() {
        let mut session = Session::default();
        let t0 = Instant::now();
        session.admit(phone(), t0);

        let t1 = t0 + Duration::from_millis(2500);
        assert_eq!(session.admit(phone(), t1), Admission::Accepted);

        // 2.5s after the second packet: still within timeout of t1
        assert!(session.check_timeout(t1 + Duration::from_millis(2500)).is_none());
        assert!(session.is_connected());
    }

    #[test]
    fn test_foreign_packet_rejected() {
        let mut session = Session::default();
        let t0 = Instant::now();
        session.admit(phone(), t0);

        assert!(session.is_foreign(intruder()));
        assert!(!session.is_foreign(phone()));

        let t1 = t0 + Duration::from_secs(2);
        assert_eq!(session.admit(intruder(), t1), Admission::Rejected);
        assert_eq!(session.peer(), Some(phone()));

        // Clock was not reset by the intruder
        let disconnect = session.check_timeout(t0 + Duration::from_secs(3)).unwrap();
        assert_eq!(disconnect.peer, phone());
    }

    #[test]
    fn test_nobody_is_foreign_when_idle() {
        let session = Session::default();
        assert!(!session.is_foreign(intruder()));
    }

    #[test]
    fn test_timeout_returns_to_idle() {
        let mut session = Session::new(Duration::from_secs(3));
        let t0 = Instant::now();
        session.admit(phone(), t0);
        session.admit(phone(), t0 + Duration::from_secs(1));

        assert!(session.check_timeout(t0 + Duration::from_millis(3999)).is_none());

        let disconnect = session.check_timeout(t0 + Duration::from_secs(4)).unwrap();
        assert_eq!(disconnect.peer, phone());
        assert_eq!(disconnect.idle, Duration::from_secs(3));
        assert_eq!(disconnect.packets, 2);
        assert_eq!(disconnect.duration, Duration::from_secs(1));

        assert_eq!(*session.state(), SessionState::Idle);
        assert_eq!(session.peer(), None);
    }

    #[test]
    fn test_reconnect_after_timeout() {
        let mut session = Session::default();
        let t0 = Instant::now();
        session.admit(phone(), t0);
        session.check_timeout(t0 + Duration::from_secs(5)).unwrap();

        // A different phone can now take over
        assert_eq!(
            session.admit(intruder(), t0 + Duration::from_secs(6)),
            Admission::Connected
        );
        assert_eq!(session.peer(), Some(intruder()));
    }

    #[test]
    fn test_idle_never_times_out() {
        let mut session = Session::default();
        assert!(session
            .check_timeout(Instant::now() + Duration::from_secs(3600))
            .is_none());
    }

    #[test]
    fn test_listen_rate() {
        let mut session = Session::new(Duration::from_secs(3));
        let t0 = Instant::now();
        session.admit(phone(), t0);

        // 20ms ticks for 3 seconds
        for _ in 0..150 {
            session.record_poll();
        }

        let disconnect = session.check_timeout(t0 + Duration::from_secs(3)).unwrap();
        assert!((disconnect.listen_rate - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_record_poll_ignored_when_idle() {
        let mut session = Session::default();
        session.record_poll();
        assert_eq!(*session.state(), SessionState::Idle);
    }
}
