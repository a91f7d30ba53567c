//! # Session Module
//!
//! Single-client UDP session: receives telemetry, tracks the connected phone,
//! and drives decode → map → emit → commit for every accepted packet.
//!
//! This module handles:
//! - Polling a non-blocking UDP endpoint at a fixed tick
//! - Peer acceptance, exclusivity and inactivity timeout
//! - Per-packet error isolation (a bad packet never ends the session)
//! - Best-effort discovery advertisement
//! - Ordered, idempotent shutdown

pub mod socket;
pub mod state;

use std::future::Future;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};

use crate::controller::mapper::EventMapper;
use crate::discovery::{Registrar, Registration};
use crate::error::{BridgeError, Result};
use crate::output::OutputDevice;
use crate::telemetry::decoder::decode;

use socket::{Datagram, DatagramSource};
use state::{Admission, Disconnect, Session};

/// Default poll tick
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Upper bound on datagrams drained in one tick so the clock is still checked
/// under a flood
pub const MAX_DATAGRAMS_PER_POLL: usize = 64;

/// Number of delivered packets between status log messages
const LOG_INTERVAL_PACKETS: u64 = 1000;

/// Timing parameters of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Silence after which the peer is dropped
    pub timeout: Duration,
    /// Delay between socket polls
    pub poll_interval: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout: state::DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// What happened to one datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Frame committed with this many events
    Delivered(usize),
    /// Sender is not the current peer
    Foreign,
    /// Decoder rejected the payload
    Malformed,
    /// Mapper rejected the readings
    MappingFailed,
    /// Output device rejected an emission or the commit
    FrameFailed,
    /// Session already closed
    Closed,
}

/// Counters for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub delivered: u64,
    pub foreign: u64,
    pub malformed: u64,
    pub mapping_failures: u64,
    pub frame_failures: u64,
    pub connections: u64,
}

/// Summary of one poll tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollReport {
    /// Outcome of every datagram drained this tick, in arrival order
    pub outcomes: Vec<PacketOutcome>,
    /// Set if the peer timed out this tick
    pub disconnect: Option<Disconnect>,
}

/// Owns the endpoint, the output device and the discovery entry for one
/// session and runs the poll loop.
pub struct SessionManager {
    source: Option<Box<dyn DatagramSource>>,
    device: Option<Box<dyn OutputDevice>>,
    registrar: Option<Box<dyn Registrar>>,
    registration: Option<Registration>,
    mapper: Box<dyn EventMapper>,
    session: Session,
    settings: SessionSettings,
    endpoint: SocketAddr,
    display_name: String,
    stats: SessionStats,
    last_log_count: u64,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("endpoint", &self.endpoint)
            .field("session", &self.session)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Creates a manager around an already bound source and opened device
    ///
    /// # Arguments
    ///
    /// * `source` - Bound datagram endpoint
    /// * `device` - Opened output device
    /// * `mapper` - Application mapping
    /// * `settings` - Timeout and poll interval
    ///
    /// # Errors
    ///
    /// Returns error if the source cannot report its local address
    pub fn new(
        source: Box<dyn DatagramSource>,
        device: Box<dyn OutputDevice>,
        mapper: Box<dyn EventMapper>,
        settings: SessionSettings,
    ) -> Result<Self> {
        let endpoint = source.local_addr()?;
        Ok(Self {
            source: Some(source),
            device: Some(device),
            registrar: None,
            registration: None,
            mapper,
            session: Session::new(settings.timeout),
            settings,
            endpoint,
            display_name: endpoint.to_string(),
            stats: SessionStats::default(),
            last_log_count: 0,
        })
    }

    /// Bound endpoint
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    /// Connection state machine
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Diagnostic counters
    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    /// Advertise the endpoint through `registrar`
    ///
    /// Discovery is best-effort: a failed registration is logged and the
    /// session runs without it. The registrar is kept so `close` can
    /// withdraw the entry.
    pub fn advertise(&mut self, mut registrar: Box<dyn Registrar>, name: &str, ttl: u32) {
        match registrar.register(self.endpoint, name, ttl) {
            Ok(registration) => {
                info!("Advertising \"{}\" at {}", name, self.endpoint);
                self.registration = Some(registration);
                self.display_name = name.to_string();
            }
            Err(BridgeError::DiscoveryDisabled) => info!("Discovery disabled"),
            Err(e) => warn!("Discovery unavailable, continuing without it: {}", e),
        }
        self.registrar = Some(registrar);
    }

    /// Name the phone should pick: the advertised name, or the bare
    /// endpoint when nothing is advertised
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Log how a phone can connect
    pub fn announce_waiting(&self) {
        if self.registration.is_some() {
            info!("To connect select \"{}\" on your device,", self.display_name);
            info!("or connect manually to \"{}\"", self.endpoint);
        } else {
            info!("Connect manually to \"{}\"", self.endpoint);
        }
    }

    /// Run the poll loop until `shutdown` completes, then close
    ///
    /// Each tick drains waiting datagrams and checks the timeout clock.
    pub async fn run<F>(&mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        self.announce_waiting();

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }

                tick = ticker.tick() => {
                    self.poll(tick.into_std());
                }
            }
        }

        self.close();
    }

    /// One scheduler tick at time `now`
    pub fn poll(&mut self, now: Instant) -> PollReport {
        let mut report = PollReport::default();

        for _ in 0..MAX_DATAGRAMS_PER_POLL {
            let Some(source) = self.source.as_mut() else {
                break;
            };
            match source.try_recv() {
                Ok(Some(datagram)) => report.outcomes.push(self.handle_datagram(&datagram, now)),
                Ok(None) => break,
                Err(e) if socket::is_transient(&e) => break,
                Err(e) => {
                    warn!("UDP receive failed: {}", e);
                    break;
                }
            }
        }

        if let Some(disconnect) = self.session.check_timeout(now) {
            info!(
                "Timeout ({:.1} seconds), disconnected from {}",
                self.settings.timeout.as_secs_f64(),
                disconnect.peer
            );
            info!(
                "  (listened {} times per second, {} packets over {:.1}s)",
                disconnect.listen_rate as u64,
                disconnect.packets,
                disconnect.duration.as_secs_f64()
            );
            self.announce_waiting();
            report.disconnect = Some(disconnect);
        }

        self.session.record_poll();
        report
    }

    /// Decode, map and deliver one datagram
    ///
    /// Decoding and mapping happen before the session is touched, so a bad
    /// packet leaves the connection state unchanged.
    pub fn handle_datagram(&mut self, datagram: &Datagram, now: Instant) -> PacketOutcome {
        if self.session.is_foreign(datagram.from) {
            trace!("Ignoring packet from {}", datagram.from);
            self.stats.foreign += 1;
            return PacketOutcome::Foreign;
        }

        let readings = match decode(&datagram.payload) {
            Ok(readings) => readings,
            Err(e) => {
                debug!("Dropping packet from {}: {}", datagram.from, e);
                self.stats.malformed += 1;
                return PacketOutcome::Malformed;
            }
        };

        let events = match self.mapper.map(&readings) {
            Ok(events) => events,
            Err(e) => {
                warn!("Dropping packet from {}: {}", datagram.from, BridgeError::from(e));
                self.stats.mapping_failures += 1;
                return PacketOutcome::MappingFailed;
            }
        };

        let Some(device) = self.device.as_mut() else {
            return PacketOutcome::Closed;
        };

        match self.session.admit(datagram.from, now) {
            Admission::Connected => {
                info!("Connected to {}", datagram.from);
                self.stats.connections += 1;
            }
            Admission::Accepted => {}
            Admission::Rejected => {
                self.stats.foreign += 1;
                return PacketOutcome::Foreign;
            }
        }

        let frame = events
            .iter()
            .try_for_each(|event| device.emit(event.code, event.value))
            .and_then(|()| device.commit());

        if let Err(e) = frame {
            device.discard();
            error!("Frame dropped: {}", e);
            self.stats.frame_failures += 1;
            return PacketOutcome::FrameFailed;
        }

        self.stats.delivered += 1;
        if self.stats.delivered - self.last_log_count >= LOG_INTERVAL_PACKETS {
            info!(
                "Delivered {} frames ({} malformed, {} foreign)",
                self.stats.delivered, self.stats.malformed, self.stats.foreign
            );
            self.last_log_count = self.stats.delivered;
        }

        PacketOutcome::Delivered(events.len())
    }

    /// Release every resource the session holds
    ///
    /// Order: output device, socket, discovery entry. Each step runs even if
    /// an earlier one failed; failures are logged. Calling this again does
    /// nothing.
    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            debug!("Closing output device");
            if let Err(e) = device.close() {
                warn!("Failed to close output device: {}", e);
            }
        }

        if self.source.take().is_some() {
            debug!("Closed UDP endpoint {}", self.endpoint);
        }

        if let Some(mut registrar) = self.registrar.take() {
            if let Some(registration) = self.registration.take() {
                info!("Unregistering discovery service...");
                if let Err(e) = registrar.unregister(&registration) {
                    warn!("Failed to unregister discovery service: {}", e);
                }
            }
        }
    }

    /// Whether `close` has run
    pub fn is_closed(&self) -> bool {
        self.device.is_none() && self.source.is_none() && self.registrar.is_none()
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.close();
    }
}
