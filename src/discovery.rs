//! # Service Discovery
//!
//! Advertises the session endpoint on the local network so the phone client
//! can find it by name instead of by address.

use std::collections::HashMap;
use std::net::SocketAddr;

use mdns_sd::{ServiceDaemon, ServiceInfo};
use tracing::{debug, info};

use crate::error::{BridgeError, Result};

/// Default DNS-SD service type
pub const DEFAULT_SERVICE_TYPE: &str = "_yoke._udp.local.";

/// Default record TTL in seconds
pub const DEFAULT_TTL_SECS: u32 = 10;

/// Handle of an active advertisement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    fullname: String,
}

impl Registration {
    pub fn new(fullname: String) -> Self {
        Self { fullname }
    }

    /// Fully qualified instance name, e.g. `host-Yoke-1._yoke._udp.local.`
    pub fn fullname(&self) -> &str {
        &self.fullname
    }
}

/// Publishes and withdraws the session endpoint
#[cfg_attr(test, mockall::automock)]
pub trait Registrar: Send {
    /// Advertise `endpoint` under the instance `name`
    ///
    /// # Errors
    ///
    /// Returns `Discovery` if the record cannot be published
    fn register(&mut self, endpoint: SocketAddr, name: &str, ttl: u32) -> Result<Registration>;

    /// Withdraw a previous advertisement
    fn unregister(&mut self, registration: &Registration) -> Result<()>;
}

/// Builds the instance name shown to the phone: `<hostname>-<name>-<id>`
///
/// # Examples
///
/// ```
/// use yoke_bridge::discovery::network_name;
///
/// assert_eq!(network_name("desk", "Yoke", 1), "desk-Yoke-1");
/// ```
pub fn network_name(hostname: &str, name: &str, id: u32) -> String {
    format!("{}-{}-{}", hostname, name, id)
}

/// Host name of this machine, lossy-converted to UTF-8
pub fn local_hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

/// mDNS/DNS-SD registrar
pub struct MdnsRegistrar {
    daemon: Option<ServiceDaemon>,
    service_type: String,
    hostname: String,
}

impl MdnsRegistrar {
    /// Start an mDNS responder for `service_type`
    ///
    /// # Errors
    ///
    /// Returns `Discovery` if the responder cannot start (no multicast
    /// interface, socket permissions)
    pub fn new(service_type: &str) -> Result<Self> {
        let daemon = ServiceDaemon::new().map_err(|e| {
            BridgeError::Discovery(format!("Failed to start mDNS responder: {}", e))
        })?;

        Ok(Self {
            daemon: Some(daemon),
            service_type: service_type.to_string(),
            hostname: local_hostname(),
        })
    }

    fn daemon(&self) -> Result<&ServiceDaemon> {
        self.daemon
            .as_ref()
            .ok_or_else(|| BridgeError::Discovery("mDNS responder is shut down".to_string()))
    }
}

impl Registrar for MdnsRegistrar {
    fn register(&mut self, endpoint: SocketAddr, name: &str, ttl: u32) -> Result<Registration> {
        let host = format!("{}.local.", self.hostname);
        let ip = if endpoint.ip().is_unspecified() {
            String::new()
        } else {
            endpoint.ip().to_string()
        };

        let mut info = ServiceInfo::new(
            &self.service_type,
            name,
            &host,
            ip.as_str(),
            endpoint.port(),
            HashMap::<String, String>::new(),
        )
        .map_err(|e| BridgeError::Discovery(format!("Invalid service record: {}", e)))?;

        if endpoint.ip().is_unspecified() {
            info = info.enable_addr_auto();
        }

        let fullname = info.get_fullname().to_string();

        // mdns-sd manages record TTLs itself
        debug!("Registering {} (requested ttl {}s)", fullname, ttl);

        self.daemon()?
            .register(info)
            .map_err(|e| BridgeError::Discovery(format!("Failed to register {}: {}", fullname, e)))?;

        info!("Registered {}", fullname);
        Ok(Registration::new(fullname))
    }

    fn unregister(&mut self, registration: &Registration) -> Result<()> {
        let daemon = self.daemon()?;
        daemon.unregister(registration.fullname()).map_err(|e| {
            BridgeError::Discovery(format!(
                "Failed to unregister {}: {}",
                registration.fullname(),
                e
            ))
        })?;

        if let Some(daemon) = self.daemon.take() {
            daemon
                .shutdown()
                .map_err(|e| BridgeError::Discovery(format!("Failed to stop mDNS responder: {}", e)))?;
        }
        Ok(())
    }
}

/// Registrar used when discovery is turned off
#[derive(Debug, Default)]
pub struct DisabledRegistrar;

impl Registrar for DisabledRegistrar {
    fn register(&mut self, _endpoint: SocketAddr, _name: &str, _ttl: u32) -> Result<Registration> {
        Err(BridgeError::DiscoveryDisabled)
    }

    fn unregister(&mut self, _registration: &Registration) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_network_name() {
        assert_eq!(network_name("studio", "Yoke", 1), "studio-Yoke-1");
        assert_eq!(network_name("studio", "Wheel", 2), "studio-Wheel-2");
    }

    #[test]
    fn test_local_hostname_not_empty() {
        assert!(!local_hostname().is_empty());
    }

    #[test]
    fn test_disabled_registrar_refuses() {
        let mut registrar = DisabledRegistrar;
        let endpoint: SocketAddr = "127.0.0.1:9000".parse().unwrap();

        let err = assert_err!(registrar.register(endpoint, "x", DEFAULT_TTL_SECS));
        assert!(matches!(err, BridgeError::DiscoveryDisabled));

        let registration = Registration::new("x._yoke._udp.local.".to_string());
        assert_ok!(registrar.unregister(&registration));
    }

    #[test]
    fn test_registration_fullname() {
        let registration = Registration::new("host-Yoke-1._yoke._udp.local.".to_string());
        assert_eq!(registration.fullname(), "host-Yoke-1._yoke._udp.local.");
    }

    #[test]
    #[ignore] // Requires a multicast-capable interface
    fn test_mdns_register_and_unregister() {
        let mut registrar = MdnsRegistrar::new(DEFAULT_SERVICE_TYPE).unwrap();
        let endpoint: SocketAddr = "0.0.0.0:45123".parse().unwrap();

        let registration = registrar
            .register(endpoint, &network_name("test", "Yoke", 9), DEFAULT_TTL_SECS)
            .unwrap();
        assert!(registration.fullname().ends_with(DEFAULT_SERVICE_TYPE));

        registrar.unregister(&registration).unwrap();
    }
}
