//! Networking: room directory, peer links, host fanout
//!
//! This module provides:
//! - mDNS-SD room directory: a host advertises its room code as the service
//!   instance name; a guest resolves the typed code to a TCP endpoint
//! - TCP server for hosting rooms (default port 56110 with auto-increment)
//! - TCP client for joining rooms
//! - Length-prefixed JSON protocol for host/guest messaging
//!
//! The room code is the dial address: guests never see an IP until the
//! directory resolves the code they typed.

pub mod client;
pub mod peer;
pub mod protocol;
pub mod server;

pub use client::Client;
pub use peer::Link;
pub use protocol::{Message, PlayerInfo};
pub use server::{Server, ServerEvent};

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use std::sync::mpsc;
use std::thread;

/// Service type for room advertisements
pub const SERVICE_TYPE: &str = "_scramble._tcp.local.";

/// Current protocol version
pub const PROTOCOL_VERSION: &str = "1";

/// A resolved room advertisement.
#[derive(Debug, Clone)]
pub struct FoundRoom {
    /// The room code (service instance name)
    pub room_code: String,
    /// Host's display name
    pub host_name: String,
    /// Protocol version the host is running
    pub version: String,
    /// IP addresses of the host
    pub addresses: Vec<std::net::IpAddr>,
    /// Port the host is listening on
    pub port: u16,
}

/// Publishes a hosted room's code on the local network.
pub struct RoomDirectory {
    daemon: ServiceDaemon,
    registered_instance: Option<String>,
}

impl RoomDirectory {
    pub fn new() -> Result<Self, String> {
        let daemon =
            ServiceDaemon::new().map_err(|e| format!("Failed to create mDNS daemon: {}", e))?;

        Ok(Self {
            daemon,
            registered_instance: None,
        })
    }

    /// Advertise a room under its code.
    ///
    /// The instance name must be unique on the network; a registration
    /// failure is reported as a code collision so the caller can retry with
    /// a fresh code.
    pub fn advertise(&mut self, room_code: &str, host_name: &str, port: u16) -> Result<(), String> {
        let properties: Vec<(&str, &str)> = vec![
            ("version", PROTOCOL_VERSION),
            ("host", host_name),
        ];

        let hostname = format!("{}.local.", room_code.to_lowercase());

        let service_info = ServiceInfo::new(
            SERVICE_TYPE,
            room_code,
            &hostname,
            (),
            port,
            &properties[..],
        )
        .map_err(|e| format!("Failed to create service info: {}", e))?
        .enable_addr_auto();

        self.daemon
            .register(service_info)
            .map_err(|e| format!("Failed to register room code: {}", e))?;

        self.registered_instance = Some(room_code.to_string());
        Ok(())
    }

    /// Stop advertising on the network
    pub fn stop_advertising(&mut self) -> Result<(), String> {
        if let Some(instance_name) = self.registered_instance.take() {
            let fullname = format!("{}.{}", instance_name, SERVICE_TYPE);
            self.daemon
                .unregister(&fullname)
                .map_err(|e| format!("Failed to unregister room: {}", e))?;
        }
        Ok(())
    }

    /// Shutdown the directory daemon.
    pub fn shutdown(self) -> Result<(), String> {
        self.daemon
            .shutdown()
            .map_err(|e| format!("Failed to shutdown daemon: {}", e))?;
        Ok(())
    }
}

impl Drop for RoomDirectory {
    fn drop(&mut self) {
        let _ = self.stop_advertising();
    }
}

/// Browses the local network for one specific room code.
pub struct RoomFinder {
    daemon: ServiceDaemon,
    rx: mpsc::Receiver<FoundRoom>,
}

impl RoomFinder {
    /// Start looking for a room code.
    pub fn start(room_code: &str) -> Result<Self, String> {
        let daemon =
            ServiceDaemon::new().map_err(|e| format!("Failed to create mDNS daemon: {}", e))?;
        let receiver = daemon
            .browse(SERVICE_TYPE)
            .map_err(|e| format!("Failed to start browsing: {}", e))?;

        let (tx, rx) = mpsc::channel();
        let wanted = room_code.to_uppercase();

        thread::spawn(move || {
            while let Ok(event) = receiver.recv() {
                if let ServiceEvent::ServiceResolved(info) = event {
                    // Instance name format: "CODE._scramble._tcp.local."
                    let code = info
                        .get_fullname()
                        .strip_suffix(&format!(".{}", SERVICE_TYPE))
                        .unwrap_or("")
                        .to_uppercase();
                    if code != wanted {
                        continue;
                    }

                    let properties = info.get_properties();
                    let host_name = properties
                        .get_property_val_str("host")
                        .unwrap_or_default()
                        .to_string();
                    let version = properties
                        .get_property_val_str("version")
                        .unwrap_or(PROTOCOL_VERSION)
                        .to_string();

                    // Collect addresses, preferring IPv4 over IPv6
                    // IPv6 link-local addresses (fe80::) require scope_id
                    // for TCP connections, which IpAddr doesn't carry
                    let mut addresses: Vec<std::net::IpAddr> = info
                        .get_addresses()
                        .iter()
                        .map(|s| s.to_ip_addr())
                        .collect();
                    addresses.sort_by_key(|addr| match addr {
                        std::net::IpAddr::V4(_) => 0,
                        std::net::IpAddr::V6(_) => 1,
                    });

                    let found = FoundRoom {
                        room_code: code,
                        host_name,
                        version,
                        addresses,
                        port: info.get_port(),
                    };

                    if tx.send(found).is_err() {
                        break;
                    }
                }
            }
        });

        Ok(Self { daemon, rx })
    }

    /// Poll for a resolved room, non-blocking.
    pub fn poll(&mut self) -> Option<FoundRoom> {
        self.rx.try_recv().ok()
    }

    /// Stop browsing.
    pub fn stop(self) -> Result<(), String> {
        self.daemon
            .stop_browse(SERVICE_TYPE)
            .map_err(|e| format!("Failed to stop browsing: {}", e))?;
        self.daemon
            .shutdown()
            .map_err(|e| format!("Failed to shutdown daemon: {}", e))?;
        Ok(())
    }
}
