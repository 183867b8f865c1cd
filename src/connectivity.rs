//! Connectivity Module
//!
//! Tracks online/offline state and publishes it to subscribers through a
//! `tokio::sync::watch` channel.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::clock::Clock;

// == Connection Type ==
/// Network quality reported by the host, when it reports one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionType {
    #[serde(rename = "slow-2g")]
    Slow2g,
    #[serde(rename = "2g")]
    TwoG,
    #[serde(rename = "3g")]
    ThreeG,
    #[serde(rename = "4g")]
    FourG,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl ConnectionType {
    /// Parses a host descriptor; absent or unrecognised values are `Unknown`.
    pub fn from_descriptor(descriptor: Option<&str>) -> Self {
        descriptor
            .and_then(|d| d.parse().ok())
            .unwrap_or(ConnectionType::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Slow2g => "slow-2g",
            ConnectionType::TwoG => "2g",
            ConnectionType::ThreeG => "3g",
            ConnectionType::FourG => "4g",
            ConnectionType::Unknown => "unknown",
        }
    }
}

impl FromStr for ConnectionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slow-2g" => Ok(ConnectionType::Slow2g),
            "2g" => Ok(ConnectionType::TwoG),
            "3g" => Ok(ConnectionType::ThreeG),
            "4g" => Ok(ConnectionType::FourG),
            "unknown" => Ok(ConnectionType::Unknown),
            other => Err(format!("unrecognised connection type '{other}'")),
        }
    }
}

impl fmt::Display for ConnectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Connectivity State ==
/// Snapshot of the connectivity signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectivityState {
    /// Current status
    pub is_online: bool,
    /// Set on the first transition to offline and never cleared
    pub was_offline: bool,
    /// Time of the most recent transition to online
    pub last_online_time: Option<DateTime<Utc>>,
    /// Network quality descriptor
    pub connection_type: ConnectionType,
}

// == Connectivity Monitor ==
/// Owner of the connectivity signal.
///
/// Cloning yields another handle to the same signal.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    sender: Arc<watch::Sender<ConnectivityState>>,
    clock: Arc<dyn Clock>,
}

impl ConnectivityMonitor {
    /// Creates a monitor initialised from the host's current status.
    pub fn new(initially_online: bool, clock: Arc<dyn Clock>) -> Self {
        let state = ConnectivityState {
            is_online: initially_online,
            was_offline: false,
            last_online_time: initially_online.then(|| clock.now_utc()),
            connection_type: ConnectionType::Unknown,
        };
        let (sender, _) = watch::channel(state);

        Self {
            sender: Arc::new(sender),
            clock,
        }
    }

    /// Returns the current state.
    pub fn state(&self) -> ConnectivityState {
        self.sender.borrow().clone()
    }

    pub fn is_online(&self) -> bool {
        self.sender.borrow().is_online
    }

    /// Subscribes to state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectivityState> {
        self.sender.subscribe()
    }

    // == Set Online ==
    /// Reports that the host is online.
    ///
    /// Returns true if this was a transition from offline.
    pub fn set_online(&self) -> bool {
        let now = self.clock.now_utc();
        let changed = self.sender.send_if_modified(|state| {
            if state.is_online {
                return false;
            }
            state.is_online = true;
            state.last_online_time = Some(now);
            true
        });

        if changed {
            info!("Connectivity restored");
        }
        changed
    }

    // == Set Offline ==
    /// Reports that the host is offline.
    ///
    /// Returns true if this was a transition from online.
    pub fn set_offline(&self) -> bool {
        let changed = self.sender.send_if_modified(|state| {
            if !state.is_online {
                return false;
            }
            state.is_online = false;
            state.was_offline = true;
            true
        });

        if changed {
            info!("Connectivity lost, serving from offline cache");
        }
        changed
    }

    /// Reports a new network quality descriptor.
    pub fn set_connection_type(&self, descriptor: Option<&str>) {
        let connection_type = ConnectionType::from_descriptor(descriptor);
        self.sender.send_if_modified(|state| {
            if state.connection_type == connection_type {
                return false;
            }
            debug!("Connection type changed to {}", connection_type);
            state.connection_type = connection_type;
            true
        });
    }
}
