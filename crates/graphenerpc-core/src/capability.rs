//! Sub-API capability model.
//!
//! A Graphene node exposes several independently toggled RPC namespaces.
//! Callers say up front which ones a connection should negotiate; the
//! connection manager creates exactly one session per enabled capability.

/// One of the node's named sub-APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Database,
    History,
    NetworkBroadcast,
    Orders,
    Crypto,
}

impl Capability {
    /// Every capability, in negotiation-name order.
    pub const ALL: [Capability; 5] = [
        Capability::Database,
        Capability::History,
        Capability::NetworkBroadcast,
        Capability::Orders,
        Capability::Crypto,
    ];

    /// The exact name the node expects in the negotiation frame.
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::History => "history",
            Self::NetworkBroadcast => "network_broadcast",
            Self::Orders => "orders",
            Self::Crypto => "crypto",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Which sub-APIs a connection should negotiate.
///
/// A session exists for capability X after `init()` iff the flag for X was
/// set at connect time. An all-false set is rejected before any I/O.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApiFlags {
    pub database: bool,
    pub history: bool,
    pub network_broadcast: bool,
    pub orders: bool,
    pub crypto: bool,
}

impl ApiFlags {
    /// A flag set with exactly one capability enabled.
    pub fn only(capability: Capability) -> Self {
        Self::default().with(capability)
    }

    /// Builder-style enable.
    pub fn with(mut self, capability: Capability) -> Self {
        match capability {
            Capability::Database => self.database = true,
            Capability::History => self.history = true,
            Capability::NetworkBroadcast => self.network_broadcast = true,
            Capability::Orders => self.orders = true,
            Capability::Crypto => self.crypto = true,
        }
        self
    }

    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::Database => self.database,
            Capability::History => self.history,
            Capability::NetworkBroadcast => self.network_broadcast,
            Capability::Orders => self.orders,
            Capability::Crypto => self.crypto,
        }
    }

    /// Returns `true` if no capability is enabled.
    pub fn is_empty(&self) -> bool {
        self.enabled().is_empty()
    }

    /// The enabled capabilities, in `Capability::ALL` order.
    pub fn enabled(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|cap| self.contains(*cap))
            .collect()
    }
}
