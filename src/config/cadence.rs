use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Marketplace roles, which decide how urgently a session needs fresh alerts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Shopkeeper,
    DeliveryPartner,
    Admin,
}

impl Role {
    pub fn from_str_lossy(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "shopkeeper" | "seller" => Role::Shopkeeper,
            "delivery_partner" | "delivery" => Role::DeliveryPartner,
            "admin" => Role::Admin,
            _ => Role::Customer,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Customer => "customer",
            Role::Shopkeeper => "shopkeeper",
            Role::DeliveryPartner => "delivery_partner",
            Role::Admin => "admin",
        }
    }

    pub fn urgency(&self) -> UrgencyTier {
        match self {
            Role::DeliveryPartner | Role::Shopkeeper => UrgencyTier::Urgent,
            Role::Customer | Role::Admin => UrgencyTier::Background,
        }
    }
}

/// Polling tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum UrgencyTier {
    Urgent,     // assignments and approvals must surface within seconds
    Background, // plain refresh of the inbox
}

impl UrgencyTier {
    pub fn default_interval(&self) -> Duration {
        match self {
            UrgencyTier::Urgent => Duration::from_secs(5),
            UrgencyTier::Background => Duration::from_secs(30),
        }
    }
}

/// Resolve the poll interval for a role, honouring an explicit override.
pub fn poll_interval(role: Role, override_ms: Option<u64>) -> Duration {
    match override_ms {
        Some(ms) if ms > 0 => Duration::from_millis(ms),
        _ => role.urgency().default_interval(),
    }
}
