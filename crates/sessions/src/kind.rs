//! Session kind as a tagged variant (§9 Design Notes): shared fields live on
//! `SessionRecord`, kind-specific identity lives here.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteIdentity {
    pub uuid: String,
    pub name: String,
    /// Room/location tag; when present, prepended to user text as
    /// `[Location: L] ` for the LLM input (history keeps the raw form).
    pub location: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Capabilities {
    pub local_asr: bool,
    pub local_tts: bool,
    pub wake_word: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionTier {
    Satellite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SessionKind {
    Local,
    LegacyNet {
        ip: String,
    },
    Satellite {
        tier: SessionTier,
        identity: SatelliteIdentity,
        caps: Capabilities,
    },
    Web,
}

impl SessionKind {
    pub fn label(&self) -> &'static str {
        match self {
            SessionKind::Local => "local",
            SessionKind::LegacyNet { .. } => "legacy_network",
            SessionKind::Satellite { .. } => "satellite",
            SessionKind::Web => "web",
        }
    }

    pub fn satellite_uuid(&self) -> Option<&str> {
        match self {
            SessionKind::Satellite { identity, .. } => Some(&identity.uuid),
            _ => None,
        }
    }

    pub fn legacy_ip(&self) -> Option<&str> {
        match self {
            SessionKind::LegacyNet { ip } => Some(ip),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&str> {
        match self {
            SessionKind::Satellite { identity, .. } => identity.location.as_deref(),
            _ => None,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        match self {
            SessionKind::Satellite { caps, .. } => *caps,
            _ => Capabilities::default(),
        }
    }
}
