//! Shared domain types

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumIter};

/// Destination channel tag: the closed set of places a click can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, AsRefStr)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum Destination {
    ChatPlatform,
    MessagingApp,
    Marketplace,
}

impl Destination {
    /// Channel label recorded on Leads created for this destination
    pub fn lead_channel(&self) -> &'static str {
        match self {
            Self::ChatPlatform => "chat",
            Self::MessagingApp => "messaging",
            Self::Marketplace => "marketplace",
        }
    }

    /// Token-cookie lifetime in days; the marketplace cookie is shorter since
    /// purchase attribution lives outside this system entirely
    pub fn cookie_max_age_days(&self) -> i64 {
        match self {
            Self::ChatPlatform | Self::MessagingApp => 30,
            Self::Marketplace => 7,
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_ref())
    }
}

impl std::str::FromStr for Destination {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chat-platform" => Ok(Self::ChatPlatform),
            "messaging-app" => Ok(Self::MessagingApp),
            "marketplace" => Ok(Self::Marketplace),
            _ => Err(format!(
                "unknown destination: '{}'. Valid: chat-platform, messaging-app, marketplace",
                s
            )),
        }
    }
}
