use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::Error;

/// How the storefront talks to the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntegrationType {
    /// Full-page redirect to the hosted payment page.
    #[default]
    #[serde(rename = "hosted")]
    Hosted,
    /// Hosted payment page shown in a modal overlay.
    #[serde(rename = "hosted_modal")]
    HostedModal,
    /// Hosted payment page embedded in an iframe.
    #[serde(rename = "iframe")]
    HostedEmbedded,
    /// Card details collected by the storefront and posted server-to-server.
    #[serde(rename = "direct")]
    Direct,
    /// Hosted payment page on the 3-D Secure v2 test environment.
    #[serde(rename = "hosted_3DSV2")]
    HostedThreeDsV2,
    /// Direct integration on the 3-D Secure v2 test environment.
    #[serde(rename = "direct_3DSV2")]
    DirectThreeDsV2,
}

impl IntegrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::Hosted => "hosted",
            IntegrationType::HostedModal => "hosted_modal",
            IntegrationType::HostedEmbedded => "iframe",
            IntegrationType::Direct => "direct",
            IntegrationType::HostedThreeDsV2 => "hosted_3DSV2",
            IntegrationType::DirectThreeDsV2 => "direct_3DSV2",
        }
    }

    pub fn is_hosted(&self) -> bool {
        !self.is_direct()
    }

    pub fn is_direct(&self) -> bool {
        matches!(
            self,
            IntegrationType::Direct | IntegrationType::DirectThreeDsV2
        )
    }
}

impl Display for IntegrationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            IntegrationType::Hosted,
            IntegrationType::HostedModal,
            IntegrationType::HostedEmbedded,
            IntegrationType::Direct,
            IntegrationType::HostedThreeDsV2,
            IntegrationType::DirectThreeDsV2,
        ]
        .into_iter()
        .find(|integration| integration.as_str() == s.trim())
        .ok_or_else(|| Error::UnknownIntegration(s.to_owned()))
    }
}
