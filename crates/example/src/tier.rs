//! App service pricing tiers.

use core::fmt;
use core::str::FromStr;

use stratus_config::ConfigError;

/// Pricing tier of an app service plan.
///
/// Parsed case-insensitively from the `appServicePlanTier` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PricingTier {
    /// Shared infrastructure, no always-on, 32-bit workers.
    Free,
    /// Shared infrastructure.
    Shared,
    /// Dedicated, entry level.
    Basic,
    /// Dedicated.
    Standard,
    /// Dedicated, premium hardware.
    Premium,
    /// Dedicated, second premium generation.
    PremiumV2,
    /// Dedicated, third premium generation.
    PremiumV3,
    /// App service environment.
    Isolated,
    /// App service environment, second generation.
    IsolatedV2,
    /// Consumption plan.
    Dynamic,
    /// Elastic premium plan.
    ElasticPremium,
}

impl PricingTier {
    const ALL: [PricingTier; 11] = [
        PricingTier::Free,
        PricingTier::Shared,
        PricingTier::Basic,
        PricingTier::Standard,
        PricingTier::Premium,
        PricingTier::PremiumV2,
        PricingTier::PremiumV3,
        PricingTier::Isolated,
        PricingTier::IsolatedV2,
        PricingTier::Dynamic,
        PricingTier::ElasticPremium,
    ];

    /// Returns the tier's canonical name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            PricingTier::Free => "Free",
            PricingTier::Shared => "Shared",
            PricingTier::Basic => "Basic",
            PricingTier::Standard => "Standard",
            PricingTier::Premium => "Premium",
            PricingTier::PremiumV2 => "PremiumV2",
            PricingTier::PremiumV3 => "PremiumV3",
            PricingTier::Isolated => "Isolated",
            PricingTier::IsolatedV2 => "IsolatedV2",
            PricingTier::Dynamic => "Dynamic",
            PricingTier::ElasticPremium => "ElasticPremium",
        }
    }

    /// Returns true for the free tier.
    #[must_use]
    pub fn is_free(&self) -> bool {
        *self == PricingTier::Free
    }

    /// Parses the tier stored under `key`, mapping failures to
    /// [`ConfigError::Invalid`].
    pub fn from_setting(key: &str, value: &str) -> Result<Self, ConfigError> {
        value
            .parse()
            .map_err(|err: UnknownTier| ConfigError::invalid(key, value, err.to_string()))
    }
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`PricingTier`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pricing tier '{0}'")]
pub struct UnknownTier(String);

impl FromStr for PricingTier {
    type Err = UnknownTier;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        PricingTier::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownTier(s.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("free".parse::<PricingTier>(), Ok(PricingTier::Free));
        assert_eq!("FREE".parse::<PricingTier>(), Ok(PricingTier::Free));
        assert_eq!(" standard ".parse::<PricingTier>(), Ok(PricingTier::Standard));
        assert_eq!("premiumv3".parse::<PricingTier>(), Ok(PricingTier::PremiumV3));
    }

    #[test]
    fn names_round_trip() {
        for tier in PricingTier::ALL {
            assert_eq!(tier.to_string().parse::<PricingTier>(), Ok(tier));
        }
    }

    #[test]
    fn only_free_is_free() {
        assert!(PricingTier::Free.is_free());
        assert!(!PricingTier::Shared.is_free());
        assert!(!PricingTier::Standard.is_free());
    }

    #[test]
    fn unknown_tier_is_invalid_config() {
        let err = PricingTier::from_setting("appServicePlanTier", "Gold").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref key, ref value, .. }
                if key == "appServicePlanTier" && value == "Gold"
        ));
    }
}
