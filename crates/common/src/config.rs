use serde::{Deserialize, Serialize};

/// Top-level IPAM engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpamConfig {
    #[serde(default = "default_host_bits")]
    pub host_bits: HostBitsPolicy,
    #[serde(default)]
    pub split: SplitConfig,
}

impl Default for IpamConfig {
    fn default() -> Self {
        Self {
            host_bits: default_host_bits(),
            split: SplitConfig::default(),
        }
    }
}

/// How to treat CIDR input whose host bits are non-zero (e.g. `10.0.0.5/24`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostBitsPolicy {
    /// Silently mask down to the network address. The safer default for a
    /// management tool: operators routinely paste interface addresses.
    Mask,
    /// Fail with a format error.
    Reject,
}

/// Policy knobs for the subnet split planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Splitting is only offered for blocks with more addresses than this.
    #[serde(default = "default_split_min_addresses")]
    pub min_addresses: u128,
    /// How many prefix lengths beyond the block's own to enumerate.
    #[serde(default = "default_split_max_delta")]
    pub max_delta: u8,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            min_addresses: default_split_min_addresses(),
            max_delta: default_split_max_delta(),
        }
    }
}

// Default value helpers
fn default_host_bits() -> HostBitsPolicy {
    HostBitsPolicy::Mask
}
fn default_split_min_addresses() -> u128 {
    4
}
fn default_split_max_delta() -> u8 {
    8
}

impl IpamConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.split.max_delta == 0 {
            anyhow::bail!("split.max_delta must be at least 1");
        }
        if self.split.max_delta > 128 {
            anyhow::bail!(
                "split.max_delta {} exceeds the widest address family (128 bits)",
                self.split.max_delta
            );
        }
        Ok(())
    }
}
