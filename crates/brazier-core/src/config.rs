use crate::error::{BrazierError, Result};
use crate::position::{default_sites, Position, DEFAULT_WAITING_AREA};
use crate::types::WorldPoint;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub const CONFIG_FILE: &str = "brazier.yaml";

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// SurvivalConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivalConfig {
    #[serde(default = "default_warmth_threshold")]
    pub warmth_threshold: u32,
    /// Name fragment used to find a potion in the inventory.
    #[serde(default = "default_potion_name")]
    pub potion_name: String,
    /// Inventory menu index of the "drink" action.
    #[serde(default = "default_potion_action")]
    pub potion_action: u8,
}

fn default_warmth_threshold() -> u32 {
    65
}

fn default_potion_name() -> String {
    "Rejuvenation".to_string()
}

fn default_potion_action() -> u8 {
    2
}

impl Default for SurvivalConfig {
    fn default() -> Self {
        Self {
            warmth_threshold: default_warmth_threshold(),
            potion_name: default_potion_name(),
            potion_action: default_potion_action(),
        }
    }
}

// ---------------------------------------------------------------------------
// SupplyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupplyConfig {
    /// Roots to chop before fletching.
    #[serde(default = "default_root_target")]
    pub root_target: u32,
    #[serde(default = "default_herb_target")]
    pub herb_target: u32,
    #[serde(default = "default_vial_target")]
    pub vial_target: u32,
    /// Potions on hand below which the crates are raided for more vials.
    #[serde(default = "default_min_potions")]
    pub min_potions: u32,
    /// Ticks without experience before an activity is re-issued.
    #[serde(default = "default_retry_ticks")]
    pub retry_ticks: u64,
    /// Tiles from a walk target that count as arrived.
    #[serde(default = "default_arrival_radius")]
    pub arrival_radius: u32,
}

fn default_root_target() -> u32 {
    10
}

fn default_herb_target() -> u32 {
    5
}

fn default_vial_target() -> u32 {
    5
}

fn default_min_potions() -> u32 {
    2
}

fn default_retry_ticks() -> u64 {
    4
}

fn default_arrival_radius() -> u32 {
    2
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            root_target: default_root_target(),
            herb_target: default_herb_target(),
            vial_target: default_vial_target(),
            min_potions: default_min_potions(),
            retry_ticks: default_retry_ticks(),
            arrival_radius: default_arrival_radius(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub survival: SurvivalConfig,
    #[serde(default)]
    pub supplies: SupplyConfig,
    #[serde(default = "default_waiting_area")]
    pub waiting_area: WorldPoint,
    #[serde(default = "default_sites")]
    pub sites: Vec<Position>,
}

fn default_version() -> u32 {
    1
}

fn default_waiting_area() -> WorldPoint {
    DEFAULT_WAITING_AREA
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            survival: SurvivalConfig::default(),
            supplies: SupplyConfig::default(),
            waiting_area: default_waiting_area(),
            sites: default_sites(),
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    /// Load `path` if it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(path, data.as_bytes())
    }

    /// Write the default config to `path` unless a file is already there.
    /// Returns true if written.
    pub fn write_default(path: &Path) -> Result<bool> {
        let data = serde_yaml::to_string(&Config::default())?;
        crate::io::write_if_missing(path, data.as_bytes())
    }

    /// Fail on any error-level warning.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(BrazierError::InvalidConfig(errors.join("; ")))
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.sites.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "no sites configured".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for site in &self.sites {
            if !seen.insert(site.name.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("duplicate site name '{}'", site.name),
                });
            }
            if site.brazier.distance(site.roots) > 40 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "site '{}' has roots {} tiles from its brazier",
                        site.name,
                        site.brazier.distance(site.roots)
                    ),
                });
            }
        }

        if self.sites.len() == 1 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "only one site configured; every cycle will reuse it".to_string(),
            });
        }

        let supplies = &self.supplies;
        for (name, value) in [
            ("root_target", supplies.root_target),
            ("herb_target", supplies.herb_target),
            ("vial_target", supplies.vial_target),
        ] {
            if value == 0 {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!("supplies.{name} is 0; that step will be skipped"),
                });
            }
        }
        if supplies.herb_target > supplies.vial_target {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!(
                    "supplies.herb_target ({}) exceeds vial_target ({}); extra herbs are wasted",
                    supplies.herb_target, supplies.vial_target
                ),
            });
        }
        if supplies.retry_ticks == 0 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "supplies.retry_ticks is 0; activities are re-issued every tick".to_string(),
            });
        }

        if self.survival.warmth_threshold > 100 {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: format!(
                    "survival.warmth_threshold is {} (warmth never exceeds 100)",
                    self.survival.warmth_threshold
                ),
            });
        }
        if self.survival.potion_name.trim().is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "survival.potion_name is empty".to_string(),
            });
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
