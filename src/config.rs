use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use crate::check::{CheckOptions, MAX_IE_WAIT_MS};
use crate::farm::FarmOptions;
use crate::models::device::VendorFamily;
use crate::models::farm::CopySource;
use crate::smart::RenderMode;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub farm: FarmConfig,

    #[serde(default)]
    pub smart: SmartConfig,

    #[serde(default)]
    pub check: CheckConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FarmConfig {
    /// Directory receiving combined FARM files. Empty = current directory.
    pub output_dir: String,
    /// "disc" or "flash" (ATA only)
    pub copy_source: CopySource,
    /// Sectors per READ LOG EXT command. 0 = transport default.
    pub transfer_hint: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SmartConfig {
    /// "raw", "hybrid" or "analyzed"
    pub mode: RenderMode,
    /// Vendor family used when the device does not report one, e.g. "seagate".
    pub family: Option<VendorFamily>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Longest informational-exceptions wait in milliseconds (at most 1000).
    pub ie_wait_ms: u64,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for FarmConfig {
    fn default() -> Self {
        Self { output_dir: String::new(), copy_source: CopySource::Disc, transfer_hint: 0 }
    }
}

impl Default for SmartConfig {
    fn default() -> Self {
        Self { mode: RenderMode::Hybrid, family: None }
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self { ie_wait_ms: MAX_IE_WAIT_MS }
    }
}

// ── Conversions ───────────────────────────────────────────────────────

impl FarmConfig {
    pub fn options(&self) -> FarmOptions {
        FarmOptions { copy_source: self.copy_source, transfer_hint: self.transfer_hint }
    }

    pub fn output_dir(&self) -> PathBuf {
        if self.output_dir.trim().is_empty() {
            PathBuf::from(".")
        } else {
            PathBuf::from(&self.output_dir)
        }
    }
}

impl CheckConfig {
    pub fn options(&self) -> CheckOptions {
        CheckOptions { ie_wait_ms: self.ie_wait_ms.min(MAX_IE_WAIT_MS) }
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    pub fn load() -> Self {
        match try_load() {
            Ok(c)  => c,
            Err(e) => {
                log::debug!("using default configuration: {}", e);
                // Write defaults on first run (best-effort)
                let _ = try_write_defaults();
                Config::default()
            }
        }
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("drivetel").join("drivetel.toml"))
    }

    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

fn try_load() -> Result<Config> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    let text = fs::read_to_string(path)?;
    Config::parse(&text)
}

fn try_write_defaults() -> Result<()> {
    let path = Config::config_path().ok_or_else(|| anyhow::anyhow!("no config dir"))?;
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# drivetel configuration\n# Generated on first run, edit freely\n\n{}", text))?;
    Ok(())
}
