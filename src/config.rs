//! Deployment configuration.
//!
//! `ServiceConfig` is what operators write (JSON file, `BRIDGEBOOK_*` environment,
//! CLI flags, applied in that order over the defaults). `ServiceConfig::validate`
//! turns it into a `ValidatedConfig` once at startup. An unset root folder does not
//! stop the service: it is captured so that every listing answers with a
//! configuration error without touching any folder.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::record::SchemaVariant;
use crate::timefmt;

/// Placeholder shipped in the setup instructions; treated as "not configured".
pub const ROOT_FOLDER_PLACEHOLDER: &str = "ここにフォルダIDを貼り付け";

pub const DEFAULT_SHEET_NAME: &str = "点検データ";
pub const DEFAULT_PROVISION_SHEET_NAME: &str = "下面";
pub const DEFAULT_HTTP_PORT: u16 = 8787;

/// True for the values that mean "root folder id was never set".
pub fn is_unset_root(id: &str) -> bool {
    let t = id.trim();
    t.is_empty() || t == ROOT_FOLDER_PLACEHOLDER || t.eq_ignore_ascii_case("<unset>")
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServiceConfig {
    pub root_folder_id: String,
    pub schema_variant: SchemaVariant,
    pub default_sheet_name: String,
    pub provision_sheet_name: String,
    /// Display timezone as minutes east of UTC.
    pub utc_offset_minutes: i32,
    pub data_root: PathBuf,
    pub http_port: u16,
    /// Base for listing entry urls; defaults to the local HTTP address.
    pub public_base_url: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            root_folder_id: ROOT_FOLDER_PLACEHOLDER.to_string(),
            schema_variant: SchemaVariant::B,
            default_sheet_name: DEFAULT_SHEET_NAME.to_string(),
            provision_sheet_name: DEFAULT_PROVISION_SHEET_NAME.to_string(),
            utc_offset_minutes: timefmt::JST_OFFSET_MINUTES,
            data_root: PathBuf::from("data"),
            http_port: DEFAULT_HTTP_PORT,
            public_base_url: None,
        }
    }
}

fn find_arg(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

impl ServiceConfig {
    pub fn load_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_slice(&bytes).with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Apply `BRIDGEBOOK_*` variables through `lookup` (usually `std::env::var`).
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(v) = lookup("BRIDGEBOOK_ROOT_FOLDER_ID") { self.root_folder_id = v; }
        if let Some(v) = lookup("BRIDGEBOOK_SCHEMA_VARIANT") {
            self.schema_variant = v.parse().map_err(|e: String| anyhow!("BRIDGEBOOK_SCHEMA_VARIANT: {}", e))?;
        }
        if let Some(v) = lookup("BRIDGEBOOK_DEFAULT_SHEET") { self.default_sheet_name = v; }
        if let Some(v) = lookup("BRIDGEBOOK_PROVISION_SHEET") { self.provision_sheet_name = v; }
        if let Some(v) = lookup("BRIDGEBOOK_UTC_OFFSET_MINUTES") {
            self.utc_offset_minutes = v.trim().parse().with_context(|| format!("BRIDGEBOOK_UTC_OFFSET_MINUTES: '{}'", v))?;
        }
        if let Some(v) = lookup("BRIDGEBOOK_DATA_ROOT") { self.data_root = PathBuf::from(v); }
        if let Some(v) = lookup("BRIDGEBOOK_HTTP_PORT") {
            self.http_port = v.trim().parse().with_context(|| format!("BRIDGEBOOK_HTTP_PORT: '{}'", v))?;
        }
        if let Some(v) = lookup("BRIDGEBOOK_PUBLIC_URL") { self.public_base_url = Some(v); }
        Ok(())
    }

    /// Apply CLI flags; unknown arguments are left for the caller.
    pub fn apply_args(&mut self, args: &[String]) -> Result<()> {
        if let Some(v) = find_arg(args, "--root-folder") { self.root_folder_id = v; }
        if let Some(v) = find_arg(args, "--variant") {
            self.schema_variant = v.parse().map_err(|e: String| anyhow!("--variant: {}", e))?;
        }
        if let Some(v) = find_arg(args, "--default-sheet") { self.default_sheet_name = v; }
        if let Some(v) = find_arg(args, "--provision-sheet") { self.provision_sheet_name = v; }
        if let Some(v) = find_arg(args, "--utc-offset-minutes") {
            self.utc_offset_minutes = v.parse().with_context(|| format!("--utc-offset-minutes: '{}'", v))?;
        }
        if let Some(v) = find_arg(args, "--data-root") { self.data_root = PathBuf::from(v); }
        if let Some(v) = find_arg(args, "--http-port") {
            self.http_port = v.parse().with_context(|| format!("--http-port: '{}'", v))?;
        }
        if let Some(v) = find_arg(args, "--public-url") { self.public_base_url = Some(v); }
        Ok(())
    }

    /// defaults → config file (`--config` or `BRIDGEBOOK_CONFIG`) → environment → flags
    pub fn from_sources(args: &[String]) -> Result<Self> {
        let file = find_arg(args, "--config").or_else(|| std::env::var("BRIDGEBOOK_CONFIG").ok());
        let mut cfg = match file {
            Some(p) => Self::load_file(Path::new(&p))?,
            None => Self::default(),
        };
        cfg.apply_env_from(|k| std::env::var(k).ok())?;
        cfg.apply_args(args)?;
        Ok(cfg)
    }

    pub fn validate(&self) -> AppResult<ValidatedConfig> {
        let offset = timefmt::fixed_offset(self.utc_offset_minutes).ok_or_else(|| {
            AppError::configuration("invalid_utc_offset".to_string(), format!("utc_offset_minutes out of range: {}", self.utc_offset_minutes))
        })?;
        if self.default_sheet_name.is_empty() {
            return Err(AppError::configuration("invalid_sheet_name", "default_sheet_name must not be empty"));
        }
        if self.provision_sheet_name.is_empty() {
            return Err(AppError::configuration("invalid_sheet_name", "provision_sheet_name must not be empty"));
        }
        let root_folder = if is_unset_root(&self.root_folder_id) { None } else { Some(self.root_folder_id.trim().to_string()) };
        let public_base_url = self.public_base_url.clone()
            .unwrap_or_else(|| format!("http://127.0.0.1:{}", self.http_port))
            .trim_end_matches('/')
            .to_string();
        Ok(ValidatedConfig {
            root_folder,
            schema_variant: self.schema_variant,
            default_sheet_name: self.default_sheet_name.clone(),
            provision_sheet_name: self.provision_sheet_name.clone(),
            offset,
            data_root: self.data_root.clone(),
            http_port: self.http_port,
            public_base_url,
        })
    }
}

/// Configuration checked once at startup and passed into the router.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    root_folder: Option<String>,
    pub schema_variant: SchemaVariant,
    pub default_sheet_name: String,
    pub provision_sheet_name: String,
    pub offset: FixedOffset,
    pub data_root: PathBuf,
    pub http_port: u16,
    pub public_base_url: String,
}

impl ValidatedConfig {
    /// The listing root, or a configuration error when it was never set.
    pub fn root_folder(&self) -> AppResult<&str> {
        self.root_folder.as_deref().ok_or_else(|| {
            AppError::configuration(
                "root_folder_unset",
                "root folder id is not configured; set root_folder_id (BRIDGEBOOK_ROOT_FOLDER_ID or --root-folder)",
            )
        })
    }

    pub fn document_url(&self, id: &str) -> String { format!("{}/documents/{}", self.public_base_url, id) }
}
