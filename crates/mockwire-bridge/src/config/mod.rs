//! Bridge config loader (strict parsing).

pub mod schema;

use std::fs;

use mockwire_core::error::{MockWireError, Result};

pub use schema::{BridgeConfig, BridgeSection, InterceptionSection, StoreSection};

pub fn load_from_file(path: &str) -> Result<BridgeConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MockWireError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<BridgeConfig> {
    let cfg: BridgeConfig = serde_yaml::from_str(s)
        .map_err(|e| MockWireError::BadRequest(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
