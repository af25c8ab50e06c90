//! Transport registration and dispatch
//!
//! This module provides a centralized registry for all transport backends,
//! with support for feature-gated inclusion and dynamic help text generation.

use std::collections::HashMap;

use rmiflash_core::transport::RmiTransport;
use thiserror::Error;

/// Errors raised while selecting or opening a transport
#[derive(Debug, Error)]
pub enum ProgrammerError {
    /// Malformed `key=value` option
    #[error("invalid parameter format: '{0}' (expected key=value)")]
    InvalidFormat(String),

    /// No backend with this name was compiled in
    #[error("unknown programmer: {0}")]
    Unknown(String),

    /// Option not understood by the backend
    #[error("unknown parameter '{key}' for programmer {programmer}")]
    UnknownParam {
        /// Backend name
        programmer: &'static str,
        /// Offending key
        key: String,
    },

    /// Option value could not be used
    #[error("invalid value '{value}' for {key}: {reason}")]
    InvalidValue {
        /// Option key
        key: &'static str,
        /// Option value
        value: String,
        /// Why it was rejected
        reason: String,
    },
}

/// Information about a transport backend
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available backends (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &["emulator"],
        description: "In-memory RMI device emulator (bl=v5|v5.1|v7|v8,block=<bytes>,busy=<polls>)",
    });

    programmers
}

/// Generate help text listing all available backends
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
        if !p.aliases.is_empty() {
            help.push_str(&format!("  {:12}   aliases: {}\n", "", p.aliases.join(", ")));
        }
    }
    help
}

/// Generate a short list of backend names for CLI help
pub fn programmer_names_short() -> String {
    let programmers = available_programmers();
    let names: Vec<&str> = programmers.iter().map(|p| p.name).collect();
    names.join(", ")
}

/// Parsed programmer parameters
#[derive(Debug)]
pub struct ProgrammerParams {
    /// Programmer name as given
    pub name: String,
    /// Key-value parameters
    pub params: HashMap<String, String>,
}

/// Parse a programmer string into name and parameters
///
/// Format: "name" or "name:key1=value1,key2=value2"
pub fn parse_programmer_params(s: &str) -> Result<ProgrammerParams, ProgrammerError> {
    let (name, opts_str) = s.split_once(':').unwrap_or((s, ""));

    let mut params = HashMap::new();
    if !opts_str.is_empty() {
        for opt in opts_str.split(',') {
            if let Some((key, value)) = opt.split_once('=') {
                params.insert(key.to_string(), value.to_string());
            } else {
                return Err(ProgrammerError::InvalidFormat(opt.to_string()));
            }
        }
    }

    Ok(ProgrammerParams {
        name: name.to_string(),
        params,
    })
}

/// Open a transport from a programmer string
///
/// # Example
/// ```ignore
/// let mut transport = open_transport("dummy:bl=v8,block=32")?;
/// let session = Session::query(&mut transport)?;
/// ```
pub fn open_transport(
    programmer: &str,
) -> Result<Box<dyn RmiTransport + Send>, Box<dyn std::error::Error>> {
    let params = parse_programmer_params(programmer)?;

    match params.name.as_str() {
        #[cfg(feature = "dummy")]
        "dummy" | "emulator" => open_dummy(&params),

        _ => Err(ProgrammerError::Unknown(params.name).into()),
    }
}

#[cfg(feature = "dummy")]
fn open_dummy(
    params: &ProgrammerParams,
) -> Result<Box<dyn RmiTransport + Send>, Box<dyn std::error::Error>> {
    use rmiflash_dummy::{DummyConfig, DummyRmi};

    let mut config = DummyConfig::default();
    for (key, value) in &params.params {
        match key.as_str() {
            "bl" | "bootloader" => config.bootloader = value.parse()?,
            "block" => {
                config.block_size = parse_number(value).ok_or_else(|| {
                    ProgrammerError::InvalidValue {
                        key: "block",
                        value: value.clone(),
                        reason: "expected a number".into(),
                    }
                })?
            }
            "busy" => {
                config.busy_polls =
                    value
                        .parse()
                        .map_err(|e: std::num::ParseIntError| ProgrammerError::InvalidValue {
                            key: "busy",
                            value: value.clone(),
                            reason: e.to_string(),
                        })?
            }
            _ => {
                return Err(ProgrammerError::UnknownParam {
                    programmer: "dummy",
                    key: key.clone(),
                }
                .into())
            }
        }
    }

    log::info!(
        "Opening dummy device ({} bootloader, {}-byte blocks)",
        config.bootloader,
        config.block_size
    );
    Ok(Box::new(DummyRmi::new(config)?))
}

/// Parse a hex (0x-prefixed) or decimal u16
fn parse_number(s: &str) -> Option<u16> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).ok()
    } else {
        s.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_programmer_params() {
        let p = parse_programmer_params("dummy:bl=v8,block=0x20").unwrap();
        assert_eq!(p.name, "dummy");
        assert_eq!(p.params.get("bl").map(String::as_str), Some("v8"));
        assert_eq!(p.params.get("block").map(String::as_str), Some("0x20"));

        let p = parse_programmer_params("dummy").unwrap();
        assert!(p.params.is_empty());

        assert!(matches!(
            parse_programmer_params("dummy:bl"),
            Err(ProgrammerError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0x40"), Some(64));
        assert_eq!(parse_number("16"), Some(16));
        assert_eq!(parse_number("zz"), None);
    }

    #[test]
    fn test_unknown_programmer() {
        assert!(open_transport("ch341a").is_err());
    }

    #[cfg(feature = "dummy")]
    #[test]
    fn test_open_dummy() {
        assert!(open_transport("dummy:bl=v5.1,block=32,busy=1").is_ok());
        assert!(open_transport("dummy:bl=v9").is_err());
        assert!(open_transport("dummy:speed=1").is_err());
        assert!(open_transport("dummy:block=0").is_err());
    }
}
