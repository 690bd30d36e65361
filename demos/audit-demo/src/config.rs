use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct DemoConfig {
    pub log_entries: u64,
    pub map_keys: u64,
    pub redaction_prefix: String,
}

impl DemoConfig {
    pub fn from_env() -> Result<Self> {
        let log_entries = parse_or("VDS_DEMO_LOG_ENTRIES", 5)?;
        let map_keys = parse_or("VDS_DEMO_MAP_KEYS", 4)?;
        let redaction_prefix =
            std::env::var("VDS_DEMO_REDACTION_PREFIX").unwrap_or_else(|_| vds::REDACTED_PREFIX.to_string());

        // fail fast on values the demo cannot walk through
        if log_entries < 1 {
            bail!("VDS_DEMO_LOG_ENTRIES must be at least 1");
        }
        if redaction_prefix.is_empty() {
            bail!("VDS_DEMO_REDACTION_PREFIX must not be empty");
        }

        Ok(Self {
            log_entries,
            map_keys,
            redaction_prefix,
        })
    }
}

fn parse_or(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(v) => v
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for env var {key}: {v:?}")),
        Err(_) => Ok(default),
    }
}
