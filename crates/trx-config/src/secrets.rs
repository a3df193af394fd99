//! Broker credential resolution.
//!
//! Config YAML stores only env var **names**; the actual values are read
//! from the environment at startup and never logged or printed in full.

use std::env;
use std::fmt;

/// Env var names a broker adapter's credentials are resolved from. The
/// MT5/REST slots are reserved for future adapters (spec §4.9); paper never
/// reads these.
#[derive(Clone, Debug)]
pub struct BrokerSecretEnvNames {
    pub api_key_var: String,
    pub api_secret_var: String,
}

/// Resolved broker credentials with a redacted `Debug` impl, so a stray
/// `{:?}` in a log line never leaks a key.
#[derive(Clone)]
pub struct ResolvedBrokerSecrets {
    pub api_key: String,
    pub api_secret: String,
}

impl ResolvedBrokerSecrets {
    pub fn from_env(names: &BrokerSecretEnvNames) -> anyhow::Result<Self> {
        let api_key = env::var(&names.api_key_var)
            .map_err(|_| anyhow::anyhow!("missing env var {}", names.api_key_var))?;
        let api_secret = env::var(&names.api_secret_var)
            .map_err(|_| anyhow::anyhow!("missing env var {}", names.api_secret_var))?;
        Ok(ResolvedBrokerSecrets { api_key, api_secret })
    }
}

fn redact(s: &str) -> String {
    if s.len() <= 4 {
        "****".to_string()
    } else {
        format!("{}****", &s[..2])
    }
}

impl fmt::Debug for ResolvedBrokerSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedBrokerSecrets")
            .field("api_key", &redact(&self.api_key))
            .field("api_secret", &redact(&self.api_secret))
            .finish()
    }
}
