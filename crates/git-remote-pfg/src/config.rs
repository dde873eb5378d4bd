//! Helper configuration.

use anyhow::{bail, Context};
use cid::Cid;
use pfg_ipfs::EMPTY_DIR;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// URL scheme git hands us for Peerforge remotes.
pub const SCHEME: &str = "pfg://";

/// Default IPFS RPC endpoint.
pub const DEFAULT_IPFS_API: &str = "http://127.0.0.1:5001";

/// Default consensus RPC endpoint.
pub const DEFAULT_CONSENSUS_RPC: &str = "http://127.0.0.1:26657";

/// Directory below the git directory holding the tracker.
pub const TRACKER_DIR: &str = "pfg";

/// Configuration for one helper invocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Repository git invoked us for.
    pub git_dir: PathBuf,
    /// IPFS RPC endpoint.
    pub ipfs_api: String,
    /// Consensus RPC endpoint; `None` disables audit events.
    pub consensus_rpc: Option<String>,
    /// Root identifier of the remote.
    pub remote: String,
    /// Log level for the helper's crates.
    pub log_level: String,
    /// Network timeout in seconds; `None` waits indefinitely.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            git_dir: PathBuf::from("."),
            ipfs_api: DEFAULT_IPFS_API.to_string(),
            consensus_rpc: Some(DEFAULT_CONSENSUS_RPC.to_string()),
            remote: EMPTY_DIR.to_string(),
            log_level: "info".to_string(),
            timeout_secs: None,
        }
    }
}

impl Config {
    /// Turns a remote URL as passed by git into the remote root identifier.
    ///
    /// An empty remote starts from the empty directory.
    pub fn remote_from_url(url: &str) -> String {
        let name = url.trim().trim_start_matches(SCHEME).trim_matches('/');
        if name.is_empty() {
            EMPTY_DIR.to_string()
        } else {
            name.to_string()
        }
    }

    /// Interprets the consensus endpoint setting.
    ///
    /// An empty value, `off` or `none` disables auditing.
    pub fn consensus_from_setting(setting: Option<&str>) -> Option<String> {
        match setting.map(str::trim) {
            None => Some(DEFAULT_CONSENSUS_RPC.to_string()),
            Some("") | Some("off") | Some("none") => None,
            Some(endpoint) => Some(endpoint.to_string()),
        }
    }

    /// Checks the configuration before anything is built from it.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.remote_root()?;
        if self.ipfs_api.trim().is_empty() {
            bail!("ipfs api endpoint is empty");
        }
        if self.timeout_secs == Some(0) {
            bail!("timeout must be at least one second");
        }
        Ok(())
    }

    /// Parses the remote root identifier.
    pub fn remote_root(&self) -> anyhow::Result<Cid> {
        Cid::try_from(self.remote.as_str())
            .with_context(|| format!("remote {:?} is not a valid content identifier", self.remote))
    }

    /// Returns the network timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Returns the tracker location inside `git_dir`.
    pub fn tracker_path(git_dir: &std::path::Path) -> PathBuf {
        git_dir.join(TRACKER_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_from_url() {
        assert_eq!(
            Config::remote_from_url("pfg://bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy"),
            "bafkreigh2akiscaildcqabsyg3dfr6chu3fgpregiymsck7e7aqa4s52zy"
        );
        assert_eq!(Config::remote_from_url("pfg://"), EMPTY_DIR);
        assert_eq!(Config::remote_from_url(""), EMPTY_DIR);
        assert_eq!(Config::remote_from_url(EMPTY_DIR), EMPTY_DIR);
    }

    #[test]
    fn test_consensus_setting() {
        assert_eq!(
            Config::consensus_from_setting(None).as_deref(),
            Some(DEFAULT_CONSENSUS_RPC)
        );
        assert_eq!(Config::consensus_from_setting(Some("")), None);
        assert_eq!(Config::consensus_from_setting(Some("off")), None);
        assert_eq!(
            Config::consensus_from_setting(Some("http://node:26657")).as_deref(),
            Some("http://node:26657")
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.remote_root().unwrap().to_string(), EMPTY_DIR);
    }

    #[test]
    fn test_invalid_remote_rejected() {
        let config = Config {
            remote: "origin".to_string(),
            ..Config::default()
        };
        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("origin"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = Config {
            timeout_secs: Some(0),
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_tracker_path() {
        let dir = tempfile::TempDir::new().unwrap();
        assert_eq!(Config::tracker_path(dir.path()), dir.path().join("pfg"));
    }
}
