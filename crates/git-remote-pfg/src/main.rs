//! git-remote-pfg - Git remote helper for Peerforge.
//!
//! git runs this binary for `pfg://` remotes:
//!
//! ```bash
//! git remote add origin pfg://
//! git push origin main        # logs the new root as pfg://<cid>
//! git clone pfg://<cid> repo
//! ```
//!
//! Commands are read from stdin and answered on stdout; all logging goes to
//! stderr.

use anyhow::Context;
use clap::Parser;
use pfg_consensus::{AuditSink, NoopAudit, TendermintClient};
use pfg_git::Git2Repository;
use pfg_ipfs::HttpStore;
use pfg_protocol::{Protocol, Session};
use pfg_remote::PeerforgeRemote;
use pfg_storage::Tracker;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

use config::Config;

/// Git remote helper for Peerforge repositories stored on IPFS
#[derive(Parser, Debug)]
#[command(name = "git-remote-pfg")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Remote name as configured in git
    remote: String,

    /// Remote URL (pfg://<cid>); defaults to the remote name
    url: Option<String>,

    /// Git directory of the local repository
    #[arg(long, env = "GIT_DIR")]
    git_dir: Option<PathBuf>,

    /// IPFS RPC endpoint
    #[arg(long, env = "PFG_IPFS_API", default_value = config::DEFAULT_IPFS_API)]
    ipfs_api: String,

    /// Consensus RPC endpoint ("off" disables audit events)
    #[arg(long, env = "PFG_CONSENSUS_RPC")]
    consensus_rpc: Option<String>,

    /// Network timeout in seconds
    #[arg(long, env = "PFG_TIMEOUT")]
    timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "PFG_LOG", default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> anyhow::Result<Config> {
        let git_dir = match self.git_dir {
            Some(dir) => dir,
            None => std::env::current_dir().context("cannot determine working directory")?,
        };
        let url = self.url.as_deref().unwrap_or(&self.remote);

        Ok(Config {
            git_dir,
            ipfs_api: self.ipfs_api,
            consensus_rpc: Config::consensus_from_setting(self.consensus_rpc.as_deref()),
            remote: Config::remote_from_url(url),
            log_level: self.log_level,
            timeout_secs: self.timeout,
        })
    }
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("pfg={0},git_remote_pfg={0}", args.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(args) {
        tracing::debug!(error = ?e, "Session failed");
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let remote_name = args.remote.clone();
    let config = args.into_config()?;
    config.validate()?;
    let root = config.remote_root()?;

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        remote = %remote_name,
        root = %root,
        git_dir = %config.git_dir.display(),
        ipfs_api = %config.ipfs_api,
        "Starting remote helper"
    );

    let repo = Git2Repository::open(&config.git_dir)
        .with_context(|| format!("cannot open repository at {}", config.git_dir.display()))?;
    let tracker = open_tracker(repo.git_dir())?;

    let store = HttpStore::new(&config.ipfs_api, config.timeout())
        .context("cannot create IPFS client")?;
    let audit: Arc<dyn AuditSink> = match &config.consensus_rpc {
        Some(endpoint) => Arc::new(
            TendermintClient::new(endpoint, config.timeout())
                .context("cannot create consensus client")?,
        ),
        None => {
            tracing::debug!("Audit events disabled");
            Arc::new(NoopAudit)
        }
    };

    let session = Session::new(Arc::new(repo), tracker);
    let handler = PeerforgeRemote::new(Arc::new(store), audit, root);
    let mut protocol = Protocol::new(handler, session)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    protocol.run(stdin.lock(), stdout.lock())?;
    Ok(())
}

#[cfg(feature = "rocksdb-backend")]
fn open_tracker(git_dir: &Path) -> anyhow::Result<Arc<dyn Tracker>> {
    let path = Config::tracker_path(git_dir);
    let tracker = pfg_storage::RocksDbTracker::open(&path)
        .with_context(|| format!("cannot open tracker at {}", path.display()))?;
    Ok(Arc::new(tracker))
}

#[cfg(not(feature = "rocksdb-backend"))]
fn open_tracker(git_dir: &Path) -> anyhow::Result<Arc<dyn Tracker>> {
    tracing::warn!(
        path = %Config::tracker_path(git_dir).display(),
        "Built without rocksdb-backend, tracker state will not persist"
    );
    Ok(Arc::new(pfg_storage::MemoryTracker::new()))
}
