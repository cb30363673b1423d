//! Options shared by every command, and the connected pool they produce.

use anyhow::{Context as _, Result, anyhow};
use clap::Args;
use nostr::{Keys, public_key_from_str};
use nostr_client::{ConnectionState, PoolConfig, RelayPool, RelayStatus, SocialClient};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Global options
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// TOML configuration file
    #[arg(long, short, global = true, env = "NOSTR_FEED_CONFIG")]
    pub config: Option<PathBuf>,

    /// Relay to use instead of the configured ones (repeatable)
    #[arg(long = "relay", short = 'r', global = true, value_name = "URL")]
    pub relays: Vec<String>,

    /// Seconds to wait for relays to connect
    #[arg(long, global = true, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Seconds each relay gets to answer a query
    #[arg(long, global = true, value_name = "SECS")]
    pub query_timeout: Option<u64>,

    /// Seconds each relay gets to acknowledge a publish
    #[arg(long, global = true, value_name = "SECS")]
    pub publish_timeout: Option<u64>,

    /// Relays that must accept a published event
    #[arg(long, global = true, value_name = "N")]
    pub quorum: Option<usize>,

    /// Secret key (nsec or hex) used to sign and as the default user
    #[arg(long, global = true, env = "NOSTR_SECRET_KEY", hide_env_values = true)]
    pub nsec: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,
}

impl GlobalArgs {
    /// Configuration file (or defaults), then `NOSTR_RELAYS`, then flags.
    pub fn pool_config(&self) -> Result<PoolConfig> {
        let mut config = match &self.config {
            Some(path) => PoolConfig::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => PoolConfig::default(),
        };
        config.apply_env();

        if !self.relays.is_empty() {
            config.relays = self.relays.clone();
        }
        if let Some(secs) = self.connect_timeout {
            config.connect_timeout_secs = secs;
        }
        if let Some(secs) = self.query_timeout {
            config.query_timeout_secs = secs;
        }
        if let Some(secs) = self.publish_timeout {
            config.publish_timeout_secs = secs;
        }
        if let Some(quorum) = self.quorum {
            config.min_write_confirmations = quorum;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    fn keys(&self) -> Result<Option<Keys>> {
        self.nsec
            .as_deref()
            .map(Keys::parse)
            .transpose()
            .context("Invalid secret key")
    }
}

/// Everything a command needs: the connected social client and the signer.
pub struct Context {
    pub social: SocialClient,
    pub statuses: Vec<RelayStatus>,
    pub json: bool,
    keys: Option<Keys>,
}

impl Context {
    /// Build the pool from `args` and connect it.
    ///
    /// Relays that fail to connect are reported and skipped; commands fail
    /// later with a pool error only if none connected.
    pub async fn connect(args: &GlobalArgs) -> Result<Self> {
        let keys = args.keys()?;
        let config = args.pool_config()?;
        let connect_timeout = config.connect_timeout();

        let pool = RelayPool::new(config);
        pool.add_configured_relays().await?;
        let statuses = pool.connect_all(connect_timeout).await;

        for status in &statuses {
            if status.state != ConnectionState::Connected {
                warn!(
                    "Relay {} unavailable: {}",
                    status.url,
                    status.last_error.as_deref().unwrap_or("not connected")
                );
            }
        }
        if pool.connected_count().await == 0 {
            warn!("No relay connected; reads and writes will fail");
        }

        Ok(Self {
            social: SocialClient::new(Arc::new(pool)),
            statuses,
            json: args.json,
            keys,
        })
    }

    /// The signing key, required by every write command.
    pub fn keys(&self) -> Result<&Keys> {
        self.keys
            .as_ref()
            .ok_or_else(|| anyhow!("This command needs a secret key (--nsec or NOSTR_SECRET_KEY)"))
    }

    /// `explicit` as a hex pubkey, else the signer's own.
    pub fn user(&self, explicit: Option<&str>) -> Result<String> {
        match explicit {
            Some(pubkey) => {
                public_key_from_str(pubkey).with_context(|| format!("Invalid public key: {}", pubkey))
            }
            None => self
                .keys()
                .map(|keys| keys.public_key().to_string())
                .context("No user given"),
        }
    }

    pub async fn shutdown(&self) {
        self.social.pool().disconnect_all().await;
    }
}
