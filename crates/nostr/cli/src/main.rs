//! nostr-feed: read and write Nostr notes through a pool of relays.

mod cli;
mod context;
mod render;

use clap::Parser;
use context::{Context, GlobalArgs};
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(
    name = "nostr-feed",
    about = "Read and write Nostr notes across many relays at once",
    version
)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: cli::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let ctx = Context::connect(&cli.global).await?;
    let result = cli::run(cli.command, &ctx).await;
    ctx.shutdown().await;
    result
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};
    // Logs go to stderr so command output can be piped
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "nostr-feed",
            "global",
            "--limit",
            "5",
            "--relay",
            "wss://a.example",
            "-r",
            "wss://b.example",
            "--quorum",
            "2",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.global.relays, vec!["wss://a.example", "wss://b.example"]);
        assert_eq!(cli.global.quorum, Some(2));
        assert!(cli.global.json);
        match cli.command {
            cli::Commands::Global(page) => {
                assert_eq!(page.limit, 5);
                assert_eq!(page.until, None);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_delete_needs_ids() {
        assert!(Cli::try_parse_from(["nostr-feed", "delete"]).is_err());

        let cli = Cli::try_parse_from(["nostr-feed", "delete", "aa", "bb", "--reason", "typo"]).unwrap();
        match cli.command {
            cli::Commands::Delete(args) => {
                assert_eq!(args.ids, vec!["aa", "bb"]);
                assert_eq!(args.reason.as_deref(), Some("typo"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_user_defaults() {
        let cli = Cli::try_parse_from(["nostr-feed", "feed"]).unwrap();
        match cli.command {
            cli::Commands::Feed(args) => {
                assert!(args.user.is_none());
                assert_eq!(args.page.limit, 20);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
