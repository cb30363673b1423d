//! Subcommands.

pub mod compose;
pub mod contacts;
pub mod feeds;

use crate::context::Context;
use crate::render;
use clap::Subcommand;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the connection state of every relay
    Relays,
    /// Newest notes from everyone
    Global(feeds::PageArgs),
    /// Top-level notes from the accounts a user follows
    Feed(feeds::UserPageArgs),
    /// Notes mentioning a user
    Notifications(feeds::UserPageArgs),
    /// Notes written by one user
    User(feeds::UserPostsArgs),
    /// A note with its parent and every reply
    Thread(feeds::ThreadArgs),
    /// Accounts a user follows
    Following(contacts::UserArgs),
    /// Accounts following a user
    Followers(contacts::UserArgs),
    /// Publish a text note
    Post(compose::PostArgs),
    /// Reply to a note
    Reply(compose::ReplyArgs),
    /// Add an account to your contact list
    Follow(contacts::TargetArgs),
    /// Remove an account from your contact list
    Unfollow(contacts::TargetArgs),
    /// Ask relays to delete your notes
    Delete(compose::DeleteArgs),
}

pub async fn run(command: Commands, ctx: &Context) -> anyhow::Result<()> {
    match command {
        Commands::Relays => render::print_statuses(&ctx.statuses, ctx.json),
        Commands::Global(args) => feeds::global(args, ctx).await,
        Commands::Feed(args) => feeds::home(args, ctx).await,
        Commands::Notifications(args) => feeds::notifications(args, ctx).await,
        Commands::User(args) => feeds::user(args, ctx).await,
        Commands::Thread(args) => feeds::thread(args, ctx).await,
        Commands::Following(args) => contacts::following(args, ctx).await,
        Commands::Followers(args) => contacts::followers(args, ctx).await,
        Commands::Post(args) => compose::post(args, ctx).await,
        Commands::Reply(args) => compose::reply(args, ctx).await,
        Commands::Follow(args) => contacts::follow(args, ctx).await,
        Commands::Unfollow(args) => contacts::unfollow(args, ctx).await,
        Commands::Delete(args) => compose::delete(args, ctx).await,
    }
}
