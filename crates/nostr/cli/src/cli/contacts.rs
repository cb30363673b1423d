//! Contact list commands.

use crate::context::Context;
use crate::render;
use anyhow::{Context as _, Result};
use clap::Args;

#[derive(Args, Debug)]
pub struct UserArgs {
    /// npub or hex public key (default: your own)
    pub user: Option<String>,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    /// npub or hex public key of the account
    pub pubkey: String,
}

pub async fn following(args: UserArgs, ctx: &Context) -> Result<()> {
    let user = ctx.user(args.user.as_deref())?;
    let following = ctx
        .social
        .following(&user)
        .await
        .context("Failed to load contact lists")?;
    render::print_pubkeys(&following, ctx.json)
}

pub async fn followers(args: UserArgs, ctx: &Context) -> Result<()> {
    let user = ctx.user(args.user.as_deref())?;
    let followers = ctx
        .social
        .followers(&user)
        .await
        .context("Failed to load followers")?;
    render::print_pubkeys(&followers, ctx.json)
}

pub async fn follow(args: TargetArgs, ctx: &Context) -> Result<()> {
    let keys = ctx.keys()?;
    match ctx
        .social
        .follow(keys, &args.pubkey)
        .await
        .with_context(|| format!("Failed to follow {}", args.pubkey))?
    {
        Some(result) => render::print_publish(&result, ctx.json),
        None => {
            println!("Already following {}", args.pubkey);
            Ok(())
        }
    }
}

pub async fn unfollow(args: TargetArgs, ctx: &Context) -> Result<()> {
    let keys = ctx.keys()?;
    match ctx
        .social
        .unfollow(keys, &args.pubkey)
        .await
        .with_context(|| format!("Failed to unfollow {}", args.pubkey))?
    {
        Some(result) => render::print_publish(&result, ctx.json),
        None => {
            println!("Not following {}", args.pubkey);
            Ok(())
        }
    }
}
