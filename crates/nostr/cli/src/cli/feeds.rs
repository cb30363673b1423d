//! Reading commands: feeds and threads.

use crate::context::Context;
use crate::render;
use anyhow::{Context as _, Result};
use clap::Args;

/// Paging options shared by every feed.
#[derive(Args, Debug)]
pub struct PageArgs {
    /// Maximum number of notes
    #[arg(long, short = 'n', default_value_t = 20)]
    pub limit: u64,

    /// Only notes created at or before this unix timestamp
    #[arg(long)]
    pub until: Option<u64>,
}

#[derive(Args, Debug)]
pub struct UserPageArgs {
    /// npub or hex public key (default: your own)
    pub user: Option<String>,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug)]
pub struct UserPostsArgs {
    /// npub or hex public key
    pub user: String,

    /// Show replies instead of top-level notes
    #[arg(long)]
    pub replies: bool,

    #[command(flatten)]
    pub page: PageArgs,
}

#[derive(Args, Debug)]
pub struct ThreadArgs {
    /// note1 or hex event id
    pub id: String,
}

pub async fn global(args: PageArgs, ctx: &Context) -> Result<()> {
    let page = ctx
        .social
        .global_feed(args.limit, args.until)
        .await
        .context("Failed to load global feed")?;
    render::print_page(&page, ctx.json)
}

pub async fn home(args: UserPageArgs, ctx: &Context) -> Result<()> {
    let user = ctx.user(args.user.as_deref())?;
    let page = ctx
        .social
        .home_feed(&user, args.page.limit, args.page.until)
        .await
        .context("Failed to load feed")?;
    render::print_page(&page, ctx.json)
}

pub async fn notifications(args: UserPageArgs, ctx: &Context) -> Result<()> {
    let user = ctx.user(args.user.as_deref())?;
    let page = ctx
        .social
        .notifications(&user, args.page.limit, args.page.until)
        .await
        .context("Failed to load notifications")?;
    render::print_page(&page, ctx.json)
}

pub async fn user(args: UserPostsArgs, ctx: &Context) -> Result<()> {
    let user = ctx.user(Some(args.user.as_str()))?;
    let page = if args.replies {
        ctx.social
            .replies_feed(std::slice::from_ref(&user), args.page.limit, args.page.until)
            .await
    } else {
        ctx.social
            .user_posts(&user, args.page.limit, args.page.until)
            .await
    };
    let page = page.with_context(|| format!("Failed to load notes of {}", args.user))?;
    render::print_page(&page, ctx.json)
}

pub async fn thread(args: ThreadArgs, ctx: &Context) -> Result<()> {
    let thread = ctx
        .social
        .thread(&args.id)
        .await
        .with_context(|| format!("Failed to load thread {}", args.id))?;
    render::print_thread(&thread, ctx.json)
}
