//! Writing commands.

use crate::context::Context;
use crate::render;
use anyhow::{Context as _, Result, bail};
use clap::Args;

#[derive(Args, Debug)]
pub struct PostArgs {
    /// Note text
    pub content: String,
}

#[derive(Args, Debug)]
pub struct ReplyArgs {
    /// note1 or hex id of the note to reply to
    pub id: String,

    /// Reply text
    pub content: String,
}

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// note1 or hex ids of your notes
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Reason shown to readers
    #[arg(long)]
    pub reason: Option<String>,
}

pub async fn post(args: PostArgs, ctx: &Context) -> Result<()> {
    if args.content.trim().is_empty() {
        bail!("Refusing to post an empty note");
    }
    let result = ctx
        .social
        .post_note(ctx.keys()?, &args.content)
        .await
        .context("Failed to publish note")?;
    render::print_publish(&result, ctx.json)
}

pub async fn reply(args: ReplyArgs, ctx: &Context) -> Result<()> {
    if args.content.trim().is_empty() {
        bail!("Refusing to post an empty reply");
    }
    let result = ctx
        .social
        .reply(ctx.keys()?, &args.id, &args.content)
        .await
        .with_context(|| format!("Failed to reply to {}", args.id))?;
    render::print_publish(&result, ctx.json)
}

pub async fn delete(args: DeleteArgs, ctx: &Context) -> Result<()> {
    let result = ctx
        .social
        .delete(ctx.keys()?, &args.ids, args.reason.as_deref())
        .await
        .context("Failed to publish deletion request")?;
    render::print_publish(&result, ctx.json)
}
