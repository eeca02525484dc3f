//! Other users: the directory, public profiles and profile comments.

use std::io::Write;

use craftify_core::UserId;

use super::{App, CommandResult};
use crate::render;

pub async fn list(app: &App, out: &mut impl Write, page: u32) -> CommandResult {
    let users = app.users(page).await?;
    render::users(out, &users, page)?;
    Ok(())
}

pub async fn show(app: &App, out: &mut impl Write, id: i64) -> CommandResult {
    let user = UserId::Numeric(id);
    let profile = app.user_profile(&user).await?;
    let comments = app.comments(&user).await?;

    render::profile(out, &profile)?;
    writeln!(out)?;
    render::comments(out, &comments)?;
    Ok(())
}

pub async fn comment(app: &App, out: &mut impl Write, id: i64, text: &str) -> CommandResult {
    let comment = app.post_comment(&UserId::Numeric(id), text).await?;
    writeln!(out, "Comment posted")?;
    render::comments(out, std::slice::from_ref(&comment))?;
    Ok(())
}
