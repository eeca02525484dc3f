//! Catalog browsing. No session needed.

use std::io::Write;

use craftify_core::ItemId;

use super::{App, CommandResult};
use crate::render;

pub async fn items(app: &App, out: &mut impl Write, id: Option<i64>) -> CommandResult {
    match id {
        Some(id) => {
            let item = app.catalog().get_item(ItemId::new(id)).await?;
            render::item(out, &item)?;
        }
        None => {
            let items = app.catalog().list_items().await?;
            render::items(out, &items)?;
        }
    }
    Ok(())
}
