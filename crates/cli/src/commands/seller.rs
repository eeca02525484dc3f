//! Commands for managing the signed-in user's own listings.

use std::io::Write;

use clap::Args;
use craftify_client::api::ItemDraft;
use craftify_core::ItemId;
use rust_decimal::Decimal;

use super::{App, CommandResult};
use crate::render;

#[derive(Args)]
pub struct ItemArgs {
    /// Item name
    #[arg(long)]
    name: String,

    /// Unit price, e.g. 24.50
    #[arg(long)]
    price: Decimal,

    /// Units in stock
    #[arg(short, long, default_value_t = 1)]
    quantity: u32,

    #[arg(long)]
    description: Option<String>,

    #[arg(long)]
    category: Option<String>,
}

impl ItemArgs {
    fn into_draft(self) -> ItemDraft {
        ItemDraft {
            name: self.name,
            description: self.description,
            price: self.price,
            quantity: self.quantity,
            category: self.category,
        }
    }
}

pub async fn list(app: &App, out: &mut impl Write) -> CommandResult {
    let items = app.my_items().await?;
    if items.is_empty() {
        writeln!(out, "You have no items listed.")?;
        return Ok(());
    }
    render::items(out, &items)?;
    Ok(())
}

pub async fn create(app: &App, out: &mut impl Write, args: ItemArgs) -> CommandResult {
    let item = app.create_item(&args.into_draft()).await?;
    writeln!(out, "Listed item #{}", item.id)?;
    render::item(out, &item)?;
    Ok(())
}

pub async fn edit(app: &App, out: &mut impl Write, id: i64, args: ItemArgs) -> CommandResult {
    let item = app.update_item(ItemId::new(id), &args.into_draft()).await?;
    writeln!(out, "Updated item #{}", item.id)?;
    render::item(out, &item)?;
    Ok(())
}

pub async fn delete(app: &App, out: &mut impl Write, id: i64) -> CommandResult {
    app.delete_item(ItemId::new(id)).await?;
    writeln!(out, "Deleted item #{id}")?;
    Ok(())
}
