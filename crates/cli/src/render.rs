//! Plain-text rendering of store snapshots.
//!
//! Everything here reads a snapshot and writes it out; nothing is cached or
//! recomputed on this side.

use std::io::{self, Write};

use craftify_client::api::{Comment, Item, Order, Profile, UserPage};
use craftify_client::{Cart, SessionPhase, SessionState};
use craftify_core::format_price;

pub fn session(out: &mut impl Write, state: &SessionState) -> io::Result<()> {
    match &state.phase {
        SessionPhase::Authenticated(user) => writeln!(out, "Signed in as user {user}"),
        SessionPhase::Initializing => writeln!(out, "Session is still loading"),
        SessionPhase::Unidentified | SessionPhase::Anonymous => writeln!(out, "Not signed in"),
    }
}

pub fn cart(out: &mut impl Write, cart: &Cart) -> io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Your cart is empty.");
    }

    for line in &cart.items {
        let line_id = line
            .line_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        writeln!(
            out,
            "[{line_id}] {} x {} @ {} = {}",
            line.quantity,
            line.item.name,
            format_price(line.item.price),
            format_price(line.line_total),
        )?;
    }
    let count = cart.item_count();
    let noun = if count == 1 { "item" } else { "items" };
    writeln!(out, "Total: {} ({count} {noun})", format_price(cart.total_price))
}

pub fn items(out: &mut impl Write, items: &[Item]) -> io::Result<()> {
    if items.is_empty() {
        return writeln!(out, "No items for sale.");
    }
    for item in items {
        writeln!(out, "#{} {} - {}", item.id, item.name, format_price(item.price))?;
    }
    Ok(())
}

pub fn item(out: &mut impl Write, item: &Item) -> io::Result<()> {
    writeln!(out, "#{} {}", item.id, item.name)?;
    writeln!(out, "Price: {}", format_price(item.price))?;
    if let Some(quantity) = item.quantity {
        writeln!(out, "In stock: {quantity}")?;
    }
    if let Some(seller) = &item.seller_username {
        writeln!(out, "Seller: {seller}")?;
    }
    if let Some(description) = &item.description {
        writeln!(out)?;
        writeln!(out, "{description}")?;
    }
    Ok(())
}

pub fn order(out: &mut impl Write, order: &Order) -> io::Result<()> {
    let placed = order
        .created_at
        .map_or_else(String::new, |at| format!(" ({})", at.format("%Y-%m-%d")));
    writeln!(out, "Order #{}{placed}", order.id)?;
    for line in &order.items {
        writeln!(
            out,
            "  {} x {} @ {}",
            line.quantity,
            line.name,
            format_price(line.price)
        )?;
    }
    writeln!(out, "  Total: {}", format_price(order.total()))
}

pub fn orders(out: &mut impl Write, orders: &[Order]) -> io::Result<()> {
    if orders.is_empty() {
        return writeln!(out, "No orders in this period.");
    }
    for entry in orders {
        order(out, entry)?;
    }
    Ok(())
}

pub fn profile(out: &mut impl Write, profile: &Profile) -> io::Result<()> {
    writeln!(out, "{}", profile.username)?;
    let fields = [
        ("Email", &profile.email),
        ("Bio", &profile.bio),
        ("Website", &profile.website),
        ("Country", &profile.country_code),
        ("Address", &profile.address),
        ("Phone", &profile.phone_number),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            writeln!(out, "{label}: {value}")?;
        }
    }
    Ok(())
}

pub fn users(out: &mut impl Write, page: &UserPage, number: u32) -> io::Result<()> {
    if page.results.is_empty() {
        return writeln!(out, "No users on page {number}.");
    }
    for user in &page.results {
        match &user.bio {
            Some(bio) => writeln!(out, "#{} {} - {bio}", user.id, user.username)?,
            None => writeln!(out, "#{} {}", user.id, user.username)?,
        }
    }
    writeln!(out, "Page {number} of {}", page.total_pages())
}

pub fn comments(out: &mut impl Write, comments: &[Comment]) -> io::Result<()> {
    if comments.is_empty() {
        return writeln!(out, "No comments yet.");
    }
    for comment in comments {
        let author = comment.user_name.as_deref().unwrap_or("anonymous");
        writeln!(out, "{author}: {}", comment.text)?;
    }
    Ok(())
}
