//! Order history command.

use std::io::Write;

use craftify_client::OrderWindow;

use super::{App, CommandResult, store_failure};
use crate::render;

pub async fn list(app: &App, out: &mut impl Write, days: u32) -> CommandResult {
    let window = OrderWindow::try_from(days)?;
    app.require_session()?;

    app.fetch_orders(window).await;
    let state = app.order_state();
    if state.error.is_some() {
        return Err(store_failure(state.error, "Could not load orders"));
    }

    writeln!(out, "Orders from the {window}:")?;
    render::orders(out, &state.orders)?;
    Ok(())
}
