//! Cart and checkout commands.

use std::io::Write;

use clap::Args;
use craftify_client::{Address, CheckoutRequest, PaymentCard};
use craftify_core::{CartLineId, ItemId};
use secrecy::SecretString;

use super::{App, CommandResult, store_failure};
use crate::render;

#[derive(Args)]
pub struct CheckoutArgs {
    /// Billing name
    #[arg(long)]
    name: String,
    /// Billing street address
    #[arg(long)]
    address: String,
    #[arg(long)]
    city: String,
    #[arg(long)]
    state: String,
    #[arg(long)]
    zip: String,
    #[arg(long)]
    country: String,

    /// Ship to a different address (`name,address,city,state,zip,country`)
    #[arg(long, value_parser = parse_address)]
    ship_to: Option<Address>,

    #[arg(long, env = "CRAFTIFY_CARD_NUMBER", hide_env_values = true)]
    card_number: String,
    /// Card expiry (MM/YY)
    #[arg(long)]
    card_expiry: String,
    #[arg(long, env = "CRAFTIFY_CARD_CVC", hide_env_values = true)]
    card_cvc: String,
}

fn parse_address(raw: &str) -> Result<Address, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [name, address, city, state, zip, country] => Ok(Address {
            name: (*name).to_string(),
            address: (*address).to_string(),
            city: (*city).to_string(),
            state: (*state).to_string(),
            zip: (*zip).to_string(),
            country: (*country).to_string(),
        }),
        _ => Err("expected name,address,city,state,zip,country".to_string()),
    }
}

impl CheckoutArgs {
    fn into_request(self) -> CheckoutRequest {
        let billing = Address {
            name: self.name,
            address: self.address,
            city: self.city,
            state: self.state,
            zip: self.zip,
            country: self.country,
        };
        let shipping = self.ship_to.unwrap_or_else(|| billing.clone());

        CheckoutRequest {
            billing,
            shipping,
            payment: PaymentCard {
                card_number: SecretString::from(self.card_number),
                card_expiry: self.card_expiry,
                card_cvc: SecretString::from(self.card_cvc),
            },
        }
    }
}

pub fn show(app: &App, out: &mut impl Write) -> CommandResult {
    app.require_session()?;

    let state = app.cart_state();
    if let Some(error) = state.error {
        return Err(error.into());
    }
    render::cart(out, &state.cart)?;
    Ok(())
}

pub async fn add(app: &App, out: &mut impl Write, item: i64, quantity: u32) -> CommandResult {
    app.require_session()?;

    if !app.add_to_cart(ItemId::new(item), quantity).await {
        return Err(store_failure(app.cart_state().error, "Could not add item"));
    }
    render::cart(out, &app.cart_state().cart)?;
    Ok(())
}

/// Which cart line `cart remove` should drop.
pub enum LineSelector {
    Line(i64),
    Item(i64),
}

pub async fn remove(app: &App, out: &mut impl Write, selector: LineSelector) -> CommandResult {
    app.require_session()?;

    let line_id = match selector {
        LineSelector::Line(line) => Some(CartLineId::new(line)),
        LineSelector::Item(item) => app
            .cart_state()
            .cart
            .line_for_item(ItemId::new(item))
            .and_then(|line| line.line_id),
    };
    if !app.remove_from_cart(line_id).await {
        return Err(store_failure(app.cart_state().error, "Could not remove item"));
    }
    render::cart(out, &app.cart_state().cart)?;
    Ok(())
}

pub async fn checkout(app: &App, out: &mut impl Write, args: CheckoutArgs) -> CommandResult {
    app.require_session()?;

    let order = app.checkout(&args.into_request()).await?;
    writeln!(out, "Order confirmed")?;
    render::order(out, &order)?;
    Ok(())
}
