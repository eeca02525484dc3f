//! Sign-in, sign-up and profile commands.

use std::io::{BufRead, Write};

use clap::Args;
use craftify_client::api::{ProfileUpdate, SignUp};
use secrecy::SecretString;

use super::{App, CommandResult};
use crate::render;

#[derive(Args)]
pub struct SignUpArgs {
    /// Account username
    #[arg(short, long)]
    username: String,

    /// Contact email
    #[arg(short, long)]
    email: String,

    /// Account password
    #[arg(long, env = "CRAFTIFY_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Phone number
    #[arg(long)]
    phone: Option<String>,

    /// ISO country code
    #[arg(long)]
    country_code: Option<String>,
}

#[derive(Args)]
pub struct ProfileArgs {
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    bio: Option<String>,
    #[arg(long)]
    website: Option<String>,
    #[arg(long)]
    country_code: Option<String>,
    #[arg(long)]
    address: Option<String>,
    #[arg(long)]
    phone: Option<String>,
}

/// Use the given password or read one line from stdin.
fn password_or_stdin(password: Option<String>) -> Result<SecretString, std::io::Error> {
    if let Some(password) = password {
        return Ok(SecretString::from(password));
    }

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;
    Ok(SecretString::from(
        line.trim_end_matches(['\r', '\n']).to_string(),
    ))
}

pub async fn login(
    app: &App,
    out: &mut impl Write,
    username: &str,
    password: Option<String>,
) -> CommandResult {
    let password = password_or_stdin(password)?;
    let user = app.sign_in(username, &password).await?;

    writeln!(out, "Signed in as user {user}")?;
    render::cart(out, &app.cart_state().cart)?;
    Ok(())
}

pub async fn logout(app: &App, out: &mut impl Write) -> CommandResult {
    app.logout().await;
    writeln!(out, "Signed out")?;
    Ok(())
}

pub async fn delete_account(app: &App, out: &mut impl Write, confirmed: bool) -> CommandResult {
    if !confirmed {
        return Err("Deleting an account cannot be undone; pass --yes to confirm".into());
    }
    app.delete_account().await?;
    writeln!(out, "Account deleted. Signed out")?;
    Ok(())
}

pub fn whoami(app: &App, out: &mut impl Write) -> CommandResult {
    render::session(out, &app.session_state())?;
    Ok(())
}

pub async fn sign_up(app: &App, out: &mut impl Write, args: SignUpArgs) -> CommandResult {
    let form = SignUp {
        username: args.username,
        email: args.email,
        password: password_or_stdin(args.password)?,
        phone_number: args.phone,
        country_code: args.country_code,
    };

    let user = app.sign_up(&form).await?;
    writeln!(out, "Welcome, {}! Signed in as user {user}", form.username)?;
    Ok(())
}

pub async fn profile(app: &App, out: &mut impl Write) -> CommandResult {
    let profile = app.profile().await?;
    render::profile(out, &profile)?;
    Ok(())
}

pub async fn update_profile(app: &App, out: &mut impl Write, args: ProfileArgs) -> CommandResult {
    let update = ProfileUpdate {
        email: args.email,
        bio: args.bio,
        website: args.website,
        country_code: args.country_code,
        address: args.address,
        phone_number: args.phone,
    };

    let profile = app.update_profile(&update).await?;
    writeln!(out, "Profile updated")?;
    render::profile(out, &profile)?;
    Ok(())
}
