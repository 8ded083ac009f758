use std::sync::Arc;

use clap::{Args, Subcommand};
use replygate_app::{
    auth::{AuthService, AuthSettings, TokenAuthService},
    clock::SystemClock,
    users::UserUuid,
};

use super::DatabaseArgs;

#[derive(Debug, Args)]
pub(crate) struct TokenCommand {
    #[command(subcommand)]
    command: TokenSubcommand,
}

#[derive(Debug, Subcommand)]
enum TokenSubcommand {
    /// Show the extension credentials held by a user
    List(UserArgs),

    /// Delete every extension credential held by a user
    Revoke(UserArgs),
}

#[derive(Debug, Args)]
struct UserArgs {
    #[command(flatten)]
    database: DatabaseArgs,

    /// User whose credentials are affected
    #[arg(long)]
    user_uuid: UserUuid,
}

pub(crate) async fn run(command: TokenCommand) -> Result<(), String> {
    match command.command {
        TokenSubcommand::List(args) => list(args).await,
        TokenSubcommand::Revoke(args) => revoke(args).await,
    }
}

async fn service(args: &UserArgs) -> Result<TokenAuthService, String> {
    Ok(TokenAuthService::new(
        args.database.connect().await?,
        Arc::new(SystemClock),
        AuthSettings::default(),
    ))
}

async fn list(args: UserArgs) -> Result<(), String> {
    let tokens = service(&args)
        .await?
        .list_user_tokens(args.user_uuid)
        .await
        .map_err(|error| format!("failed to list tokens: {error}"))?;

    if tokens.is_empty() {
        println!("no tokens found for user {}", args.user_uuid);
        return Ok(());
    }

    for token in tokens {
        println!("token_uuid: {}", token.uuid);
        println!("user_uuid: {}", token.user_uuid);
        println!("created_at: {}", token.created_at);
        println!("expires_at: {}", token.expires_at);
        println!();
    }

    Ok(())
}

async fn revoke(args: UserArgs) -> Result<(), String> {
    let revoked = service(&args)
        .await?
        .revoke_user_tokens(args.user_uuid)
        .await
        .map_err(|error| format!("failed to revoke tokens: {error}"))?;

    if revoked == 0 {
        println!("user {} held no tokens", args.user_uuid);
    } else {
        println!("revoked {revoked} token(s) for user {}", args.user_uuid);
    }

    Ok(())
}
