mod cli;

use std::sync::Arc;

use clap::Parser;
use medgate_auth::{Identity, RouteTable};
use medgate_session::{HttpAuthBackend, RouteGuard, SessionManager, SqliteCredentialStore};
use serde_json::{Value, json};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    medgate_observability::init(cli.log_format.into());

    let config = cli.session_config()?;
    tracing::debug!(api_url = %config.api_url, credentials = ?config.credentials_path, "session config");

    let store = Arc::new(SqliteCredentialStore::new(&config.credentials_path));
    let backend = Arc::new(HttpAuthBackend::new(&config.api_url, config.request_timeout)?);
    let session = SessionManager::new(store, backend);

    let output = execute(cli.command, &session).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Run one subcommand against `session` and return what to print.
///
/// Every command reconciles the stored session first, as the app does on
/// startup, except `logout` and `register`, which never depend on who is
/// signed in.
async fn execute(command: Commands, session: &SessionManager) -> anyhow::Result<Value> {
    match command {
        Commands::Login(args) => {
            session.init().await;
            match session.login(&args.username, &args.password).await {
                Ok(identity) => Ok(signed_in(&identity)),
                Err(err) => anyhow::bail!(err.user_message()),
            }
        }
        Commands::Logout => {
            session.logout().await;
            Ok(json!({ "signed_in": false }))
        }
        Commands::Whoami => {
            let snapshot = session.init().await;
            Ok(match snapshot.state.identity() {
                Some(identity) => signed_in(identity),
                None => json!({ "signed_in": false }),
            })
        }
        Commands::Register(args) => match session.register(&args.registration()).await {
            Ok(account) => Ok(json!({ "registered": account })),
            Err(err) => anyhow::bail!(err.user_message()),
        },
        Commands::Route(args) => {
            let guard = RouteGuard::new(session, RouteTable::hospital());
            session.init().await;
            let navigation = guard.settle(&args.path).await;
            Ok(json!({
                "path": args.path,
                "navigation": navigation,
                "target": navigation.target(),
                "sidebar": guard.navigation(),
            }))
        }
    }
}

fn signed_in(identity: &Identity) -> Value {
    json!({
        "signed_in": true,
        "display": identity.display_label(),
        "identity": identity,
    })
}
