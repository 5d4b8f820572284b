use crate::cli::AuthCommands;
use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_auth(command: AuthCommands, ctx: &Context) -> Result<(), CliError> {
    match command {
        AuthCommands::Login { email, password } => {
            let auth = ctx.auth_client()?;
            let session = auth.sign_in(&email, &password).await?;
            let email_label = session.user.email.as_deref().unwrap_or("(no email)");
            println!("Signed in as {email_label}");

            let store = ctx.open_store().await?;
            if store.pending_count().await? > 0 {
                ctx.sync_after_change(&store).await;
            }
            Ok(())
        }
        AuthCommands::Status => {
            let session = match ctx.auth_client() {
                Ok(auth) => auth.restore_session().await?,
                Err(CliError::SyncNotConfigured) => None,
                Err(error) => return Err(error),
            };

            if let Some(session) = session {
                let email_label = session.user.email.as_deref().unwrap_or("(no email)");
                println!(
                    "Signed in as {} (expires_at={})",
                    email_label, session.expires_at
                );
            } else {
                println!("Not signed in.");
            }
            Ok(())
        }
        AuthCommands::Logout => {
            match ctx.auth_client() {
                Ok(auth) => auth.sign_out().await?,
                // Sessions are keyed by project URL; none can exist without one.
                Err(CliError::SyncNotConfigured) => {}
                Err(error) => return Err(error),
            }
            println!("Signed out");
            Ok(())
        }
    }
}
