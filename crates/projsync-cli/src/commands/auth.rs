//! Auth command - Manage the stored session
//!
//! Provides the `projsync auth` CLI command which stores, shows and clears
//! the session key and organization used for every remote call.

use anyhow::{Context, Result};
use clap::Subcommand;
use projsync_core::domain::OrganizationId;
use projsync_core::ports::IRemoteDocumentStore;
use tracing::info;

use super::CliContext;

/// Auth subcommands
#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Store a session key and organization
    Set {
        /// Organization UUID
        #[arg(long)]
        organization: String,
        /// Value of the `sessionKey` cookie
        #[arg(long)]
        session_key: String,
        /// Check the session by listing projects before storing it
        #[arg(long)]
        verify: bool,
    },
    /// Show the stored session
    Show,
    /// Forget the stored session
    Clear,
}

impl AuthCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            AuthCommand::Set {
                organization,
                session_key,
                verify,
            } => self.execute_set(ctx, organization, session_key, *verify).await,
            AuthCommand::Show => self.execute_show(ctx).await,
            AuthCommand::Clear => self.execute_clear(ctx).await,
        }
    }

    async fn execute_set(
        &self,
        ctx: &CliContext,
        organization: &str,
        session_key: &str,
        verify: bool,
    ) -> Result<()> {
        let formatter = ctx.formatter();
        let organization: OrganizationId = organization
            .trim()
            .parse()
            .context("Organization must be a UUID")?;

        if verify {
            let session = projsync_core::usecases::Session {
                session_key: session_key.trim().to_string(),
                organization,
            };
            let projects = ctx
                .remote(&session)?
                .list_projects(&organization)
                .await
                .context("Session check failed")?;
            info!(projects = projects.len(), "Session verified");
        }

        let settings = ctx.settings().await?;
        settings.store_session(session_key, &organization).await?;

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "organization": organization.to_string(),
            }));
        } else {
            formatter.success(&format!("Session stored for organization {organization}"));
        }
        Ok(())
    }

    async fn execute_show(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let settings = ctx.settings().await?;

        match settings.session().await? {
            Some(session) => {
                let masked = mask(&session.session_key);
                if ctx.format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "authenticated": true,
                        "organization": session.organization.to_string(),
                        "session_key": masked,
                    }));
                } else {
                    formatter.success("Session stored");
                    formatter.info(&format!("Organization: {}", session.organization));
                    formatter.info(&format!("Session key:  {masked}"));
                }
            }
            None => {
                if ctx.format.is_json() {
                    formatter.print_json(&serde_json::json!({ "authenticated": false }));
                } else {
                    formatter.warn("No session stored. Run 'projsync auth set' first.");
                }
            }
        }
        Ok(())
    }

    async fn execute_clear(&self, ctx: &CliContext) -> Result<()> {
        ctx.settings().await?.clear_session().await?;
        ctx.formatter().success("Session cleared");
        Ok(())
    }
}

/// Keeps the first and last four characters of a secret
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}
