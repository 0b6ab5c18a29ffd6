//! Projects command - List and select remote projects

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use projsync_core::domain::ProjectId;
use projsync_core::ports::IRemoteDocumentStore;
use tracing::info;

use super::{require_project, require_session, CliContext};

/// Projects subcommands
#[derive(Debug, Subcommand)]
pub enum ProjectsCommand {
    /// List the projects of the organization
    List,
    /// Select the project files are synced to
    Use {
        /// Project UUID
        project_id: String,
    },
    /// Show the selected project
    Current,
}

impl ProjectsCommand {
    pub async fn execute(&self, ctx: &CliContext) -> Result<()> {
        match self {
            ProjectsCommand::List => self.execute_list(ctx).await,
            ProjectsCommand::Use { project_id } => self.execute_use(ctx, project_id).await,
            ProjectsCommand::Current => self.execute_current(ctx).await,
        }
    }

    async fn execute_list(&self, ctx: &CliContext) -> Result<()> {
        let formatter = ctx.formatter();
        let settings = ctx.settings().await?;
        let session = require_session(&settings).await?;
        let current = settings.current_project_id().await?;

        let projects = ctx
            .remote(&session)?
            .list_projects(&session.organization)
            .await
            .context("Failed to list projects")?;

        if ctx.format.is_json() {
            let list: Vec<_> = projects
                .iter()
                .map(|p| {
                    serde_json::json!({
                        "uuid": p.uuid.to_string(),
                        "name": p.name,
                        "current": Some(p.uuid) == current,
                    })
                })
                .collect();
            formatter.print_json(&serde_json::Value::Array(list));
        } else if projects.is_empty() {
            formatter.warn("No projects found");
        } else {
            formatter.success(&format!("{} project(s)", projects.len()));
            for project in &projects {
                let marker = if Some(project.uuid) == current { "*" } else { " " };
                formatter.info(&format!("{marker} {}  {}", project.uuid, project.name));
            }
        }
        Ok(())
    }

    async fn execute_use(&self, ctx: &CliContext, project_id: &str) -> Result<()> {
        let formatter = ctx.formatter();
        let project: ProjectId = project_id
            .trim()
            .parse()
            .context("Project id must be a UUID")?;

        let settings = ctx.settings().await?;
        let session = require_session(&settings).await?;
        let projects = ctx
            .remote(&session)?
            .list_projects(&session.organization)
            .await
            .context("Failed to list projects")?;

        let Some(selected) = projects.iter().find(|p| p.uuid == project) else {
            bail!("Project {project} not found in organization {}", session.organization);
        };

        settings.set_current_project_id(&project).await?;
        info!(%project, name = %selected.name, "Selected project");

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "uuid": project.to_string(),
                "name": selected.name,
            }));
        } else {
            formatter.success(&format!("Now syncing to '{}'", selected.name));
        }
        Ok(())
    }

    async fn execute_current(&self, ctx: &CliContext) -> Result<()> {
        let settings = ctx.settings().await?;
        let project = require_project(&settings).await?;

        if ctx.format.is_json() {
            ctx.formatter()
                .print_json(&serde_json::json!({ "uuid": project.to_string() }));
        } else {
            ctx.formatter().success(&format!("Current project: {project}"));
        }
        Ok(())
    }
}
