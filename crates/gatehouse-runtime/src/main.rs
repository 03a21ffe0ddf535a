//! Gatehouse IAM runtime entry point.
//!
//! Boots the in-memory pipeline, walks one user and one role through it,
//! and logs the settled projections.

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use gatehouse_core::clock::SystemClock;
use gatehouse_core::command::Command;
use gatehouse_iam::application::query_handlers;
use gatehouse_iam::domain::commands::{AddUserRole, CreateRole, RegisterUser};
use gatehouse_runtime::config::Config;
use gatehouse_runtime::context::AppContext;
use gatehouse_runtime::pumps;

/// How long the walkthrough waits for the projections to settle.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Initialize tracing subscriber.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting Gatehouse IAM runtime");

    let config = Config::from_env()?;
    let context = AppContext::new(config, Arc::new(SystemClock));
    let tasks = pumps::spawn_pipeline(&context);

    walkthrough(&context).await?;

    for task in tasks {
        task.abort();
    }
    tracing::info!("Gatehouse IAM runtime finished");
    Ok(())
}

/// Registers a user, creates a role, grants it, and waits for both read
/// models to converge.
async fn walkthrough(context: &AppContext) -> Result<(), Box<dyn Error>> {
    let user_id = Uuid::new_v4();
    let role_id = Uuid::new_v4();
    let correlation_id = Some(Uuid::new_v4());

    let register = RegisterUser {
        correlation_id,
        id: user_id,
        email: "ada.lovelace@gatehouse.example".to_owned(),
    };
    tracing::info!(command = register.command_type(), id = %user_id, "executing command");
    context.user_service.register(&register).await?;

    let create = CreateRole {
        correlation_id,
        id: role_id,
        name: "administrators".to_owned(),
    };
    tracing::info!(command = create.command_type(), id = %role_id, "executing command");
    context.role_service.create(&create).await?;

    let grant = AddUserRole {
        correlation_id,
        id: user_id,
        role_id,
    };
    tracing::info!(command = grant.command_type(), id = %user_id, "executing command");
    context.user_service.add_role(&grant).await?;

    let deadline = Instant::now() + SETTLE_TIMEOUT;
    loop {
        let user = query_handlers::get_user(&context.user_projections, user_id).await;
        let role = query_handlers::get_role(&context.role_projections, role_id).await;
        if let (Ok(user), Ok(role)) = (user, role)
            && !user.roles.is_empty()
            && !role.users.is_empty()
        {
            tracing::info!(
                user = %serde_json::to_string(&user)?,
                role = %serde_json::to_string(&role)?,
                "projections settled"
            );
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err("projections did not settle in time".into());
        }
        sleep(Duration::from_millis(20)).await;
    }
}
