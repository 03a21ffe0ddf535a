//! End-to-end pipeline tests over the in-memory collaborators.
//!
//! Commands run against the services, then the relay, router, and
//! dispatcher are driven by hand until nothing moves, which makes the
//! eventually-consistent pipeline deterministic to assert on. One final
//! test runs the real pumps instead.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, sleep};
use uuid::Uuid;

use gatehouse_core::clock::SystemClock;
use gatehouse_core::error::Error;
use gatehouse_core::queue::QueueService;
use gatehouse_core::table::ChangeNotification;
use gatehouse_iam::application::query_handlers::{self, UserListQuery};
use gatehouse_iam::domain::commands::{
    AddUserRole, CreateRole, RegisterUser, RemoveUserRole, UpdateUser,
};
use gatehouse_runtime::config::Config;
use gatehouse_runtime::context::AppContext;
use gatehouse_runtime::pumps;

/// Builds a fresh context plus a change-feed subscription opened before any
/// command runs.
fn pipeline() -> (AppContext, UnboundedReceiver<ChangeNotification>) {
    let context = AppContext::new(Config::default(), Arc::new(SystemClock));
    let feed = context.table.subscribe(&context.config.event_log_table);
    (context, feed)
}

/// Drives relay, router, and dispatcher until the pipeline is empty.
///
/// Messages whose handlers failed stay queued; the next pass redelivers
/// them, so a cross-queue race settles here exactly as it would under the
/// live pumps.
async fn settle(context: &AppContext, feed: &mut UnboundedReceiver<ChangeNotification>) {
    loop {
        let mut moved = false;
        while let Ok(notification) = feed.try_recv() {
            context.relay.relay(&notification).await.unwrap();
            moved = true;
        }
        let records = context.stream.drain(context.config.relay_batch).unwrap();
        if !records.is_empty() {
            context.router.route(&records).await.unwrap();
            moved = true;
        }
        for endpoint in &context.queue_endpoints {
            let messages = context
                .queues
                .receive(endpoint, context.config.dispatch_batch)
                .await
                .unwrap();
            if messages.is_empty() {
                continue;
            }
            let handled = context.dispatcher.dispatch_batch(&messages).await;
            for message_id in &handled {
                context.queues.delete(endpoint, message_id).await.unwrap();
            }
            if !handled.is_empty() {
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
}

fn register(id: Uuid, email: &str) -> RegisterUser {
    RegisterUser {
        correlation_id: None,
        id,
        email: email.to_owned(),
    }
}

fn create_role(id: Uuid, name: &str) -> CreateRole {
    CreateRole {
        correlation_id: None,
        id,
        name: name.to_owned(),
    }
}

// --- command to projection ---

#[tokio::test]
async fn test_registration_flows_through_to_the_user_projection() {
    // Arrange
    let (context, mut feed) = pipeline();
    let user_id = Uuid::new_v4();

    // Act
    context
        .user_service
        .register(&register(user_id, "ann@example.io"))
        .await
        .unwrap();
    settle(&context, &mut feed).await;

    // Assert
    let view = query_handlers::get_user(&context.user_projections, user_id)
        .await
        .unwrap();
    assert_eq!(view.id, user_id);
    assert_eq!(view.email.as_deref(), Some("ann@example.io"));
    assert!(view.roles.is_empty());
    assert!(view.timestamp.is_some());
}

#[tokio::test]
async fn test_duplicate_email_is_rejected_and_never_reaches_the_projections() {
    // Arrange
    let (context, mut feed) = pipeline();
    context
        .user_service
        .register(&register(Uuid::new_v4(), "ann@example.io"))
        .await
        .unwrap();

    // Act
    let result = context
        .user_service
        .register(&register(Uuid::new_v4(), "ann@example.io"))
        .await;
    settle(&context, &mut feed).await;

    // Assert
    assert!(matches!(result, Err(Error::UniqueConstraintViolated(_))));
    let views = query_handlers::list_users(&context.user_projections, UserListQuery::default())
        .await
        .unwrap();
    assert_eq!(views.len(), 1);
}

// --- cross-aggregate enrichment ---

#[tokio::test]
async fn test_role_grant_converges_both_projections() {
    // Arrange
    let (context, mut feed) = pipeline();
    let user_id = Uuid::new_v4();
    let role_id = Uuid::new_v4();
    context
        .user_service
        .register(&register(user_id, "ann@example.io"))
        .await
        .unwrap();
    context
        .role_service
        .create(&create_role(role_id, "auditors"))
        .await
        .unwrap();

    // Act
    context
        .user_service
        .add_role(&AddUserRole {
            correlation_id: None,
            id: user_id,
            role_id,
        })
        .await
        .unwrap();
    settle(&context, &mut feed).await;

    // Assert
    let user_view = query_handlers::get_user(&context.user_projections, user_id)
        .await
        .unwrap();
    assert_eq!(user_view.roles.len(), 1);
    assert_eq!(user_view.roles[0].id, role_id);
    assert_eq!(user_view.roles[0].name, "auditors");

    let role_view = query_handlers::get_role(&context.role_projections, role_id)
        .await
        .unwrap();
    assert_eq!(role_view.name.as_deref(), Some("auditors"));
    assert_eq!(role_view.users.len(), 1);
    assert_eq!(role_view.users[0].id, user_id);
    assert_eq!(role_view.users[0].email.as_deref(), Some("ann@example.io"));
}

#[tokio::test]
async fn test_update_fans_out_to_every_role_view_holding_the_user() {
    // Arrange
    let (context, mut feed) = pipeline();
    let user_id = Uuid::new_v4();
    let first_role = Uuid::new_v4();
    let second_role = Uuid::new_v4();
    context
        .user_service
        .register(&register(user_id, "ann@example.io"))
        .await
        .unwrap();
    context
        .role_service
        .create(&create_role(first_role, "auditors"))
        .await
        .unwrap();
    context
        .role_service
        .create(&create_role(second_role, "operators"))
        .await
        .unwrap();
    for role_id in [first_role, second_role] {
        context
            .user_service
            .add_role(&AddUserRole {
                correlation_id: None,
                id: user_id,
                role_id,
            })
            .await
            .unwrap();
    }

    // Act
    context
        .user_service
        .update(&UpdateUser {
            correlation_id: None,
            id: user_id,
            first_name: "Ann".to_owned(),
            last_name: "Barr".to_owned(),
        })
        .await
        .unwrap();
    settle(&context, &mut feed).await;

    // Assert
    let user_view = query_handlers::get_user(&context.user_projections, user_id)
        .await
        .unwrap();
    assert_eq!(user_view.first_name.as_deref(), Some("Ann"));
    assert_eq!(user_view.last_name.as_deref(), Some("Barr"));
    for role_id in [first_role, second_role] {
        let role_view = query_handlers::get_role(&context.role_projections, role_id)
            .await
            .unwrap();
        assert_eq!(role_view.users.len(), 1);
        assert_eq!(role_view.users[0].first_name.as_deref(), Some("Ann"));
        assert_eq!(role_view.users[0].last_name.as_deref(), Some("Barr"));
    }
}

#[tokio::test]
async fn test_role_removal_updates_both_views() {
    // Arrange
    let (context, mut feed) = pipeline();
    let user_id = Uuid::new_v4();
    let role_id = Uuid::new_v4();
    context
        .user_service
        .register(&register(user_id, "ann@example.io"))
        .await
        .unwrap();
    context
        .role_service
        .create(&create_role(role_id, "auditors"))
        .await
        .unwrap();
    context
        .user_service
        .add_role(&AddUserRole {
            correlation_id: None,
            id: user_id,
            role_id,
        })
        .await
        .unwrap();
    settle(&context, &mut feed).await;

    // Act
    context
        .user_service
        .remove_role(&RemoveUserRole {
            correlation_id: None,
            id: user_id,
            role_id,
        })
        .await
        .unwrap();
    settle(&context, &mut feed).await;

    // Assert
    let user_view = query_handlers::get_user(&context.user_projections, user_id)
        .await
        .unwrap();
    assert!(user_view.roles.is_empty());
    let role_view = query_handlers::get_role(&context.role_projections, role_id)
        .await
        .unwrap();
    assert!(role_view.users.is_empty());
}

// --- live pumps ---

#[tokio::test]
async fn test_live_pumps_settle_a_grant_without_manual_driving() {
    // Arrange
    let context = AppContext::new(Config::default(), Arc::new(SystemClock));
    let tasks = pumps::spawn_pipeline(&context);
    let user_id = Uuid::new_v4();
    let role_id = Uuid::new_v4();

    // Act
    context
        .user_service
        .register(&register(user_id, "ann@example.io"))
        .await
        .unwrap();
    context
        .role_service
        .create(&create_role(role_id, "auditors"))
        .await
        .unwrap();
    context
        .user_service
        .add_role(&AddUserRole {
            correlation_id: None,
            id: user_id,
            role_id,
        })
        .await
        .unwrap();

    // Assert
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let user = query_handlers::get_user(&context.user_projections, user_id).await;
        let role = query_handlers::get_role(&context.role_projections, role_id).await;
        if let (Ok(user), Ok(role)) = (user, role)
            && !user.roles.is_empty()
            && !role.users.is_empty()
        {
            break;
        }
        assert!(
            Instant::now() < deadline,
            "projections did not settle in time"
        );
        sleep(Duration::from_millis(10)).await;
    }
    for task in tasks {
        task.abort();
    }
}
