//! Process composition root.
//!
//! Every collaborator is built and wired here, once, explicitly: queues are
//! declared by name, handlers are registered against the event names they
//! consume, and nothing registers itself at import time. Components receive
//! their collaborators as constructor arguments and hold no global state.

use std::sync::Arc;

use gatehouse_core::clock::Clock;
use gatehouse_core::handler::EventHandler;
use gatehouse_core::queue::QueueService;
use gatehouse_core::stream::OrderedStream;
use gatehouse_core::table::KeyValueTable;
use gatehouse_event_store::constraints::ConstraintStore;
use gatehouse_event_store::memory::MemoryTable;
use gatehouse_event_store::projections::ProjectionStore;
use gatehouse_event_store::store::EventStore;
use gatehouse_iam::application::services::{RoleService, UserService};
use gatehouse_iam::domain::events::{
    ROLE_CREATED_EVENT_NAME, ROLE_DISABLED_EVENT_NAME, USER_DISABLED_EVENT_NAME,
    USER_REGISTERED_EVENT_NAME, USER_ROLE_ADDED_EVENT_NAME, USER_ROLE_REMOVED_EVENT_NAME,
    USER_UPDATED_EVENT_NAME,
};
use gatehouse_iam::projections::handlers::{RoleProjectionHandler, UserProjectionHandler};
use gatehouse_iam::projections::role::RoleProjection;
use gatehouse_iam::projections::user::UserProjection;
use gatehouse_messaging::dispatcher::QueueDispatcher;
use gatehouse_messaging::memory::{MemoryQueue, MemoryStream};
use gatehouse_messaging::registry::HandlerRegistry;
use gatehouse_messaging::relay::ChangeRelay;
use gatehouse_messaging::router::FanOutRouter;

use crate::config::Config;

/// Destination queue for user events; the name the router derives from
/// `org/iam/user/...`.
pub const USER_QUEUE: &str = "IamUserQueue";

/// Destination queue for role events; the name the router derives from
/// `org/iam/role/...`.
pub const ROLE_QUEUE: &str = "IamRoleQueue";

/// Everything a running process needs, wired over the in-memory
/// collaborators.
pub struct AppContext {
    /// The settings the context was built from.
    pub config: Config,
    /// Backing table for the log, the constraints, and both projections.
    pub table: Arc<MemoryTable>,
    /// Ordered stream between the relay and the router.
    pub stream: Arc<MemoryStream>,
    /// Queue service carrying both declared queues.
    pub queues: Arc<MemoryQueue>,
    /// Endpoints of the declared queues, in declaration order.
    pub queue_endpoints: Vec<String>,
    /// Append-only event log.
    pub event_store: Arc<EventStore>,
    /// Uniqueness reservations.
    pub constraints: Arc<ConstraintStore>,
    /// User read models, for the query side.
    pub user_projections: Arc<ProjectionStore<UserProjection>>,
    /// Role read models, for the query side.
    pub role_projections: Arc<ProjectionStore<RoleProjection>>,
    /// User command entry point.
    pub user_service: Arc<UserService>,
    /// Role command entry point.
    pub role_service: Arc<RoleService>,
    /// Change feed → stream.
    pub relay: Arc<ChangeRelay>,
    /// Stream → queues.
    pub router: Arc<FanOutRouter>,
    /// Queues → handlers.
    pub dispatcher: Arc<QueueDispatcher>,
}

impl AppContext {
    /// Wires the full pipeline against fresh in-memory collaborators.
    #[must_use]
    pub fn new(config: Config, clock: Arc<dyn Clock>) -> Self {
        let table = Arc::new(MemoryTable::new());
        table.declare(&config.event_log_table, &["id", "version"]);
        table.declare(&config.constraints_table, &["constraint"]);
        table.declare(&config.user_projections_table, &["id"]);
        table.declare(&config.role_projections_table, &["id"]);

        let stream = Arc::new(MemoryStream::new());
        let queues = Arc::new(MemoryQueue::new());
        let queue_endpoints = vec![queues.declare(USER_QUEUE), queues.declare(ROLE_QUEUE)];

        let event_store = Arc::new(EventStore::new(
            Arc::clone(&table) as Arc<dyn KeyValueTable>,
            config.event_log_table.clone(),
        ));
        let constraints = Arc::new(ConstraintStore::new(
            Arc::clone(&table) as Arc<dyn KeyValueTable>,
            config.constraints_table.clone(),
        ));
        let user_projections = Arc::new(ProjectionStore::new(
            Arc::clone(&table) as Arc<dyn KeyValueTable>,
            config.user_projections_table.clone(),
        ));
        let role_projections = Arc::new(ProjectionStore::new(
            Arc::clone(&table) as Arc<dyn KeyValueTable>,
            config.role_projections_table.clone(),
        ));

        let role_service = Arc::new(RoleService::new(
            Arc::clone(&event_store),
            Arc::clone(&constraints),
            Arc::clone(&clock),
        ));
        let user_service = Arc::new(UserService::new(
            Arc::clone(&event_store),
            Arc::clone(&constraints),
            Arc::clone(&role_service),
            clock,
        ));

        let user_handler = Arc::new(UserProjectionHandler::new(ProjectionStore::new(
            Arc::clone(&table) as Arc<dyn KeyValueTable>,
            config.user_projections_table.clone(),
        )));
        let role_handler = Arc::new(RoleProjectionHandler::new(ProjectionStore::new(
            Arc::clone(&table) as Arc<dyn KeyValueTable>,
            config.role_projections_table.clone(),
        )));

        // The role view also tracks its members, so the user-side events
        // register on both handlers.
        let registry = HandlerRegistry::builder()
            .register(
                &[
                    USER_REGISTERED_EVENT_NAME,
                    USER_UPDATED_EVENT_NAME,
                    USER_DISABLED_EVENT_NAME,
                    USER_ROLE_ADDED_EVENT_NAME,
                    USER_ROLE_REMOVED_EVENT_NAME,
                ],
                user_handler as Arc<dyn EventHandler>,
            )
            .register(
                &[
                    ROLE_CREATED_EVENT_NAME,
                    ROLE_DISABLED_EVENT_NAME,
                    USER_UPDATED_EVENT_NAME,
                    USER_ROLE_ADDED_EVENT_NAME,
                    USER_ROLE_REMOVED_EVENT_NAME,
                ],
                role_handler as Arc<dyn EventHandler>,
            )
            .build();

        let relay = Arc::new(ChangeRelay::new(Arc::clone(&stream) as Arc<dyn OrderedStream>));
        let router = Arc::new(FanOutRouter::new(Arc::clone(&queues) as Arc<dyn QueueService>));
        let dispatcher = Arc::new(QueueDispatcher::new(Arc::new(registry)));

        Self {
            config,
            table,
            stream,
            queues,
            queue_endpoints,
            event_store,
            constraints,
            user_projections,
            role_projections,
            user_service,
            role_service,
            relay,
            router,
            dispatcher,
        }
    }
}
