//! CourseDesk Telegram bot
//!
//! Main application entry point

use std::sync::Arc;
use teloxide::{prelude::*, types::{CallbackQuery, Message, Update}};
use teloxide::dispatching::UpdateHandler;
use tracing::{info, warn, error};

use CourseDesk::{
    config::Settings,
    utils::{logging, clock::{Clock, SystemClock}},
    database::{DatabaseService, DatabaseConfig, ScheduleStore, create_pool, run_migrations},
    services::ServiceFactory,
    state::{PendingActionStore, RedisPendingStore},
    handlers::{Command, handle_command, handle_callback_query, handle_message},
};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    settings.validate()?;

    // Initialize logging; the guard flushes the file writer on shutdown
    let _log_guard = logging::init_logging(&settings.logging)?;

    info!("Starting CourseDesk bot...");

    // Initialize database connection
    info!("Connecting to database...");
    let db_pool = create_pool(&DatabaseConfig::from(&settings.database)).await?;
    run_migrations(&db_pool).await?;
    let store: Arc<dyn ScheduleStore> = Arc::new(DatabaseService::new(db_pool));

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    // Pending topic/notes prompts live in Redis
    info!("Connecting to Redis...");
    let redis_store = RedisPendingStore::new(&settings.redis, clock.clone()).await?;
    if !redis_store.health_check().await.unwrap_or(false) {
        warn!("Redis did not answer PING");
    }
    let pending: Arc<dyn PendingActionStore> = Arc::new(redis_store);

    // Initialize bot and services
    let bot = Bot::new(&settings.bot.token);
    let services = Arc::new(ServiceFactory::new(bot.clone(), settings, store, pending, clock));

    let mut dispatcher = Dispatcher::builder(bot, create_handler())
        .dependencies(dptree::deps![services])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd);
        })
        .enable_ctrlc_handler()
        .build();

    info!("CourseDesk bot is ready, starting polling");
    dispatcher.dispatch().await;

    info!("CourseDesk bot has been shut down.");
    Ok(())
}

/// Create the main update handler
fn create_handler() -> UpdateHandler<Box<dyn std::error::Error + Send + Sync + 'static>> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .branch(
                    dptree::entry()
                        .filter_command::<Command>()
                        .endpoint(handle_commands),
                )
                .branch(dptree::endpoint(handle_messages)),
        )
        .branch(Update::filter_callback_query().endpoint(handle_callbacks))
}

/// Handle bot commands
async fn handle_commands(bot: Bot, msg: Message, cmd: Command, services: Arc<ServiceFactory>) -> HandlerResult {
    let services = (*services).clone();

    if let Err(e) = handle_command(bot, msg, cmd, services).await {
        error!(error = %e, "Error handling command");
        return Err(e.into());
    }

    Ok(())
}

/// Handle regular messages
async fn handle_messages(bot: Bot, msg: Message, services: Arc<ServiceFactory>) -> HandlerResult {
    let services = (*services).clone();

    if let Err(e) = handle_message(bot, msg, services).await {
        error!(error = %e, "Error handling message");
        return Err(e.into());
    }

    Ok(())
}

/// Handle callback queries
async fn handle_callbacks(bot: Bot, query: CallbackQuery, services: Arc<ServiceFactory>) -> HandlerResult {
    let user_id = query.from.id.0 as i64;
    let services = (*services).clone();

    if let Err(e) = handle_callback_query(bot, query, services).await {
        error!(user_id = user_id, error = %e, "Error handling callback query");
        return Err(e.into());
    }

    Ok(())
}
