//! Basic example of the lambda-ioc container.
//!
//! Run with `RUST_LOG=basic=debug,lambda_ioc_container=trace` to watch
//! resolution.

use std::sync::Arc;

use lambda_ioc::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// === Define your types ===

trait Logger: Send + Sync {
    fn log(&self, msg: &str);
}

struct ConsoleLogger;

impl Logger for ConsoleLogger {
    fn log(&self, msg: &str) {
        println!("[LOG] {msg}");
    }
}

struct Database {
    url: String,
    logger: Arc<dyn Logger>,
}

impl Database {
    async fn connect(url: &str, logger: Arc<dyn Logger>) -> Self {
        logger.log(&format!("Connecting to {url}"));
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        Self {
            url: url.to_string(),
            logger,
        }
    }

    fn query(&self, sql: &str) -> String {
        self.logger.log(&format!("Executing: {sql}"));
        format!("Results from {}", self.url)
    }
}

struct UserService {
    db: Arc<Database>,
}

impl UserService {
    fn get_user(&self, id: u64) -> String {
        self.db.query(&format!("SELECT * FROM users WHERE id = {id}"))
    }
}

trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

struct Named(&'static str);

impl Plugin for Named {
    fn name(&self) -> &str {
        self.0
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("basic=info,lambda_ioc_container=debug")),
        )
        .init();

    let mut builder = lambda_ioc::create_container();
    builder
        // Config values
        .register_value("db_url", String::from("postgres://localhost/myapp"))?
        // Logger, shared behind a trait object
        .register_value("logger", Arc::new(ConsoleLogger) as Arc<dyn Logger>)?
        // Database: connected once, on first use
        .register_async_singleton(
            "db",
            |deps| async move {
                let url = deps.get::<String>(0)?;
                let logger = deps.get::<Arc<dyn Logger>>(1)?;
                Ok::<_, IocError>(Database::connect(&url, (*logger).clone()).await)
            },
            &["db_url", "logger"],
        )?
        // UserService: new one per resolution
        .register_async_factory(
            "users",
            |deps| async move { Ok::<_, IocError>(UserService { db: deps.get(0)? }) },
            &["db"],
        )?
        // Plugins form the "plugins" group
        .register_value("plugins:auth", Arc::new(Named("auth")) as Arc<dyn Plugin>)?
        .register_value("plugins:billing", Arc::new(Named("billing")) as Arc<dyn Plugin>)?;

    if let Err(err) = builder.validate() {
        warn!(%err, "Container is not wired correctly");
        return Err(err);
    }
    let container = builder.close();
    info!(keys = ?container.keys(), "Container ready");
    println!("✅ Container closed: {container:?}");

    let service = container.resolve_async::<UserService>("users").await?;
    info!(db_resolved = ?container.binding_info("db").map(|b| b.resolved), "Resolved users");
    println!("👤 {}", service.get_user(42));

    // Same database, the singleton is memoized
    let again = container.resolve_async::<UserService>("users").await?;
    assert!(Arc::ptr_eq(&service.db, &again.db));

    for (label, plugin) in container
        .resolve_labelled_group::<Arc<dyn Plugin>>("plugins")
        .await?
    {
        println!("🔌 {label}: {}", plugin.name());
    }
    println!("📋 Plugin labels: {:?}", container.resolve_group_labels("plugins"));

    println!("\n🎉 Everything works!");
    Ok(())
}
