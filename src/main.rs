// src/main.rs

use axum::{routing::post, serve, Router};
use clap::Parser;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::info;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

mod api;
mod config;
mod dao;
mod logging;
mod mock_catalog;
mod model;
mod selection;
mod targeting;

use config::config_manager::ConfigManager;
use dao::adapters::{FileStoreAdapter, StoreAdapter};
use logging::runtime_logger::RuntimeLogger;
use mock_catalog::MockStoreAdapter;
use selection::logic::AdvertisementSelectionLogic;

pub struct AppState {
    pub selection: AdvertisementSelectionLogic,
    pub runtime_logger: Arc<RuntimeLogger>,
}

#[derive(Parser, Debug)]
#[command(version = "1.0", about = "A CTR-ranked advertisement selection server")]
struct CliArgs {
    #[arg(short, long, default_value_t = 8080)]
    port: u16,
    #[arg(long, default_value = "logs")]
    log_dir: String,
    #[arg(long, default_value = "static")]
    static_dir: String,
    /// Per-predicate evaluation deadline in milliseconds.
    #[arg(long, default_value_t = targeting::evaluator::DEFAULT_PREDICATE_TIMEOUT_MS)]
    predicate_timeout_ms: u64,
    /// Upper bound on predicate tasks in flight.
    #[arg(long, default_value_t = targeting::evaluator::DEFAULT_MAX_CONCURRENCY)]
    max_concurrency: usize,
}

#[tokio::main]
async fn main() {
    let args = CliArgs::parse();

    // 初始化全局 tracing 日志
    let log_file = rolling::hourly(&args.log_dir, "adserve_log.json");
    let (non_blocking, _guard) = tracing_appender::non_blocking(log_file);
    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().with_writer(non_blocking));
    tracing::subscriber::set_global_default(subscriber)
        .expect("Unable to set global tracing subscriber");
    info!("ad selection server starting on port {}", args.port);

    // 初始化运行日志记录器
    let runtime_logger = RuntimeLogger::new(&args.log_dir, "runtime", 1000, 100, 1000);
    runtime_logger.log("INFO", "ad selection server is starting...").await;

    // 加载广告目录：static 目录存在则读文件，否则生成 mock 数据
    let content_file = format!("{}/ad_contents.json", args.static_dir);
    let group_file = format!("{}/targeting_groups.json", args.static_dir);
    let file_adapter = FileStoreAdapter::new(&content_file, &group_file);
    let adapter: Box<dyn StoreAdapter> = if file_adapter.files_exist() {
        info!("loading ad catalog from {}", args.static_dir);
        Box::new(file_adapter)
    } else {
        info!("no static catalog found, generating a mock catalog");
        Box::new(MockStoreAdapter::generate())
    };

    let config = ConfigManager::from_adapter(
        adapter.as_ref(),
        args.predicate_timeout_ms,
        args.max_concurrency,
    );

    let state = Arc::new(AppState {
        selection: config.selection_logic(),
        runtime_logger: runtime_logger.clone(),
    });

    let server = tokio::spawn({
        let state = state.clone();
        let port = args.port;
        let runtime_logger = runtime_logger.clone();
        async move {
            let app = Router::new()
                .route("/advertisement", post(api::handlers::handle_ad_request))
                .with_state(state);
            let addr = format!("0.0.0.0:{}", port);
            runtime_logger
                .log("INFO", &format!("ad selection server running at http://{}", addr))
                .await;
            let listener = TcpListener::bind(&addr).await.unwrap();
            serve(listener, app).await.unwrap();
        }
    });

    tokio::select! {
        _ = signal::ctrl_c() => {
            runtime_logger.log("INFO", "Shutting down gracefully...").await;
        }
        result = server => {
            if let Err(e) = result {
                runtime_logger.log("ERROR", &format!("server task failed: {}", e)).await;
            }
        }
    }

    runtime_logger.shutdown().await;
    info!("ad selection server shut down");
}
