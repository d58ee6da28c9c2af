use raffle_number_inventory::adapter::driven::{
    MySqlPaymentSettlementRepository, MySqlRaffleLookup, MySqlRaffleNumberRepository, SystemClock,
    TracingEventPublisher, TracingLogger, UuidTicketMinter,
};
use raffle_number_inventory::adapter::driver::{create_router, AppState, ExpiryScheduler};
use raffle_number_inventory::adapter::{DatabaseConfig, DatabaseMigration, ReservationConfig};
use raffle_number_inventory::application::service::{
    PaymentConfirmationService, RaffleNumberApplicationService, RaffleNumberQueryService,
};

use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .envファイルから環境変数を読み込む
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 設定を読み込む
    let database_config = DatabaseConfig::from_env()?;
    let reservation_config = ReservationConfig::from_env()?;
    tracing::info!(
        host = %database_config.host,
        port = database_config.port,
        hold_ttl_minutes = reservation_config.policy.default_ttl.minutes(),
        reclaim_interval_seconds = reservation_config.reclaim_interval.as_secs(),
        "設定を読み込みました"
    );

    // 接続プールを作成
    let pool = MySqlPoolOptions::new()
        .max_connections(database_config.max_connections)
        .acquire_timeout(Duration::from_secs(database_config.acquire_timeout_seconds))
        .connect(&database_config.connection_string())
        .await?;

    // マイグレーションを実行
    DatabaseMigration::new(pool.clone()).run().await?;

    // アダプターを作成
    let number_repository = Arc::new(MySqlRaffleNumberRepository::new(pool.clone()));
    let raffle_lookup = Arc::new(MySqlRaffleLookup::new(pool.clone()));
    let logger = Arc::new(TracingLogger::new());

    // アプリケーションサービスを作成
    let number_service = Arc::new(RaffleNumberApplicationService::new(
        number_repository.clone(),
        raffle_lookup.clone(),
        Arc::new(TracingEventPublisher::new()),
        logger.clone(),
        Arc::new(SystemClock::new()),
        reservation_config.policy,
    ));
    let query_service = Arc::new(RaffleNumberQueryService::new(
        number_repository.clone(),
        raffle_lookup,
    ));
    let payment_service = Arc::new(PaymentConfirmationService::new(
        number_service.clone(),
        number_repository,
        Arc::new(MySqlPaymentSettlementRepository::new(pool.clone())),
        Arc::new(UuidTicketMinter::new()),
        logger,
    ));

    // 期限切れ予約の定期回収を起動
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = ExpiryScheduler::new(number_service.clone(), reservation_config.reclaim_interval)
        .spawn(shutdown_rx);

    let app_state = AppState {
        number_service,
        query_service,
        payment_service,
    };

    // REST APIルーターを作成
    let app = create_router()
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(app_state);

    // サーバーを起動
    let listener = tokio::net::TcpListener::bind(&reservation_config.server_addr).await?;
    tracing::info!(addr = %reservation_config.server_addr, "REST APIサーバーが起動しました");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 定期回収を停止して終了を待つ
    shutdown_tx.send(true).ok();
    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "定期回収タスクが異常終了しました");
    }

    tracing::info!("サーバーを停止しました");
    Ok(())
}

/// Ctrl+C または SIGTERM を待つ
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+Cハンドラーを登録できませんでした");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERMハンドラーを登録できませんでした");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Ctrl+Cを受信しました。停止します"),
        () = terminate => tracing::info!("SIGTERMを受信しました。停止します"),
    }
}
