use axum::http::{HeaderName, HeaderValue};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mutuals::app::auth::AccessTokens;
use mutuals::app::engagement::EngagementService;
use mutuals::config::{AppConfig, AppMode};
use mutuals::infra::{db::Db, media::MediaUrls};
use mutuals::{http, AppState};

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    let db = Db::connect(&config).await?;

    match config.app_mode {
        AppMode::Migrate => {
            db.migrate().await?;
            tracing::info!("migrations applied");
        }
        AppMode::Reconcile => {
            let corrected = EngagementService::new(db.clone()).reconcile_counters().await?;
            tracing::info!(corrected, "counter reconciliation finished");
        }
        AppMode::Api => {
            if config.run_migrations {
                db.migrate().await?;
            }

            let state = AppState {
                db,
                tokens: AccessTokens::new(config.paseto_access_key, config.access_ttl_minutes),
                media: MediaUrls::new(config.media_base_url.as_deref())?,
            };

            let app: Router = http::router(state)
                .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
                .layer(CompressionLayer::new())
                .layer(cors_layer(&config.cors_allowed_origins)?)
                .layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
                .layer(TraceLayer::new_for_http())
                .layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid));

            let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
            tracing::info!("listening on {}", config.http_addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
        }
    }

    Ok(())
}

fn cors_layer(origins: &[String]) -> anyhow::Result<CorsLayer> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        let origins = origins
            .iter()
            .map(|origin| HeaderValue::from_str(origin))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| anyhow::anyhow!("invalid CORS_ALLOWED_ORIGINS: {}", err))?;
        AllowOrigin::list(origins)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
