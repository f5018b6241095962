use chrono::Duration;
use sea_orm::Database;
use tracing::info;

use warden_core::config::Config;
use warden_core::tracing::init_tracing;
use warden_proto::trust::trust_service_server::TrustServiceServer;

use warden_trust::config::TrustConfig;
use warden_trust::grpc_server::TrustGrpcServer;
use warden_trust::router::build_router;
use warden_trust::state::AppState;

#[tokio::main]
async fn main() {
    init_tracing("info");

    let config = TrustConfig::from_env();

    let db = Database::connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    let state = AppState {
        db,
        cookie_domain: config.cookie_domain,
        code_ttl: Duration::seconds(config.code_ttl_secs),
        expose_lock_codes: config.expose_lock_codes,
        event_sink: config.event_sink,
    };
    if state.expose_lock_codes {
        tracing::warn!("EXPOSE_LOCK_CODES is set; step-up codes are returned in HTTP responses");
    }

    // Spawn gRPC server
    let grpc_state = state.clone();
    let grpc_addr = format!("0.0.0.0:{}", config.trust_grpc_port);
    tokio::spawn(async move {
        let server = TrustGrpcServer { state: grpc_state };
        info!("trust gRPC server listening on {grpc_addr}");
        tonic::transport::Server::builder()
            .add_service(TrustServiceServer::new(server))
            .serve(grpc_addr.parse().expect("invalid gRPC address"))
            .await
            .expect("gRPC server error");
    });

    // HTTP server
    let router = build_router(state);
    let http_addr = format!("0.0.0.0:{}", config.trust_port);
    let listener = tokio::net::TcpListener::bind(&http_addr)
        .await
        .expect("failed to bind");

    info!("trust service listening on {http_addr}");
    axum::serve(listener, router).await.expect("server error");
}
