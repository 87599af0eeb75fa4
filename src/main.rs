use std::net::SocketAddr;

use campus_lost_found::auth::TokenIssuer;
use campus_lost_found::catalog::Catalog;
use campus_lost_found::config::Config;
use campus_lost_found::middleware::AuthLayer;
use campus_lost_found::proto::auth::auth_service_server::AuthServiceServer;
use campus_lost_found::proto::health::health_server::HealthServer;
use campus_lost_found::proto::FILE_DESCRIPTOR_SET;
use campus_lost_found::services::{AuthServiceImpl, HealthServiceImpl, ItemsServiceImpl};
use campus_lost_found::storage;

use tonic::transport::Server;
use tonic_reflection::server::Builder as ReflectionBuilder;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campus_lost_found=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting campus-lost-found gRPC server...");

    let store = storage::connect(&config).await?;
    tracing::info!("Storage backend ready: {}", store.backend_name());

    let catalog = Catalog::new(store.clone());
    let tokens = TokenIssuer::new(config.jwt_secret.clone(), config.token_ttl_hours);

    let auth_service = AuthServiceImpl::new(catalog.clone(), tokens.clone());
    let items_service = ItemsServiceImpl::new(catalog);
    let health_service = HealthServiceImpl::new(store);

    // CORS layer for gRPC-Web
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any)
        .expose_headers(Any);

    let reflection_service = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    let addr: SocketAddr = config.server_addr().parse()?;
    tracing::info!("Listening on {}", addr);

    Server::builder()
        .accept_http1(true) // Required for gRPC-Web
        .layer(cors)
        .layer(tonic_web::GrpcWebLayer::new())
        .layer(AuthLayer::new(tokens))
        .add_service(reflection_service)
        .add_service(AuthServiceServer::new(auth_service))
        .add_service(items_service.into_server())
        .add_service(HealthServer::new(health_service))
        .serve(addr)
        .await?;

    Ok(())
}
