use std::env;
use std::net::SocketAddr;

use axum::Router;
use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use tower_http::catch_panic::CatchPanicLayer;

use participant_service::database::schema;
use participant_service::web::routes::participants;

#[tokio::main]
async fn main() {
    dotenv().ok();

    tracing_subscriber::fmt::init();

    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = SqlitePoolOptions::new()
        .connect(&db_url)
        .await
        .expect("cannot connect to database");

    schema::ensure_schema(&pool)
        .await
        .expect("cannot create participants schema");

    let app = Router::new()
        .nest("/participants", participants::router())
        .layer(CatchPanicLayer::new())
        .with_state(pool);

    let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .expect("cannot parse host/port");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("cannot bind listener");
    tracing::info!("participant service listening on http://{}", addr);

    axum::serve(listener, app).await.unwrap();
}
