use clap::Parser;
use storefront::cli::{Args, build_config, init_logging, load_token_secret, open_database};
use storefront::{init_cleanup, run_server};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(access_secret) = load_token_secret(
        "ACCESS_TOKEN_SECRET",
        args.access_token_secret_file.as_deref(),
    ) else {
        std::process::exit(1);
    };

    let Some(refresh_secret) = load_token_secret(
        "REFRESH_TOKEN_SECRET",
        args.refresh_token_secret_file.as_deref(),
    ) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let Some(config) = build_config(db, access_secret, refresh_secret, args.production) else {
        std::process::exit(1);
    };

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    init_cleanup(&config.db).await;

    info!(address = %addr, "Listening");

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
