//! Bubble gateway entry point

use clap::Parser;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use bubble_gateway::{
    config::{self, Args, CredentialPolicy, EnvFileLoad},
    credentials::ProcessEnv,
    server::{self, AppState, StoreInit},
    GatewayError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load the env file before clap reads the environment
    let env_file = config::env_file_path();
    let env_load = config::load_env_file(&env_file);

    let args = Args::parse();

    // Initialize tracing/logging
    let log_level = args.log_level.clone();
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("bubble_gateway={},info", log_level).into());
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match env_load {
        EnvFileLoad::Loaded => debug!("Loaded env file {}", env_file.display()),
        EnvFileLoad::Missing => debug!("No env file at {}", env_file.display()),
        EnvFileLoad::Partial { error, recovered } => warn!(
            "Env file {} is not valid dotenv syntax ({}); recovered by direct scan: {}",
            env_file.display(),
            error,
            if recovered.is_empty() {
                "nothing".to_string()
            } else {
                recovered.join(", ")
            }
        ),
    }

    // Validate configuration
    if let Err(e) = args.validate() {
        error!("Configuration error: {}", e);
        std::process::exit(1);
    }

    let firestore = args.firestore_config();

    info!("======================================");
    info!("  Bubble Gateway");
    info!("======================================");
    info!("Listen: {}", args.listen_addr());
    info!(
        "Credential policy: {}",
        match args.credential_policy {
            CredentialPolicy::Strict => "STRICT",
            CredentialPolicy::Degraded => "DEGRADED",
        }
    );
    info!("Submissions collection: {}", args.submissions_collection);
    info!("Read collection: {} (ordered by {})", args.read_collection, args.order_field);
    info!("Firestore database: {}", firestore.database);
    if let Some(ref host) = firestore.emulator_host {
        info!("Firestore emulator: {}", host);
    }
    info!("======================================");

    let StoreInit {
        store,
        credential_source,
    } = match server::init_store(
        &ProcessEnv,
        &args.loader_options(env_file),
        &firestore,
        args.credential_policy,
    ) {
        Ok(init) => init,
        Err(GatewayError::Configuration(e)) => {
            error!("Credential error: {}", e);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Document store initialization failed: {}", e);
            std::process::exit(1);
        }
    };

    let mut state = AppState::new(args.gateway_config(), store);
    if let Some(source) = credential_source {
        state = state.with_credential_source(source);
    }

    server::run(Arc::new(state), args.listen_addr()).await?;

    Ok(())
}
