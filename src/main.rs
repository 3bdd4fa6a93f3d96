#![warn(clippy::unwrap_used)]

use clap::Parser as _;
use std::{path::PathBuf, sync::Arc};

use bookpress::{
    error::ContextError,
    fonts::FontSet,
    server::{self, AppState},
};

/// The image embedded at the top of every rendered document when no other URL is given.
const DEFAULT_IMAGE_URL: &str =
    "https://rxqfrojpwinspidmrgyl.supabase.co/storage/v1/object/public/edm/msf-logo.png";

#[derive(clap::Parser)]
#[command(version, long_about = None)]
struct CliArguments {
    #[arg(long = "host", default_value = "0.0.0.0", help = "Address the HTTP listener binds to")]
    host: String,
    #[arg(long = "port", default_value_t = 3000, help = "Port the HTTP listener binds to")]
    port: u16,
    #[arg(
        long = "image-url",
        default_value = DEFAULT_IMAGE_URL,
        help = "URL of the header image embedded into the documents"
    )]
    image_url: String,
    #[arg(
        long = "fonts-directory",
        default_value = "fonts",
        help = "Directory the font set is read from"
    )]
    fonts_directory: PathBuf,
}

#[tokio::main]
async fn main() {
    if let Err(error) = fallible_main().await {
        log::error!("{}", error);
        std::process::exit(1);
    }
}

async fn fallible_main() -> Result<(), ContextError> {
    env_logger::init();
    let cli_arguments = CliArguments::parse();

    // The fonts are loaded once here and shared by reference afterwards, so a missing font
    // aborts the startup instead of a request
    let fonts = FontSet::load(&cli_arguments.fonts_directory)?;
    let state = AppState {
        fonts: Arc::new(fonts),
        image_url: cli_arguments.image_url.into(),
    };
    let app = server::router(state);

    let address = format!("{}:{}", cli_arguments.host, cli_arguments.port);
    let listener = tokio::net::TcpListener::bind(&address).await.map_err(|error| {
        ContextError::with_error(format!("Failed to bind the listener to {}", address), &error)
    })?;

    log::info!("Server is running at http://{}", address);
    log::info!("Endpoints:");
    log::info!("  - GET /generate-pdf");
    log::info!("  - GET /booking-confirmation");

    axum::serve(listener, app)
        .await
        .map_err(|error| ContextError::with_error("The HTTP server terminated", &error))
}
