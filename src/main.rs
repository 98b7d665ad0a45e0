// SPDX-License-Identifier: GPL-3.0-only

use camera_upload::UploadStrategy;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "camera-upload")]
#[command(about = "Capture photos and upload them to remote image storage")]
#[command(version = env!("GIT_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the image store or the proxy is reachable
    Check {
        /// Upload path to check: direct or proxied (default: USE_DIRECT_CLOUDINARY)
        #[arg(short, long)]
        strategy: Option<UploadStrategy>,
    },

    /// Capture an image file through a session and upload it
    Upload {
        /// Image file used as the capture device
        file: PathBuf,

        /// Destination folder (default: uploads/<timestamp>)
        #[arg(short, long)]
        folder: Option<String>,

        /// Upload path: direct or proxied (default: USE_DIRECT_CLOUDINARY)
        #[arg(short, long)]
        strategy: Option<UploadStrategy>,

        /// Upload the captured still without resizing
        #[arg(long)]
        no_optimize: bool,

        /// JPEG quality (1-100) for the still and the optimized upload
        #[arg(short, long)]
        quality: Option<u8>,

        /// Treat the source as the front camera (mirrored preview)
        #[arg(long)]
        front: bool,
    },

    /// Delete an uploaded asset through the proxy
    Delete {
        /// Asset identifier returned by a previous upload
        asset_id: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    // Set RUST_LOG environment variable to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=camera_upload=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { strategy } => cli::check_connection(strategy),
        Commands::Upload {
            file,
            folder,
            strategy,
            no_optimize,
            quality,
            front,
        } => cli::upload_file(file, folder, strategy, no_optimize, quality, front),
        Commands::Delete { asset_id } => cli::delete_asset(asset_id),
    }
}
