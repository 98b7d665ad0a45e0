// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for upload diagnostics
//!
//! This module provides command-line functionality for:
//! - Checking reachability of the image store or the proxy
//! - Capturing a still from an image file and uploading it
//! - Deleting an uploaded asset

use camera_upload::backends::camera::{
    CaptureSession, DeviceClass, DeviceFacing, FileCaptureDevice,
};
use camera_upload::config::Config;
use camera_upload::constants::remote;
use camera_upload::pipelines::photo::{OptimizeOptions, PhotoEncoder, generate_upload_path};
use camera_upload::pipelines::upload::{UploadPipeline, UploadStrategy};
use camera_upload::SessionController;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// How long the file-backed preview may take to show its frame
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Check whether the selected upload path is reachable
pub fn check_connection(strategy: Option<UploadStrategy>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let strategy = strategy.unwrap_or_else(|| config.flags.upload_strategy());
    let pipeline = UploadPipeline::from_config(&config)?;

    println!("Checking {} upload path...", strategy);
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(pipeline.test_connection(strategy));

    if report.reachable {
        println!("Reachable: {}", report.detail);
        Ok(())
    } else {
        Err(format!("Unreachable: {}", report.detail).into())
    }
}

/// Capture the image at `file` and upload it
pub fn upload_file(
    file: PathBuf,
    folder: Option<String>,
    strategy: Option<UploadStrategy>,
    no_optimize: bool,
    quality: Option<u8>,
    front: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::from_env();
    if no_optimize {
        config.flags.image_optimization = false;
    }
    let strategy = strategy.unwrap_or_else(|| config.flags.upload_strategy());
    let folder = folder.unwrap_or_else(|| generate_upload_path(remote::DEFAULT_FOLDER));

    let facing = if front {
        DeviceFacing::Front
    } else {
        DeviceFacing::Back
    };
    let device = Arc::new(FileCaptureDevice::new(&file));
    let mut session = CaptureSession::new(device, DeviceClass::Desktop, facing);
    let mut optimize = OptimizeOptions::default();
    if let Some(quality) = quality {
        session = session.with_encoder(PhotoEncoder::with_quality(quality));
        optimize.quality = quality.clamp(1, 100);
    }
    let controller = SessionController::new(session, UploadPipeline::from_config(&config)?, config.flags)
        .with_optimize_options(optimize);

    println!("Using image: {}", file.display());
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(capture_and_upload(&controller, folder, strategy))
}

async fn capture_and_upload(
    controller: &SessionController,
    folder: String,
    strategy: UploadStrategy,
) -> Result<(), Box<dyn std::error::Error>> {
    controller.initialize().await?;

    if !controller.session().wait_for_frame(FIRST_FRAME_TIMEOUT).await {
        controller.reset().await;
        return Err("No preview frame from the capture device".into());
    }

    let photo = controller.capture().await?;
    println!(
        "Captured {}x{} ({} bytes)",
        photo.width,
        photo.height,
        photo.blob.len()
    );

    println!("Uploading to '{}' via {}...", folder, strategy);
    let mut updates = controller.subscribe();
    let upload = controller.upload(Some(folder), strategy);
    tokio::pin!(upload);

    let mut shown = None;
    let result = loop {
        tokio::select! {
            result = &mut upload => break result,
            changed = updates.changed() => {
                if changed.is_err() {
                    break upload.await;
                }
                let progress = updates.borrow_and_update().progress();
                if shown != Some(progress) {
                    shown = Some(progress);
                    print!("\r  {:>3}%", progress);
                    let _ = std::io::stdout().flush();
                }
            }
        }
    };
    println!();

    controller.reset().await;
    let asset = result?;
    println!("Uploaded: {}", asset.remote_url);
    println!("Asset id: {}", asset.asset_id);
    Ok(())
}

/// Delete an uploaded asset through the proxy
pub fn delete_asset(asset_id: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env();
    let gate = UploadPipeline::from_config(&config)?.deletion_gate();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(gate.delete_asset(&asset_id))?;

    println!("Deleted: {}", asset_id);
    Ok(())
}
