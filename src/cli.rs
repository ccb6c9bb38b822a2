// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands for the proof-of-delivery workflow
//!
//! This module provides command-line functionality for:
//! - Running the workflow interactively from a terminal
//! - Decoding a QR code from an image file
//! - Printing the effective configuration

use pod_capture::app::{BarcodeDecoder, Command, QrDecoder, Workflow, WorkflowSnapshot};
use pod_capture::backends::camera::get_backend;
use pod_capture::backends::virtual_camera::load_image_as_frame;
use pod_capture::config::Config;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  scan           start scanning for an AWB barcode
  stop           stop scanning
  awb <id>       enter the AWB number manually (alias: manual)
  photo          capture a photo as proof
  video          record a video as proof
  upload         upload the proof for the current AWB
  reset          start over
  status         show the current state
  help           show this help
  quit           exit";

/// Load the configuration from `path` or the default location
pub fn load_config(path: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let config = match path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    Ok(config)
}

/// Print the effective configuration as JSON
pub fn print_config(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Decode the first QR code found in an image file
pub fn decode_image(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let frame = load_image_as_frame(path)?;
    println!("Image: {}x{}", frame.width, frame.height);

    match QrDecoder::new().decode(&frame) {
        Some(decoded) => {
            println!("Decoded: {}", decoded.text);
            Ok(())
        }
        None => Err(format!("No QR code found in {}", path.display()).into()),
    }
}

/// Drive the workflow from stdin until `quit` or end of input
pub fn run_session(config: Config, source: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let backend = get_backend(source)?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let workflow = Workflow::from_config(backend, &config)?;
        let mut updates = workflow.subscribe();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        println!("pod-capture {}", pod_capture::constants::app_info::version());
        println!("{}", HELP);
        print_snapshot(&workflow.snapshot());

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    if !execute(&workflow, line.trim()) {
                        break;
                    }
                }
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    print_snapshot(&snapshot);
                }
            }
        }

        workflow.shutdown();
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}

/// Run one command line; returns `false` when the session should end
fn execute(workflow: &Workflow, line: &str) -> bool {
    let (verb, argument) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let result = match verb {
        "" => Ok(()),
        "scan" => workflow.start_scan(),
        "stop" => workflow.stop_scan(),
        "awb" | "manual" => workflow.manual_entry(argument),
        "photo" => {
            workflow.capture_photo();
            Ok(())
        }
        "video" => {
            workflow.record_video();
            Ok(())
        }
        "upload" => workflow.upload(),
        "reset" => {
            workflow.reset();
            Ok(())
        }
        "status" => {
            print_snapshot(&workflow.snapshot());
            Ok(())
        }
        "help" | "?" => {
            println!("{}", HELP);
            Ok(())
        }
        "quit" | "exit" => return false,
        other => {
            println!("Unknown command `{}` (try `help`)", other);
            Ok(())
        }
    };

    if let Err(e) = result {
        println!("! {}", e);
    }
    true
}

fn print_snapshot(snapshot: &WorkflowSnapshot) {
    let media = match (&snapshot.media_type, snapshot.media_size) {
        (Some(kind), Some(size)) => format!("{} ({} bytes)", kind, size),
        _ => "none".to_string(),
    };
    let commands: Vec<&str> = snapshot
        .enabled
        .iter()
        .map(|c| match c {
            Command::StartScan => "scan",
            Command::StopScan => "stop",
            Command::ManualEntry => "awb",
            Command::CapturePhoto => "photo",
            Command::RecordVideo => "video",
            Command::Upload => "upload",
            Command::Reset => "reset",
        })
        .collect();

    println!(
        "[AWB: {}] [media: {}]{}{}",
        snapshot.identifier.as_deref().unwrap_or("-"),
        media,
        if snapshot.scanning { " [scanning]" } else { "" },
        if snapshot.uploading { " [uploading]" } else { "" },
    );
    if snapshot.scanning && !snapshot.scan_message.is_empty() {
        println!("  scanner: {}", snapshot.scan_message);
    }
    if !snapshot.status_message.is_empty() {
        println!("  status:  {}", snapshot.status_message);
    }
    println!("  available: {}", commands.join(", "));
}
