use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use devxobj_object::{EmulatedFirmware, EmulatorConfig};
use devxobj_transport::{MailboxServer, UnixDomainSocket};
use serde::Serialize;

use crate::cmd::ServeArgs;
use crate::exit::{transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{field_table, print_json, OutputFormat};

#[derive(Serialize)]
struct ServeSummary {
    socket: String,
    connections: usize,
    submissions: usize,
    live_objects: usize,
}

pub fn run(args: ServeArgs, format: OutputFormat) -> CliResult<i32> {
    let firmware = Arc::new(EmulatedFirmware::with_config(EmulatorConfig {
        max_objects: args.max_objects,
        enforce_registered_regions: !args.regions.is_empty(),
    }));
    for &(address, size, key) in &args.regions {
        firmware.register_region(address, size, key);
    }

    let server = MailboxServer::bind(&args.path, Arc::clone(&firmware))
        .map_err(|err| transport_error("bind failed", err))?;
    install_ctrlc_handler(server.stop_handle(), server.path().to_path_buf())?;
    tracing::info!(
        path = %args.path.display(),
        max_objects = args.max_objects,
        regions = args.regions.len(),
        "serving emulated firmware"
    );

    let connections = server
        .run()
        .map_err(|err| transport_error("serve failed", err))?;

    let summary = ServeSummary {
        socket: args.path.display().to_string(),
        connections,
        submissions: firmware.submissions(),
        live_objects: firmware.live_objects(),
    };
    match format {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Table | OutputFormat::Pretty => println!(
            "{}",
            field_table(&[
                ("socket", summary.socket.clone()),
                ("connections", summary.connections.to_string()),
                ("submissions", summary.submissions.to_string()),
                ("live_objects", summary.live_objects.to_string()),
            ])
        ),
        OutputFormat::Raw => println!("{}", summary.connections),
    }
    Ok(SUCCESS)
}

/// Raise the stop flag and wake the blocking accept with a throwaway
/// connection.
fn install_ctrlc_handler(stop: Arc<AtomicBool>, path: PathBuf) -> CliResult<()> {
    ctrlc::set_handler(move || {
        stop.store(true, Ordering::SeqCst);
        let _ = UnixDomainSocket::connect(&path);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
