//! Host emulated firmware on a socket and drive one channel object through
//! it from a mailbox client.
//!
//! Run with:
//!   cargo run --example socket-lifecycle

use std::sync::Arc;
use std::thread;

use devxobj::object::{ChannelConfig, EmulatedFirmware, MemoryRegion, ObjectHandle};
use devxobj::transport::{MailboxClient, MailboxServer};
use devxobj::ObjectLifecycleManager;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sock_dir = std::env::temp_dir().join(format!("devxobj-example-{}", std::process::id()));
    std::fs::create_dir_all(&sock_dir)?;
    let sock_path = sock_dir.join("fw.sock");

    let firmware = Arc::new(EmulatedFirmware::new());
    let server = MailboxServer::bind(&sock_path, Arc::clone(&firmware))?;
    eprintln!("Emulated firmware on {}", sock_path.display());
    let endpoint = thread::spawn(move || server.serve_one());

    let client = MailboxClient::connect(&sock_path)?;
    let manager = ObjectLifecycleManager::new();
    let mut handle = ObjectHandle::new(MemoryRegion::new(0x1000, 0x1000, 0x55));
    let config = ChannelConfig::new(0x1000, 4096, 0x55).with_stride_index(1);

    let object_id = manager.create(&client, &mut handle, &config)?;
    eprintln!("Created channel object {object_id:#x}");

    let reported = manager.query(&client, &handle)?;
    let diffs = config.diff(&reported);
    if diffs.is_empty() {
        eprintln!("Query matches requested configuration");
    } else {
        eprintln!("Query differs: {diffs:?}");
    }

    manager.destroy(&client, &mut handle)?;
    let region = handle.release_region()?;
    eprintln!("Destroyed; region {:#x} released", region.address());

    drop(client);
    let served = endpoint
        .join()
        .map_err(|_| "endpoint thread panicked")??;
    eprintln!("Endpoint served {served} commands");

    let _ = std::fs::remove_dir_all(&sock_dir);
    Ok(())
}
