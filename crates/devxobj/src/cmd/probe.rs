use devxobj_object::{MemoryRegion, ObjectHandle, ObjectLifecycleManager, Support};
use serde::Serialize;

use crate::cmd::ProbeArgs;
use crate::exit::{lifecycle_error, CliResult, FIRMWARE_REJECTED, SUCCESS};
use crate::output::{field_table, print_json, OutputFormat, SyndromeReport};

#[derive(Serialize)]
struct ProbeOutput {
    transport: &'static str,
    supported: bool,
    object_id: Option<u32>,
    syndrome: Option<SyndromeReport>,
}

pub fn run(args: ProbeArgs, format: OutputFormat) -> CliResult<i32> {
    let transport = args.target.open()?;
    let manager = ObjectLifecycleManager::new();
    let region = MemoryRegion::new(
        args.region_address,
        args.target
            .region_size
            .unwrap_or(ObjectLifecycleManager::PROBE_QUEUE_SIZE),
        args.mkey,
    );
    let mut handle = ObjectHandle::new(region);

    let support = manager
        .probe_support(&transport, &mut handle)
        .map_err(|err| lifecycle_error("probe failed", err))?;

    let out = match &support {
        Support::Supported { object_id } => ProbeOutput {
            transport: transport.transport_name(),
            supported: true,
            object_id: Some(*object_id),
            syndrome: None,
        },
        Support::Unsupported(syndrome) => ProbeOutput {
            transport: transport.transport_name(),
            supported: false,
            object_id: None,
            syndrome: Some(SyndromeReport::from(syndrome)),
        },
    };
    print_probe(&out, format);

    Ok(match support {
        Support::Supported { .. } => SUCCESS,
        Support::Unsupported(_) => FIRMWARE_REJECTED,
    })
}

fn print_probe(out: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut rows = vec![
                ("transport", out.transport.to_string()),
                ("supported", out.supported.to_string()),
            ];
            if let Some(object_id) = out.object_id {
                rows.push(("probe_object_id", format!("{object_id:#x}")));
            }
            if let Some(syndrome) = &out.syndrome {
                rows.push(("syndrome", syndrome.raw_code.clone()));
                rows.push(("category", syndrome.category.to_string()));
                for cause in syndrome.probable_causes {
                    rows.push(("probable_cause", cause.to_string()));
                }
            }
            println!("{}", field_table(&rows));
        }
        OutputFormat::Raw => println!("{}", out.supported),
    }
}
