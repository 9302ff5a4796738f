use devxobj_object::{ChannelConfig, FieldDiff, ObjectHandle, ObjectLifecycleManager};
use serde::Serialize;

use crate::cmd::ExerciseArgs;
use crate::exit::{lifecycle_error, CliResult, FAILURE, SUCCESS};
use crate::output::{config_rows, diff_table, field_table, print_json, OutputFormat};

#[derive(Serialize)]
struct ExerciseReport {
    transport: &'static str,
    object_id: u32,
    requested: ChannelConfig,
    reported: ChannelConfig,
    mismatches: Vec<FieldDiff>,
    destroyed: bool,
}

pub fn run(args: ExerciseArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.channel.load()?;
    let transport = args.target.open()?;
    let manager = ObjectLifecycleManager::new();
    let mut handle = ObjectHandle::new(args.target.region_for(&config));

    let object_id = manager
        .create(&transport, &mut handle, &config)
        .map_err(|err| lifecycle_error("create failed", err))?;

    let reported = match manager.query(&transport, &handle) {
        Ok(reported) => reported,
        Err(err) => {
            if let Err(cleanup) = manager.destroy(&transport, &mut handle) {
                tracing::warn!(object_id, error = %cleanup, "cleanup destroy failed");
            }
            return Err(lifecycle_error("query failed", err));
        }
    };
    let mismatches = config.diff(&reported);

    manager
        .destroy(&transport, &mut handle)
        .map_err(|err| lifecycle_error("destroy failed", err))?;

    let report = ExerciseReport {
        transport: transport.transport_name(),
        object_id,
        requested: config,
        reported,
        mismatches,
        destroyed: true,
    };
    print_report(&report, format);

    if report.mismatches.is_empty() {
        Ok(SUCCESS)
    } else {
        tracing::warn!(
            object_id,
            fields = report.mismatches.len(),
            "queried configuration differs from requested"
        );
        Ok(FAILURE)
    }
}

fn print_report(report: &ExerciseReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut rows = vec![
                ("transport", report.transport.to_string()),
                ("object_id", format!("{:#x}", report.object_id)),
            ];
            rows.extend(config_rows(&report.reported));
            rows.push(("destroyed", report.destroyed.to_string()));
            println!("{}", field_table(&rows));
            if report.mismatches.is_empty() {
                println!("query matches requested configuration");
            } else {
                println!("DATA MISMATCH");
                println!("{}", diff_table(&report.mismatches));
            }
        }
        OutputFormat::Raw => println!("{:#x}", report.object_id),
    }
}
