use devxobj_object::{
    ChannelConfig, LifecycleConfig, LifecycleError, ObjectHandle, ObjectLifecycleManager,
    SyndromeKind, ValidationError,
};
use devxobj_transport::CommandTransport;
use serde::Serialize;

use crate::cmd::{ProtocolModesArgs, TargetArgs};
use crate::exit::{lifecycle_error, CliResult, FAILURE, SUCCESS};
use crate::output::{new_table, print_json, OutputFormat};

/// Modes exercised: the supported one and three that must be refused.
pub const MODES: [u8; 4] = [0, 1, 2, 255];

#[derive(Debug, Serialize)]
struct ModeCase {
    mode: u8,
    expected: &'static str,
    outcome: String,
    passed: bool,
}

#[derive(Serialize)]
struct MatrixReport {
    transport: &'static str,
    strict: bool,
    cases: Vec<ModeCase>,
    passed: bool,
}

pub fn run(args: ProtocolModesArgs, format: OutputFormat) -> CliResult<i32> {
    let base = args.channel.load()?;
    let transport = args.target.open()?;
    let manager = ObjectLifecycleManager::with_config(LifecycleConfig {
        strict_protocol_mode: args.strict,
        ..LifecycleConfig::default()
    });

    let cases = MODES
        .iter()
        .map(|&mode| {
            run_case(
                &manager,
                &transport,
                &args.target,
                base.with_protocol_mode(mode),
            )
        })
        .collect::<CliResult<Vec<_>>>()?;

    let report = MatrixReport {
        transport: transport.transport_name(),
        strict: args.strict,
        passed: cases.iter().all(|case| case.passed),
        cases,
    };
    print_report(&report, format);
    Ok(if report.passed { SUCCESS } else { FAILURE })
}

fn run_case<T>(
    manager: &ObjectLifecycleManager,
    transport: &T,
    target: &TargetArgs,
    config: ChannelConfig,
) -> CliResult<ModeCase>
where
    T: CommandTransport + ?Sized,
{
    let mode = config.protocol_mode;
    let should_accept = mode == ChannelConfig::SUPPORTED_PROTOCOL_MODE;
    let mut handle = ObjectHandle::new(target.region_for(&config));

    let (outcome, passed) = match manager.create(transport, &mut handle, &config) {
        Ok(object_id) => {
            let reported = match manager.query(transport, &handle) {
                Ok(reported) => reported,
                Err(err) => {
                    if let Err(cleanup) = manager.destroy(transport, &mut handle) {
                        tracing::warn!(object_id, error = %cleanup, "cleanup destroy failed");
                    }
                    return Err(lifecycle_error("query failed", err));
                }
            };
            manager
                .destroy(transport, &mut handle)
                .map_err(|err| lifecycle_error("destroy failed", err))?;
            let diffs = config.diff(&reported);
            if diffs.is_empty() {
                (format!("created {object_id:#x}"), should_accept)
            } else {
                let fields: Vec<_> = diffs.iter().map(|d| d.field).collect();
                (
                    format!("created {object_id:#x}, mismatch: {}", fields.join(", ")),
                    false,
                )
            }
        }
        Err(LifecycleError::Validation(ValidationError::UnsupportedProtocolMode(_))) => {
            ("rejected locally".to_string(), !should_accept)
        }
        Err(LifecycleError::Firmware(syndrome))
            if syndrome.category == SyndromeKind::InvalidProtocolMode =>
        {
            (
                format!("rejected by firmware ({:#x})", syndrome.raw_code),
                !should_accept,
            )
        }
        Err(LifecycleError::Firmware(syndrome)) => {
            (format!("unexpected rejection: {syndrome}"), false)
        }
        Err(err @ LifecycleError::Transport(_)) => {
            return Err(lifecycle_error("submit failed", err));
        }
        Err(err) => (err.to_string(), false),
    };

    tracing::info!(mode, passed, outcome = %outcome, "protocol mode case");
    Ok(ModeCase {
        mode,
        expected: if should_accept { "accepted" } else { "rejected" },
        outcome,
        passed,
    })
}

fn print_report(report: &MatrixReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table | OutputFormat::Pretty => {
            let mut table = new_table(vec!["MODE", "EXPECTED", "OUTCOME", "RESULT"]);
            for case in &report.cases {
                table.add_row(vec![
                    case.mode.to_string(),
                    case.expected.to_string(),
                    case.outcome.clone(),
                    if case.passed { "PASS" } else { "FAIL" }.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Raw => {
            for case in &report.cases {
                println!("{} {}", case.mode, if case.passed { "pass" } else { "fail" });
            }
        }
    }
}
