use devxobj_object::{build_create, build_destroy, build_query, ChannelConfig, CommandBuffer};
use devxobj_wire::general::opcode_name;
use serde::Serialize;

use crate::cmd::{EncodeArgs, Operation};
use crate::exit::{CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{field_table, hex, hex_dump, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct EncodeOutput {
    opcode: String,
    opcode_name: &'static str,
    obj_type: String,
    length: usize,
    out_capacity: usize,
    hex: String,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let cmd = encode(&args)?;

    match format {
        OutputFormat::Json => print_json(&EncodeOutput {
            opcode: format!("{:#06x}", cmd.opcode()),
            opcode_name: opcode_name(cmd.opcode()),
            obj_type: format!("{:#06x}", cmd.obj_type()),
            length: cmd.len(),
            out_capacity: cmd.out_capacity(),
            hex: hex(cmd.as_bytes()),
        }),
        OutputFormat::Table => {
            let table = field_table(&[
                (
                    "opcode",
                    format!("{:#06x} ({})", cmd.opcode(), opcode_name(cmd.opcode())),
                ),
                ("obj_type", format!("{:#06x}", cmd.obj_type())),
                ("length", cmd.len().to_string()),
                ("out_capacity", cmd.out_capacity().to_string()),
            ]);
            println!("{table}");
            println!("{}", hex_dump(cmd.as_bytes()));
        }
        OutputFormat::Pretty => println!("{}", hex_dump(cmd.as_bytes())),
        OutputFormat::Raw => print_raw(cmd.as_bytes()),
    }
    Ok(SUCCESS)
}

fn encode(args: &EncodeArgs) -> CliResult<CommandBuffer> {
    let built = match args.operation {
        Operation::Create => build_create(&args.channel.load()?),
        Operation::Query => build_query::<ChannelConfig>(args.object_id),
        Operation::Destroy => build_destroy::<ChannelConfig>(args.object_id),
    };
    built.map_err(|err| CliError::new(INTERNAL, format!("encode failed: {err}")))
}
