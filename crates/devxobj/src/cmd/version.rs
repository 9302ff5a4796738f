use devxobj_wire::{OBJ_TYPE_TLP_EMU_CHANNEL, OPCODE_CREATE, OPCODE_DESTROY, OPCODE_QUERY};

use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("devxobj {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: devxobj");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("DEVXOBJ_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "build_profile: {}",
        option_env!("DEVXOBJ_BUILD_PROFILE").unwrap_or("unknown")
    );
    println!("git_hash: {}", option_env!("GIT_HASH").unwrap_or("unknown"));
    println!(
        "opcodes: create={OPCODE_CREATE:#06x} query={OPCODE_QUERY:#06x} destroy={OPCODE_DESTROY:#06x}"
    );
    println!("channel_obj_type: {OBJ_TYPE_TLP_EMU_CHANNEL:#06x}");

    Ok(SUCCESS)
}
