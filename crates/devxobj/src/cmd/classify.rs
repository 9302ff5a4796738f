use devxobj_object::Syndrome;

use crate::cmd::ClassifyArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{field_table, print_json, OutputFormat, SyndromeReport};

pub fn run(args: ClassifyArgs, format: OutputFormat) -> CliResult<i32> {
    let syndrome = Syndrome::new(args.status, args.code);
    let report = SyndromeReport::from(&syndrome);

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Table => {
            let mut rows = vec![
                ("raw_code", report.raw_code.clone()),
                ("category", report.category.to_string()),
                ("description", report.description.to_string()),
                (
                    "status",
                    format!("{} ({:#04x})", report.status, report.status_byte),
                ),
            ];
            for cause in report.probable_causes {
                rows.push(("probable_cause", cause.to_string()));
            }
            println!("{}", field_table(&rows));
        }
        OutputFormat::Pretty => {
            println!("{syndrome}");
            for cause in report.probable_causes {
                println!("  - {cause}");
            }
        }
        OutputFormat::Raw => println!("{} {}", report.category, report.raw_code),
    }
    Ok(SUCCESS)
}
