use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use serlink_transport::SerialLine;

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::OutputFormat;

#[derive(Serialize)]
struct PortOutput<'a> {
    name: &'a str,
    kind: &'a str,
    product: Option<&'a str>,
}

pub fn run(_args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports =
        SerialLine::enumerate().map_err(|err| transport_error("enumeration failed", err))?;

    match format {
        OutputFormat::Json => {
            for port in &ports {
                let out = PortOutput {
                    name: &port.name,
                    kind: port.kind,
                    product: port.product.as_deref(),
                };
                println!(
                    "{}",
                    serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["NAME", "KIND", "PRODUCT"]);
            for port in &ports {
                table.add_row(vec![
                    port.name.clone(),
                    port.kind.to_string(),
                    port.product.clone().unwrap_or_default(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty | OutputFormat::Raw => {
            for port in &ports {
                println!("{} ({})", port.name, port.kind);
            }
        }
    }

    Ok(SUCCESS)
}
