//! Id command - encode and decode cache identities

use crate::cli::args::{IdAction, IdArgs};
use crate::error::WorkrefResult;
use crate::identity::{self, WorkerRefId};
use console::style;

/// Execute the id command
pub async fn execute(args: IdArgs) -> WorkrefResult<()> {
    match args.action {
        IdAction::Encode { worker, reference } => {
            identity::validate_component("worker", &worker)?;
            identity::validate_component("reference", &reference)?;
            println!("{}", identity::encode(&worker, &reference));
        }
        IdAction::Decode { id, json } => {
            let parsed: WorkerRefId = id.parse()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&parsed)?);
            } else {
                print_decoded(&parsed);
            }
        }
    }

    Ok(())
}

fn print_decoded(id: &WorkerRefId) {
    println!("{} {}", style("worker:").bold(), id.worker_id);
    if id.is_contentless() {
        println!("{} {}", style("ref:").bold(), style("(none)").dim());
    } else {
        println!("{} {}", style("ref:").bold(), id.ref_id);
    }
}
