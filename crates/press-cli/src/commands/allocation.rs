use std::io::Write;

use press_core::{ResourceSnapshot, compute_allocation};
use serde::Serialize;

use super::{Format, write_json};
use crate::output;

#[derive(Serialize)]
struct AllocationReport<'a> {
    snapshot: &'a ResourceSnapshot,
    plan: press_core::AllocationPlan,
}

pub fn report(snapshot: &ResourceSnapshot, format: Format, out: &mut dyn Write) -> anyhow::Result<()> {
    let plan = compute_allocation(snapshot);
    match format {
        Format::Json => write_json(out, &AllocationReport { snapshot, plan }),
        Format::Text => {
            write!(out, "{}", output::format_allocation(snapshot, &plan))?;
            Ok(())
        }
    }
}
