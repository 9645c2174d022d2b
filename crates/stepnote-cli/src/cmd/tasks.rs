use super::{block_on, Context};
use crate::output::{or_dash, print_json, print_table};
use anyhow::{anyhow, Result};

pub fn run(ctx: &Context, unique_id: Option<&str>) -> Result<()> {
    let unique_id = match unique_id {
        Some(id) => id.trim().to_string(),
        None => ctx.prefs.load_identity().ok_or_else(|| {
            anyhow!("no Unique ID given and none remembered; pass --unique-id <id>")
        })?,
    };

    let records = block_on(ctx.client().get_records_by_unique_id(&unique_id))??;
    if let Err(e) = ctx.prefs.save_identity(&unique_id) {
        tracing::warn!("could not remember Unique ID: {e}");
    }

    if ctx.json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No tasks for '{unique_id}'.");
        return Ok(());
    }

    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.task_number().to_string(),
                or_dash(r.fields.status.as_deref()),
                r.notes().len().to_string(),
                or_dash(r.fields.link_to_task.as_deref()),
            ]
        })
        .collect();
    print_table(&["TASK", "STATUS", "NOTES", "LINK"], rows);
    Ok(())
}
