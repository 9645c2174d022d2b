use super::{block_on, Context};
use crate::output::{or_dash, print_json, print_table};
use anyhow::{anyhow, Result};
use stepnote_core::notes::{NoteScalar, NoteValue};

pub fn run(ctx: &Context, number: &str) -> Result<()> {
    let record = block_on(ctx.client().get_record_by_task_number(number))??
        .ok_or_else(|| anyhow!("task {number} not found"))?;

    if ctx.json {
        return print_json(&record);
    }

    println!("Task {}  ({})", record.task_number(), record.id);
    println!("  Status: {}", or_dash(record.fields.status.as_deref()));
    println!("  Link:   {}", or_dash(record.fields.link_to_task.as_deref()));

    let notes = record.notes();
    if notes.is_empty() {
        println!("\nNo annotations yet.");
        return Ok(());
    }
    println!();
    let rows = notes
        .iter()
        .map(|(key, value)| {
            vec![
                key.clone(),
                describe(value),
                or_dash(value.timestamp()),
            ]
        })
        .collect();
    print_table(&["KEY", "VALUE", "SAVED"], rows);
    Ok(())
}

fn describe(value: &NoteValue) -> String {
    match value.scalar() {
        Some(NoteScalar::Text(s)) => s.clone(),
        Some(NoteScalar::Flag(b)) => b.to_string(),
        Some(scalar @ (NoteScalar::List(_) | NoteScalar::Selection(_))) => scalar.as_tags().join(","),
        None => "?".to_string(),
    }
}
