use super::source::SourceArgs;
use super::{block_on, Context};
use crate::output::{or_dash, print_json, print_table};
use anyhow::{anyhow, Result};
use stepnote_client::section_progress;
use stepnote_core::form::QUESTION_COUNT;
use stepnote_core::markdown::SegmentedDocument;

pub fn run(ctx: &Context, task: &str, source: &SourceArgs) -> Result<()> {
    let (record, markdown) = block_on(async {
        let record = ctx
            .client()
            .get_record_by_task_number(task)
            .await?
            .ok_or_else(|| anyhow!("task {task} not found"))?;
        let markdown = source.load(record.fields.link_to_task.as_deref()).await?;
        anyhow::Ok((record, markdown))
    })??;

    let doc = SegmentedDocument::parse(&markdown);
    let progress = section_progress(&record, &doc);

    if ctx.json {
        return print_json(&progress);
    }
    if progress.is_empty() {
        println!("Task {task} has no assistant sections to annotate.");
        return Ok(());
    }

    let complete = progress.iter().filter(|p| p.complete).count();
    let rows = progress
        .iter()
        .map(|p| {
            vec![
                p.section.to_string(),
                or_dash(p.heading.as_deref()),
                format!("{}/{QUESTION_COUNT}", p.answered),
                if p.complete { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    print_table(&["SECTION", "HEADING", "ANSWERED", "COMPLETE"], rows);
    println!("\n{complete}/{} sections complete", progress.len());
    Ok(())
}
