use super::{block_on, Context};
use crate::output::print_json;
use anyhow::{anyhow, bail, Result};
use stepnote_client::ReviewSession;
use stepnote_core::form::{FieldChange, FormSession, QUESTION_COUNT};
use stepnote_core::notes::AnnotationKey;

pub fn run(ctx: &Context, task: &str, section: usize, field: &str, values: &[String]) -> Result<()> {
    if section == 0 {
        bail!("sections are numbered from 1");
    }
    let change = FieldChange::parse(field, values)?;
    let field = change.field();

    let session = ReviewSession::new(ctx.client());
    let form = block_on(async {
        let record = session
            .open_task(task)
            .await?
            .ok_or_else(|| anyhow!("task {task} was superseded while loading"))?;
        let prefill = record.notes().section_values(record.task_number(), section);
        let mut form = FormSession::mount(record.task_number(), section, prefill);
        session.save(&mut form, change).await?;
        anyhow::Ok(form)
    })??;

    let key = AnnotationKey::new(form.task_number(), section, field.key()).to_string();
    if ctx.json {
        return print_json(&serde_json::json!({
            "key": key,
            "answered": form.answered(),
            "complete": form.is_complete(),
            "form": form.form,
        }));
    }
    println!("Saved {key}  ({}/{QUESTION_COUNT} answered)", form.answered());
    Ok(())
}
