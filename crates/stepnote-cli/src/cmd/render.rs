use super::source::SourceArgs;
use super::{block_on, Context};
use crate::output::print_json;
use anyhow::Result;
use stepnote_core::markdown::{render, SegmentedDocument};

pub fn run(ctx: &Context, source: &SourceArgs) -> Result<()> {
    let markdown = block_on(source.load(None))??;
    let doc = SegmentedDocument::parse(&markdown);
    let rendered = render(&doc);

    if ctx.json {
        return print_json(&rendered);
    }
    print!("{}", rendered.to_html());
    Ok(())
}
