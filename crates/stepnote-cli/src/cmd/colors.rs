use super::Context;
use crate::output::{print_json, print_table};
use anyhow::Result;
use clap::Subcommand;
use stepnote_core::prefs::Hsl;

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ColorsSubcommand {
    /// Show the current color scheme
    Show,

    /// Change one color
    Set {
        /// Color name, e.g. heading or code_background
        name: String,
        /// Hue in degrees (0-360)
        h: f32,
        /// Saturation in percent (0-100)
        s: f32,
        /// Lightness in percent (0-100)
        l: f32,
    },

    /// Restore the default scheme
    Reset,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn run(ctx: &Context, subcommand: ColorsSubcommand) -> Result<()> {
    match subcommand {
        ColorsSubcommand::Show => show(ctx),
        ColorsSubcommand::Set { name, h, s, l } => {
            let color = Hsl::new(h, s, l)?;
            let mut colors = ctx.prefs.load_colors();
            colors.set(&name, color)?;
            ctx.prefs.save_colors(&colors)?;
            if !ctx.json {
                println!("Set {name} to {color}");
            }
            Ok(())
        }
        ColorsSubcommand::Reset => {
            ctx.prefs.reset_colors()?;
            if !ctx.json {
                println!("Colors reset to defaults.");
            }
            Ok(())
        }
    }
}

fn show(ctx: &Context) -> Result<()> {
    let colors = ctx.prefs.load_colors();
    if ctx.json {
        return print_json(&colors);
    }
    let rows = colors
        .entries()
        .into_iter()
        .map(|(name, hsl)| vec![name.to_string(), hsl.to_string()])
        .collect();
    print_table(&["NAME", "COLOR"], rows);
    Ok(())
}
