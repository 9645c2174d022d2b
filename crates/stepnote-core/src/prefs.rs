//! Reviewer-local preferences: the last Unique ID used and the nine
//! customizable display colors.
//!
//! Both live as small files under one directory and are read and written only
//! through [`PrefsStore`]. Missing or unreadable data falls back to defaults.

use crate::error::{Result, StepnoteError};
use crate::io::{atomic_write, read_optional};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const IDENTITY_FILE: &str = "last-unique-id";
const COLORS_FILE: &str = "colors.json";

// ---------------------------------------------------------------------------
// Hsl
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub const fn raw(h: f32, s: f32, l: f32) -> Self {
        Hsl { h, s, l }
    }

    /// Hue in degrees `0..=360`, saturation and lightness in percent.
    pub fn new(h: f32, s: f32, l: f32) -> Result<Self> {
        let in_range = (0.0..=360.0).contains(&h)
            && (0.0..=100.0).contains(&s)
            && (0.0..=100.0).contains(&l);
        if !in_range {
            return Err(StepnoteError::InvalidFieldValue {
                field: "hsl".to_string(),
                value: format!("{h} {s} {l}"),
            });
        }
        Ok(Hsl { h, s, l })
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hsl({} {}% {}%)", self.h, self.s, self.l)
    }
}

// ---------------------------------------------------------------------------
// ColorScheme
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorScheme {
    pub text: Hsl,
    pub background: Hsl,
    pub heading: Hsl,
    pub link: Hsl,
    pub code_text: Hsl,
    pub code_background: Hsl,
    pub blockquote: Hsl,
    pub table_border: Hsl,
    pub accent: Hsl,
}

impl Default for ColorScheme {
    fn default() -> Self {
        ColorScheme {
            text: Hsl::raw(222.0, 47.0, 11.0),
            background: Hsl::raw(0.0, 0.0, 100.0),
            heading: Hsl::raw(222.0, 47.0, 20.0),
            link: Hsl::raw(221.0, 83.0, 53.0),
            code_text: Hsl::raw(210.0, 40.0, 96.0),
            code_background: Hsl::raw(222.0, 47.0, 11.0),
            blockquote: Hsl::raw(215.0, 16.0, 47.0),
            table_border: Hsl::raw(214.0, 32.0, 91.0),
            accent: Hsl::raw(262.0, 83.0, 58.0),
        }
    }
}

impl ColorScheme {
    pub const NAMES: [&'static str; 9] = [
        "text",
        "background",
        "heading",
        "link",
        "code_text",
        "code_background",
        "blockquote",
        "table_border",
        "accent",
    ];

    fn slot(&mut self, name: &str) -> Result<&mut Hsl> {
        Ok(match name {
            "text" => &mut self.text,
            "background" => &mut self.background,
            "heading" => &mut self.heading,
            "link" => &mut self.link,
            "code_text" => &mut self.code_text,
            "code_background" => &mut self.code_background,
            "blockquote" => &mut self.blockquote,
            "table_border" => &mut self.table_border,
            "accent" => &mut self.accent,
            other => return Err(StepnoteError::UnknownColor(other.to_string())),
        })
    }

    pub fn set(&mut self, name: &str, color: Hsl) -> Result<()> {
        *self.slot(name)? = color;
        Ok(())
    }

    pub fn entries(&self) -> Vec<(&'static str, Hsl)> {
        let mut scheme = self.clone();
        Self::NAMES
            .iter()
            .filter_map(|name| scheme.slot(name).ok().map(|c| (*name, *c)))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// PrefsStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct PrefsStore {
    dir: PathBuf,
}

impl PrefsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        PrefsStore { dir: dir.into() }
    }

    /// `<config dir>/stepnote`, or `.stepnote` when the platform has none.
    pub fn default_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("stepnote"))
            .unwrap_or_else(|| PathBuf::from(".stepnote"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn load_identity(&self) -> Option<String> {
        match read_optional(&self.dir.join(IDENTITY_FILE)) {
            Ok(content) => content
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            Err(e) => {
                tracing::warn!("could not read saved identity: {e}");
                None
            }
        }
    }

    pub fn save_identity(&self, unique_id: &str) -> Result<()> {
        atomic_write(&self.dir.join(IDENTITY_FILE), unique_id.trim().as_bytes())
    }

    pub fn load_colors(&self) -> ColorScheme {
        let content = match read_optional(&self.dir.join(COLORS_FILE)) {
            Ok(Some(content)) => content,
            Ok(None) => return ColorScheme::default(),
            Err(e) => {
                tracing::warn!("could not read saved colors: {e}");
                return ColorScheme::default();
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("saved colors are corrupt, using defaults: {e}");
            ColorScheme::default()
        })
    }

    pub fn save_colors(&self, colors: &ColorScheme) -> Result<()> {
        let json = serde_json::to_vec_pretty(colors)?;
        atomic_write(&self.dir.join(COLORS_FILE), &json)
    }

    pub fn reset_colors(&self) -> Result<()> {
        let path = self.dir.join(COLORS_FILE);
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn identity_round_trip_and_default() {
        let dir = TempDir::new().unwrap();
        let store = PrefsStore::new(dir.path());
        assert_eq!(store.load_identity(), None);
        store.save_identity(" reviewer-7 \n").unwrap();
        assert_eq!(store.load_identity().as_deref(), Some("reviewer-7"));
    }

    #[test]
    fn colors_default_when_missing_or_corrupt() {
        let dir = TempDir::new().unwrap();
        let store = PrefsStore::new(dir.path());
        assert_eq!(store.load_colors(), ColorScheme::default());

        std::fs::write(dir.path().join(COLORS_FILE), "{ nope").unwrap();
        assert_eq!(store.load_colors(), ColorScheme::default());
    }

    #[test]
    fn partial_color_map_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let store = PrefsStore::new(dir.path());
        std::fs::write(
            dir.path().join(COLORS_FILE),
            r#"{"link": {"h": 10.0, "s": 20.0, "l": 30.0}}"#,
        )
        .unwrap();
        let colors = store.load_colors();
        assert_eq!(colors.link, Hsl::raw(10.0, 20.0, 30.0));
        assert_eq!(colors.text, ColorScheme::default().text);
    }

    #[test]
    fn set_save_reset() {
        let dir = TempDir::new().unwrap();
        let store = PrefsStore::new(dir.path());
        let mut colors = store.load_colors();
        colors.set("accent", Hsl::new(120.0, 50.0, 50.0).unwrap()).unwrap();
        store.save_colors(&colors).unwrap();
        assert_eq!(store.load_colors().accent, Hsl::raw(120.0, 50.0, 50.0));

        store.reset_colors().unwrap();
        assert_eq!(store.load_colors(), ColorScheme::default());
    }

    #[test]
    fn unknown_color_and_bad_hsl_rejected() {
        let mut colors = ColorScheme::default();
        assert!(matches!(
            colors.set("border", Hsl::raw(0.0, 0.0, 0.0)),
            Err(StepnoteError::UnknownColor(_))
        ));
        assert!(Hsl::new(400.0, 10.0, 10.0).is_err());
        assert!(Hsl::new(10.0, 101.0, 10.0).is_err());
    }

    #[test]
    fn entries_lists_all_nine() {
        assert_eq!(ColorScheme::default().entries().len(), 9);
    }
}
