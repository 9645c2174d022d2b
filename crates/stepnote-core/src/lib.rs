pub mod content;
pub mod error;
pub mod focus;
pub mod form;
pub mod io;
pub mod markdown;
pub mod notes;
pub mod prefs;
pub mod record;

pub use error::{Result, StepnoteError};
