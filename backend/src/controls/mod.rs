//! Ready-made coms backing the engine's widgets.
//!
//! - [`FileDialog`] - directory listing for `UI_FILE_DIALOG`
//! - [`Table`] - rows and columns for `UI_TABLE`, fed by a [`DataSource`]
//! - [`Label`] - button text for `UI_BUTTON`

pub mod file_dialog;
pub mod label;
pub mod table;

pub use file_dialog::{FileDialog, OpenHandler};
pub use label::Label;
pub use table::{CompareOp, Condition, DataSource, Request, Row, StaticSource, Table};
