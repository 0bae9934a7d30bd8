//! Core library for the process-node price grid.
//! Holds the catalog dataset with copy-on-write updates, derives the grid's
//! column schema, validates price edits, and keeps grid checkboxes and row
//! selection flags in step.

mod fixture;
mod gui;
mod model;
mod payload;
mod reconcile;
mod schema;
mod session;
pub mod statics;
mod store;
mod validate;

pub use fixture::demo_dataset;
pub use gui::run_gui;
pub use model::{
    Category, Dataset, DatasetError, NodeRows, Price, RawDataset, Row, RowId, YearEntry, YearLabel,
};
pub use payload::{LoadedPayload, PayloadFormat};
pub use reconcile::{GridEvent, GridSurface, Notifier, ReadyOutcome, Reconciler, checked_on_surface};
pub use schema::{
    Cell, Column, ColumnSchema, FieldRef, FixedField, YearField, YearGroup, cell, derive_columns,
};
pub use session::{ActiveNode, EventOutcome, Session};
pub use store::{SelectionFlags, Store, StoreError};
pub use validate::{EditOutcome, EditValue, ValidationError, validate_edit};
