//! Keeps the grid's checkbox state and the rows' `is_selected` flags in step.
//!
//! Store to surface runs in two phases. [`Reconciler::present`] hands the
//! schema and rows to the surface under a new generation number. The surface
//! registers the rows while laying them out and then emits
//! [`GridEvent::Ready`] for that generation; only then does
//! [`Reconciler::on_ready`] push the checked state. Surface to store maps the
//! full checked set back onto every visible row.

use crate::model::{Price, Row, RowId};
use crate::schema::{ColumnSchema, FieldRef};
use crate::store::SelectionFlags;
use std::{collections::BTreeSet, sync::Arc};

/// The table widget, as the core sees it.
pub trait GridSurface {
    /// Replaces what the surface shows. The surface keeps its own copies of
    /// the rows and answers with [`GridEvent::Ready`] carrying `generation`
    /// once every row is registered.
    fn present(&mut self, generation: u64, schema: &ColumnSchema, rows: &[Arc<Row>]);

    /// Sets a row's checkbox. Returns `false` when the row is not registered
    /// yet; that is not an error.
    fn set_checked(&mut self, id: RowId, checked: bool) -> bool;

    /// Visits every registered row with its current checked state.
    fn for_each_visible_row(&self, f: &mut dyn FnMut(RowId, bool));

    /// Puts a cell's displayed value back after a refused edit.
    fn revert_cell(&mut self, id: RowId, field: &FieldRef, value: Option<Price>);
}

/// Fire-and-forget user-facing error messages (toasts, status bar).
pub trait Notifier {
    fn error(&mut self, message: &str);
}

/// Raw events emitted by a [`GridSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum GridEvent {
    /// The rows of presentation `generation` are laid out and registered.
    Ready { generation: u64 },
    /// The user changed the checkboxes; `checked` is the full checked set.
    SelectionChanged { checked: BTreeSet<RowId> },
    CellEdited {
        row_id: RowId,
        field: FieldRef,
        new_value: String,
        old_value: Option<Price>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// Checked state pushed; `unregistered` rows were not on the surface yet.
    Applied { updated: usize, unregistered: usize },
    /// Ready for a presentation that has since been replaced.
    Stale,
}

#[derive(Debug, Default)]
pub struct Reconciler {
    generation: u64,
    awaiting: Option<u64>,
}

impl Reconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True between [`present`](Self::present) and the matching ready signal.
    pub fn is_awaiting_ready(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Phase one: hand `rows` to the surface and wait for its ready signal.
    pub fn present(
        &mut self,
        surface: &mut dyn GridSurface,
        schema: &ColumnSchema,
        rows: &[Arc<Row>],
    ) -> u64 {
        self.generation += 1;
        self.awaiting = Some(self.generation);
        tracing::debug!(
            generation = self.generation,
            rows = rows.len(),
            years = schema.years.len(),
            "present rows"
        );
        surface.present(self.generation, schema, rows);
        self.generation
    }

    /// Phase two: make each row's checkbox match its `is_selected`.
    pub fn on_ready(
        &mut self,
        generation: u64,
        surface: &mut dyn GridSurface,
        rows: &[Arc<Row>],
    ) -> ReadyOutcome {
        if self.awaiting != Some(generation) {
            tracing::warn!(
                generation,
                current = self.generation,
                "ignoring stale ready signal"
            );
            return ReadyOutcome::Stale;
        }
        self.awaiting = None;

        let mut on_surface = std::collections::HashMap::with_capacity(rows.len());
        surface.for_each_visible_row(&mut |id, checked| {
            on_surface.insert(id, checked);
        });

        let mut updated = 0;
        let mut unregistered = 0;
        for row in rows {
            if on_surface.get(&row.id) == Some(&row.is_selected) {
                continue;
            }
            // Rows not laid out yet make this a tolerated no-op.
            if surface.set_checked(row.id, row.is_selected) {
                updated += 1;
            } else {
                unregistered += 1;
            }
        }

        if unregistered > 0 {
            tracing::debug!(generation, unregistered, "rows not registered on surface");
        }
        ReadyOutcome::Applied {
            updated,
            unregistered,
        }
    }

    /// Surface to store: an explicit flag for every visible row, so
    /// deselections are never dropped.
    ///
    /// Returns `None` while a presentation awaits its ready signal, since the
    /// surface's checkboxes do not reflect the rows yet.
    pub fn selection_flags(
        &self,
        checked: &BTreeSet<RowId>,
        rows: &[Arc<Row>],
    ) -> Option<SelectionFlags> {
        if self.is_awaiting_ready() {
            return None;
        }
        Some(
            rows.iter()
                .map(|r| (r.id, checked.contains(&r.id)))
                .collect(),
        )
    }
}

/// The checked set currently shown by `surface`.
pub fn checked_on_surface(surface: &dyn GridSurface) -> BTreeSet<RowId> {
    let mut checked = BTreeSet::new();
    surface.for_each_visible_row(&mut |id, is_checked| {
        if is_checked {
            checked.insert(id);
        }
    });
    checked
}
