#![allow(dead_code)]

use procgrid::{ColumnSchema, FieldRef, GridSurface, Notifier, Price, Row, RowId};
use std::{collections::BTreeMap, sync::Arc};

/// Stand-in for the table widget. Rows handed over by `present` are only
/// registered once `layout` runs, and every ready signal has to be fetched
/// with `take_ready`.
#[derive(Default)]
pub struct RecordingSurface {
    pub generation: Option<u64>,
    pub rows: Vec<Row>,
    pub year_count: usize,
    pending: Vec<RowId>,
    pub registered: BTreeMap<RowId, bool>,
    pub reverts: Vec<(RowId, FieldRef, Option<Price>)>,
}

impl RecordingSurface {
    /// Registers the presented rows and returns the generation to report ready.
    pub fn layout(&mut self) -> Option<u64> {
        for id in self.pending.drain(..) {
            self.registered.insert(id, false);
        }
        self.generation
    }

    /// Simulates the user clicking a checkbox.
    pub fn click(&mut self, id: RowId) {
        if let Some(checked) = self.registered.get_mut(&id) {
            *checked = !*checked;
        }
    }
}

impl GridSurface for RecordingSurface {
    fn present(&mut self, generation: u64, schema: &ColumnSchema, rows: &[Arc<Row>]) {
        self.generation = Some(generation);
        self.year_count = schema.years.len();
        self.rows = rows.iter().map(|r| Row::clone(r)).collect();
        self.registered.clear();
        self.pending = rows.iter().map(|r| r.id).collect();
    }

    fn set_checked(&mut self, id: RowId, checked: bool) -> bool {
        match self.registered.get_mut(&id) {
            Some(slot) => {
                *slot = checked;
                true
            }
            None => false,
        }
    }

    fn for_each_visible_row(&self, f: &mut dyn FnMut(RowId, bool)) {
        for (&id, &checked) in &self.registered {
            f(id, checked);
        }
    }

    fn revert_cell(&mut self, id: RowId, field: &FieldRef, value: Option<Price>) {
        self.reverts.push((id, field.clone(), value));
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Vec<String>,
}

impl Notifier for RecordingNotifier {
    fn error(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

pub const CATALOG: &str = r#"{
  "Wafer Buy": {
    "3nm": [
      { id: 1, name: "Chip A", quantity: 100,
        years: { "2025": { listPrice: 520, negotiatedPrice: 510 } } },
      { id: 2, name: "Chip B", quantity: 50, isSelected: true,
        years: { "2024": { listPrice: 480, negotiatedPrice: 470 },
                 "2025": { listPrice: 500, negotiatedPrice: 490 } } },
      { id: 3, name: "Chip C", quantity: 10, isSelected: true },
    ],
    "5nm": [
      { id: 1, name: "Chip D", quantity: 75,
        years: { "2025": { listPrice: 410, negotiatedPrice: 400 } } },
    ],
    "7nm": [],
  },
  Misc: {
    "22nm": [ { id: 9, name: "Misc B", quantity: 5 } ],
  },
}"#;
