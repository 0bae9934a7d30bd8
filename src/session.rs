use crate::model::{Dataset, NodeRows, Price, Row, RowId};
use crate::reconcile::{GridEvent, GridSurface, Notifier, ReadyOutcome, Reconciler};
use crate::schema::{ColumnSchema, FieldRef, YearField, derive_columns};
use crate::store::{Store, StoreError};
use crate::validate::{EditOutcome, ValidationError, validate_edit};
use std::{collections::BTreeSet, sync::Arc};

/// The (category, node) pair the grid shows. Always names an existing node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNode {
    pub category: String,
    pub node: String,
}

/// What handling one surface event did.
#[derive(Debug, Clone, PartialEq)]
pub enum EventOutcome {
    Reconciled(ReadyOutcome),
    SelectionCommitted,
    /// Arrived while a presentation awaited its ready signal.
    SelectionIgnored,
    EditCommitted,
    EditRejected(ValidationError),
    /// The store refused the commit; the dataset is unchanged.
    Refused(StoreError),
    /// Valid event that left the dataset as it was.
    Unchanged,
}

/// Event loop glue: routes surface events through the validator, the
/// reconciler, and the store, and re-presents rows after each change.
#[derive(Debug)]
pub struct Session {
    store: Store,
    active: ActiveNode,
    schema: ColumnSchema,
    reconciler: Reconciler,
}

impl Session {
    /// Starts on the first node of the first category that has one.
    pub fn new(dataset: Dataset) -> Result<Self, StoreError> {
        let (first, _) = dataset
            .categories
            .first()
            .ok_or(StoreError::EmptyDataset)?;
        let active = dataset
            .categories
            .iter()
            .find_map(|(category, cat)| {
                Some(ActiveNode {
                    category: category.clone(),
                    node: cat.first_node()?.to_string(),
                })
            })
            .ok_or_else(|| StoreError::EmptyCategory(first.clone()))?;

        let schema = derive_columns(dataset.rows(&active.category, &active.node)?);
        tracing::info!(
            categories = dataset.categories.len(),
            rows = dataset.row_count(),
            category = %active.category,
            node = %active.node,
            "session started"
        );
        Ok(Self {
            store: Store::new(dataset),
            active,
            schema,
            reconciler: Reconciler::new(),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn dataset(&self) -> &Dataset {
        self.store.dataset()
    }

    pub fn active(&self) -> &ActiveNode {
        &self.active
    }

    pub fn schema(&self) -> &ColumnSchema {
        &self.schema
    }

    pub fn is_awaiting_ready(&self) -> bool {
        self.reconciler.is_awaiting_ready()
    }

    /// Rows of the active node.
    pub fn rows(&self) -> Arc<NodeRows> {
        self.store
            .rows(&self.active.category, &self.active.node)
            .cloned()
            .unwrap_or_default()
    }

    pub fn selected_rows(&self) -> Vec<Arc<Row>> {
        self.store
            .selected_rows(&self.active.category, &self.active.node)
            .unwrap_or_default()
    }

    /// Phase one of store-to-surface for the active node.
    pub fn present(&mut self, surface: &mut dyn GridSurface) -> u64 {
        let rows = self.rows();
        self.schema = derive_columns(&rows);
        self.reconciler.present(surface, &self.schema, &rows)
    }

    /// Switches to `category`, landing on its first node.
    pub fn select_category(
        &mut self,
        category: &str,
        surface: &mut dyn GridSurface,
    ) -> Result<(), StoreError> {
        let cat = self
            .dataset()
            .category(category)
            .ok_or_else(|| StoreError::CategoryNotFound(category.to_string()))?;
        let node = cat
            .first_node()
            .ok_or_else(|| StoreError::EmptyCategory(category.to_string()))?
            .to_string();
        self.activate(category, &node, surface)
    }

    pub fn select_node(
        &mut self,
        node: &str,
        surface: &mut dyn GridSurface,
    ) -> Result<(), StoreError> {
        let category = self.active.category.clone();
        self.activate(&category, node, surface)
    }

    /// Makes (category, node) active and presents its rows. On error the
    /// previous pair stays active.
    pub fn activate(
        &mut self,
        category: &str,
        node: &str,
        surface: &mut dyn GridSurface,
    ) -> Result<(), StoreError> {
        self.store.rows(category, node)?;
        self.active = ActiveNode {
            category: category.to_string(),
            node: node.to_string(),
        };
        tracing::info!(category, node, "switched node");
        self.present(surface);
        Ok(())
    }

    pub fn handle_event(
        &mut self,
        event: GridEvent,
        surface: &mut dyn GridSurface,
        notifier: &mut dyn Notifier,
    ) -> EventOutcome {
        match event {
            GridEvent::Ready { generation } => {
                let rows = self.rows();
                EventOutcome::Reconciled(self.reconciler.on_ready(generation, surface, &rows))
            }
            GridEvent::SelectionChanged { checked } => self.on_selection_changed(&checked, surface),
            GridEvent::CellEdited {
                row_id,
                field,
                new_value,
                old_value,
            } => self.on_cell_edited(row_id, &field, &new_value, old_value, surface, notifier),
        }
    }

    fn on_selection_changed(
        &mut self,
        checked: &BTreeSet<RowId>,
        surface: &mut dyn GridSurface,
    ) -> EventOutcome {
        let rows = self.rows();
        let Some(flags) = self.reconciler.selection_flags(checked, &rows) else {
            tracing::debug!("selection change before ready; ignored");
            return EventOutcome::SelectionIgnored;
        };

        let ActiveNode { category, node } = &self.active;
        if let Err(e) = self.store.commit_selection(category, node, &flags) {
            return EventOutcome::Refused(e);
        }
        if Arc::ptr_eq(&rows, &self.rows()) {
            return EventOutcome::Unchanged;
        }
        self.present(surface);
        EventOutcome::SelectionCommitted
    }

    fn on_cell_edited(
        &mut self,
        row_id: RowId,
        field: &FieldRef,
        new_value: &str,
        old_value: Option<Price>,
        surface: &mut dyn GridSurface,
        notifier: &mut dyn Notifier,
    ) -> EventOutcome {
        // The store's value wins over whatever the surface thought it had.
        let previous = self.stored_price(row_id, field).unwrap_or(old_value);

        let value = match validate_edit(field, new_value, previous) {
            EditOutcome::Accepted(value) => value,
            EditOutcome::Rejected { reason, revert_to } => {
                tracing::warn!(row_id, %field, "edit rejected: {reason}");
                surface.revert_cell(row_id, field, revert_to);
                notifier.error(reason.user_message());
                return EventOutcome::EditRejected(reason);
            }
        };

        let rows = self.rows();
        let ActiveNode { category, node } = &self.active;
        if let Err(e) = self
            .store
            .commit_field_edit(category, node, row_id, field, value)
        {
            surface.revert_cell(row_id, field, previous);
            return EventOutcome::Refused(e);
        }
        if Arc::ptr_eq(&rows, &self.rows()) {
            // Same value, different spelling ("510.0"): show the stored form.
            if let Some(stored) = self.stored_price(row_id, field) {
                surface.revert_cell(row_id, field, stored);
            }
            return EventOutcome::Unchanged;
        }
        self.present(surface);
        EventOutcome::EditCommitted
    }

    /// Current price of a year field in the active node. `None` when the row
    /// or field does not hold a price; `Some(None)` for an empty price cell.
    fn stored_price(&self, row_id: RowId, field: &FieldRef) -> Option<Option<Price>> {
        let FieldRef::Year { year, field } = field else {
            return None;
        };
        let rows = self.store.rows(&self.active.category, &self.active.node).ok()?;
        let row = rows.iter().find(|r| r.id == row_id)?;
        let entry = row.year(year);
        Some(entry.and_then(|e| match field {
            YearField::ListPrice => e.list_price,
            YearField::NegotiatedPrice => e.negotiated_price,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{ActiveNode, Session};
    use crate::model::{Dataset, RawDataset};
    use crate::store::StoreError;
    use indexmap::IndexMap;

    #[test]
    fn new_session_needs_a_category_with_a_node() {
        assert_eq!(
            Session::new(Dataset::default()).unwrap_err(),
            StoreError::EmptyDataset
        );

        let mut raw: RawDataset = IndexMap::new();
        raw.insert("Empty".to_string(), IndexMap::new());
        assert_eq!(
            Session::new(Dataset::from_raw(raw).unwrap()).unwrap_err(),
            StoreError::EmptyCategory("Empty".to_string())
        );
    }

    #[test]
    fn skips_leading_categories_without_nodes() {
        let mut nodes = IndexMap::new();
        nodes.insert("22nm".to_string(), vec![]);
        let mut raw: RawDataset = IndexMap::new();
        raw.insert("Empty".to_string(), IndexMap::new());
        raw.insert("Misc".to_string(), nodes);

        let session = Session::new(Dataset::from_raw(raw).unwrap()).unwrap();
        assert_eq!(
            session.active(),
            &ActiveNode {
                category: "Misc".to_string(),
                node: "22nm".to_string(),
            }
        );
    }

    #[test]
    fn starts_on_first_category_and_node() {
        let mut nodes = IndexMap::new();
        nodes.insert("5nm".to_string(), vec![]);
        nodes.insert("3nm".to_string(), vec![]);
        let mut raw: RawDataset = IndexMap::new();
        raw.insert("Wafer Buy".to_string(), nodes);

        let session = Session::new(Dataset::from_raw(raw).unwrap()).unwrap();
        assert_eq!(
            session.active(),
            &ActiveNode {
                category: "Wafer Buy".to_string(),
                node: "5nm".to_string(),
            }
        );
        assert!(session.rows().is_empty());
        assert!(session.schema().years.is_empty());
        assert!(!session.is_awaiting_ready());
    }
}
