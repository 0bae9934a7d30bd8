//! Scoped, copy-on-write updates to the dataset.
//!
//! Every commit addresses one (category, node) pair and returns a new
//! [`Dataset`]. The new value shares, by `Arc`, every category, node, and row
//! it did not have to change, so "what changed" is observable with
//! `Arc::ptr_eq`. The dataset passed in is never modified.

use crate::model::{Category, Dataset, NodeRows, Row, RowId, YearEntry};
use crate::schema::{FieldRef, FixedField, YearField};
use crate::validate::EditValue;
use std::{collections::BTreeMap, sync::Arc};

/// Row id -> desired `is_selected`. Rows absent from the map keep their flag.
pub type SelectionFlags = BTreeMap<RowId, bool>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("dataset has no categories")]
    EmptyDataset,
    #[error("category {0:?} not found")]
    CategoryNotFound(String),
    #[error("category {0:?} has no process nodes")]
    EmptyCategory(String),
    #[error("process node {node:?} not found in category {category:?}")]
    NodeNotFound { category: String, node: String },
    #[error("row {id} not found in {category} / {node}")]
    RowNotFound {
        category: String,
        node: String,
        id: RowId,
    },
    #[error("field {0} is read-only")]
    ReadOnlyField(FieldRef),
    #[error("value {value:?} cannot be written to {field}")]
    ValueMismatch { field: FieldRef, value: EditValue },
}

impl Dataset {
    /// Read view of one node's rows.
    pub fn rows(&self, category: &str, node: &str) -> Result<&Arc<NodeRows>, StoreError> {
        let cat = self
            .categories
            .get(category)
            .ok_or_else(|| StoreError::CategoryNotFound(category.to_string()))?;
        cat.node(node).ok_or_else(|| StoreError::NodeNotFound {
            category: category.to_string(),
            node: node.to_string(),
        })
    }

    /// Sets `is_selected` from `flags` for every row of the node whose id is
    /// in the map. Rows whose flag does not change keep their identity; if no
    /// row changes, the result shares everything with `self`.
    pub fn commit_selection(
        &self,
        category: &str,
        node: &str,
        flags: &SelectionFlags,
    ) -> Result<Dataset, StoreError> {
        let rows = self.rows(category, node)?;

        let mut changed = 0usize;
        let next: NodeRows = rows
            .iter()
            .map(|row| match flags.get(&row.id) {
                Some(&flag) if flag != row.is_selected => {
                    changed += 1;
                    Arc::new(Row {
                        is_selected: flag,
                        ..Row::clone(row)
                    })
                }
                _ => Arc::clone(row),
            })
            .collect();

        tracing::debug!(category, node, changed, "commit selection");
        if changed == 0 {
            return Ok(self.clone());
        }
        Ok(self.with_node_rows(category, node, next))
    }

    /// Writes `value` into `field` of the row `row_id`.
    ///
    /// Writable fields are the row name (text) and a year's negotiated price
    /// (price). Writing a negotiated price for a year the row has no entry for
    /// creates the entry with no list price.
    pub fn commit_field_edit(
        &self,
        category: &str,
        node: &str,
        row_id: RowId,
        field: &FieldRef,
        value: EditValue,
    ) -> Result<Dataset, StoreError> {
        let rows = self.rows(category, node)?;
        let Some(idx) = rows.iter().position(|r| r.id == row_id) else {
            return Err(StoreError::RowNotFound {
                category: category.to_string(),
                node: node.to_string(),
                id: row_id,
            });
        };
        let current = &rows[idx];

        let updated = match (field, value) {
            (FieldRef::Fixed(FixedField::Name), EditValue::Text(name)) => Row {
                name,
                ..Row::clone(current)
            },
            (
                FieldRef::Year {
                    year,
                    field: YearField::NegotiatedPrice,
                },
                EditValue::Price(price),
            ) => {
                let mut years = current.years.clone();
                let entry = years.entry(year.clone()).or_insert_with(YearEntry::default);
                entry.negotiated_price = Some(price);
                Row {
                    years,
                    ..Row::clone(current)
                }
            }
            (FieldRef::Fixed(FixedField::Name), value)
            | (
                FieldRef::Year {
                    field: YearField::NegotiatedPrice,
                    ..
                },
                value,
            ) => {
                return Err(StoreError::ValueMismatch {
                    field: field.clone(),
                    value,
                });
            }
            (FieldRef::Fixed(_) | FieldRef::Year { .. }, _) => {
                return Err(StoreError::ReadOnlyField(field.clone()));
            }
        };

        if updated == **current {
            return Ok(self.clone());
        }

        tracing::debug!(category, node, row_id, %field, "commit field edit");
        let mut next = NodeRows::clone(rows);
        next[idx] = Arc::new(updated);
        Ok(self.with_node_rows(category, node, next))
    }

    /// New top-level container with one node replaced. Callers have already
    /// checked that the (category, node) pair exists.
    fn with_node_rows(&self, category: &str, node: &str, rows: NodeRows) -> Dataset {
        let mut categories = self.categories.clone();
        if let Some(cat) = categories.get_mut(category) {
            let mut next_cat = Category::clone(cat);
            if let Some(slot) = next_cat.nodes.get_mut(node) {
                *slot = Arc::new(rows);
            }
            *cat = Arc::new(next_cat);
        }
        Dataset { categories }
    }

    /// True when both values hold the very same category containers.
    pub fn shares_all(&self, other: &Dataset) -> bool {
        self.categories.len() == other.categories.len()
            && self
                .categories
                .iter()
                .zip(other.categories.iter())
                .all(|((ka, a), (kb, b))| ka == kb && Arc::ptr_eq(a, b))
    }
}

/// Single owner of the current dataset. Only the commit methods replace it.
#[derive(Debug, Clone)]
pub struct Store {
    current: Dataset,
    initial: Dataset,
}

impl Store {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            initial: dataset.clone(),
            current: dataset,
        }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.current
    }

    pub fn rows(&self, category: &str, node: &str) -> Result<&Arc<NodeRows>, StoreError> {
        self.current.rows(category, node)
    }

    pub fn commit_selection(
        &mut self,
        category: &str,
        node: &str,
        flags: &SelectionFlags,
    ) -> Result<&Dataset, StoreError> {
        let next = self
            .current
            .commit_selection(category, node, flags)
            .inspect_err(|e| tracing::warn!("selection not committed: {e}"))?;
        self.current = next;
        Ok(&self.current)
    }

    pub fn commit_field_edit(
        &mut self,
        category: &str,
        node: &str,
        row_id: RowId,
        field: &FieldRef,
        value: EditValue,
    ) -> Result<&Dataset, StoreError> {
        let next = self
            .current
            .commit_field_edit(category, node, row_id, field, value)
            .inspect_err(|e| tracing::warn!("edit not committed: {e}"))?;
        self.current = next;
        Ok(&self.current)
    }

    /// Rows of the node with `is_selected` set, in node order.
    pub fn selected_rows(&self, category: &str, node: &str) -> Result<Vec<Arc<Row>>, StoreError> {
        Ok(self
            .rows(category, node)?
            .iter()
            .filter(|r| r.is_selected)
            .cloned()
            .collect())
    }

    /// Whether the current dataset differs in value from the one the store
    /// started with.
    pub fn is_modified(&self) -> bool {
        !self.current.shares_all(&self.initial) && self.current != self.initial
    }
}

#[cfg(test)]
mod tests {
    use super::{SelectionFlags, Store, StoreError};
    use crate::model::{Dataset, Price, RawDataset, Row, YearEntry, YearLabel};
    use crate::schema::{FieldRef, FixedField};
    use crate::validate::EditValue;
    use indexmap::IndexMap;
    use std::{collections::BTreeMap, sync::Arc};

    fn row(id: i64, selected: bool) -> Row {
        let mut years = BTreeMap::new();
        years.insert(
            YearLabel::from("2025"),
            YearEntry {
                list_price: Price::new(520.0),
                negotiated_price: Price::new(510.0),
            },
        );
        Row {
            id,
            name: format!("Chip {id}"),
            quantity: 100,
            years,
            is_selected: selected,
        }
    }

    fn dataset() -> Dataset {
        let mut wafer = IndexMap::new();
        wafer.insert(
            "3nm".to_string(),
            vec![row(1, false), row(2, true), row(3, true)],
        );
        wafer.insert("5nm".to_string(), vec![row(4, false)]);
        wafer.insert("7nm".to_string(), vec![]);
        let mut misc = IndexMap::new();
        misc.insert("3nm".to_string(), vec![row(1, false)]);

        let mut raw: RawDataset = IndexMap::new();
        raw.insert("Wafer Buy".to_string(), wafer);
        raw.insert("Misc".to_string(), misc);
        Dataset::from_raw(raw).unwrap()
    }

    fn flags(pairs: &[(i64, bool)]) -> SelectionFlags {
        pairs.iter().copied().collect()
    }

    fn selection(ds: &Dataset, category: &str, node: &str) -> Vec<bool> {
        ds.rows(category, node)
            .unwrap()
            .iter()
            .map(|r| r.is_selected)
            .collect()
    }

    #[test]
    fn partial_selection_map_leaves_uncovered_rows_untouched() {
        let before = dataset();
        let after = before
            .commit_selection("Wafer Buy", "3nm", &flags(&[(1, true), (2, false)]))
            .unwrap();

        assert_eq!(selection(&after, "Wafer Buy", "3nm"), vec![true, false, true]);
        // The input dataset is unchanged.
        assert_eq!(selection(&before, "Wafer Buy", "3nm"), vec![false, true, true]);

        let old = before.rows("Wafer Buy", "3nm").unwrap();
        let new = after.rows("Wafer Buy", "3nm").unwrap();
        assert!(!Arc::ptr_eq(&old[0], &new[0]));
        assert!(!Arc::ptr_eq(&old[1], &new[1]));
        assert!(Arc::ptr_eq(&old[2], &new[2]));
    }

    #[test]
    fn selection_commit_shares_untouched_branches() {
        let before = dataset();
        let after = before
            .commit_selection("Wafer Buy", "3nm", &flags(&[(1, true)]))
            .unwrap();

        assert!(Arc::ptr_eq(
            before.category("Misc").unwrap(),
            after.category("Misc").unwrap()
        ));
        assert!(Arc::ptr_eq(
            before.node("Wafer Buy", "5nm").unwrap(),
            after.node("Wafer Buy", "5nm").unwrap()
        ));
        assert!(!Arc::ptr_eq(
            before.category("Wafer Buy").unwrap(),
            after.category("Wafer Buy").unwrap()
        ));
    }

    #[test]
    fn no_op_selection_shares_everything() {
        let before = dataset();
        let after = before
            .commit_selection("Wafer Buy", "3nm", &flags(&[(1, false), (2, true)]))
            .unwrap();
        assert!(after.shares_all(&before));
    }

    #[test]
    fn selection_commit_is_idempotent() {
        let map = flags(&[(1, true), (2, false), (3, false)]);
        let once = dataset().commit_selection("Wafer Buy", "3nm", &map).unwrap();
        let twice = once.commit_selection("Wafer Buy", "3nm", &map).unwrap();
        assert_eq!(once, twice);
        assert!(twice.shares_all(&once));
    }

    #[test]
    fn selection_on_missing_node_is_refused() {
        let ds = dataset();
        assert_eq!(
            ds.commit_selection("Wafer Buy", "2nm", &flags(&[(1, true)])),
            Err(StoreError::NodeNotFound {
                category: "Wafer Buy".to_string(),
                node: "2nm".to_string(),
            })
        );
        assert_eq!(
            ds.commit_selection("Nope", "3nm", &flags(&[])),
            Err(StoreError::CategoryNotFound("Nope".to_string()))
        );
    }

    #[test]
    fn selection_on_empty_node_is_a_no_op() {
        let ds = dataset();
        let after = ds
            .commit_selection("Wafer Buy", "7nm", &flags(&[(9, true)]))
            .unwrap();
        assert!(after.shares_all(&ds));
    }

    #[test]
    fn field_edit_replaces_only_the_target_row() {
        let before = dataset();
        let field = FieldRef::negotiated("2025");
        let after = before
            .commit_field_edit(
                "Wafer Buy",
                "3nm",
                2,
                &field,
                EditValue::Price(Price::new(450.0).unwrap()),
            )
            .unwrap();

        let old = before.rows("Wafer Buy", "3nm").unwrap();
        let new = after.rows("Wafer Buy", "3nm").unwrap();
        assert!(Arc::ptr_eq(&old[0], &new[0]));
        assert!(!Arc::ptr_eq(&old[1], &new[1]));
        assert!(Arc::ptr_eq(&old[2], &new[2]));

        let entry = new[1].year(&YearLabel::from("2025")).unwrap();
        assert_eq!(entry.negotiated_price, Price::new(450.0));
        assert_eq!(entry.list_price, Price::new(520.0));
        assert_eq!(
            old[1].year(&YearLabel::from("2025")).unwrap().negotiated_price,
            Price::new(510.0)
        );

        assert!(Arc::ptr_eq(
            before.category("Misc").unwrap(),
            after.category("Misc").unwrap()
        ));
        assert!(Arc::ptr_eq(
            before.node("Wafer Buy", "5nm").unwrap(),
            after.node("Wafer Buy", "5nm").unwrap()
        ));
    }

    #[test]
    fn field_edit_creates_missing_year_entry() {
        let ds = dataset();
        let after = ds
            .commit_field_edit(
                "Wafer Buy",
                "5nm",
                4,
                &FieldRef::negotiated("2027"),
                EditValue::Price(Price::new(300.0).unwrap()),
            )
            .unwrap();
        let row = &after.rows("Wafer Buy", "5nm").unwrap()[0];
        assert_eq!(
            row.year(&YearLabel::from("2027")),
            Some(&YearEntry {
                list_price: None,
                negotiated_price: Price::new(300.0),
            })
        );
    }

    #[test]
    fn field_edit_on_unknown_row_is_not_found() {
        let ds = dataset();
        assert_eq!(
            ds.commit_field_edit(
                "Wafer Buy",
                "3nm",
                42,
                &FieldRef::negotiated("2025"),
                EditValue::Price(Price::ZERO),
            ),
            Err(StoreError::RowNotFound {
                category: "Wafer Buy".to_string(),
                node: "3nm".to_string(),
                id: 42,
            })
        );
    }

    #[test]
    fn read_only_and_mismatched_writes_are_refused() {
        let ds = dataset();
        assert_eq!(
            ds.commit_field_edit(
                "Wafer Buy",
                "3nm",
                1,
                &FieldRef::list("2025"),
                EditValue::Price(Price::ZERO),
            ),
            Err(StoreError::ReadOnlyField(FieldRef::list("2025")))
        );
        assert_eq!(
            ds.commit_field_edit(
                "Wafer Buy",
                "3nm",
                1,
                &FieldRef::Fixed(FixedField::Id),
                EditValue::Text("9".to_string()),
            ),
            Err(StoreError::ReadOnlyField(FieldRef::Fixed(FixedField::Id)))
        );
        assert!(matches!(
            ds.commit_field_edit(
                "Wafer Buy",
                "3nm",
                1,
                &FieldRef::negotiated("2025"),
                EditValue::Text("450".to_string()),
            ),
            Err(StoreError::ValueMismatch { .. })
        ));
    }

    #[test]
    fn name_edit_is_committed() {
        let ds = dataset();
        let after = ds
            .commit_field_edit(
                "Misc",
                "3nm",
                1,
                &FieldRef::Fixed(FixedField::Name),
                EditValue::Text("Renamed".to_string()),
            )
            .unwrap();
        assert_eq!(after.rows("Misc", "3nm").unwrap()[0].name, "Renamed");
    }

    #[test]
    fn store_keeps_prior_value_on_failed_commit_and_tracks_modification() {
        let mut store = Store::new(dataset());
        assert!(!store.is_modified());

        let before = store.dataset().clone();
        assert!(
            store
                .commit_field_edit(
                    "Wafer Buy",
                    "3nm",
                    99,
                    &FieldRef::negotiated("2025"),
                    EditValue::Price(Price::ZERO),
                )
                .is_err()
        );
        assert!(store.dataset().shares_all(&before));
        assert!(!store.is_modified());

        store
            .commit_selection("Wafer Buy", "3nm", &flags(&[(1, true)]))
            .unwrap();
        assert!(store.is_modified());
        let selected: Vec<i64> = store
            .selected_rows("Wafer Buy", "3nm")
            .unwrap()
            .iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(selected, vec![1, 2, 3]);

        store
            .commit_selection("Wafer Buy", "3nm", &flags(&[(1, false)]))
            .unwrap();
        assert!(!store.is_modified());
    }
}
