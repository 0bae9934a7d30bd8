use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::{cmp::Ordering, collections::BTreeMap, fmt, sync::Arc};

/// Row identity, unique within its owning node.
pub type RowId = i64;

/// The rows of one process node. Rows are shared by reference between
/// dataset versions until they change.
pub type NodeRows = Vec<Arc<Row>>;

/// A non-negative, finite price.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Price(f64);

impl Price {
    pub const ZERO: Price = Price(0.0);

    /// Returns `None` for negative, NaN, or infinite values.
    /// Negative zero is normalized to zero.
    pub fn new(value: f64) -> Option<Price> {
        if !value.is_finite() || value < 0.0 {
            return None;
        }
        Some(Price(if value == 0.0 { 0.0 } else { value }))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Whole prices render without a trailing ".0".
        if self.0.fract() == 0.0 && self.0 < 1e15 {
            return write!(f, "{}", self.0 as u64);
        }
        let mut buf = ryu::Buffer::new();
        f.write_str(buf.format(self.0))
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.0.fract() == 0.0 && self.0 < 1e15 {
            serializer.serialize_u64(self.0 as u64)
        } else {
            serializer.serialize_f64(self.0)
        }
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct PriceVisitor;

        impl<'de> de::Visitor<'de> for PriceVisitor {
            type Value = Price;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative number")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Price::new(v as f64)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Price::new(v as f64)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Price::new(v).ok_or_else(|| E::invalid_value(de::Unexpected::Float(v), &self))
            }
        }

        deserializer.deserialize_any(PriceVisitor)
    }
}

/// A year key such as `"2025"`.
///
/// Ordering is numeric for pure-digit labels (shorter first, then lexical),
/// and any other label sorts after them lexically. Equal labels are always
/// the same string, so the order stays consistent with `Eq`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YearLabel(String);

impl YearLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_numeric(&self) -> bool {
        !self.0.is_empty() && self.0.bytes().all(|b| b.is_ascii_digit())
    }
}

impl Ord for YearLabel {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.is_numeric(), other.is_numeric()) {
            (true, true) => self
                .0
                .len()
                .cmp(&other.0.len())
                .then_with(|| self.0.cmp(&other.0)),
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for YearLabel {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for YearLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for YearLabel {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Prices for one year of one row. `list_price` is read-only in the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearEntry {
    #[serde(default, alias = "pgPrice")]
    pub list_price: Option<Price>,
    #[serde(default, alias = "propPrice")]
    pub negotiated_price: Option<Price>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Row {
    pub id: RowId,
    #[serde(alias = "product")]
    pub name: String,
    pub quantity: u64,
    /// Sparse: rows in one node need not share year keys.
    #[serde(default, alias = "year")]
    pub years: BTreeMap<YearLabel, YearEntry>,
    #[serde(default)]
    pub is_selected: bool,
}

impl Row {
    pub fn year(&self, year: &YearLabel) -> Option<&YearEntry> {
        self.years.get(year)
    }
}

/// One category: process node name -> rows, in tab order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Category {
    pub(crate) nodes: IndexMap<String, Arc<NodeRows>>,
}

impl Category {
    pub fn node_names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn node(&self, node: &str) -> Option<&Arc<NodeRows>> {
        self.nodes.get(node)
    }

    pub fn first_node(&self) -> Option<&str> {
        self.nodes.keys().next().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Payload shape before invariants are checked.
pub type RawDataset = IndexMap<String, IndexMap<String, Vec<Row>>>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DatasetError {
    #[error("duplicate row id {id} in {category} / {node}")]
    DuplicateRowId {
        category: String,
        node: String,
        id: RowId,
    },
}

/// The whole catalog: category -> node -> rows.
///
/// Values are immutable once built. [`Dataset::commit_selection`] and
/// [`Dataset::commit_field_edit`] return a new `Dataset` sharing every
/// untouched category, node, and row with the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Dataset {
    pub(crate) categories: IndexMap<String, Arc<Category>>,
}

impl Dataset {
    pub fn from_raw(raw: RawDataset) -> Result<Self, DatasetError> {
        let mut categories = IndexMap::with_capacity(raw.len());
        for (category_name, nodes) in raw {
            let mut category = Category::default();
            for (node_name, rows) in nodes {
                let mut seen = std::collections::HashSet::with_capacity(rows.len());
                for row in &rows {
                    if !seen.insert(row.id) {
                        return Err(DatasetError::DuplicateRowId {
                            category: category_name,
                            node: node_name,
                            id: row.id,
                        });
                    }
                }
                let rows: NodeRows = rows.into_iter().map(Arc::new).collect();
                category.nodes.insert(node_name, Arc::new(rows));
            }
            categories.insert(category_name, Arc::new(category));
        }
        Ok(Self { categories })
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn category(&self, category: &str) -> Option<&Arc<Category>> {
        self.categories.get(category)
    }

    pub fn node(&self, category: &str, node: &str) -> Option<&Arc<NodeRows>> {
        self.categories.get(category)?.node(node)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.categories
            .values()
            .flat_map(|c| c.nodes.values())
            .map(|rows| rows.len())
            .sum()
    }
}

impl<'de> Deserialize<'de> for Dataset {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawDataset::deserialize(deserializer)?;
        Dataset::from_raw(raw).map_err(de::Error::custom)
    }
}
