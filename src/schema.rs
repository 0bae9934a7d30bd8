//! Column schema for one node's rows: fixed leading columns, then one
//! grouped pair of price columns per year found anywhere in the rows.

use crate::model::{Price, Row, YearLabel};
use crate::statics;
use std::{collections::BTreeSet, fmt, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixedField {
    Selection,
    Id,
    Name,
    Quantity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum YearField {
    ListPrice,
    NegotiatedPrice,
}

/// Addresses one cell of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Fixed(FixedField),
    Year { year: YearLabel, field: YearField },
}

impl FieldRef {
    pub fn negotiated(year: impl Into<YearLabel>) -> Self {
        FieldRef::Year {
            year: year.into(),
            field: YearField::NegotiatedPrice,
        }
    }

    pub fn list(year: impl Into<YearLabel>) -> Self {
        FieldRef::Year {
            year: year.into(),
            field: YearField::ListPrice,
        }
    }

    pub fn is_negotiated_price(&self) -> bool {
        matches!(
            self,
            FieldRef::Year {
                field: YearField::NegotiatedPrice,
                ..
            }
        )
    }

    /// Only negotiated prices are editable in the grid.
    pub fn is_editable(&self) -> bool {
        self.is_negotiated_price()
    }

    pub fn header(&self) -> &'static str {
        match self {
            FieldRef::Fixed(FixedField::Selection) => statics::EN_EMPTY,
            FieldRef::Fixed(FixedField::Id) => statics::EN_COL_ID,
            FieldRef::Fixed(FixedField::Name) => statics::EN_COL_NAME,
            FieldRef::Fixed(FixedField::Quantity) => statics::EN_COL_QUANTITY,
            FieldRef::Year {
                field: YearField::ListPrice,
                ..
            } => statics::EN_COL_LIST_PRICE,
            FieldRef::Year {
                field: YearField::NegotiatedPrice,
                ..
            } => statics::EN_COL_NEGOTIATED_PRICE,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldRef::Fixed(FixedField::Selection) => f.write_str(statics::FIELD_IS_SELECTED),
            FieldRef::Fixed(_) => f.write_str(self.header()),
            FieldRef::Year { year, .. } => write!(f, "{year}/{}", self.header()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub field: FieldRef,
    pub header: &'static str,
    pub editable: bool,
    /// Stays at the left edge when the grid scrolls horizontally.
    pub pinned: bool,
}

impl Column {
    fn new(field: FieldRef) -> Self {
        Self {
            header: field.header(),
            editable: field.is_editable(),
            pinned: matches!(field, FieldRef::Fixed(FixedField::Selection)),
            field,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearGroup {
    pub year: YearLabel,
    pub list_price: Column,
    pub negotiated_price: Column,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSchema {
    pub fixed: Vec<Column>,
    pub years: Vec<YearGroup>,
}

impl ColumnSchema {
    pub fn year_labels(&self) -> impl Iterator<Item = &YearLabel> {
        self.years.iter().map(|g| &g.year)
    }

    /// Fixed columns, then each year's list/negotiated pair, left to right.
    pub fn leaf_columns(&self) -> impl Iterator<Item = &Column> {
        self.fixed.iter().chain(
            self.years
                .iter()
                .flat_map(|g| [&g.list_price, &g.negotiated_price]),
        )
    }

    pub fn leaf_count(&self) -> usize {
        self.fixed.len() + self.years.len() * 2
    }
}

/// Derives the schema for `rows`.
///
/// Year groups cover the union of every row's year keys, in [`YearLabel`]
/// order. Pure and cheap enough to run on every presentation.
pub fn derive_columns(rows: &[Arc<Row>]) -> ColumnSchema {
    let years: BTreeSet<&YearLabel> = rows.iter().flat_map(|r| r.years.keys()).collect();

    let fixed = [
        FixedField::Selection,
        FixedField::Id,
        FixedField::Name,
        FixedField::Quantity,
    ]
    .into_iter()
    .map(|f| Column::new(FieldRef::Fixed(f)))
    .collect();

    let years = years
        .into_iter()
        .map(|year| YearGroup {
            year: year.clone(),
            list_price: Column::new(FieldRef::list(year.clone())),
            negotiated_price: Column::new(FieldRef::negotiated(year.clone())),
        })
        .collect();

    ColumnSchema { fixed, years }
}

/// What a row shows in one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Flag(bool),
    Id(i64),
    Text(&'a str),
    Count(u64),
    Price(Price),
    /// The row has no entry (or no price) for this year.
    Empty,
}

impl fmt::Display for Cell<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Flag(v) => write!(f, "{v}"),
            Cell::Id(v) => write!(f, "{v}"),
            Cell::Text(s) => f.write_str(s),
            Cell::Count(v) => write!(f, "{v}"),
            Cell::Price(p) => write!(f, "{p}"),
            Cell::Empty => f.write_str(statics::EN_EMPTY),
        }
    }
}

pub fn cell<'a>(row: &'a Row, field: &FieldRef) -> Cell<'a> {
    match field {
        FieldRef::Fixed(FixedField::Selection) => Cell::Flag(row.is_selected),
        FieldRef::Fixed(FixedField::Id) => Cell::Id(row.id),
        FieldRef::Fixed(FixedField::Name) => Cell::Text(&row.name),
        FieldRef::Fixed(FixedField::Quantity) => Cell::Count(row.quantity),
        FieldRef::Year { year, field } => {
            let price = row.year(year).and_then(|e| match field {
                YearField::ListPrice => e.list_price,
                YearField::NegotiatedPrice => e.negotiated_price,
            });
            price.map_or(Cell::Empty, Cell::Price)
        }
    }
}
