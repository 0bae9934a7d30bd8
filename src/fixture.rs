//! Built-in demo catalog.

use crate::model::Dataset;
use anyhow::Context;

const DEMO_JSON5: &str = include_str!("../data/demo.json5");

pub fn demo_dataset() -> anyhow::Result<Dataset> {
    Dataset::from_json5(DEMO_JSON5).context("built-in demo catalog")
}
