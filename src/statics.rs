// Central place for UI strings and other non-localized constants.
// Keep these out of gui.rs to reduce duplication and make tweaks safer.

// English UI strings (EN_ prefix to make future localization easier)
pub const EN_APP_TITLE: &str = "Process Price Grid";

pub const EN_BTN_OPEN: &str = "Open...";
pub const EN_BTN_ABOUT: &str = "About";
pub const EN_BTN_TOGGLE_THEME: &str = "Theme";
pub const EN_BTN_CLEAR: &str = "Clear";
pub const EN_BTN_PRINT_SELECTED: &str = "Print selected";
pub const EN_BTN_EXPORT_ALL: &str = "Export all";

pub const EN_WINDOW_ABOUT: &str = "About";
pub const EN_ABOUT_HEADING: &str = "Process Price Grid";
pub const EN_ABOUT_VERSION: &str = "Version:";
pub const EN_ABOUT_EDITING: &str = "Only negotiatedPrice cells are editable; press Enter or click away to apply.";

pub const EN_HEADING_CATEGORY: &str = "Category";
pub const EN_HEADING_NODE: &str = "Process node";
pub const EN_NO_DATA: &str = "No data";
pub const EN_NO_NODES: &str = "This category has no process nodes.";

pub const EN_COL_ID: &str = "id";
pub const EN_COL_NAME: &str = "name";
pub const EN_COL_QUANTITY: &str = "quantity";
pub const EN_COL_LIST_PRICE: &str = "listPrice";
pub const EN_COL_NEGOTIATED_PRICE: &str = "negotiatedPrice";

pub const EN_ERR_NEGOTIATED_PRICE: &str = "negotiatedPrice must be a non-negative number";

pub const EN_BADGE_MODIFIED: &str = "Modified";
pub const EN_PLACEHOLDER_DEMO: &str = "<demo catalog>";
pub const EN_LABEL_ROWS: &str = "rows:";
pub const EN_LABEL_SELECTED: &str = "selected:";
pub const EN_STATUS_EXPORTED: &str = "Exported all data to the clipboard";

pub const EN_EMPTY: &str = "";

// Payload field names used outside serde attributes.
pub const FIELD_IS_SELECTED: &str = "isSelected";

// File dialog.
pub const DIALOG_FILTER_NAME: &str = "Price catalog";
pub const DIALOG_FILTER_EXTENSIONS: &[&str] = &["json", "json5", "gz"];

// Window and table geometry.
pub const WINDOW_INNER_SIZE: [f32; 2] = [1280.0, 720.0];
pub const COL_W_SELECT: f32 = 28.0;
pub const COL_W_ID: f32 = 48.0;
pub const COL_W_NAME: f32 = 140.0;
pub const COL_W_QUANTITY: f32 = 80.0;
pub const COL_W_PRICE: f32 = 110.0;
