use crate::model::Price;
use crate::schema::FieldRef;
use crate::statics;

/// A value the grid proposes to write into a row.
#[derive(Debug, Clone, PartialEq)]
pub enum EditValue {
    Price(Price),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{} (got {input:?})", statics::EN_ERR_NEGOTIATED_PRICE)]
    NotANumber { input: String },
    #[error("{} (got {value})", statics::EN_ERR_NEGOTIATED_PRICE)]
    Negative { value: f64 },
}

impl ValidationError {
    /// Message for the notification sink.
    pub fn user_message(&self) -> &'static str {
        statics::EN_ERR_NEGOTIATED_PRICE
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Accepted(EditValue),
    /// The display must go back to `revert_to`; nothing reaches the dataset.
    Rejected {
        reason: ValidationError,
        revert_to: Option<Price>,
    },
}

impl EditOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, EditOutcome::Accepted(_))
    }
}

/// Decides whether `proposed` may be written to `field`.
///
/// Negotiated prices must parse as a finite number `>= 0` (surrounding
/// whitespace ignored, `-0` normalized to `0`). Every other field passes
/// through unchanged as text.
pub fn validate_edit(field: &FieldRef, proposed: &str, previous: Option<Price>) -> EditOutcome {
    if !field.is_negotiated_price() {
        return EditOutcome::Accepted(EditValue::Text(proposed.to_string()));
    }

    let reject = |reason| EditOutcome::Rejected {
        reason,
        revert_to: previous,
    };

    let input = proposed.trim();
    let value = match input.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            return reject(ValidationError::NotANumber {
                input: proposed.to_string(),
            });
        }
    };

    match Price::new(value) {
        Some(price) => EditOutcome::Accepted(EditValue::Price(price)),
        None => reject(ValidationError::Negative { value }),
    }
}
