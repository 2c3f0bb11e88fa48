//! Key layout shared by the cache adapters.

use crate::domain::FieldId;

pub(super) fn status_key(field_id: &FieldId) -> String {
    format!("field:{field_id}:calculation-status")
}

pub(super) fn results_key(field_id: &FieldId) -> String {
    format!("field:{field_id}:results")
}
