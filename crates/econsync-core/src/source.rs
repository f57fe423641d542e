//! The seam between binders and whatever owns the source of truth

use crate::{Result, StateAssociation, Value};

/// Supplies fresh values for declared coordinates
///
/// Implemented by the hub's registry. Returned values are clones: the
/// caller becomes their sole owner.
pub trait ValueSource {
    /// Look up the value behind `(object_name, property_name, association)`
    ///
    /// `Ok(None)` means the coordinate is declared but no value is available
    /// and the caller is expected to tolerate that (offline, non-strict).
    /// An undeclared coordinate is always an error.
    fn find_source_value(
        &self,
        object_name: Option<&str>,
        property_name: &str,
        state_association: Option<&StateAssociation>,
    ) -> Result<Option<Value>>;
}
