//! Attribute-level updates over selections.
//!
//! A [`Selection`] names what to change and an [`UpdateSpec`] says how. The
//! update first picks a [`Strategy`]: wrap the selection in a new container,
//! nest a container inside each selected node, or change the nodes in
//! place. Selections that cannot be reduced to one contiguous block are
//! rejected before anything is touched.

pub mod selection;
pub mod spec;
pub mod update;

pub use selection::{NodeSetSelection, RangeSelection, Selection, SelectionFragment};
pub use spec::{
    AddSpec, AttrKey, ForceContext, RemoveSpec, RemoveValue, SetSpec, UpdateSpec, ValueMatcher,
};
pub use update::{Strategy, choose_strategy, is_complex_selection};
