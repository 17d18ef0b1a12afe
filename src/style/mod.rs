//! Mapbox GL style documents: constants, layer inheritance and filters.

pub mod filter;
pub mod styler;
pub mod value;

pub use filter::Filter;
pub use styler::{LayerKind, StyleDiagnostic, StyleRule, Styler};
pub use value::{Properties, PropertyValue, TYPE_KEY};
