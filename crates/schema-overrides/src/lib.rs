//! Sparse overrides for declarative resource schemas.
//!
//! A base schema describes resources and their properties once. Providers then tweak that schema
//! without copying it: they write a handful of field-level patches, addressed by resource name (or by a
//! dotted path for nested properties), and the generator merges those patches into the base nodes
//! it is about to emit.
//!
//! ```yaml
//! SomeResource:
//!   description: '{{description}} A tool-specific description complement'
//!   properties:
//!     someProperty:
//!       description: 'foobar'
//!     anotherProperty.someNestedProperty:
//!       description: 'baz'
//! ```
//!
//! The crate is built in three layers:
//!
//! - [`AttributeBag`]: a sparse mapping from field name to [`Value`]. `"description"` and
//!   `"@description"` address the same slot, and a missing field is just [`None`].
//! - [`ValidatingBag`]: a bag that knows how to [`Validate`] every field value that is itself
//!   validatable, no matter how deeply it is nested.
//! - [`Override`]: a validating bag bound to an [`OverrideKind`], which declares the fields that
//!   make sense for it. [`ResourceOverride`] and [`PropertyOverride`] are the two core variants, and
//!   [`ResourceOverrides`] collects resource overrides by target name.
//!
//! Overrides are merged into base nodes through [`Apply`]. *How* they are merged is a
//! [`Strategy`], so that each provider can pick its own: [`Identity`] hands back the override
//! itself, while [`MergeFields`] copies the overridden fields into a clone of the base node and
//! expands `{{field}}` placeholders against the original values.
//!
//! ```
//! # use schema_overrides::{Apply, AttributeBag, MergeFields, ResourceOverride, Validate};
//! let base = AttributeBag::from_map([("description", "A bucket.")]);
//! let over = ResourceOverride::from_map([("description", "{{description}} Now with versioning.")])
//!     .with_strategy(MergeFields);
//!
//! over.validate().unwrap();
//! let effective = over.apply(&base).unwrap();
//! assert_eq!(
//!     effective.get("description"),
//!     Some(&"A bucket. Now with versioning.".into())
//! );
//! ```
pub mod apply;
pub mod bag;
pub mod overrides;
pub mod validation;
pub mod value;
pub mod yaml;

pub use apply::{Apply, ApplyError, Identity, MergeFields, Overridable, Strategy};
pub use bag::AttributeBag;
pub use overrides::{
    FieldKind, FieldSpec, Override, OverrideKind, PropertyOverride, ResourceOverride,
    ResourceOverrides,
};
pub use validation::{Validate, ValidatingBag, ValidationError, ValidationProblem, Validator};
pub use value::{Value, ValueKind};
