//! Reading overrides from, and writing them to, the YAML format providers author them in.
//!
//! Parsing is driven by the [`OverrideKind`] of each level: a field that its kind declares as
//! [`FieldKind::Overrides`] is turned into nested overrides of that kind, everything else becomes
//! a plain [`Value`]. YAML tags (such as `!ruby/object:Provider::ResourceOverride`) are ignored, the
//! position in the document determines the override kind.
//!
//! No validation happens while parsing. Unrecognized and mistyped fields are kept, so that
//! [validation](`crate::Validate`) can report them with their full path.
use serde::Serialize;
use serde_yaml::{Mapping, Value as Yaml};
use snafu::{OptionExt, ResultExt, Snafu};

use crate::{
    bag::field_name,
    overrides::{FieldKind, Override, OverrideKind, RESOURCE, ResourceOverride, ResourceOverrides},
    value::Value,
};

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse YAML"))]
    ParseYaml { source: serde_yaml::Error },

    #[snafu(display("failed to serialize YAML"))]
    SerializeYaml { source: serde_yaml::Error },

    #[snafu(display("expected a mapping at {path:?}"))]
    NotAMapping { path: String },

    #[snafu(display("mapping at {path:?} has a key that is not a string"))]
    NonStringKey { path: String },

    #[snafu(display("value at {path:?} cannot be represented"))]
    UnsupportedValue { path: String },
}

impl ResourceOverrides {
    /// Parses a provider's resource overrides, keyed by resource name.
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        from_str_with_kind(input, &RESOURCE)
    }
}

/// Parses resource overrides whose recognized fields are declared by `kind`.
pub fn from_str_with_kind(input: &str, kind: &'static OverrideKind) -> Result<ResourceOverrides> {
    let document: Yaml = serde_yaml::from_str(input).context(ParseYamlSnafu)?;

    let mut overrides = ResourceOverrides::new();
    if let Some(entries) = as_mapping(&document, "")? {
        for (key, value) in entries {
            let target = field_name(key_str(key, "")?);
            let node = override_from_yaml(kind, value, target)?;
            overrides.insert(target, ResourceOverride::from_node(node));
        }
    }

    tracing::debug!(
        resources = overrides.len(),
        kind = kind.name,
        "loaded resource overrides"
    );
    Ok(overrides)
}

/// Parses a single override of the given kind.
pub fn override_from_str(input: &str, kind: &'static OverrideKind) -> Result<Override> {
    let document: Yaml = serde_yaml::from_str(input).context(ParseYamlSnafu)?;
    override_from_yaml(kind, &document, "")
}

/// Serializes a bag, override or collection of overrides as YAML.
pub fn to_string<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_yaml::to_string(value).context(SerializeYamlSnafu)
}

fn override_from_yaml(kind: &'static OverrideKind, yaml: &Yaml, path: &str) -> Result<Override> {
    let mut over = Override::new(kind);
    let Some(fields) = as_mapping(yaml, path)? else {
        return Ok(over);
    };

    for (key, value) in fields {
        let name = key_str(key, path)?;
        let field_path = join(path, name);
        let value = match kind.field(name).map(|spec| spec.kind) {
            Some(FieldKind::Overrides(nested_kind)) => {
                overrides_from_yaml(nested_kind, value, &field_path)?
            }
            _ => value_from_yaml(value, &field_path)?,
        };
        over.insert(name, value);
    }
    Ok(over)
}

fn overrides_from_yaml(kind: &'static OverrideKind, yaml: &Yaml, path: &str) -> Result<Value> {
    let Some(entries) = as_mapping(yaml, path)? else {
        return Ok(Value::Null);
    };

    entries
        .iter()
        .map(|(key, value)| {
            let target = field_name(key_str(key, path)?);
            let node = override_from_yaml(kind, value, &join(path, target))?;
            Ok((target.to_owned(), Value::Override(node)))
        })
        .collect::<Result<_>>()
        .map(Value::Mapping)
}

fn value_from_yaml(yaml: &Yaml, path: &str) -> Result<Value> {
    Ok(match yaml {
        Yaml::Null => Value::Null,
        Yaml::Bool(value) => Value::Bool(*value),
        // Integers outside the i64 range are rejected rather than rounded to a float.
        Yaml::Number(number) => match number.as_i64() {
            Some(value) => Value::Integer(value),
            None if number.is_f64() => number
                .as_f64()
                .map(Value::Float)
                .context(UnsupportedValueSnafu { path })?,
            None => return UnsupportedValueSnafu { path }.fail(),
        },
        Yaml::String(value) => Value::String(value.clone()),
        Yaml::Sequence(items) => Value::Sequence(
            items
                .iter()
                .enumerate()
                .map(|(index, item)| value_from_yaml(item, &join(path, &index.to_string())))
                .collect::<Result<_>>()?,
        ),
        Yaml::Mapping(entries) => Value::Mapping(
            entries
                .iter()
                .map(|(key, value)| {
                    let key = key_str(key, path)?;
                    Ok((key.to_owned(), value_from_yaml(value, &join(path, key))?))
                })
                .collect::<Result<_>>()?,
        ),
        Yaml::Tagged(tagged) => value_from_yaml(&tagged.value, path)?,
    })
}

/// Returns the mapping behind `yaml`, or [`None`] if it is empty.
fn as_mapping<'a>(yaml: &'a Yaml, path: &str) -> Result<Option<&'a Mapping>> {
    match yaml {
        Yaml::Null => Ok(None),
        Yaml::Mapping(mapping) => Ok(Some(mapping)),
        Yaml::Tagged(tagged) => as_mapping(&tagged.value, path),
        _ => NotAMappingSnafu { path }.fail(),
    }
}

fn key_str<'a>(key: &'a Yaml, path: &str) -> Result<&'a str> {
    key.as_str().context(NonStringKeySnafu { path })
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_owned()
    } else {
        format!("{path}.{segment}")
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;
    use crate::{
        apply::{Apply, MergeFields},
        bag::AttributeBag,
        overrides::PROPERTY,
        validation::{Validate, ValidationProblem},
    };

    const PROVIDER_OVERRIDES: &str = indoc! {"
        SomeResource: !ruby/object:Provider::MyProvider::ResourceOverride
          description: '{{description}} A tool-specific description complement'
          parameters:
            someParameter: !ruby/object:Provider::MyProvider::PropertyOverride
              description: 'foobar'
          properties:
            someProperty: !ruby/object:Provider::MyProvider::PropertyOverride
              description: 'foobar'
            anotherProperty.someNestedProperty: !ruby/object:Provider::MyProvider::PropertyOverride
              description: 'baz'
        OtherResource:
          exclude: true
    "};

    #[test]
    fn parses_tagged_provider_overrides() {
        let overrides = ResourceOverrides::from_yaml_str(PROVIDER_OVERRIDES).unwrap();
        assert_eq!(
            overrides.targets().collect::<Vec<_>>(),
            ["OtherResource", "SomeResource"]
        );

        let resource = overrides.get("SomeResource").unwrap();
        assert_eq!(
            resource.get("description"),
            Some(&Value::from(
                "{{description}} A tool-specific description complement"
            ))
        );

        let nested = resource
            .property("anotherProperty.someNestedProperty")
            .unwrap();
        assert_eq!(nested.kind(), &PROPERTY);
        assert_eq!(nested.get("description"), Some(&Value::from("baz")));
        assert_eq!(
            resource
                .parameter("someParameter")
                .and_then(|p| p.get("@description").cloned()),
            Some(Value::from("foobar"))
        );

        assert_eq!(
            overrides
                .get("OtherResource")
                .and_then(|over| over.get("exclude")),
            Some(&Value::from(true))
        );
        assert_eq!(overrides.validate(), Ok(()));
    }

    #[test]
    fn empty_documents() {
        assert!(ResourceOverrides::from_yaml_str("").unwrap().is_empty());

        let overrides = ResourceOverrides::from_yaml_str("SomeResource:\n").unwrap();
        assert!(overrides.get("SomeResource").unwrap().is_empty());
    }

    #[test]
    fn unknown_fields_survive_parsing() {
        let overrides = ResourceOverrides::from_yaml_str(indoc! {"
            SomeResource:
              properties:
                someProperty:
                  descripton: typo
        "})
        .unwrap();

        let err = overrides.validate().unwrap_err();
        assert_eq!(err.path(), "SomeResource.properties.someProperty.descripton");
        assert_eq!(
            err.problem(),
            &ValidationProblem::UnrecognizedField { kind: "property" }
        );
    }

    #[test]
    fn plain_values() {
        let over = override_from_str(
            indoc! {"
                default_value:
                  count: 3
                  ratio: 0.5
                  items: [a, ~, false]
            "},
            &PROPERTY,
        )
        .unwrap();

        let expected: Value = [
            ("count", Value::from(3)),
            ("ratio", Value::from(0.5)),
            (
                "items",
                Value::Sequence(vec![Value::from("a"), Value::Null, Value::from(false)]),
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(over.get("default_value"), Some(&expected));
    }

    #[test]
    fn structural_errors() {
        let err = ResourceOverrides::from_yaml_str("- just\n- a list\n").unwrap_err();
        assert!(matches!(err, Error::NotAMapping { ref path } if path.is_empty()));

        let err = ResourceOverrides::from_yaml_str(indoc! {"
            SomeResource:
              properties: [someProperty]
        "})
        .unwrap_err();
        assert!(matches!(err, Error::NotAMapping { ref path } if path == "SomeResource.properties"));

        let err = ResourceOverrides::from_yaml_str("SomeResource:\n  1: one\n").unwrap_err();
        assert!(matches!(err, Error::NonStringKey { ref path } if path == "SomeResource"));

        let err = ResourceOverrides::from_yaml_str("SomeResource: [").unwrap_err();
        assert!(matches!(err, Error::ParseYaml { .. }));
    }

    #[rstest]
    #[case::u64_max("18446744073709551615")]
    #[case::just_above_i64("9223372036854775808")]
    fn integers_out_of_range_are_rejected(#[case] number: &str) {
        let err = override_from_str(&format!("default_value: {number}\n"), &PROPERTY).unwrap_err();
        assert!(matches!(err, Error::UnsupportedValue { ref path } if path == "default_value"));
    }

    #[test]
    fn integer_bounds_are_kept_exactly() {
        let over = override_from_str(
            indoc! {"
                default_value: [9223372036854775807, -9223372036854775808, 1.5e300]
            "},
            &PROPERTY,
        )
        .unwrap();
        assert_eq!(
            over.get("default_value"),
            Some(&Value::Sequence(vec![
                Value::Integer(i64::MAX),
                Value::Integer(i64::MIN),
                Value::Float(1.5e300),
            ]))
        );
    }

    #[test]
    fn nested_targets_drop_a_leading_at() {
        let overrides = ResourceOverrides::from_yaml_str(indoc! {"
            '@SomeResource':
              properties:
                '@someProperty':
                  description: foobar
              parameters:
                '@someParameter':
                  exclude: true
        "})
        .unwrap();

        let resource = overrides.get("SomeResource").unwrap();
        for path in ["someProperty", "@someProperty"] {
            assert_eq!(
                resource
                    .property(path)
                    .and_then(|p| p.get("description").cloned()),
                Some(Value::from("foobar"))
            );
        }
        assert!(resource.parameter("someParameter").is_some());
        assert_eq!(
            resource.nested("properties").map(|(target, _)| target).collect::<Vec<_>>(),
            ["someProperty"]
        );
    }

    #[rstest]
    #[case::empty("SomeResource:\n  description: x\n  properties: {}\n")]
    #[case::null("SomeResource:\n  description: x\n  properties:\n  parameters: ~\n")]
    fn empty_nested_overrides_leave_the_base_untouched(#[case] input: &str) {
        let overrides = ResourceOverrides::from_yaml_str(input).unwrap();
        assert_eq!(overrides.validate(), Ok(()));

        let base = AttributeBag::from_map([
            ("description", Value::from("A bucket.")),
            ("properties", Value::Sequence(vec!["a".into(), "b".into()])),
            ("parameters", Value::Sequence(vec!["c".into()])),
        ]);
        let effective = overrides
            .get("SomeResource")
            .unwrap()
            .clone()
            .with_strategy(MergeFields)
            .apply(&base)
            .unwrap();

        assert_eq!(effective.get("description"), Some(&Value::from("x")));
        assert_eq!(effective.get("properties"), base.get("properties"));
        assert_eq!(effective.get("parameters"), base.get("parameters"));
    }

    #[test]
    fn serializes_fields_only() {
        let overrides = ResourceOverrides::from_yaml_str(indoc! {"
            SomeResource:
              properties:
                someProperty:
                  description: foobar
        "})
        .unwrap();

        assert_eq!(
            to_string(&overrides).unwrap(),
            indoc! {"
                SomeResource:
                  properties:
                    someProperty:
                      description: foobar
            "}
        );
    }
}
