/// Typed list filters and partial updates
use super::fields::{FieldError, FieldType, FieldValue};
use super::Content;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    /// Field equals the value
    Eq,
    /// List field contains the value
    Contains,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: FilterOp,
    pub value: FieldValue,
}

/// Conjunction of field conditions. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op: FilterOp::Eq,
            value,
        });
        self
    }

    pub fn contains(mut self, field: impl Into<String>, item: impl Into<String>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op: FilterOp::Contains,
            value: FieldValue::Text(item.into()),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Check every condition against the schema of `T`.
    pub fn validate<T: Content>(&self) -> Result<(), FieldError> {
        for cond in &self.conditions {
            let spec = T::field(&cond.field)
                .ok_or_else(|| FieldError::UnknownField(cond.field.clone()))?;

            let valid = match (cond.op, spec.ty) {
                (FilterOp::Contains, FieldType::TextList) => {
                    matches!(cond.value, FieldValue::Text(_))
                }
                (FilterOp::Contains, _) => false,
                (FilterOp::Eq, FieldType::TextList) => false,
                (FilterOp::Eq, ty) => cond.value.field_type() == ty,
            };

            if !valid {
                return Err(FieldError::InvalidValue {
                    field: cond.field.clone(),
                    reason: "value does not match field type".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build a filter from query-string parameters.
    ///
    /// Scalar fields become equality conditions; list fields become
    /// membership conditions (`?topics=lore`).
    pub fn from_query<T: Content>(params: &HashMap<String, String>) -> Result<Self, FieldError> {
        let ordered: BTreeMap<_, _> = params.iter().collect();
        let mut filter = Filter::new();

        for (name, raw) in ordered {
            let spec = T::field(name).ok_or_else(|| FieldError::UnknownField(name.clone()))?;
            filter = match spec.ty {
                FieldType::TextList => filter.contains(spec.name, raw.clone()),
                ty => filter.eq(spec.name, FieldValue::decode(spec.name, ty, raw)?),
            };
        }

        Ok(filter)
    }
}

/// Set of field replacements applied to an existing item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    changes: Vec<(String, FieldValue)>,
}

impl Patch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: impl Into<String>, value: FieldValue) -> Self {
        self.changes.push((field.into(), value));
        self
    }

    pub fn changes(&self) -> &[(String, FieldValue)] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// A patch must be non-empty and only touch known, non-key fields with
    /// values of the declared type.
    pub fn validate<T: Content>(&self) -> Result<(), FieldError> {
        if self.changes.is_empty() {
            return Err(FieldError::InvalidValue {
                field: "patch".to_string(),
                reason: "update must change at least one field".to_string(),
            });
        }

        for (field, value) in &self.changes {
            let spec = T::field(field).ok_or_else(|| FieldError::UnknownField(field.clone()))?;
            if T::is_key_field(spec.name) {
                return Err(FieldError::InvalidValue {
                    field: field.clone(),
                    reason: "key fields cannot be updated".to_string(),
                });
            }
            if value.field_type() != spec.ty {
                return Err(FieldError::InvalidValue {
                    field: field.clone(),
                    reason: "value does not match field type".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Build and validate a patch from a JSON object body.
    pub fn from_json<T: Content>(body: &Map<String, Value>) -> Result<Self, FieldError> {
        let mut patch = Patch::new();
        for (name, value) in body {
            let spec = T::field(name).ok_or_else(|| FieldError::UnknownField(name.clone()))?;
            patch = patch.set(spec.name, FieldValue::from_json(spec.name, spec.ty, value)?);
        }
        patch.validate::<T>()?;
        Ok(patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Article, NewsItem};
    use serde_json::json;

    #[test]
    fn test_empty_filter_is_valid() {
        assert!(Filter::new().validate::<Article>().is_ok());
    }

    #[test]
    fn test_filter_rejects_unknown_field() {
        let filter = Filter::new().eq("likes", FieldValue::SmallInt(3));
        assert!(matches!(
            filter.validate::<Article>(),
            Err(FieldError::UnknownField(_))
        ));
    }

    #[test]
    fn test_filter_contains_only_on_lists() {
        assert!(Filter::new().contains("topics", "lore").validate::<Article>().is_ok());
        assert!(Filter::new().contains("author", "A").validate::<Article>().is_err());
        assert!(Filter::new()
            .eq("topics", FieldValue::Text("lore".into()))
            .validate::<Article>()
            .is_err());
    }

    #[test]
    fn test_filter_from_query_types_values() {
        let params: HashMap<String, String> = [("censor", "2"), ("author", "A")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();

        let filter = Filter::from_query::<NewsItem>(&params).unwrap();
        assert_eq!(
            filter,
            Filter::new()
                .eq("author", FieldValue::Text("A".into()))
                .eq("censor", FieldValue::SmallInt(2))
        );
    }

    #[test]
    fn test_filter_from_query_rejects_bad_number() {
        let params: HashMap<String, String> =
            [("censor".to_string(), "high".to_string())].into_iter().collect();
        assert!(Filter::from_query::<NewsItem>(&params).is_err());
    }

    #[test]
    fn test_patch_from_json() {
        let body = json!({"content": "rewritten", "topics": ["lore"]});
        let patch = Patch::from_json::<Article>(body.as_object().unwrap()).unwrap();
        assert_eq!(patch.changes().len(), 2);
    }

    #[test]
    fn test_patch_rejects_key_and_empty() {
        let key_change = json!({"title": "other"});
        assert!(Patch::from_json::<Article>(key_change.as_object().unwrap()).is_err());
        assert!(Patch::from_json::<Article>(&Map::new()).is_err());
    }

    #[test]
    fn test_patch_rejects_wrong_type() {
        let patch = Patch::new().set("censor", FieldValue::Text("x".into()));
        assert!(patch.validate::<NewsItem>().is_err());
    }
}
