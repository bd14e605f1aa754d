//! Request validation from descriptor rules.

use crate::config::{ColumnRule, ResolvedEntity};
use crate::error::AppError;
use crate::store::Values;
use serde_json::{Map, Value};
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Pull the entity's data columns out of a JSON body. Values must be strings or null;
    /// keys that are not columns are left alone. With `partial`, absent columns are skipped,
    /// otherwise they come back as None.
    pub fn column_values(
        entity: &ResolvedEntity,
        body: &Map<String, Value>,
        partial: bool,
    ) -> Result<Values, AppError> {
        let mut out = Values::new();
        for c in &entity.columns {
            let v = match body.get(&c.name) {
                None if partial => continue,
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s.clone()),
                Some(_) => return Err(AppError::Validation(format!("{} must be a string", c.name))),
            };
            out.insert(c.name.clone(), v);
        }
        Ok(out)
    }

    /// Validate a full row. All required fields must be present.
    pub fn validate(values: &Values, rules: &HashMap<String, ColumnRule>) -> Result<(), AppError> {
        for (col, rule) in rules {
            let val = values.get(col).and_then(Option::as_deref);
            if rule.required && val.is_none() {
                return Err(AppError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present (for PUT/PATCH). A present required field may not be null.
    pub fn validate_partial(values: &Values, rules: &HashMap<String, ColumnRule>) -> Result<(), AppError> {
        for (col, v) in values {
            let Some(rule) = rules.get(col) else { continue };
            match v {
                Some(v) => validate_field(col, v, rule)?,
                None if rule.required => {
                    return Err(AppError::Validation(format!("{} is required", col)));
                }
                None => {}
            }
        }
        Ok(())
    }
}

fn validate_field(col: &str, v: &str, rule: &ColumnRule) -> Result<(), AppError> {
    let len = v.chars().count();
    if let Some(max) = rule.max_length {
        if len > max as usize {
            return Err(AppError::Validation(format!(
                "{} must be at most {} characters",
                col, max
            )));
        }
    }
    if let Some(min) = rule.min_length {
        if len < min as usize {
            return Err(AppError::Validation(format!(
                "{} must be at least {} characters",
                col, min
            )));
        }
    }
    if let Some(ref re) = rule.pattern {
        if !re.is_match(v) {
            return Err(AppError::Validation(format!("{} does not match required pattern", col)));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve, FullConfig, ValidationRule};
    use serde_json::json;

    fn authors() -> std::sync::Arc<ResolvedEntity> {
        let model = resolve(&FullConfig::bookstore().unwrap()).unwrap();
        model.entity_by_path("authors").unwrap().clone()
    }

    fn body(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn missing_name_is_required() {
        let e = authors();
        let values = RequestValidator::column_values(&e, &body(json!({})), false).unwrap();
        let err = RequestValidator::validate(&values, &e.validation).unwrap_err();
        assert_eq!(err.to_string(), "name is required");
    }

    #[test]
    fn non_string_name_is_rejected() {
        let e = authors();
        let err = RequestValidator::column_values(&e, &body(json!({"name": 42})), false).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn name_over_bound_is_rejected() {
        let e = authors();
        let long = "x".repeat(33);
        let values = RequestValidator::column_values(&e, &body(json!({ "name": long })), false).unwrap();
        assert!(RequestValidator::validate(&values, &e.validation).is_err());
    }

    #[test]
    fn partial_skips_absent_and_ignores_unknown_keys() {
        let e = authors();
        let values =
            RequestValidator::column_values(&e, &body(json!({"book_id": 3, "colour": "red"})), true).unwrap();
        assert!(values.is_empty());
        RequestValidator::validate_partial(&values, &e.validation).unwrap();
    }

    #[test]
    fn partial_rejects_null_required() {
        let e = authors();
        let values = RequestValidator::column_values(&e, &body(json!({"name": null})), true).unwrap();
        assert!(RequestValidator::validate_partial(&values, &e.validation).is_err());
    }

    #[test]
    fn pattern_rule_applies() {
        let mut rules = HashMap::new();
        rules.insert(
            "name".to_string(),
            ColumnRule::compile(
                "name",
                &ValidationRule {
                    pattern: Some("^[A-Z]".into()),
                    ..Default::default()
                },
            )
            .unwrap(),
        );
        let mut values = Values::new();
        values.insert("name".into(), Some("lowercase".into()));
        assert!(RequestValidator::validate(&values, &rules).is_err());
        values.insert("name".into(), Some("Upper".into()));
        RequestValidator::validate(&values, &rules).unwrap();
    }
}
