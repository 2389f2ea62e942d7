//! Editable recipe state as held by the client.
//!
//! Every optional input is an `Option`: an empty text box or an unparseable
//! number box is `None`, never an empty string or NaN. Field names serialize
//! in camelCase; converting to wire names is the codec's job.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::ordinal::{Ordinal, OrdinalList};
use crate::types::{Author, RecipeId};

/// Text box value: empty (after trimming) means no value.
pub fn text_input(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Text fields read from stored form state go through [`text_input`] too, so
/// a saved `""` comes back as `None`.
fn text_field<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(text_input))
}

/// Number box value: empty, unparseable or non-finite means no value.
pub fn number_input(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Duration box value in whole seconds.
pub fn seconds_input(raw: &str) -> Option<u64> {
    raw.trim().parse().ok()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientForm {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "text_field")]
    pub ingredient: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default, deserialize_with = "text_field")]
    pub units: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub preparation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepForm {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub ordinal: u32,
    #[serde(default, deserialize_with = "text_field")]
    pub instruction: Option<String>,
}

impl StepForm {
    /// A new step; its ordinal is assigned when appended to a list.
    pub fn new(instruction: &str) -> Self {
        Self {
            id: None,
            ordinal: 0,
            instruction: text_input(instruction),
        }
    }
}

impl Ordinal for StepForm {
    fn ordinal(&self) -> u32 {
        self.ordinal
    }

    fn set_ordinal(&mut self, ordinal: u32) {
        self.ordinal = ordinal;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeForm {
    #[serde(default)]
    pub id: Option<RecipeId>,
    #[serde(default, deserialize_with = "text_field")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "text_field")]
    pub description: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub prep_time: Option<u64>,
    #[serde(default)]
    pub cook_time: Option<u64>,
    #[serde(default)]
    pub inactive_time: Option<u64>,
    #[serde(default)]
    pub yield_quantity: Option<f64>,
    #[serde(default, deserialize_with = "text_field")]
    pub yield_units: Option<String>,
    #[serde(default)]
    pub ingredients: Vec<IngredientForm>,
    #[serde(default)]
    pub steps: OrdinalList<StepForm>,
    /// Only present on fetched recipes. Never sent back.
    #[serde(default, skip_serializing)]
    pub author: Option<Author>,
}

/// A single problem with a single field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path, e.g. `ingredients.2.units`.
    pub field: String,
    pub problem: &'static str,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.problem)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid recipe: {}", summarize(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: String, problem: &'static str) {
        self.errors.push(FieldError { field, problem });
    }

    fn required_text(&mut self, field: impl Into<String>, value: &Option<String>) {
        if value.as_deref().map(str::trim).unwrap_or("").is_empty() {
            self.fail(field.into(), "is required");
        }
    }

    fn positive(&mut self, field: impl Into<String>, value: Option<f64>) {
        match value {
            None => self.fail(field.into(), "is required"),
            Some(v) if !(v.is_finite() && v > 0.0) => self.fail(field.into(), "must be positive"),
            Some(_) => {}
        }
    }
}

impl RecipeForm {
    /// Check required fields before anything is sent.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut check = Checker::default();

        check.required_text("title", &self.title);
        check.positive("yieldQuantity", self.yield_quantity);
        check.required_text("yieldUnits", &self.yield_units);

        for (i, ingredient) in self.ingredients.iter().enumerate() {
            check.required_text(format!("ingredients.{i}.ingredient"), &ingredient.ingredient);
            check.positive(format!("ingredients.{i}.quantity"), ingredient.quantity);
            check.required_text(format!("ingredients.{i}.units"), &ingredient.units);
        }

        for (i, step) in self.steps.iter().enumerate() {
            check.required_text(format!("steps.{i}.instruction"), &step.instruction);
        }

        if check.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                errors: check.errors,
            })
        }
    }

    pub fn is_new(&self) -> bool {
        self.id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid_form() -> RecipeForm {
        let mut steps = OrdinalList::new();
        steps.append(StepForm::new("Simmer"));
        RecipeForm {
            title: text_input("Soup"),
            yield_quantity: number_input("4"),
            yield_units: text_input("bowls"),
            ingredients: vec![IngredientForm {
                ingredient: text_input("leek"),
                quantity: number_input("2"),
                units: text_input("whole"),
                ..Default::default()
            }],
            steps,
            ..Default::default()
        }
    }

    #[test]
    fn test_input_helpers() {
        assert_eq!(text_input("   "), None);
        assert_eq!(text_input(" leek "), Some("leek".to_string()));
        assert_eq!(number_input(""), None);
        assert_eq!(number_input("abc"), None);
        assert_eq!(number_input("NaN"), None);
        assert_eq!(number_input("1.5"), Some(1.5));
        assert_eq!(seconds_input("-3"), None);
        assert_eq!(seconds_input("900"), Some(900));
    }

    #[test]
    fn test_valid_form_passes() {
        assert!(valid_form().validate().is_ok());
    }

    #[test]
    fn test_missing_required_fields() {
        let form = RecipeForm {
            title: text_input("Soup"),
            yield_quantity: number_input(""),
            yield_units: text_input(""),
            ..Default::default()
        };
        let err = form.validate().unwrap_err();
        assert!(err.has_field("yieldQuantity"));
        assert!(err.has_field("yieldUnits"));
        assert!(!err.has_field("title"));
    }

    #[test]
    fn test_nested_field_paths() {
        let mut form = valid_form();
        form.ingredients[0].quantity = Some(0.0);
        form.steps.append(StepForm::new(""));
        let err = form.validate().unwrap_err();
        assert_eq!(
            err.errors,
            vec![
                FieldError {
                    field: "ingredients.0.quantity".into(),
                    problem: "must be positive"
                },
                FieldError {
                    field: "steps.1.instruction".into(),
                    problem: "is required"
                },
            ]
        );
    }

    #[test]
    fn test_author_is_read_but_not_written() {
        let form: RecipeForm = serde_json::from_value(json!({
            "id": 3,
            "title": "Soup",
            "author": {"id": 1, "name": "Ann"}
        }))
        .unwrap();
        assert_eq!(form.author.as_ref().unwrap().name, "Ann");

        let written = serde_json::to_value(&form).unwrap();
        assert!(written.get("author").is_none());
        assert_eq!(written["yieldQuantity"], json!(null));
    }

    #[test]
    fn test_stored_empty_text_reads_as_absent() {
        let form: RecipeForm = serde_json::from_value(json!({
            "title": " Soup ",
            "description": "",
            "yieldQuantity": 4,
            "yieldUnits": "  ",
            "ingredients": [
                {"ingredient": "leek", "quantity": 2, "units": "whole", "preparation": ""}
            ],
            "steps": [{"ordinal": 0, "instruction": ""}]
        }))
        .unwrap();

        assert_eq!(form.title.as_deref(), Some("Soup"));
        assert_eq!(form.description, None);
        assert_eq!(form.yield_units, None);
        assert_eq!(form.ingredients[0].preparation, None);
        assert_eq!(form.steps.iter().next().unwrap().instruction, None);

        let err = form.validate().unwrap_err();
        assert!(err.has_field("yieldUnits"));
        assert!(err.has_field("steps.0.instruction"));
    }
}
