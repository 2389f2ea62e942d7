use anyhow::{Context, Result};
use potluck_core::{RecipeForm, StepForm};
use std::fs;
use std::path::Path;

/// Read an editable recipe form from a JSON file.
pub fn read_form(path: &Path) -> Result<RecipeForm> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read form file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse form file: {}", path.display()))
}

pub fn write_form(path: &Path, form: &RecipeForm) -> Result<()> {
    let content = serde_json::to_string_pretty(form).context("Failed to serialize form")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write form file: {}", path.display()))
}

/// Append a step after the current last step. Returns the new step's ordinal.
pub fn add_step(path: &Path, instruction: &str) -> Result<u32> {
    let mut form = read_form(path)?;
    let key = form.steps.append(StepForm::new(instruction));
    let ordinal = form
        .steps
        .get(key)
        .map(|s| s.ordinal)
        .context("Appended step is missing")?;
    write_form(path, &form)?;
    Ok(ordinal)
}

/// Remove the last step, if any. Returns the removed step.
pub fn drop_step(path: &Path) -> Result<Option<StepForm>> {
    let mut form = read_form(path)?;
    let removed = form.steps.remove_last();
    if removed.is_some() {
        write_form(path, &form)?;
    }
    Ok(removed)
}

pub fn print_form(form: &RecipeForm) {
    let id = form
        .id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "new".to_string());
    println!("[{}] {}", id, form.title.as_deref().unwrap_or("(untitled)"));
    if let Some(author) = &form.author {
        println!("by {}", author.name);
    }
    if let Some(description) = &form.description {
        println!("{}", description);
    }
    if let (Some(quantity), Some(units)) = (form.yield_quantity, &form.yield_units) {
        println!("Makes {} {}", quantity, units);
    }
    for (label, seconds) in [
        ("Prep", form.prep_time),
        ("Cook", form.cook_time),
        ("Inactive", form.inactive_time),
    ] {
        if let Some(seconds) = seconds {
            println!("{}: {} min", label, seconds / 60);
        }
    }

    println!();
    for ingredient in &form.ingredients {
        let mut line = format!(
            "- {} {} {}",
            ingredient.quantity.map(|q| q.to_string()).unwrap_or_default(),
            ingredient.units.as_deref().unwrap_or(""),
            ingredient.ingredient.as_deref().unwrap_or(""),
        );
        if let Some(preparation) = &ingredient.preparation {
            line.push_str(&format!(", {}", preparation));
        }
        println!("{}", line);
    }

    println!();
    for (i, step) in form.steps.iter().enumerate() {
        println!("{}. {}", i + 1, step.instruction.as_deref().unwrap_or(""));
    }
}
