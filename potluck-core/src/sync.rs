//! Moving recipes between editable form state and the recipe service.

use std::sync::Arc;

use crate::account::Navigator;
use crate::error::SyncError;
use crate::form::{text_input, IngredientForm, RecipeForm, StepForm};
use crate::http::{Method, Transport};
use crate::ordinal::OrdinalList;
use crate::session::{Body, SessionClient};
use crate::strip::strip;
use crate::tree::Node;
use crate::types::{RecipeId, WireIngredient, WireRecipe, WireStep};

pub const RECIPE_PATH: &str = "/recipe";

/// Where a payload is saved: a new recipe, or an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget {
    Create,
    Update(RecipeId),
}

impl SaveTarget {
    pub fn path(&self) -> String {
        match self {
            SaveTarget::Create => RECIPE_PATH.to_string(),
            SaveTarget::Update(id) => recipe_path(*id),
        }
    }
}

pub fn recipe_path(id: RecipeId) -> String {
    format!("{}/{}", RECIPE_PATH, id)
}

/// A recipe ready to send: absent fields already removed, keys still in
/// internal casing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipePayload {
    pub target: SaveTarget,
    pub body: Node,
}

/// Project form state onto the wire.
///
/// Does not validate: an incomplete form produces an incomplete payload.
/// Step ordinals are rewritten to `0..n` in display order, so gaps left by
/// editing never reach the server.
pub fn to_wire_payload(form: &RecipeForm) -> Result<RecipePayload, SyncError> {
    let mut steps = form.steps.clone();
    steps.renumber();
    let normalized = RecipeForm {
        steps,
        ..form.clone()
    };

    let body = strip(Node::from_serialize(&normalized)?);
    let target = match form.id {
        Some(id) => SaveTarget::Update(id),
        None => SaveTarget::Create,
    };
    Ok(RecipePayload { target, body })
}

/// Turn a fetched recipe back into editable state.
pub fn from_wire_response(recipe: WireRecipe) -> RecipeForm {
    let ingredients = recipe
        .ingredients
        .into_iter()
        .map(|i: WireIngredient| IngredientForm {
            id: i.id,
            ingredient: text_input(&i.ingredient),
            quantity: Some(i.quantity),
            units: text_input(&i.units),
            preparation: i.preparation.as_deref().and_then(text_input),
        })
        .collect();

    let steps: OrdinalList<StepForm> = recipe
        .steps
        .into_iter()
        .map(|s: WireStep| StepForm {
            id: s.id,
            ordinal: s.ordinal,
            instruction: text_input(&s.instruction),
        })
        .collect();

    RecipeForm {
        id: Some(recipe.id),
        title: text_input(&recipe.title),
        description: recipe.description.as_deref().and_then(text_input),
        prep_time: recipe.prep_time,
        cook_time: recipe.cook_time,
        inactive_time: recipe.inactive_time,
        yield_quantity: Some(recipe.yield_quantity),
        yield_units: text_input(&recipe.yield_units),
        ingredients,
        steps,
        author: recipe.author,
    }
}

/// Recipe operations over an authenticated session.
pub struct RecipeSyncService<T> {
    client: Arc<SessionClient<T>>,
    navigator: Option<Arc<dyn Navigator>>,
}

impl<T> Clone for RecipeSyncService<T> {
    fn clone(&self) -> Self {
        Self {
            client: self.client.clone(),
            navigator: self.navigator.clone(),
        }
    }
}

impl<T: Transport> RecipeSyncService<T> {
    pub fn new(client: Arc<SessionClient<T>>) -> Self {
        Self {
            client,
            navigator: None,
        }
    }

    /// Send the user to the saved recipe after every successful submit.
    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    /// Validate and save the form. Returns the id of the stored recipe.
    pub async fn submit(&self, form: &RecipeForm) -> Result<RecipeId, SyncError> {
        form.validate()?;
        let payload = to_wire_payload(form)?;
        let path = payload.target.path();

        tracing::debug!(path = %path, target = ?payload.target, "saving recipe");
        let saved: WireRecipe = self
            .client
            .request(Method::Post, &path, Some(Body::Json(payload.body)))
            .await?
            .json()?;

        tracing::info!(id = %saved.id, "recipe saved");
        if let Some(navigator) = &self.navigator {
            navigator.recipe(saved.id);
        }
        Ok(saved.id)
    }

    /// Fetch a recipe as editable form state.
    pub async fn fetch(&self, id: RecipeId) -> Result<RecipeForm, SyncError> {
        let recipe: WireRecipe = self.client.get(&recipe_path(id)).await?;
        Ok(from_wire_response(recipe))
    }

    pub async fn list(&self) -> Result<Vec<WireRecipe>, SyncError> {
        self.client.get(RECIPE_PATH).await
    }

    pub async fn delete(&self, id: RecipeId) -> Result<(), SyncError> {
        self.client.delete(&recipe_path(id)).await?;
        tracing::info!(%id, "recipe deleted");
        Ok(())
    }
}
