//! Response and request shapes exchanged with the recipe service.
//!
//! These are the internal (camelCase) views. By the time a response body is
//! deserialized into one of them, the session client has already rewritten the
//! wire's snake_case keys.

use serde::{Deserialize, Serialize};

/// Server-assigned recipe identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipeId(pub i64);

impl std::fmt::Display for RecipeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireIngredient {
    #[serde(default)]
    pub id: Option<i64>,
    pub ingredient: String,
    pub quantity: f64,
    pub units: String,
    #[serde(default)]
    pub preparation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireStep {
    #[serde(default)]
    pub id: Option<i64>,
    pub ordinal: u32,
    pub instruction: String,
}

/// A recipe as returned by `GET /recipe/{id}` and `GET /recipe`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireRecipe {
    pub id: RecipeId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub prep_time: Option<u64>,
    #[serde(default)]
    pub cook_time: Option<u64>,
    #[serde(default)]
    pub inactive_time: Option<u64>,
    pub yield_quantity: f64,
    pub yield_units: String,
    #[serde(default)]
    pub ingredients: Vec<WireIngredient>,
    #[serde(default)]
    pub steps: Vec<WireStep>,
}

/// Body of `POST /user/token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Body sent to `POST /user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub name: String,
}

/// Body of `POST /user` and `GET /user/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
}

/// Error body the service attaches to non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
