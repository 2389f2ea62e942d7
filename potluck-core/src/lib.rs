pub mod account;
pub mod case;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod ordinal;
pub mod session;
pub mod store;
pub mod strip;
pub mod sync;
pub mod tree;
pub mod types;

pub use account::{Account, Navigator, StoredUser};
pub use case::{camel_keys, camel_to_snake, snake_keys, snake_to_camel};
pub use config::{ClientConfig, ConfigError};
pub use error::{StoreError, SyncError, TransportError};
pub use form::{
    number_input, seconds_input, text_input, FieldError, IngredientForm, RecipeForm, StepForm,
    ValidationError,
};
pub use http::{Method, MockResponse, MockTransport, ReqwestTransport, Transport};
pub use ordinal::{EntryKey, Ordinal, OrdinalList};
pub use session::{ApiResponse, Body, SessionClient};
pub use store::{FileStore, KeyValueStore, MemoryStore};
pub use strip::strip;
pub use sync::{from_wire_response, to_wire_payload, RecipePayload, RecipeSyncService, SaveTarget};
pub use tree::Node;
pub use types::{Author, RecipeId, WireRecipe};
