//! Snapcode Core - key lifecycle and the image-to-HTML pipeline
//!
//! Key side: validate against the authority, seal and persist a user key,
//! pick between the operator key and the stored one, broadcast changes.
//! Generation side: build the prompt, make one cancellable call, clean up
//! the answer and classify what went wrong.

pub mod app;
pub mod cancel;
pub mod config;
pub mod error;
pub mod gemini;
pub mod generator;
pub mod manager;
pub mod notifier;
pub mod prompt;
pub mod request;
pub mod resolver;
pub mod response;
pub mod validator;
pub mod vault;

pub use app::Snapcode;
pub use cancel::CancellationToken;
pub use config::{Config, StoreKind};
pub use error::{ConfigError, CoreError, Result};
pub use gemini::{BackendError, GeminiClient, GenerationBackend};
pub use generator::{FailureCategory, GeneratedPage, GenerationFailure, GenerationOutcome, HtmlGenerator};
pub use manager::KeyManager;
pub use notifier::{ChangeNotifier, Subscription};
pub use request::{AdvancedOptions, ComponentCategory, GenerationRequest, ImagePayload, TemplateStyle};
pub use resolver::{KeyResolver, ResolvedKey};
pub use response::Source;
pub use validator::{GeminiKeyValidator, KeyValidator, Validation};
pub use vault::CredentialVault;
