pub mod assets;
pub mod collab;
pub mod config;
pub mod error;
pub mod nav;
pub mod parts;
pub mod push;
pub mod render;
pub mod scanner;
pub mod template;

// Re-export main types
pub use assets::AssetRegistry;
pub use collab::{Anonymous, Features, PageIndex, Session, User};
pub use config::Settings;
pub use error::{ConfigError, RenderError, ScanError};
pub use nav::{NavEntry, Navigation};
pub use parts::{PartProcessor, PartProcessorRegistry, Parts, ProcessorCatalog};
pub use push::{HeaderSink, PushHint, PushHints, ResourceType, ResponseHead};
pub use render::{PageRenderer, RenderPass, RenderedPage, Request};
pub use scanner::ContentDir;
