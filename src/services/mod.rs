//! Service layer
//!
//! The reconciler drives everything; the notifier owns the chat-platform
//! side effects; the registry implements the explicit registration actions.

pub mod notifier;
pub mod reconciler;
pub mod registry;

pub use notifier::Notifier;
pub use reconciler::Reconciler;
pub use registry::Registry;
