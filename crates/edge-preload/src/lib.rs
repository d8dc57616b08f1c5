//! Lifecycle orchestrator for pages whose data is preloaded on the server
//! and resumed on the client.
//!
//! This crate provides:
//! - `wire` / `PreloadedPage` - Wrap a page component with its query descriptors
//! - `PreloadedPage::initial_props` - Server and client branches, redirects included
//! - `PageInstance` - Per-render fetch and boundary decisions, handle disposal
//! - `VariableChangeDetector` - Whether variables changed since mount
//! - `PreloadOptions` - Builder-style configuration
//!
//! ```ignore
//! let page = wire(ProductPage, descriptors, options);
//!
//! // Server
//! let props = page.initial_props(&ExecutionContext::Server(ctx)).await?;
//! let render = page.render_server(&props, ctx.route())?;
//! let document = render.document(shell)?;
//!
//! // Client
//! page.bootstrap_from_document_state(&embedded_json)?;
//! let mut instance = page.mount(&props, &route);
//! let outcome = instance.render(&props, &route)?;
//! ```

mod detector;
mod error;
mod instance;
mod options;
mod page;

pub use detector::*;
pub use error::*;
pub use instance::*;
pub use options::*;
pub use page::*;
