//! Public SDK for preloading page data across server and client renders.
//!
//! This crate re-exports all preload functionality:
//!
//! ```ignore
//! use edge_sdk::prelude::*;
//!
//! let page = wire(
//!     ProductPage,
//!     QuerySet::single("product", QueryDescriptor::new("q1", "ProductQuery")),
//!     PreloadOptions::new()
//!         .with_fallback("<p>Loading...</p>")
//!         .with_server_environment(|_, _| Arc::new(MemoryEnvironment::new(net.clone())))
//!         .with_client_environment(|| Arc::new(MemoryEnvironment::new(net.clone()))),
//! );
//!
//! let props = page.initial_props(&ExecutionContext::Server(ctx)).await?;
//! let html = page
//!     .render_server(&props, &route)?
//!     .document(DocumentShell::new(HeadContent::new("Product")))?;
//! ```

pub use edge_core;
pub use edge_data;
pub use edge_hydration;
pub use edge_preload;
pub use edge_streaming;

/// Prelude for convenient imports.
pub mod prelude {
    pub use edge_core::*;
    pub use edge_data::memory::MemoryEnvironment;
    pub use edge_data::*;
    pub use edge_hydration::*;
    pub use edge_preload::*;
    pub use edge_streaming::*;
}
