//! Fragment geometry sources.
//!
//! [`FragmentService`] is the boundary to the external geocoding service.
//! [`FragmentProvider`] sits in front of it with a bounded cache so a
//! fragment is fetched at most once while it stays resident.
//!
//! ```ignore
//! use std::sync::Arc;
//! use tilestream::provider::{FragmentProvider, InMemoryFragmentService};
//!
//! let service = Arc::new(InMemoryFragmentService::new());
//! let provider = FragmentProvider::new(service, 1_000)?;
//! let fragments = provider.get_fragments(&regions, &quads).await?;
//! ```

mod fragments;
mod memory;
mod types;

pub use fragments::FragmentProvider;
pub use memory::InMemoryFragmentService;
pub use types::{
    BoxFuture, FetchError, Fragment, FragmentMap, FragmentRequest, FragmentResponse,
    FragmentService,
};
