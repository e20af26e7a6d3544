pub mod catalogue;
pub mod error;
pub mod extension;
pub mod local;
pub mod registry;
pub mod stub;
pub mod variant;

pub use catalogue::{CatalogueBackend, CatalogueSource, HttpSource};
pub use error::{SourceError, SourceResult};
pub use extension::{
    Extension, ExtensionFeed, ExtensionIndex, ExtensionReceiver, NoSourceNames, SourceNameLookup,
    extension_feed,
};
pub use local::{LOCAL_SOURCE_LANG, LOCAL_SOURCE_NAME, LocalSource};
pub use registry::{SourceRegistry, SourceSnapshot};
pub use stub::StubSource;
pub use variant::Source;
