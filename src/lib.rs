//! Embedding one content item inside the rich-text field of another.
//!
//! A marker element in a host's field markup refers to a guest entity. The marker moves
//! between three representations: the editor's authoring format, the storage format kept
//! with the host, and the display format shown to readers. [`Converter`] implements the
//! transitions; [`host`] wraps them into a host save, and [`filter`] into display
//! filtering.
//!
//! # Examples
//!
//! ```no_run
//! use shard::collaborators::Entity;
//! use shard::diagnostics::LogSink;
//! use shard::memory::MemorySite;
//! use shard::metadata::{ShardMetadata, StoreIdentities};
//! use shard::{Config, Converter, HostFieldValue, Identity};
//!
//! let site = MemorySite::new();
//! site.insert_entity(Entity::new("article").with_id(7));
//! site.insert_entity(Entity::new("note").with_id(42));
//!
//! let config = Config::default();
//! let metadata = ShardMetadata::new(&config, &site);
//! let identities = StoreIdentities::new(&site);
//! let ctx = site.context(&metadata, &identities, &LogSink);
//!
//! let converter = Converter::with_config(ctx, &config);
//! let stored = converter
//!     .authoring_to_storage(
//!         "<div data-shard-type='shard' data-guest-id='42' data-view-mode='full'></div>",
//!         &HostFieldValue::new(Identity::Id(7), "body", 0),
//!     )
//!     .unwrap();
//! println!("{}", stored.markup);
//! ```

pub mod collaborators;
pub mod config;
pub mod converter;
pub mod diagnostics;
pub mod error;
pub mod filter;
pub mod host;
pub mod markup;
pub mod memory;
pub mod merger;
pub mod metadata;
pub mod placeholder;
pub mod record;
pub mod scanner;
pub mod vocabulary;

pub use config::Config;
pub use config::ConfigBuilder;
pub use converter::{Conversion, Converter, Format, HostFieldValue, MarkerOutcome};
pub use error::{Result, ShardError};
pub use record::{EmbedRecord, EntityId, Identity, RecordId};

/// Route `log` output through env_logger in tests. Safe to call more than once.
pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
