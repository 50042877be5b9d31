//! Configurable per-file fields
//!
//! Files are described by named string fields. Built-in fields cover names,
//! sizes, times and content digests; settings add derived fields that are
//! templates over earlier fields, command pipelines, or regex extractions.
//! Field values are computed lazily and once per file, and drive ordering,
//! filtering and the rendered output of a [`Listing`].
//!
//! ```no_run
//! use fieldlist::{AvailableFields, Engine};
//!
//! let fields = AvailableFields::new(Engine::default())
//!     .define("stem", "/^([^.]*)/g=1,f=filename")?
//!     .define("label", "${stem} (${hsize})")?;
//! let info = fields.info("/tmp/report.pdf");
//! println!("{}", info.get("label")?);
//! # Ok::<(), fieldlist::FieldError>(())
//! ```

pub mod config;
pub mod error;
pub mod fields;
pub mod filter;
pub mod listing;
pub mod logging;
pub mod order;
pub mod settings;
pub mod utils;

pub use config::{Engine, EngineConfig, FieldSetting, ListingConfig, PatternSetting};
pub use error::{FieldError, Result};
pub use fields::{
    AvailableFields, DuctRunner, FieldSource, FieldValue, HashAlgorithm, Info, PipelineRunner,
};
pub use filter::{FileFilter, FormatPattern, FormatPatternFilter, RegexFilter, RegexOptions};
pub use listing::{ListedFile, Listing};
pub use order::{OrderSpec, OrderSpecInfoSorter};
pub use settings::{ParameterizedSetting, SettingKind, TokenFormatter};
