//! # plPlugMapM conversion
//!
//! Converts the plPlugMapP file of a guider commissioning plate into the
//! plPlugMapM file of a simulated fiber scan of one of its guide fields.
//!
//! A commissioning plate carries up to 4 pointings, each pointing with 3 fields of
//! [N_GUIDES] guide stars. The plPlugMapM file of a field keeps the light traps of
//! the plate, the alignment holes and the guides of the field, the guides being
//! assigned their fibers from a lookup table.
//!
//! ```no_run
//! use plugmap::{Conversion, Field, Lookup, Pointing, PlateList, ScanMeta};
//!
//! let path = Conversion::new(
//!     PlateList::new("/data/platelist"),
//!     Pointing::B,
//!     Field::new(2)?,
//!     ScanMeta::new(8123, 57514),
//! )
//! .lookup(Lookup::from_path("lookup.txt")?)
//! .run()?;
//! # Ok::<(), plugmap::Error>(())
//! ```

pub mod convert;
mod error;
pub mod field;
pub mod header;
pub mod lookup;
pub mod plugmap;
pub mod yanny;

pub use convert::{Conversion, ConvertError, PlPlugMapM, PlateList};
pub use error::Error;
pub use field::{Field, FieldColour, FieldError, Pointing};
pub use header::ScanMeta;
pub use lookup::{Lookup, LookupError};
pub use plugmap::{FieldSelection, Hole, HoleKind, PlugMap, PlugMapError};

/// Number of guide stars per field
pub const N_GUIDES: usize = 16;
/// Number of guide fields per pointing
pub const FIELDS_PER_POINTING: usize = 3;

pub type Result<T> = std::result::Result<T, Error>;
