pub mod converter;
pub mod error;
pub mod registry;

pub use converter::VersionedEntityConverter;
pub use error::ConversionError;
pub use registry::{EntityKind, Shape};

/// Conversion from a legacy wire shape to the next newer one.
///
/// Fields absent in the legacy shape become the zero value of the newer shape's
/// field type. Only a structurally impossible input is an error.
pub trait Upgrade {
    type Current;

    fn upgrade(&self) -> Result<Self::Current, ConversionError>;
}

/// Conversion from a current shape to the next older one. Fields with no
/// counterpart in the older shape are dropped.
pub trait Downgrade {
    type Legacy;

    fn downgrade(&self) -> Result<Self::Legacy, ConversionError>;
}
