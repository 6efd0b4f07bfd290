//! Load-time configuration.

use typed_builder::TypedBuilder;

/// Tunables for one load. `strict_relocation_range` controls whether an
/// out-of-range Thumb-2 branch displacement is a hard error or is allowed
/// to wrap.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Config {
    /// If `true` (the default), a Thumb-2 branch displacement that does not
    /// fit in 25 bits is a fatal [`crate::error::Error::DisplacementOverflow`]
    /// rather than being allowed to wrap silently.
    #[builder(default = true)]
    pub strict_relocation_range: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::builder().build()
    }
}
