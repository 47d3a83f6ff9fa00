//! Sector catalogue: which methods apply to a sector, how they are weighted,
//! and which multiple ranges bound them.

pub mod profile;
pub mod registry;

pub use profile::{
    AdjustmentFactor, Direction, MethodId, MethodWeight, MultipleRange, SectorProfile,
    WEIGHT_TOLERANCE,
};
pub use registry::{normalize_code, MatchKind, SectorMatch, SectorRegistry, DEFAULT_SECTOR};
