//! S-57 field decoding: structured values from raw ISO 8211 field bytes.

pub mod decode;
pub mod value;

pub use decode::{
    CoordFactors, DsidInfo, FeaturePointer, FoidInfo, FridInfo, SpatialPointer, VridInfo,
};
pub use value::AttributeValue;
