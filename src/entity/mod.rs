//! Entity types: the static catalog and the cached validator in front of it

mod registry;
mod validator;

pub use registry::{EntityCategory, EntityRegistry, EntityTypeDescriptor};
pub use validator::{
    CacheOrigin, EntityTypeValidator, TypeCache, TypeSource, endpoint_for_type, validate_id,
};
