pub mod object_cache;

pub use object_cache::{cache_key, ObjectCache};
