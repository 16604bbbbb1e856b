pub mod partition_catalog;

pub use partition_catalog::{load_catalog, Family, PartitionCatalog};
