pub mod sparql_bgp;

pub use sparql_bgp::parse_bgps;
