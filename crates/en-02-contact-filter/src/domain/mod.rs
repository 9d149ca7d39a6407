//! Filter data structures. No I/O.

pub mod bloom_filter;
pub mod hash_functions;
pub mod lookup_table;
pub mod parameters;
pub mod prefix_id_map;
