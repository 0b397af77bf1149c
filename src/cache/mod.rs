//! Two independent concurrent maps — the positive cache and the blocklist — plus the
//! validation rules that guard what goes into them.

pub mod keyed_map;
pub mod layer;
