// Domain layer: enums, table rows, seed-rate models and ports.

pub mod enums;
pub mod model;
pub mod ports;
pub mod reference;
pub mod schema;
