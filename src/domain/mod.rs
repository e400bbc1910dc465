// Domain layer: canonical schema, listing records and capability ports.

pub mod model;
pub mod ports;
