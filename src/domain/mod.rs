// Domain layer: customer model, routing types and the ports the router depends on.

pub mod model;
pub mod ports;
