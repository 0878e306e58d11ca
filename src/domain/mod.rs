// Domain layer: request/response schemas and the port to the external model.

pub mod model;
pub mod ports;
