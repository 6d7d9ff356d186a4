// Ports (interfaces) shared by the core plumbing and the service façades.

pub mod ports;
