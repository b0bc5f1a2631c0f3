pub mod decoder;
pub mod dto;
pub mod emitter;
pub mod ports;
pub mod preprocess;
pub mod reducer;
pub mod registry;
pub mod services;
pub mod tracker;
