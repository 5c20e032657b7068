pub mod endpoint;
pub mod scan;
pub mod tcp;
