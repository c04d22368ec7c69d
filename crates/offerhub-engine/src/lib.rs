pub mod selection;
pub mod service;

mod inflight;

pub use selection::select;
pub use service::ProductService;
