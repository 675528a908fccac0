pub mod image_gate;
pub mod image_store;

pub use image_gate::ImageGate;
pub use image_store::FsImageStore;
