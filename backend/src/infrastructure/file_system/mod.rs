pub mod discovery;

pub use discovery::{
    discover_image_classes, discover_image_files, ClassImages, TRAINING_IMAGE_EXTENSIONS,
};
