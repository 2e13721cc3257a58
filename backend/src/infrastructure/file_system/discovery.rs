/// File discovery utilities for the product image training set
use std::path::{Path, PathBuf};
use tokio::fs;

/// Extensions accepted as training images
pub const TRAINING_IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Images of one class, named after its directory
#[derive(Debug, Clone, PartialEq)]
pub struct ClassImages {
    pub class_name: String,
    pub images: Vec<PathBuf>,
}

fn is_training_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_lowercase();
            TRAINING_IMAGE_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// Discover image files directly inside a directory, sorted by path
pub async fn discover_image_files(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut files = Vec::new();
    let mut entries = fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.is_file() && is_training_image(&path) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// One entry per non-hidden sub-directory of `root`, sorted by class name.
/// Classes without images are skipped.
pub async fn discover_image_classes(root: &Path) -> Result<Vec<ClassImages>, std::io::Error> {
    let mut classes = Vec::new();
    let mut entries = fs::read_dir(root).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(class_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if class_name.starts_with('.') {
            continue;
        }

        let images = discover_image_files(&path).await?;
        if !images.is_empty() {
            classes.push(ClassImages {
                class_name: class_name.to_string(),
                images,
            });
        }
    }

    classes.sort_by(|a, b| a.class_name.cmp(&b.class_name));
    Ok(classes)
}
