use image::RgbaImage;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};

/// `frame_0007.png` style name for the given frame index.
pub fn frame_file_name(index: u32) -> String {
    format!("frame_{:04}.png", index)
}

/// Writes a presented frame into `dir`, creating the directory if needed.
pub fn save_frame(image: &RgbaImage, dir: &Path, index: u32) -> Result<PathBuf, image::ImageError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(frame_file_name(index));
    image.save(&path)?;
    debug!("Saved frame {} to {}", index, path.display());
    Ok(path)
}
