//! Gallery export onto the local filesystem.
use chrono::Utc;
use choicetype_core::{ExportError, ExportRequest, ExportSource, MediaExport};
use log::debug;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Wallpaper images shipped inside the binary.
fn bundled_asset(name: &str) -> Option<&'static [u8]> {
    let bytes: &'static [u8] = match name {
        "wall_steady.png" => include_bytes!("../assets/wallpapers/wall_steady.png"),
        "wall_calm.png" => include_bytes!("../assets/wallpapers/wall_calm.png"),
        "wall_quick.png" => include_bytes!("../assets/wallpapers/wall_quick.png"),
        "wall_flow.png" => include_bytes!("../assets/wallpapers/wall_flow.png"),
        "wall_moment.png" => include_bytes!("../assets/wallpapers/wall_moment.png"),
        _ => return None,
    };
    Some(bytes)
}

/// Saves images under `<gallery_root>/<album>/`.
#[derive(Debug, Clone)]
pub struct FsMediaExport {
    gallery_root: PathBuf,
}

impl FsMediaExport {
    pub const fn new(gallery_root: PathBuf) -> Self {
        Self { gallery_root }
    }

    /// Create the album and make sure it accepts writes.
    fn ensure_album(&self, album: &str) -> Result<PathBuf, ExportError> {
        let dir = self.gallery_root.join(album);
        fs::create_dir_all(&dir).map_err(map_io)?;
        if fs::metadata(&dir).map_err(map_io)?.permissions().readonly() {
            return Err(ExportError::PermissionDenied);
        }
        Ok(dir)
    }
}

fn map_io(err: std::io::Error) -> ExportError {
    if err.kind() == ErrorKind::PermissionDenied {
        ExportError::PermissionDenied
    } else {
        ExportError::Filesystem(err)
    }
}

fn copy_local(source: &Path, dest: &Path) -> Result<(), ExportError> {
    fs::copy(source, dest).map(|_| ()).map_err(map_io)
}

impl MediaExport for FsMediaExport {
    fn export_image(&self, request: &ExportRequest) -> Result<PathBuf, ExportError> {
        let album = self.ensure_album(&request.album)?;
        let dest = album.join(format!(
            "{}_{}.png",
            request.file_stem,
            Utc::now().timestamp_millis()
        ));
        match &request.source {
            ExportSource::Bundled(name) => {
                let bytes = bundled_asset(name).ok_or_else(|| {
                    ExportError::Filesystem(std::io::Error::new(
                        ErrorKind::NotFound,
                        format!("no bundled asset named {name}"),
                    ))
                })?;
                fs::write(&dest, bytes).map_err(map_io)?;
            }
            ExportSource::LocalFile(path) => copy_local(path, &dest)?,
            ExportSource::Remote(url) => {
                return Err(ExportError::Network(format!("cannot download {url}")));
            }
        }
        debug!("exported {} to {}", request.file_stem, dest.display());
        Ok(dest)
    }
}
