//! FileSink - encodes frames as image files under per-device directories

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use contracts::{ContractError, Frame, FrameSink, ImageData, ImageFileFormat, PersistenceConfig, PixelFormat};
use image::{ColorType, ImageFormat};
use tracing::{debug, error, instrument};

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Root directory; device prefixes are resolved against it
    pub base_path: PathBuf,
    pub image_format: ImageFileFormat,
    /// Insert a `floor(host_ts / 60s)` directory level
    pub minute_buckets: bool,
}

impl From<&PersistenceConfig> for FileSinkConfig {
    fn from(config: &PersistenceConfig) -> Self {
        Self {
            base_path: config.base_path.clone(),
            image_format: config.image_format,
            minute_buckets: config.minute_buckets,
        }
    }
}

/// Sink that writes each frame to its own image file.
///
/// Layout: `base/prefix/[minute]/{seq:08}-{host_ts}-{device_ts}.{ext}`
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
    created_dirs: HashSet<PathBuf>,
}

impl FileSink {
    /// Create a FileSink, creating the base directory if needed
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
            created_dirs: HashSet::new(),
        })
    }

    /// Directory a frame is stored in
    pub fn frame_dir(&self, frame: &Frame) -> PathBuf {
        let dir = self.config.base_path.join(&frame.storage_prefix);
        if self.config.minute_buckets {
            dir.join(frame.minute_bucket().to_string())
        } else {
            dir
        }
    }

    /// Full destination path of a frame
    pub fn frame_path(&self, frame: &Frame) -> PathBuf {
        self.frame_dir(frame).join(format!(
            "{:08}-{}-{}.{}",
            frame.sequence,
            frame.host_timestamp_us,
            frame.device_timestamp,
            self.config.image_format.extension()
        ))
    }

    fn ensure_dir(&mut self, dir: PathBuf) -> std::io::Result<()> {
        if !self.created_dirs.contains(&dir) {
            fs::create_dir_all(&dir)?;
            self.created_dirs.insert(dir);
        }
        Ok(())
    }

    fn write_frame_to_disk(&mut self, frame: &Frame) -> std::io::Result<PathBuf> {
        self.ensure_dir(self.frame_dir(frame))?;
        let path = self.frame_path(frame);
        save_image(&path, &frame.image, self.config.image_format)?;
        Ok(path)
    }
}

fn save_image(path: &Path, image: &ImageData, format: ImageFileFormat) -> std::io::Result<()> {
    // encoders panic on a length mismatch
    if !image.is_complete() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "image buffer has {} bytes, expected {}",
                image.data.len(),
                image.expected_len()
            ),
        ));
    }

    let format = match format {
        ImageFileFormat::Png => ImageFormat::Png,
        ImageFileFormat::Jpeg => ImageFormat::Jpeg,
        ImageFileFormat::Bmp => ImageFormat::Bmp,
    };

    match image.format {
        PixelFormat::Mono8 => image::save_buffer_with_format(
            path,
            &image.data,
            image.width,
            image.height,
            ColorType::L8,
            format,
        )
        .map_err(std::io::Error::other),

        PixelFormat::Rgb8 => image::save_buffer_with_format(
            path,
            &image.data,
            image.width,
            image.height,
            ColorType::Rgb8,
            format,
        )
        .map_err(std::io::Error::other),

        PixelFormat::Bgr8 => {
            let mut rgb = image.data.to_vec();
            for chunk in rgb.chunks_exact_mut(3) {
                chunk.swap(0, 2);
            }
            image::save_buffer_with_format(
                path,
                &rgb,
                image.width,
                image.height,
                ColorType::Rgb8,
                format,
            )
            .map_err(std::io::Error::other)
        }
    }
}

impl FrameSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn commit(&mut self, frame: &Frame) -> Result<(), ContractError> {
        match self.write_frame_to_disk(frame) {
            Ok(path) => {
                debug!(sink = %self.name, sequence = frame.sequence, path = %path.display(), "frame written");
                Ok(())
            }
            Err(e) => {
                error!(
                    sink = %self.name,
                    device_id = %frame.device_id,
                    sequence = frame.sequence,
                    error = %e,
                    "write failed"
                );
                Err(ContractError::sink_write(&self.name, e.to_string()))
            }
        }
    }

    fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self), fields(sink = %self.name))]
    fn close(&mut self) -> Result<(), ContractError> {
        debug!(dirs = self.created_dirs.len(), "FileSink closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn frame(sequence: u64, host_timestamp_us: i64, format: PixelFormat, data: Vec<u8>) -> Frame {
        Frame {
            device_id: "cam1".into(),
            sequence,
            host_timestamp_us,
            device_timestamp: 1000 + sequence,
            storage_prefix: Arc::from(Path::new("imgs/cam1")),
            image: ImageData {
                width: 2,
                height: 1,
                format,
                data: Bytes::from(data),
            },
        }
    }

    fn config(base: &Path) -> FileSinkConfig {
        FileSinkConfig {
            base_path: base.to_path_buf(),
            image_format: ImageFileFormat::Png,
            minute_buckets: true,
        }
    }

    #[test]
    fn test_path_layout() {
        let dir = tempdir().unwrap();
        let sink = FileSink::new("file", config(dir.path())).unwrap();

        let f = frame(7, 125_000_000, PixelFormat::Mono8, vec![0, 255]);
        assert_eq!(
            sink.frame_path(&f),
            dir.path()
                .join("imgs/cam1")
                .join("2")
                .join("00000007-125000000-1007.png")
        );
    }

    #[test]
    fn test_without_minute_buckets() {
        let dir = tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.minute_buckets = false;
        cfg.image_format = ImageFileFormat::Bmp;
        let sink = FileSink::new("file", cfg).unwrap();

        let f = frame(0, 5, PixelFormat::Mono8, vec![0, 255]);
        assert_eq!(
            sink.frame_path(&f),
            dir.path().join("imgs/cam1").join("00000000-5-1000.bmp")
        );
    }

    #[test]
    fn test_commit_writes_decodable_gray_png() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new("file", config(dir.path())).unwrap();

        let f = frame(1, 61_000_000, PixelFormat::Mono8, vec![10, 200]);
        sink.commit(&f).unwrap();
        sink.close().unwrap();

        let decoded = image::open(sink.frame_path(&f)).unwrap().into_luma8();
        assert_eq!(decoded.dimensions(), (2, 1));
        assert_eq!(decoded.into_raw(), vec![10, 200]);
    }

    #[test]
    fn test_bgr_is_stored_as_rgb() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new("file", config(dir.path())).unwrap();

        let f = frame(2, 0, PixelFormat::Bgr8, vec![1, 2, 3, 4, 5, 6]);
        sink.commit(&f).unwrap();

        let decoded = image::open(sink.frame_path(&f)).unwrap().into_rgb8();
        assert_eq!(decoded.into_raw(), vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_short_buffer_fails_commit() {
        let dir = tempdir().unwrap();
        let mut sink = FileSink::new("file", config(dir.path())).unwrap();

        let f = frame(3, 0, PixelFormat::Rgb8, vec![1, 2]);
        let err = sink.commit(&f).unwrap_err();
        assert!(matches!(err, ContractError::SinkWrite { .. }));
    }
}
