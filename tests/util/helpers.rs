use camino::Utf8PathBuf;
use std::sync::Once;

static INIT_LOGGING: Once = Once::new();

pub(crate) fn init_logging() {
    INIT_LOGGING.call_once(|| {
        tracing::subscriber::set_global_default(
            tracing_subscriber::FmtSubscriber::builder()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .finish(),
        )
        .unwrap()
    })
}

/// A temporary directory, which is deleted when the guard is dropped.
pub(crate) fn temp_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
    (dir, path)
}

pub(crate) fn count_files(dir: &camino::Utf8Path) -> usize {
    fs_err::read_dir(dir).unwrap().count()
}

/// Decode a PNG into its 8-bit grayscale pixels.
pub(crate) fn png_pixels(png: &[u8]) -> (u32, u32, Vec<u8>) {
    let image = image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .unwrap()
        .to_luma8();
    (image.width(), image.height(), image.into_raw())
}
