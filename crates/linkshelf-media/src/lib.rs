//! Media handling for linkshelf: blob storage on the local filesystem, image
//! compression before upload, and fetching remote images.

pub mod blob;
pub mod compress;
pub mod error;
pub mod fetch;

pub use blob::{BlobPath, FsBlobStore};
pub use compress::{CompressOptions, Compressed, compress_image, encode_png};
pub use error::{Error, Result};
pub use fetch::{FetchedImage, ImageFetcher, detect_image_mime};
