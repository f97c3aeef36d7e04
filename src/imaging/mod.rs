//! Slide and attachment image handling

mod data_url;
mod optimize;

pub use data_url::{encode_data_url, DataUrl};
pub use optimize::{
    fit_within, is_legacy_png, transcode_png_to_jpeg, ImageOptimizer, RasterOptimizer,
    MIGRATION_JPEG_QUALITY,
};
