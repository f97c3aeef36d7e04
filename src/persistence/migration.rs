use tracing::{info, warn};

use crate::imaging::{is_legacy_png, transcode_png_to_jpeg, MIGRATION_JPEG_QUALITY};
use crate::session::{LectureSession, Slide};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub converted: usize,
    pub failed: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.converted == 0 && self.failed == 0
    }
}

/// Transcode slides still stored as PNG to JPEG, one at a time.
///
/// A slide that fails to convert keeps its original image.
pub fn migrate_slides(slides: &mut [Slide]) -> MigrationReport {
    let mut report = MigrationReport::default();

    for slide in slides.iter_mut().filter(|s| is_legacy_png(&s.image_data_url)) {
        match transcode_png_to_jpeg(&slide.image_data_url, MIGRATION_JPEG_QUALITY) {
            Ok(jpeg) => {
                slide.image_data_url = jpeg;
                report.converted += 1;
            }
            Err(e) => {
                warn!("Keeping PNG for slide {}: {:#}", slide.page_number, e);
                report.failed += 1;
            }
        }
    }

    report
}

/// Run [`migrate_slides`] on a blocking thread and hand the session back
pub async fn migrate_session(mut session: LectureSession) -> (LectureSession, MigrationReport) {
    if !session.slides.iter().any(|s| is_legacy_png(&s.image_data_url)) {
        return (session, MigrationReport::default());
    }

    let slides = session.slides.clone();
    let result = tokio::task::spawn_blocking(move || {
        let mut slides = slides;
        let report = migrate_slides(&mut slides);
        (slides, report)
    })
    .await;

    match result {
        Ok((slides, report)) => {
            if report.converted > 0 {
                info!(
                    "Migrated {} slides of {} to JPEG ({} failed)",
                    report.converted, session.id, report.failed
                );
            }
            session.slides = slides;
            (session, report)
        }
        Err(e) => {
            warn!("Slide migration task failed for {}: {}", session.id, e);
            (session, MigrationReport::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::encode_data_url;
    use crate::session::ParsedSlide;
    use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_url() -> String {
        let image = RgbaImage::from_pixel(8, 8, Rgba([10, 20, 30, 128]));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(image)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        encode_data_url("image/png", &bytes)
    }

    fn slide(page_number: u32, image_data_url: String) -> Slide {
        Slide::from_parsed(ParsedSlide {
            page_number,
            image_data_url,
            text_content: String::new(),
            has_images: true,
        })
    }

    #[test]
    fn test_migrate_converts_png_and_isolates_failures() {
        let mut slides = vec![
            slide(1, png_url()),
            slide(2, "data:image/png;base64,bm90IGEgcG5n".to_string()),
            slide(3, "data:image/jpeg;base64,QUJD".to_string()),
        ];

        let report = migrate_slides(&mut slides);
        assert_eq!(report, MigrationReport { converted: 1, failed: 1 });
        assert!(slides[0].image_data_url.starts_with("data:image/jpeg"));
        assert_eq!(slides[1].image_data_url, "data:image/png;base64,bm90IGEgcG5n");
        assert_eq!(slides[2].image_data_url, "data:image/jpeg;base64,QUJD");
    }

    #[test]
    fn test_migrate_is_noop_without_png() {
        let mut slides = vec![slide(1, "data:image/jpeg;base64,QUJD".to_string())];
        assert!(migrate_slides(&mut slides).is_noop());
    }
}
