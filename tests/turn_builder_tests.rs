// Integration tests for outgoing turn assembly and delivery
//
// These tests drive the turn builder against a recording transport and
// check which parts reach the model and over which path.

mod common;

use anyhow::{bail, Result};
use common::{slide, FakeTransport, Sent};
use lecture_live::imaging::{ImageOptimizer, RasterOptimizer};
use lecture_live::live::{Part, RealtimeInput, SendOptions, SendOutcome, TurnBuilder};
use lecture_live::session::{
    CanvasBlock, CanvasBlockKind, ImageOptimizationSettings, LectureConfig,
};
use lecture_live::transcript::{AttachmentKind, ChatAttachment};
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Optimizer that always fails
struct BrokenOptimizer;

impl ImageOptimizer for BrokenOptimizer {
    fn optimize(&self, _data_url: &str, _settings: &ImageOptimizationSettings) -> Result<String> {
        bail!("decoder exploded")
    }
}

/// Optimizer that tags its output so tests can tell it ran
struct MarkingOptimizer;

impl ImageOptimizer for MarkingOptimizer {
    fn optimize(&self, _data_url: &str, _settings: &ImageOptimizationSettings) -> Result<String> {
        Ok("data:image/jpeg;base64,T1BUSU1JWkVE".to_string())
    }
}

fn optimizing(optimizer: Arc<dyn ImageOptimizer>) -> TurnBuilder {
    TurnBuilder::new(optimizer, Some(ImageOptimizationSettings::default()), false)
}

fn count_images(parts: &[Part]) -> usize {
    parts.iter().filter(|p| p.as_inline().is_some()).count()
}

#[tokio::test]
async fn test_text_only_slide_sends_single_text_part() -> Result<()> {
    let transport = FakeTransport::opened();
    let builder = TurnBuilder::from_config(&LectureConfig::default(), Arc::new(RasterOptimizer));
    let slide = slide(1, false);

    let outcome = builder
        .send(&transport, SendOptions::text("explain").with_slide(&slide))
        .await;

    assert_eq!(outcome, SendOutcome::Sent);
    let contents = transport.contents();
    assert_eq!(contents.len(), 1);

    let parts = &contents[0].turns[0].parts;
    assert_eq!(parts.len(), 1, "Should carry exactly one part");
    assert_eq!(parts[0].as_text(), Some("explain"));
    assert_eq!(count_images(parts), 0);
    assert!(contents[0].turn_complete);

    Ok(())
}

#[tokio::test]
async fn test_failed_optimization_keeps_original_attachment() -> Result<()> {
    let transport = FakeTransport::opened();
    let builder = optimizing(Arc::new(BrokenOptimizer));
    let attachment = ChatAttachment::image("data:image/png;base64,iVBORw0KGgo=", "image/png");

    let outcome = builder
        .send(
            &transport,
            SendOptions::text("what is this?").with_attachments(std::slice::from_ref(&attachment)),
        )
        .await;

    assert_eq!(outcome, SendOutcome::Sent);
    let contents = transport.contents();
    let parts = &contents[0].turns[0].parts;
    let blob = parts[0].as_inline().expect("attachment image part");
    assert_eq!(blob.mime_type, "image/png");
    assert_eq!(blob.data, "iVBORw0KGgo=");
    assert_eq!(parts[1].as_text(), Some("what is this?"));

    Ok(())
}

#[tokio::test]
async fn test_optimizer_output_replaces_slide_image() -> Result<()> {
    let builder = optimizing(Arc::new(MarkingOptimizer));
    let slide = slide(2, true);

    let parts = builder
        .build_parts(SendOptions::text("explain").with_slide(&slide))
        .await;

    let blob = parts[0].as_inline().expect("slide image part");
    assert_eq!(blob.mime_type, "image/jpeg");
    assert_eq!(blob.data, "T1BUSU1JWkVE");

    Ok(())
}

#[tokio::test]
async fn test_no_settings_means_no_optimization() -> Result<()> {
    let builder = TurnBuilder::new(Arc::new(MarkingOptimizer), None, false);
    let slide = slide(2, true);

    let parts = builder.build_parts(SendOptions::default().with_slide(&slide)).await;

    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].as_inline().map(|b| b.data.as_str()), Some("/9j/AAAA"));

    Ok(())
}

#[tokio::test]
async fn test_canvas_content_follows_slide_image() -> Result<()> {
    let builder = TurnBuilder::new(Arc::new(RasterOptimizer), None, false);
    let mut slide = slide(3, true);
    slide.canvas_content = Some(vec![CanvasBlock {
        kind: CanvasBlockKind::Markdown,
        content: "S = k ln W".to_string(),
    }]);
    let selection = ChatAttachment::selection("data:image/png;base64,U0VM");
    let file = ChatAttachment::new(AttachmentKind::File, "plain text notes", "text/plain");

    let parts = builder
        .build_parts(
            SendOptions::text(vec!["ACTIVE SLIDE: 3".to_string(), "  ".to_string()])
                .with_slide(&slide)
                .with_attachments(&[selection, file]),
        )
        .await;

    assert_eq!(parts.len(), 4);
    assert!(parts[0].as_inline().is_some());
    let canvas = parts[1].as_text().unwrap();
    assert!(canvas.starts_with("Context: Canvas Content: "));
    assert!(canvas.contains("S = k ln W"));
    assert_eq!(parts[2].as_inline().map(|b| b.data.as_str()), Some("U0VM"));
    assert_eq!(parts[3].as_text(), Some("ACTIVE SLIDE: 3"));

    Ok(())
}

#[tokio::test]
async fn test_closed_transport_sends_nothing() -> Result<()> {
    let transport = FakeTransport::new();
    let builder = TurnBuilder::new(Arc::new(RasterOptimizer), None, false);

    let outcome = builder.send(&transport, SendOptions::text("hello")).await;

    assert_eq!(outcome, SendOutcome::NotOpen);
    assert!(transport.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_empty_turn_is_not_sent() -> Result<()> {
    let transport = FakeTransport::opened();
    let builder = TurnBuilder::new(Arc::new(RasterOptimizer), None, false);

    let outcome = builder.send(&transport, SendOptions::text("   ")).await;

    assert_eq!(outcome, SendOutcome::Empty);
    assert!(transport.sent().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_structured_failure_falls_back_to_realtime_input() -> Result<()> {
    let transport = FakeTransport::opened();
    transport.fail_client_content.store(true, Ordering::SeqCst);
    let builder = TurnBuilder::new(Arc::new(RasterOptimizer), None, false);
    let slide = slide(1, true);

    let outcome = builder
        .send(&transport, SendOptions::text("explain").with_slide(&slide))
        .await;

    assert_eq!(outcome, SendOutcome::SentViaFallback);
    let sent = transport.sent();
    assert_eq!(sent.len(), 3);
    assert!(matches!(&sent[0], Sent::Realtime(RealtimeInput::Media { media }) if media.mime_type == "image/jpeg"));
    assert_eq!(
        sent[1],
        Sent::Realtime(RealtimeInput::Text {
            text: "explain".to_string()
        })
    );
    assert_eq!(sent[2], Sent::Realtime(RealtimeInput::end_of_turn()));

    Ok(())
}

#[tokio::test]
async fn test_fallback_without_turn_complete_skips_end_of_turn() -> Result<()> {
    let transport = FakeTransport::opened();
    transport.fail_client_content.store(true, Ordering::SeqCst);
    let builder = TurnBuilder::new(Arc::new(RasterOptimizer), None, false);

    builder
        .send(
            &transport,
            SendOptions::text("partial thought").with_turn_complete(false),
        )
        .await;

    assert_eq!(transport.sent().len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_fallback_errors_are_swallowed() -> Result<()> {
    let transport = FakeTransport::opened();
    transport.fail_client_content.store(true, Ordering::SeqCst);
    transport.fail_realtime_input.store(true, Ordering::SeqCst);
    let builder = TurnBuilder::new(Arc::new(RasterOptimizer), None, false);
    let slide = slide(1, true);

    let outcome = builder
        .send(
            &transport,
            SendOptions::text(vec!["first".to_string(), "second".to_string()]).with_slide(&slide),
        )
        .await;

    assert_eq!(outcome, SendOutcome::SentViaFallback);
    assert!(transport.sent().is_empty());

    // Every part is still attempted, then the end-of-turn marker
    let rejected = transport.rejected();
    assert_eq!(rejected.len(), 4);
    assert!(matches!(&rejected[0], RealtimeInput::Media { .. }));
    assert_eq!(
        rejected[2],
        RealtimeInput::Text {
            text: "second".to_string()
        }
    );
    assert_eq!(rejected[3], RealtimeInput::end_of_turn());

    Ok(())
}
