// Shared fixtures for integration tests
#![allow(dead_code)]

use anyhow::{bail, Result};
use lecture_live::live::{
    ClientContent, LiveTransport, RealtimeInput, ServerMessage, SessionSetup, ToolResponse,
};
use lecture_live::session::{LectureConfig, LectureSession, ParsedSlide, Slide};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything the fake transport was asked to send
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Content(ClientContent),
    Realtime(RealtimeInput),
    Tool(ToolResponse),
}

/// Scripted transport. Tests push server messages through it and inspect
/// what the session sent.
#[derive(Default)]
pub struct FakeTransport {
    open: AtomicBool,
    pub fail_connect: AtomicBool,
    pub fail_client_content: AtomicBool,
    pub fail_realtime_input: AtomicBool,
    rejected: Mutex<Vec<RealtimeInput>>,
    setups: Mutex<Vec<SessionSetup>>,
    sent: Mutex<Vec<Sent>>,
    server: Mutex<Option<mpsc::Sender<ServerMessage>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that is already open without a connect call
    pub fn opened() -> Self {
        let transport = Self::default();
        transport.open.store(true, Ordering::SeqCst);
        transport
    }

    pub async fn push(&self, message: ServerMessage) {
        let server = self.server.lock().unwrap().clone();
        server
            .expect("transport not connected")
            .send(message)
            .await
            .expect("session stopped reading");
    }

    /// Simulate the remote end dropping the stream
    pub fn drop_stream(&self) {
        self.open.store(false, Ordering::SeqCst);
        self.server.lock().unwrap().take();
    }

    pub fn setups(&self) -> Vec<SessionSetup> {
        self.setups.lock().unwrap().clone()
    }

    /// Realtime inputs that were attempted while `fail_realtime_input` was set
    pub fn rejected(&self) -> Vec<RealtimeInput> {
        self.rejected.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    pub fn contents(&self) -> Vec<ClientContent> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Content(c) => Some(c),
                _ => None,
            })
            .collect()
    }

    pub fn tool_responses(&self) -> Vec<ToolResponse> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Tool(t) => Some(t),
                _ => None,
            })
            .collect()
    }

    /// Texts of every structured turn, in send order
    pub fn turn_texts(&self) -> Vec<Vec<String>> {
        self.contents()
            .iter()
            .map(|c| {
                c.turns[0]
                    .parts
                    .iter()
                    .filter_map(|p| p.as_text().map(str::to_string))
                    .collect()
            })
            .collect()
    }

    fn record(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }
}

#[async_trait::async_trait]
impl LiveTransport for FakeTransport {
    async fn connect(&self, setup: &SessionSetup) -> Result<mpsc::Receiver<ServerMessage>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            bail!("connection refused");
        }

        self.setups.lock().unwrap().push(setup.clone());
        let (tx, rx) = mpsc::channel(64);
        *self.server.lock().unwrap() = Some(tx);
        self.open.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn send_client_content(&self, content: ClientContent) -> Result<()> {
        if self.fail_client_content.load(Ordering::SeqCst) {
            bail!("structured turns unsupported");
        }
        self.record(Sent::Content(content));
        Ok(())
    }

    async fn send_realtime_input(&self, input: RealtimeInput) -> Result<()> {
        if self.fail_realtime_input.load(Ordering::SeqCst) {
            self.rejected.lock().unwrap().push(input);
            bail!("realtime input rejected");
        }
        self.record(Sent::Realtime(input));
        Ok(())
    }

    async fn send_tool_response(&self, response: ToolResponse) -> Result<()> {
        self.record(Sent::Tool(response));
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

pub fn slide(page_number: u32, has_images: bool) -> Slide {
    let mut slide = Slide::from_parsed(ParsedSlide {
        page_number,
        image_data_url: "data:image/jpeg;base64,/9j/AAAA".to_string(),
        text_content: format!("Slide {} text", page_number),
        has_images,
    });
    slide.summary = format!("Summary of slide {}", page_number);
    slide
}

pub fn lecture(id: &str, slides: u32) -> LectureSession {
    LectureSession {
        id: id.to_string(),
        file_name: "thermo.pdf".to_string(),
        file_names: vec!["thermo.pdf".to_string()],
        created_at: 1_700_000_000_000,
        slides: (1..=slides).map(|n| slide(n, false)).collect(),
        general_info: "Intro to thermodynamics".to_string(),
        transcript: Vec::new(),
        current_slide_index: 0,
        lecture_config: LectureConfig::default(),
        slide_groups: None,
        usage_reports: Vec::new(),
    }
}

/// Poll until `check` holds or the deadline passes
pub async fn eventually<F>(mut check: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
