//! Turning per-file plan generation results into a lecture session

use std::collections::{BTreeMap, BTreeSet};

use anyhow::{bail, Result};
use serde::Deserialize;
use tracing::info;

use crate::session::{generate_session_id, LectureConfig, LectureSession, ParsedSlide, Slide};
use crate::usage::{CallType, TokenUsage, UsageReport, PLAN_GENERATION_MODEL};

pub const MISSING_SUMMARY: &str = "No summary was generated for this slide.";
pub const PLAN_TAG: &str = "lecture_plan";

const COMBINED_INFO_MAX_CHARS: usize = 1000;

/// Parsed plan text for one source file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LecturePlan {
    pub general_info: String,
    /// Keyed by the slide's page number within its file
    pub summaries: BTreeMap<u32, String>,
    /// Slides marked with an asterisk (`Slide N *:`)
    pub important: BTreeSet<u32>,
}

enum Header<'a> {
    GeneralInfo(&'a str),
    Slide {
        number: u32,
        important: bool,
        rest: &'a str,
    },
}

#[derive(Clone, Copy)]
enum Section {
    None,
    GeneralInfo,
    Slide(u32),
}

/// Parse `general info:` / `Slide N:` / `Slide N *:` sections.
///
/// Body text may follow the colon on the header line or sit on the lines
/// below; multiple lines are joined with a space.
pub fn parse_lecture_plan(text: &str) -> LecturePlan {
    let mut plan = LecturePlan::default();
    let mut section = Section::None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let body = match parse_header(line) {
            Some(Header::GeneralInfo(rest)) => {
                section = Section::GeneralInfo;
                rest
            }
            Some(Header::Slide {
                number,
                important,
                rest,
            }) => {
                section = Section::Slide(number);
                if important {
                    plan.important.insert(number);
                }
                rest
            }
            None => line,
        };

        let target = match section {
            Section::None => continue,
            Section::GeneralInfo => &mut plan.general_info,
            Section::Slide(number) => plan.summaries.entry(number).or_default(),
        };
        append_line(target, body);
    }

    plan
}

fn append_line(target: &mut String, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line);
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &s[prefix.len()..])
}

fn parse_header(line: &str) -> Option<Header<'_>> {
    // Tolerate list markers and bold markup around labels
    let line = line.trim_start_matches(|c: char| c == '-' || c == '*' || c.is_whitespace());

    if let Some(rest) = strip_prefix_ignore_case(line, "general info") {
        let rest = rest.trim_start_matches('*').trim_start();
        return rest
            .strip_prefix(':')
            .map(|r| Header::GeneralInfo(r.trim_start_matches('*')));
    }

    let rest = strip_prefix_ignore_case(line, "slide")?.trim_start();
    let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let number = rest[..digits].parse().ok()?;

    let rest = rest[digits..].trim_start();
    let (important, rest) = match rest.strip_prefix('*') {
        Some(r) => (true, r.trim_start()),
        None => (false, rest),
    };
    let rest = rest.strip_prefix(':')?;

    Some(Header::Slide {
        number,
        important,
        rest: rest.trim_start_matches('*'),
    })
}

/// Everything the plan generation step produced for one PDF
#[derive(Debug, Clone)]
pub struct FilePlan {
    pub file_name: String,
    pub slides: Vec<ParsedSlide>,
    pub plan: LecturePlan,
    /// Token usage of the plan generation call
    pub usage: TokenUsage,
}

/// Merge per-file plans into one session. Slides are renumbered from 1
/// across files in the given order.
pub fn assemble_session(files: Vec<FilePlan>, config: LectureConfig) -> Result<LectureSession> {
    if files.is_empty() {
        bail!("Cannot assemble a lecture from zero files");
    }

    let file_names: Vec<String> = files.iter().map(|f| f.file_name.clone()).collect();
    let general_info = combined_general_info(&files, &file_names);

    let mut slides = Vec::new();
    let mut usage_reports = Vec::with_capacity(files.len());
    let mut next_page = 1u32;

    for file in files {
        for parsed in file.slides {
            let local_page = parsed.page_number;
            let mut slide = Slide::from_parsed(parsed);
            slide.page_number = next_page;
            slide.summary = file
                .plan
                .summaries
                .get(&local_page)
                .cloned()
                .unwrap_or_else(|| MISSING_SUMMARY.to_string());
            slide.is_important = Some(file.plan.important.contains(&local_page));
            slide.origin_file = Some(file.file_name.clone());
            slides.push(slide);
            next_page += 1;
        }

        usage_reports.push(
            UsageReport::new(PLAN_GENERATION_MODEL, file.usage, CallType::PlanGen)
                .with_tag(PLAN_TAG),
        );
    }

    let created_at = chrono::Utc::now().timestamp_millis();
    let session = LectureSession {
        id: generate_session_id(&file_names, created_at),
        file_name: file_names.join(" & "),
        file_names,
        created_at,
        slides,
        general_info,
        transcript: Vec::new(),
        current_slide_index: 0,
        lecture_config: config,
        slide_groups: None,
        usage_reports,
    };

    info!(
        "Assembled lecture {} ({} slides from {} files)",
        session.id,
        session.slides.len(),
        session.file_names.len()
    );

    Ok(session)
}

/// Like [`assemble_session`], but over fallible per-file results. The first
/// failed file aborts the whole batch.
pub fn assemble_from_results<I>(results: I, config: LectureConfig) -> Result<LectureSession>
where
    I: IntoIterator<Item = Result<FilePlan>>,
{
    let files = results.into_iter().collect::<Result<Vec<_>>>()?;
    assemble_session(files, config)
}

fn combined_general_info(files: &[FilePlan], file_names: &[String]) -> String {
    if files.len() == 1 {
        return files[0].plan.general_info.clone();
    }

    let infos: Vec<&str> = files.iter().map(|f| f.plan.general_info.as_str()).collect();
    format!(
        "Combined lecture from {} files: {}. {}",
        files.len(),
        file_names.join(", "),
        infos.join(" ")
    )
    .chars()
    .take(COMBINED_INFO_MAX_CHARS)
    .collect()
}

/// One file of an import manifest: slides already extracted from the PDF
/// plus the raw plan text the model produced for them.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestFile {
    pub file_name: String,
    pub slides: Vec<ParsedSlide>,
    pub plan_text: String,
    #[serde(default)]
    pub usage: TokenUsage,
}

/// JSON document accepted by `lecture-live import`
#[derive(Debug, Clone, Deserialize)]
pub struct PlanManifest {
    #[serde(default)]
    pub config: LectureConfig,
    pub files: Vec<ManifestFile>,
}

impl PlanManifest {
    pub fn into_session(self) -> Result<LectureSession> {
        let files = self
            .files
            .into_iter()
            .map(|file| FilePlan {
                plan: parse_lecture_plan(&file.plan_text),
                file_name: file.file_name,
                slides: file.slides,
                usage: file.usage,
            })
            .collect();
        assemble_session(files, self.config)
    }
}
