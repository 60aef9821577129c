//! Extracts multiple-choice questions from HTML pasted out of a word
//! processor or a web page.
//!
//! The HTML is first flattened to text lines (block tags become line breaks,
//! entities are decoded), then each line is classified as a section heading,
//! question start, option, answer, explanation, or continuation of whatever
//! came before. Parsing never fails: incomplete questions are dropped and
//! reported through [`ParseResult::warnings`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::entity::question::AnswerOption;

static SCRIPT_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</(?:script|style)\s*>").expect("valid regex")
});
static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static LINE_BREAK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</?(?:p|div|li|ul|ol|tr|table|tbody|thead|h[1-6]|section|article|blockquote)\b[^>]*>")
        .expect("valid regex")
});
static CELL_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)</t[dh]\s*>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(?:[xX]([0-9a-fA-F]+)|(\d+));").expect("valid regex"));
static SPACES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\u{a0}\u{3000}]+").expect("valid regex"));

static SECTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?:[一二三四五六七八九十]+\s*[、.．]|第\s*[一二三四五六七八九十\d]+\s*(?:部分|章|节)|(?i:part|section)\s+[\dIVXivx]+\b)",
    )
    .expect("valid regex")
});
static QUESTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:第\s*(\d+)\s*题\s*[:：.．、]?|(\d+)\s*[.．、)）]|[(（]\s*(\d+)\s*[)）])\s*(.*)$")
        .expect("valid regex")
});
static OPTION_MARK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(（]?\s*([A-D])\s*[.．、)）:：]").expect("valid regex"));
static ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:【\s*(?:正确)?答案\s*】|(?:正确|参考)?答案\s*[:：]|(?:correct\s+)?answer\s*[:：])\s*([A-D])\s*(.*)$",
    )
    .expect("valid regex")
});
static EXPLANATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:【\s*解析\s*】|(?:答案)?解析\s*[:：]|explanation\s*[:：]|analysis\s*[:：])\s*(.*)$")
        .expect("valid regex")
});
static INLINE_ANSWER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[(（]\s*([A-D])\s*[)）]").expect("valid regex"));

/// One complete question recovered from the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ParsedQuestion {
    /// Sequential position in the parsed output, starting at 1.
    pub question_number: i32,
    /// Number as written in the source, when there was one.
    pub source_number: Option<i32>,
    pub section: Option<String>,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    pub correct_answer: AnswerOption,
    pub explanation: Option<String>,
}

/// A non-fatal problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct ParseWarning {
    /// Source question number the warning refers to, if any.
    pub question: Option<i32>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ParseResult {
    /// `true` when at least one question was recovered.
    pub success: bool,
    pub questions: Vec<ParsedQuestion>,
    pub warnings: Vec<ParseWarning>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Text,
    Option(usize),
    Explanation,
    /// Text after a bare answer line belongs to nothing.
    Answer,
}

#[derive(Debug, Default)]
struct Draft {
    source_number: Option<i32>,
    section: Option<String>,
    text: String,
    options: [Option<String>; 4],
    answer: Option<AnswerOption>,
    explanation: Option<String>,
    last: Option<Field>,
}

impl Draft {
    fn append(&mut self, line: &str) {
        let target = match self.last {
            Some(Field::Text) | None => &mut self.text,
            Some(Field::Option(i)) => self.options[i].get_or_insert_with(String::new),
            Some(Field::Explanation) => self.explanation.get_or_insert_with(String::new),
            Some(Field::Answer) => return,
        };
        push_joined(target, line);
    }
}

fn push_joined(target: &mut String, line: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(line);
}

/// Parse pasted HTML into questions. Never panics on malformed input.
pub fn parse_questions(html: &str) -> ParseResult {
    let lines = html_to_lines(html);
    let mut warnings = Vec::new();

    if lines.is_empty() {
        warnings.push(ParseWarning {
            question: None,
            message: "Input contains no text".into(),
        });
        return ParseResult {
            success: false,
            questions: Vec::new(),
            warnings,
        };
    }

    let mut section: Option<String> = None;
    let mut current: Option<Draft> = None;
    let mut drafts: Vec<Draft> = Vec::new();

    for line in &lines {
        if let Some(caps) = ANSWER_RE.captures(line) {
            let Some(draft) = current.as_mut() else {
                warnings.push(ParseWarning {
                    question: None,
                    message: format!("Answer line outside of a question: {line}"),
                });
                continue;
            };
            draft.answer = caps[1].to_ascii_uppercase().parse().ok();
            let rest = caps.get(2).map_or("", |m| m.as_str()).trim();
            if let Some(exp) = EXPLANATION_RE.captures(rest) {
                let text = exp[1].trim();
                if !text.is_empty() {
                    draft.explanation = Some(text.to_string());
                }
                draft.last = Some(Field::Explanation);
            } else {
                draft.last = Some(Field::Answer);
            }
            continue;
        }

        if let Some(caps) = EXPLANATION_RE.captures(line) {
            if let Some(draft) = current.as_mut() {
                let text = caps[1].trim();
                if !text.is_empty() {
                    draft.explanation = Some(text.to_string());
                }
                draft.last = Some(Field::Explanation);
            }
            continue;
        }

        if SECTION_RE.is_match(line) {
            if let Some(draft) = current.take() {
                drafts.push(draft);
            }
            section = Some(line.to_string());
            continue;
        }

        if let Some((number, rest)) = question_start(line) {
            if let Some(draft) = current.take() {
                drafts.push(draft);
            }
            let mut draft = Draft {
                source_number: Some(number),
                section: section.clone(),
                last: Some(Field::Text),
                ..Default::default()
            };
            if !rest.is_empty() {
                draft.text.push_str(rest);
            }
            current = Some(draft);
            continue;
        }

        if let Some(options) = split_options(line) {
            let Some(draft) = current.as_mut() else {
                warnings.push(ParseWarning {
                    question: None,
                    message: format!("Option line outside of a question: {line}"),
                });
                continue;
            };
            for (index, text) in options {
                if draft.options[index].is_some() {
                    warnings.push(ParseWarning {
                        question: draft.source_number,
                        message: format!("Option {} appears more than once", letter(index)),
                    });
                }
                draft.options[index] = Some(text);
                draft.last = Some(Field::Option(index));
            }
            continue;
        }

        match current.as_mut() {
            Some(draft) => draft.append(line),
            None => warnings.push(ParseWarning {
                question: None,
                message: format!("Ignored text before the first question: {line}"),
            }),
        }
    }

    if let Some(draft) = current.take() {
        drafts.push(draft);
    }

    let mut questions = Vec::new();
    let mut seen_numbers = HashSet::new();

    for draft in drafts {
        if let Some(n) = draft.source_number
            && !seen_numbers.insert(n)
        {
            warnings.push(ParseWarning {
                question: Some(n),
                message: format!("Duplicate question number {n}; renumbered"),
            });
        }

        match finish(draft, questions.len() as i32 + 1) {
            Ok(q) => questions.push(q),
            Err(w) => warnings.push(w),
        }
    }

    ParseResult {
        success: !questions.is_empty(),
        questions,
        warnings,
    }
}

fn finish(mut draft: Draft, number: i32) -> Result<ParsedQuestion, ParseWarning> {
    let mut text = draft.text.trim().to_string();

    if draft.answer.is_none()
        && let Some(caps) = INLINE_ANSWER_RE.captures(&text)
    {
        draft.answer = caps[1].parse().ok();
        text = INLINE_ANSWER_RE.replace(&text, "（ ）").into_owned();
    }

    let mut missing = Vec::new();
    if text.is_empty() {
        missing.push("question text".to_string());
    }
    for (i, opt) in draft.options.iter().enumerate() {
        if opt.as_deref().is_none_or(|o| o.trim().is_empty()) {
            missing.push(format!("option {}", letter(i)));
        }
    }
    if draft.answer.is_none() {
        missing.push("answer".to_string());
    }

    if !missing.is_empty() {
        return Err(ParseWarning {
            question: draft.source_number,
            message: format!(
                "Question {} skipped: missing {}",
                draft
                    .source_number
                    .map_or_else(|| "?".to_string(), |n| n.to_string()),
                missing.join(", ")
            ),
        });
    }

    let [a, b, c, d] = draft.options.map(|o| o.unwrap_or_default().trim().to_string());
    Ok(ParsedQuestion {
        question_number: number,
        source_number: draft.source_number,
        section: draft.section,
        question_text: text,
        option_a: a,
        option_b: b,
        option_c: c,
        option_d: d,
        correct_answer: draft.answer.unwrap_or(AnswerOption::A),
        explanation: draft
            .explanation
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()),
    })
}

fn letter(index: usize) -> char {
    (b'A' + index as u8) as char
}

/// Recognise `12.`, `12、`, `(12)`, `第12题` style starts.
fn question_start(line: &str) -> Option<(i32, &str)> {
    let caps = QUESTION_RE.captures(line)?;
    let number = caps
        .get(1)
        .or_else(|| caps.get(2))
        .or_else(|| caps.get(3))?
        .as_str()
        .parse()
        .ok()?;
    let rest = caps.get(4).map_or("", |m| m.as_str()).trim();

    // "3.5 million ..." is a sentence, not question 3.
    let separator_is_dot = caps.get(2).is_some()
        && line[caps.get(2)?.end()..].trim_start().starts_with('.');
    if separator_is_dot && rest.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }

    Some((number, rest))
}

/// Split a line starting with an option marker into `(index, text)` pairs.
/// Several options may share a line, e.g. `A.red B.green C.blue D.black`.
fn split_options(line: &str) -> Option<Vec<(usize, String)>> {
    let first = OPTION_MARK_RE.find(line)?;
    if first.start() != 0 {
        return None;
    }

    let mut marks: Vec<(usize, usize, usize)> = Vec::new();
    let mut prev_index: Option<usize> = None;
    for caps in OPTION_MARK_RE.captures_iter(line) {
        let (Some(m), Some(l)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let index = (l.as_str().as_bytes()[0] - b'A') as usize;
        let at_boundary = m.start() == 0
            || line[..m.start()]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);
        let ascending = prev_index.is_none_or(|p| index > p);
        if at_boundary && ascending {
            marks.push((index, m.start(), m.end()));
            prev_index = Some(index);
        }
    }

    let options = marks
        .iter()
        .enumerate()
        .map(|(i, &(index, _, text_start))| {
            let text_end = marks.get(i + 1).map_or(line.len(), |next| next.1);
            (index, line[text_start..text_end].trim().to_string())
        })
        .collect();
    Some(options)
}

/// Flatten HTML into trimmed, non-empty text lines.
pub fn html_to_lines(html: &str) -> Vec<String> {
    let text = SCRIPT_STYLE_RE.replace_all(html, "");
    let text = COMMENT_RE.replace_all(&text, "");
    let text = LINE_BREAK_RE.replace_all(&text, "\n");
    let text = CELL_END_RE.replace_all(&text, " ");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);

    text.lines()
        .map(|l| SPACES_RE.replace_all(l, " ").trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

fn decode_entities(s: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(s, |caps: &regex::Captures| {
        let code = match (caps.get(1), caps.get(2)) {
            (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
            (_, Some(dec)) => dec.as_str().parse().ok(),
            _ => None,
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });

    numeric
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&ldquo;", "“")
        .replace("&rdquo;", "”")
        .replace("&hellip;", "…")
        .replace("&mdash;", "—")
        .replace("&amp;", "&")
}
