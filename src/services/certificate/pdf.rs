//! Single-page PDF writer for certificates.
//!
//! Uses the standard Type1 Helvetica family so no fonts are embedded. Text is
//! encoded as WinAnsi; characters outside it become `?`.

const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 51.0;
const LEADING: f32 = 16.0;
const BODY_WRAP: usize = 92;

/// Text placed on the certificate page.
#[derive(Debug, Clone)]
pub struct CertificatePage<'a> {
    pub title: &'a str,
    pub subtitle: &'a str,
    pub body: &'a str,
    pub signature: &'a str,
}

impl CertificatePage<'_> {
    /// Lay out the page: dark background, title, subtitle, rule, wrapped
    /// body (cut at the bottom margin) and a signature line.
    pub fn render(&self) -> Vec<u8> {
        let mut content = ContentStream::default();
        let left = MARGIN;
        let right = PAGE_WIDTH - MARGIN;
        let bottom = MARGIN;
        let mut y = PAGE_HEIGHT - MARGIN;

        content.op("0.08 0.09 0.11 rg");
        content.op(&format!("0 0 {PAGE_WIDTH} {PAGE_HEIGHT} re f"));
        content.op("1 1 1 rg");
        content.op("1 1 1 RG");

        content.text(Font::Bold, 24.0, left, y, self.title);
        y -= 30.0;
        content.text(Font::Regular, 11.0, left, y, self.subtitle);
        y -= 16.0;
        content.line(0.6, left, right, y);
        y -= 16.0;

        for line in wrap_lines(self.body, BODY_WRAP) {
            if y <= bottom + LEADING {
                break;
            }
            if !line.is_empty() {
                content.text(Font::Regular, 12.0, left, y, &line);
            }
            y -= LEADING;
        }

        y -= 10.0;
        content.line(0.4, left, left + 156.0, y);
        y -= 12.0;
        content.text(Font::Oblique, 11.0, left, y, self.signature);

        assemble(&content.bytes)
    }
}

/// Greedy word wrap. Paragraphs are split on newlines; blank paragraphs are
/// kept as empty lines and words longer than `width` are split.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                let rest = word.split_off(width);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let current_len = current.chars().count();
            if current_len > 0 && current_len + 1 + word.len() > width {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.extend(word);
        }
        if !current.is_empty() {
            lines.push(current);
        }
    }

    lines
}

pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF-")
}

#[derive(Debug, Clone, Copy)]
enum Font {
    Regular,
    Bold,
    Oblique,
}

impl Font {
    fn resource(&self) -> &'static str {
        match self {
            Self::Regular => "F1",
            Self::Bold => "F2",
            Self::Oblique => "F3",
        }
    }
}

#[derive(Debug, Default)]
struct ContentStream {
    bytes: Vec<u8>,
}

impl ContentStream {
    fn op(&mut self, op: &str) {
        self.bytes.extend_from_slice(op.as_bytes());
        self.bytes.push(b'\n');
    }

    fn text(&mut self, font: Font, size: f32, x: f32, y: f32, text: &str) {
        self.op(&format!("BT /{} {} Tf {} {} Td", font.resource(), size, x, y));
        self.bytes.push(b'(');
        self.bytes.extend(encode_text(text));
        self.bytes.extend_from_slice(b") Tj ET\n");
    }

    fn line(&mut self, width: f32, x1: f32, x2: f32, y: f32) {
        self.op(&format!("{width} w {x1} {y} m {x2} {y} l S"));
    }
}

/// WinAnsi-encode a string and escape PDF string delimiters.
fn encode_text(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let byte = match ch {
            '\u{2022}' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '\u{2026}' => 0x85,
            '\n' | '\r' | '\t' => b' ',
            c if (c as u32) < 0x20 => continue,
            c if (c as u32) <= 0xFF => c as u32 as u8,
            _ => b'?',
        };
        if matches!(byte, b'\\' | b'(' | b')') {
            out.push(b'\\');
        }
        out.push(byte);
    }
    out
}

/// Wrap a content stream into a complete one-page document with an xref table.
fn assemble(content: &[u8]) -> Vec<u8> {
    let font = |base: &str| {
        format!("<< /Type /Font /Subtype /Type1 /BaseFont /{base} /Encoding /WinAnsiEncoding >>")
            .into_bytes()
    };
    let mut stream = format!("<< /Length {} >>\nstream\n", content.len()).into_bytes();
    stream.extend_from_slice(content);
    stream.extend_from_slice(b"\nendstream");

    let objects: Vec<Vec<u8>> = vec![
        b"<< /Type /Catalog /Pages 2 0 R >>".to_vec(),
        b"<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_vec(),
        format!(
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {PAGE_WIDTH} {PAGE_HEIGHT}] \
             /Resources << /Font << /F1 4 0 R /F2 5 0 R /F3 6 0 R >> >> /Contents 7 0 R >>"
        )
        .into_bytes(),
        font("Helvetica"),
        font("Helvetica-Bold"),
        font("Helvetica-Oblique"),
        stream,
    ];

    let mut out = b"%PDF-1.4\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", i + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_at = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1).as_bytes());
    for offset in offsets {
        out.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    out.extend_from_slice(
        format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_at
        )
        .as_bytes(),
    );
    out
}
