//! Text metrics for the standard Helvetica faces and greedy line breaking
//! over styled spans.

use crate::types::Pt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FontFace {
    Regular,
    Bold,
    Oblique,
    BoldOblique,
}

impl FontFace {
    pub fn from_style(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => FontFace::Regular,
            (true, false) => FontFace::Bold,
            (false, true) => FontFace::Oblique,
            (true, true) => FontFace::BoldOblique,
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            FontFace::Regular => "Helvetica",
            FontFace::Bold => "Helvetica-Bold",
            FontFace::Oblique => "Helvetica-Oblique",
            FontFace::BoldOblique => "Helvetica-BoldOblique",
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, FontFace::Bold | FontFace::BoldOblique)
    }
}

// Advance widths (1/1000 em) for 0x20..=0x7E.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722, 722, 667,
    611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500,
    222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722, 722, 667,
    611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667,
    667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556,
    278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const MISSING_WIDTH: u16 = 556;

fn advance(face: FontFace, ch: char) -> u16 {
    let table = if face.is_bold() {
        &HELVETICA_BOLD_WIDTHS
    } else {
        &HELVETICA_WIDTHS
    };
    let code = ch as u32;
    if (0x20..=0x7E).contains(&code) {
        return table[(code - 0x20) as usize];
    }
    match ch {
        '\u{2019}' | '\u{2018}' => {
            if face.is_bold() {
                278
            } else {
                222
            }
        }
        '\u{2013}' => 556,
        '\u{2014}' => 1000,
        '\u{00A0}' => 278,
        _ => MISSING_WIDTH,
    }
}

pub fn text_width(face: FontFace, font_size: Pt, text: &str) -> Pt {
    let units: u32 = text.chars().map(|ch| advance(face, ch) as u32).sum();
    Pt::from_milli_i64(((units as i64) * font_size.to_milli_i64() + 500) / 1000)
}

pub fn line_height(font_size: Pt) -> Pt {
    font_size * 1.2
}

/// A run of text to be broken into lines. `key` is carried through to the
/// produced fragments so callers can recover the span's style.
#[derive(Debug, Clone, Copy)]
pub struct Run<'a> {
    pub key: usize,
    pub face: FontFace,
    pub font_size: Pt,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub key: usize,
    pub text: String,
    pub offset: Pt,
    pub width: Pt,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub fragments: Vec<Fragment>,
    pub width: Pt,
    pub font_size: Pt,
    pub height: Pt,
}

struct Piece<'a> {
    run: usize,
    text: &'a str,
    width: Pt,
    is_space: bool,
    hard_break: bool,
}

fn pieces<'a>(runs: &[Run<'a>]) -> Vec<Piece<'a>> {
    let mut out = Vec::new();
    for (idx, run) in runs.iter().enumerate() {
        let mut first_segment = true;
        for segment in run.text.split('\n') {
            if !first_segment {
                out.push(Piece {
                    run: idx,
                    text: "",
                    width: Pt::ZERO,
                    is_space: false,
                    hard_break: true,
                });
            }
            first_segment = false;
            let mut start = 0usize;
            let mut in_space: Option<bool> = None;
            for (pos, ch) in segment.char_indices() {
                let space = ch == ' ';
                match in_space {
                    Some(prev) if prev != space => {
                        let text = &segment[start..pos];
                        out.push(Piece {
                            run: idx,
                            text,
                            width: text_width(run.face, run.font_size, text),
                            is_space: prev,
                            hard_break: false,
                        });
                        start = pos;
                    }
                    _ => {}
                }
                in_space = Some(space);
            }
            if let Some(space) = in_space {
                let text = &segment[start..];
                out.push(Piece {
                    run: idx,
                    text,
                    width: text_width(run.face, run.font_size, text),
                    is_space: space,
                    hard_break: false,
                });
            }
        }
    }
    out
}

struct LineBuilder<'a> {
    fragments: Vec<Fragment>,
    width: Pt,
    font_size: Pt,
    pending_space: Option<(Run<'a>, &'a str, Pt)>,
}

impl<'a> LineBuilder<'a> {
    fn new() -> Self {
        Self {
            fragments: Vec::new(),
            width: Pt::ZERO,
            font_size: Pt::ZERO,
            pending_space: None,
        }
    }

    fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    // Width the line would have after committing any pending space.
    fn committed_width(&self) -> Pt {
        self.width + self.pending_space.map(|(_, _, w)| w).unwrap_or(Pt::ZERO)
    }

    fn push_space(&mut self, run: Run<'a>, text: &'a str, width: Pt) {
        if self.fragments.is_empty() {
            return;
        }
        if self.pending_space.is_none() {
            self.pending_space = Some((run, text, width));
        }
    }

    fn push_word(&mut self, run: Run<'a>, text: &str, width: Pt) {
        if let Some((space_run, space_text, space_width)) = self.pending_space.take() {
            self.append(space_run, space_text, space_width);
        }
        self.append(run, text, width);
    }

    fn append(&mut self, run: Run<'a>, text: &str, width: Pt) {
        self.font_size = self.font_size.max(run.font_size);
        if let Some(last) = self.fragments.last_mut() {
            if last.key == run.key {
                last.text.push_str(text);
                last.width += width;
                self.width += width;
                return;
            }
        }
        self.fragments.push(Fragment {
            key: run.key,
            text: text.to_string(),
            offset: self.width,
            width,
        });
        self.width += width;
    }

    fn finish(self, fallback_size: Pt) -> Line {
        let font_size = if self.font_size > Pt::ZERO {
            self.font_size
        } else {
            fallback_size
        };
        Line {
            fragments: self.fragments,
            width: self.width,
            font_size,
            height: line_height(font_size),
        }
    }
}

/// Greedy word wrap. Spaces at a wrap point are dropped; words wider than
/// the whole line are broken between characters.
pub fn break_lines(runs: &[Run<'_>], max_width: Pt) -> Vec<Line> {
    let fallback_size = runs
        .iter()
        .map(|run| run.font_size)
        .max()
        .unwrap_or(Pt::from_f32(12.0));
    let mut lines = Vec::new();
    let mut line = LineBuilder::new();
    for piece in pieces(runs) {
        let run = runs[piece.run];
        if piece.hard_break {
            line.font_size = line.font_size.max(run.font_size);
            lines.push(std::mem::replace(&mut line, LineBuilder::new()).finish(fallback_size));
            continue;
        }
        if piece.is_space {
            line.push_space(run, piece.text, piece.width);
            continue;
        }
        if line.committed_width() + piece.width <= max_width {
            line.push_word(run, piece.text, piece.width);
            continue;
        }
        if !line.is_empty() {
            lines.push(std::mem::replace(&mut line, LineBuilder::new()).finish(fallback_size));
        }
        if piece.width <= max_width {
            line.push_word(run, piece.text, piece.width);
            continue;
        }
        for ch in piece.text.chars() {
            let mut buf = [0u8; 4];
            let text = ch.encode_utf8(&mut buf);
            let width = text_width(run.face, run.font_size, text);
            if line.committed_width() + width > max_width && !line.is_empty() {
                lines.push(std::mem::replace(&mut line, LineBuilder::new()).finish(fallback_size));
            }
            line.push_word(run, text, width);
        }
    }
    if !line.is_empty() || lines.is_empty() {
        lines.push(line.finish(fallback_size));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str) -> Run<'_> {
        Run {
            key: 0,
            face: FontFace::Regular,
            font_size: Pt::from_f32(10.0),
            text,
        }
    }

    #[test]
    fn helvetica_widths_match_afm() {
        let size = Pt::from_f32(10.0);
        assert_eq!(text_width(FontFace::Regular, size, "A").to_milli_i64(), 6670);
        assert_eq!(text_width(FontFace::Bold, size, "A").to_milli_i64(), 7220);
        assert_eq!(text_width(FontFace::Regular, size, "il").to_milli_i64(), 4440);
        assert_eq!(
            text_width(FontFace::Oblique, size, "il"),
            text_width(FontFace::Regular, size, "il")
        );
    }

    #[test]
    fn short_text_stays_on_one_line() {
        let lines = break_lines(&[run("VALUATION PRICE")], Pt::from_f32(500.0));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].fragments[0].text, "VALUATION PRICE");
        assert_eq!(lines[0].height.to_milli_i64(), 12000);
    }

    #[test]
    fn long_text_wraps_at_spaces_and_drops_trailing_space() {
        let lines = break_lines(&[run("alpha beta gamma delta")], Pt::from_f32(60.0));
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.width <= Pt::from_f32(60.0));
            let text: String = line.fragments.iter().map(|f| f.text.as_str()).collect();
            assert!(!text.ends_with(' '));
            assert!(!text.starts_with(' '));
        }
    }

    #[test]
    fn newline_forces_a_break() {
        let lines = break_lines(&[run("Mahesh\nLicense No : 74183\nPronto")], Pt::from_f32(500.0));
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1].fragments[0].text, "License No : 74183");
    }

    #[test]
    fn oversized_word_breaks_between_characters() {
        let lines = break_lines(&[run("ME4KC1234J57653ME4KC1234J57653")], Pt::from_f32(40.0));
        assert!(lines.len() > 1);
        let joined: String = lines
            .iter()
            .flat_map(|l| l.fragments.iter().map(|f| f.text.clone()))
            .collect();
        assert_eq!(joined, "ME4KC1234J57653ME4KC1234J57653");
    }

    #[test]
    fn mixed_runs_keep_keys_and_tallest_size() {
        let runs = [
            Run {
                key: 0,
                face: FontFace::Bold,
                font_size: Pt::from_f32(10.0),
                text: "REMARKS : ",
            },
            Run {
                key: 1,
                face: FontFace::Regular,
                font_size: Pt::from_f32(14.0),
                text: "No remarks",
            },
        ];
        let lines = break_lines(&runs, Pt::from_f32(500.0));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].fragments.len(), 2);
        assert_eq!(lines[0].fragments[1].key, 1);
        assert_eq!(lines[0].font_size, Pt::from_f32(14.0));
    }

    #[test]
    fn empty_text_yields_single_empty_line() {
        let lines = break_lines(&[run("")], Pt::from_f32(100.0));
        assert_eq!(lines.len(), 1);
        assert!(lines[0].fragments.is_empty());
        assert_eq!(lines[0].height.to_milli_i64(), 12000);
    }
}
