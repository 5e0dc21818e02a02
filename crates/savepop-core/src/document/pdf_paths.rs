//! Ruling lines recovered from a PDF's drawn paths
//!
//! Each page's content stream is walked for path construction (`m`, `l`,
//! `re`, `h`) and painting operators. Painted axis-aligned segments become
//! rulings; a filled or stroked rectangle thinner than `RULE_THICKNESS`
//! becomes a single ruling along its long side, wider ones contribute their
//! four edges. Curves only move the current point. The CTM (`cm`, `q`, `Q`)
//! is applied, then y is flipped so `top` grows downward like the word boxes
//! `pdftotext -bbox` reports.

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::Object;
use tracing::debug;

use super::Ruling;
use crate::error::{Error, Result};

/// Rectangles thinner than this are drawn rules, not boxes
const RULE_THICKNESS: f64 = 2.0;

/// Segments within this many points of axis-aligned count as rulings
const ALIGN_TOLERANCE: f64 = 0.5;

/// Affine transform `[a b c d e f]` as in the PDF `cm` operator
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix([f64; 6]);

impl Matrix {
    const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// `self` applied first, then `outer`
    fn then(&self, outer: &Matrix) -> Matrix {
        let [a, b, c, d, e, f] = self.0;
        let [oa, ob, oc, od, oe, of] = outer.0;
        Matrix([
            a * oa + b * oc,
            a * ob + b * od,
            c * oa + d * oc,
            c * ob + d * od,
            e * oa + f * oc + oe,
            e * ob + f * od + of,
        ])
    }
}

type Point = (f64, f64);

enum Shape {
    Segment(Point, Point),
    /// Corners in device space, in drawing order
    Rect([Point; 4]),
}

/// Path state for one page's content stream
struct PathWalker {
    ctm: Matrix,
    saved: Vec<Matrix>,
    current: Option<Point>,
    start: Option<Point>,
    pending: Vec<Shape>,
    painted: Vec<Shape>,
}

impl PathWalker {
    fn new() -> Self {
        Self {
            ctm: Matrix::IDENTITY,
            saved: Vec::new(),
            current: None,
            start: None,
            pending: Vec::new(),
            painted: Vec::new(),
        }
    }

    fn step(&mut self, op: &Operation) {
        let n = numbers(&op.operands);
        match (op.operator.as_str(), n.as_slice()) {
            ("q", _) => self.saved.push(self.ctm),
            ("Q", _) => {
                if let Some(ctm) = self.saved.pop() {
                    self.ctm = ctm;
                }
            }
            ("cm", &[a, b, c, d, e, f]) => {
                self.ctm = Matrix([a, b, c, d, e, f]).then(&self.ctm);
            }
            ("m", &[x, y]) => {
                let p = self.ctm.apply(x, y);
                self.current = Some(p);
                self.start = Some(p);
            }
            ("l", &[x, y]) => {
                let p = self.ctm.apply(x, y);
                if let Some(from) = self.current {
                    self.pending.push(Shape::Segment(from, p));
                }
                self.current = Some(p);
            }
            ("c" | "v" | "y", &[.., x, y]) => {
                self.current = Some(self.ctm.apply(x, y));
            }
            ("h", _) => self.close(),
            ("re", &[x, y, w, h]) => {
                let corners = [
                    self.ctm.apply(x, y),
                    self.ctm.apply(x + w, y),
                    self.ctm.apply(x + w, y + h),
                    self.ctm.apply(x, y + h),
                ];
                self.pending.push(Shape::Rect(corners));
                self.current = Some(corners[0]);
                self.start = Some(corners[0]);
            }
            ("s" | "b" | "b*", _) => {
                self.close();
                self.paint();
            }
            ("S" | "f" | "F" | "f*" | "B" | "B*", _) => self.paint(),
            ("n", _) => self.discard(),
            _ => {}
        }
    }

    fn close(&mut self) {
        if let (Some(from), Some(to)) = (self.current, self.start) {
            if from != to {
                self.pending.push(Shape::Segment(from, to));
            }
            self.current = Some(to);
        }
    }

    fn paint(&mut self) {
        self.painted.append(&mut self.pending);
        self.current = None;
        self.start = None;
    }

    fn discard(&mut self) {
        self.pending.clear();
        self.current = None;
        self.start = None;
    }
}

fn numbers(operands: &[Object]) -> Vec<f64> {
    operands
        .iter()
        .filter_map(|o| match o {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            _ => None,
        })
        .collect()
}

/// Axis-aligned ruling for a device-space segment, flipped to top-down y
fn segment_ruling(from: Point, to: Point, page_height: f64) -> Option<Ruling> {
    let (x0, x1) = (from.0.min(to.0), from.0.max(to.0));
    let (y0, y1) = (from.1.min(to.1), from.1.max(to.1));
    if y1 - y0 <= ALIGN_TOLERANCE && x1 - x0 > ALIGN_TOLERANCE {
        Some(Ruling::horizontal(x0, x1, page_height - (y0 + y1) / 2.0))
    } else if x1 - x0 <= ALIGN_TOLERANCE && y1 - y0 > ALIGN_TOLERANCE {
        Some(Ruling::vertical(
            (x0 + x1) / 2.0,
            page_height - y1,
            page_height - y0,
        ))
    } else {
        None
    }
}

fn rect_rulings(corners: &[Point; 4], page_height: f64) -> Vec<Ruling> {
    let xs = corners.iter().map(|p| p.0);
    let ys = corners.iter().map(|p| p.1);
    let x0 = xs.clone().fold(f64::INFINITY, f64::min);
    let x1 = xs.fold(f64::NEG_INFINITY, f64::max);
    let y0 = ys.clone().fold(f64::INFINITY, f64::min);
    let y1 = ys.fold(f64::NEG_INFINITY, f64::max);
    let (width, height) = (x1 - x0, y1 - y0);

    if height <= RULE_THICKNESS && width > RULE_THICKNESS {
        let mid = (y0 + y1) / 2.0;
        return vec![Ruling::horizontal(x0, x1, page_height - mid)];
    }
    if width <= RULE_THICKNESS && height > RULE_THICKNESS {
        let mid = (x0 + x1) / 2.0;
        return vec![Ruling::vertical(mid, page_height - y1, page_height - y0)];
    }

    (0..4)
        .filter_map(|i| segment_ruling(corners[i], corners[(i + 1) % 4], page_height))
        .collect()
}

/// Rulings drawn by one decoded content stream
pub(crate) fn rulings_from_operations(operations: &[Operation], page_height: f64) -> Vec<Ruling> {
    let mut walker = PathWalker::new();
    for op in operations {
        walker.step(op);
    }

    walker
        .painted
        .iter()
        .flat_map(|shape| match shape {
            Shape::Segment(from, to) => segment_ruling(*from, *to, page_height)
                .into_iter()
                .collect::<Vec<_>>(),
            Shape::Rect(corners) => rect_rulings(corners, page_height),
        })
        .collect()
}

/// Rulings decoded from raw content stream bytes
pub(crate) fn rulings_from_content(content: &[u8], page_height: f64) -> Result<Vec<Ruling>> {
    let content = Content::decode(content)
        .map_err(|e| Error::InvalidData(format!("Unreadable content stream: {}", e)))?;
    Ok(rulings_from_operations(&content.operations, page_height))
}

/// Rulings for every page of the PDF at `path`, in page order
///
/// `page_heights` comes from the word boxes; a page without a known height
/// gets no rulings since its coordinates cannot be flipped.
pub fn load_rulings(path: &Path, page_heights: &[f64]) -> Result<Vec<Vec<Ruling>>> {
    let doc = lopdf::Document::load(path)
        .map_err(|e| Error::InvalidData(format!("Cannot parse {}: {}", path.display(), e)))?;

    let mut pages = Vec::new();
    for (i, (_, page_id)) in doc.get_pages().into_iter().enumerate() {
        let height = page_heights.get(i).copied().unwrap_or(0.0);
        if height <= 0.0 {
            pages.push(Vec::new());
            continue;
        }
        let rulings = doc
            .get_page_content(page_id)
            .map_err(|e| Error::InvalidData(format!("Page {} content: {}", i + 1, e)))
            .and_then(|bytes| rulings_from_content(&bytes, height));
        match rulings {
            Ok(rulings) => pages.push(rulings),
            Err(e) => {
                debug!("Skipping rulings on page {}: {}", i + 1, e);
                pages.push(Vec::new());
            }
        }
    }

    debug!(pages = pages.len(), "Recovered PDF rulings");
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{Page, Word};
    use crate::extract::TableStrategy;

    const HEIGHT: f64 = 792.0;

    /// Bordered three-column table drawn as stroked lines
    const GRID: &[u8] = b"0 702 m 400 702 l 0 682 m 400 682 l 0 662 m 400 662 l S \
        0 662 m 0 702 l 100 662 m 100 702 l 300 662 m 300 702 l 400 662 m 400 702 l S";

    fn statement_words() -> Vec<Word> {
        let word = |text: &str, x0: f64, top: f64| {
            Word::new(text, x0, top, x0 + 6.0 * text.len() as f64, top + 10.0)
        };
        vec![
            word("Date", 5.0, 95.0),
            word("Description", 105.0, 95.0),
            word("Amount", 305.0, 95.0),
            word("01/15/2024", 5.0, 115.0),
            word("STARBUCKS", 105.0, 115.0),
            word("-6.15", 305.0, 115.0),
        ]
    }

    #[test]
    fn test_stroked_lines_become_rulings() {
        let rulings = rulings_from_content(b"0.5 w 10 700 m 390 700 l S 50 600 m 50 680 l S", HEIGHT)
            .unwrap();
        assert_eq!(
            rulings,
            vec![
                Ruling::horizontal(10.0, 390.0, 92.0),
                Ruling::vertical(50.0, 112.0, 192.0),
            ]
        );
        assert!(rulings[0].is_horizontal());
        assert!(rulings[1].is_vertical());
    }

    #[test]
    fn test_thin_rect_is_one_rule() {
        let rulings = rulings_from_content(b"100 690 0.5 30 re f", HEIGHT).unwrap();
        assert_eq!(rulings, vec![Ruling::vertical(100.25, 72.0, 102.0)]);
    }

    #[test]
    fn test_box_contributes_four_edges() {
        let rulings = rulings_from_content(b"0 0 100 50 re S", HEIGHT).unwrap();
        assert_eq!(rulings.len(), 4);
        assert_eq!(rulings.iter().filter(|r| r.is_horizontal()).count(), 2);
        assert_eq!(rulings.iter().filter(|r| r.is_vertical()).count(), 2);
    }

    #[test]
    fn test_ctm_translation_and_restore() {
        let rulings = rulings_from_content(
            b"q 1 0 0 1 50 0 cm 0 0 m 0 100 l S Q 0 0 m 0 100 l S",
            HEIGHT,
        )
        .unwrap();
        assert_eq!(
            rulings,
            vec![
                Ruling::vertical(50.0, 692.0, 792.0),
                Ruling::vertical(0.0, 692.0, 792.0),
            ]
        );
    }

    #[test]
    fn test_unpainted_curved_and_diagonal_paths_ignored() {
        let rulings = rulings_from_content(
            b"0 0 m 100 0 l n 0 0 m 10 10 20 20 30 0 c S 0 0 m 100 100 l S",
            HEIGHT,
        )
        .unwrap();
        assert!(rulings.is_empty());
    }

    #[test]
    fn test_closepath_adds_closing_edge() {
        let rulings = rulings_from_content(b"0 0 m 100 0 l 100 50 l 0 50 l s", HEIGHT).unwrap();
        assert_eq!(rulings.len(), 4);
        assert!(rulings.contains(&Ruling::vertical(0.0, 742.0, 792.0)));
    }

    #[test]
    fn test_drawn_grid_enables_ruled_strategies() {
        let mut page = Page {
            number: 1,
            width: 612.0,
            height: HEIGHT,
            words: statement_words(),
            ..Default::default()
        };

        // Words alone: only the text-alignment strategy can fire
        assert!(TableStrategy::Lines.detect(&page).is_empty());
        assert!(TableStrategy::Explicit.detect(&page).is_empty());

        page.rulings = rulings_from_content(GRID, HEIGHT).unwrap();
        assert_eq!(page.rulings.len(), 7);

        let lines = TableStrategy::Lines.detect(&page);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0][1][1].as_deref(), Some("STARBUCKS"));

        let explicit = TableStrategy::Explicit.detect(&page);
        assert_eq!(explicit.len(), 1);
        assert_eq!(explicit[0][1][2].as_deref(), Some("-6.15"));
    }

    #[test]
    fn test_missing_file_is_error() {
        assert!(load_rulings(Path::new("/nonexistent/statement.pdf"), &[HEIGHT]).is_err());
    }
}
