//! # Layout Engine
//!
//! Turns one string into a [`LayoutPlan`]: every non-whitespace cluster with
//! a precomputed centered x-offset and width, line-wrapped to the surface.
//!
//! ## Pipeline
//!
//! ```text
//! "hello brave new world"
//!        │ tokenize (whitespace runs kept as spacing)
//!        ▼
//! [hello][ ][brave][ ][new][ ][world]
//!        │ greedy wrap at target width
//!        ▼
//! line 0: hello brave      line 1: new world
//!        │ random start offset per line, running x per cluster
//!        ▼
//! h e l l o b r a v e n e w w o r l d   (offsets fixed, reveal order random)
//! ```
//!
//! Offsets are computed exactly once per string. The scheduler then reveals
//! clusters in random order, and the text still lands as a coherent block.

use rand::Rng;
use tracing::debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::color::Rgba8;
use crate::config::Segmentation;
use crate::measure::Measure;

/// Inputs to [`build_layout`] that do not change between strings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutOptions {
    /// Width lines are wrapped to, normally the surface width.
    pub target_width: f32,
    /// Hard cap on clusters per plan.
    pub max_glyphs: usize,
    /// Cluster segmentation mode.
    pub segmentation: Segmentation,
}

impl LayoutOptions {
    /// Options for a surface of the given width with default cap and
    /// grapheme segmentation.
    #[must_use]
    pub fn for_width(target_width: f32) -> Self {
        Self {
            target_width,
            max_glyphs: 4000,
            segmentation: Segmentation::Graphemes,
        }
    }
}

/// One planned cluster.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlannedGlyph<'a> {
    /// The cluster text.
    pub glyph: &'a str,
    /// Centered x position on the surface.
    pub offset: f32,
    /// Measured width.
    pub width: f32,
    /// Zero-based wrapped line.
    pub line: u32,
}

/// Per-string emission plan: ordered layout, unordered reveal.
#[derive(Clone, Debug)]
pub struct LayoutPlan {
    glyphs: Vec<String>,
    offsets: Vec<f32>,
    widths: Vec<f32>,
    lines: Vec<u32>,
    remaining: Vec<usize>,
    color: Rgba8,
}

impl LayoutPlan {
    /// Total clusters laid out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// True when the string produced no clusters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Clusters not yet emitted.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    /// True once every cluster has been taken.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Color shared by every cluster of the string.
    #[must_use]
    pub fn color(&self) -> Rgba8 {
        self.color
    }

    /// Number of wrapped lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.lines.last().map_or(0, |&line| line as usize + 1)
    }

    /// The planned cluster at `index`, in layout order.
    #[must_use]
    pub fn glyph(&self, index: usize) -> Option<PlannedGlyph<'_>> {
        Some(PlannedGlyph {
            glyph: self.glyphs.get(index)?,
            offset: self.offsets[index],
            width: self.widths[index],
            line: self.lines[index],
        })
    }

    /// Every planned cluster in layout order.
    pub fn glyphs(&self) -> impl Iterator<Item = PlannedGlyph<'_>> + '_ {
        (0..self.len()).filter_map(|i| self.glyph(i))
    }

    /// Removes one uniformly random not-yet-emitted index and returns it.
    pub fn take_random<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<usize> {
        if self.remaining.is_empty() {
            return None;
        }
        let pick = rng.gen_range(0..self.remaining.len());
        Some(self.remaining.swap_remove(pick))
    }
}

enum Token<'a> {
    Space(f32),
    Word(Word<'a>),
}

struct Word<'a> {
    clusters: Vec<(&'a str, f32)>,
    width: f32,
}

#[derive(Default)]
struct Line<'t, 'a> {
    items: Vec<&'t Token<'a>>,
    width: f32,
}

impl Line<'_, '_> {
    fn trim_trailing_space(&mut self) {
        while let Some(Token::Space(w)) = self.items.last() {
            self.width -= w;
            self.items.pop();
        }
    }
}

/// Lays out `text` for out-of-order emission.
///
/// Whitespace-only or empty text yields an empty plan. Clusters whose
/// measured width is not a finite, non-negative number are dropped.
pub fn build_layout<M, R>(
    text: &str,
    measure: &M,
    options: &LayoutOptions,
    rng: &mut R,
) -> LayoutPlan
where
    M: Measure + ?Sized,
    R: Rng + ?Sized,
{
    let color = Rgba8::random_vivid(rng);
    let tokens = tokenize(text, measure, options.segmentation);
    let lines = wrap(&tokens, options.target_width);

    let mut plan = LayoutPlan {
        glyphs: Vec::new(),
        offsets: Vec::new(),
        widths: Vec::new(),
        lines: Vec::new(),
        remaining: Vec::new(),
        color,
    };

    'lines: for (line_index, line) in lines.iter().enumerate() {
        let slack = options.target_width - line.width;
        let start = if slack > 0.0 { rng.gen_range(0.0..=slack) } else { 0.0 };
        let mut cursor = start;

        for token in &line.items {
            match token {
                Token::Space(w) => cursor += w,
                Token::Word(word) => {
                    for &(cluster, width) in &word.clusters {
                        if plan.glyphs.len() >= options.max_glyphs {
                            debug!(cap = options.max_glyphs, "glyph cap reached, truncating");
                            break 'lines;
                        }
                        plan.glyphs.push(cluster.to_string());
                        plan.offsets.push(cursor + width / 2.0);
                        plan.widths.push(width);
                        plan.lines.push(line_index as u32);
                        cursor += width;
                    }
                }
            }
        }
    }

    plan.remaining = (0..plan.glyphs.len()).collect();
    plan
}

fn tokenize<'a, M>(text: &'a str, measure: &M, segmentation: Segmentation) -> Vec<Token<'a>>
where
    M: Measure + ?Sized,
{
    let mut tokens = Vec::new();
    let mut run_start = 0;
    let mut run_is_space = None;

    for (i, ch) in text.char_indices() {
        let is_space = ch.is_whitespace();
        match run_is_space {
            Some(prev) if prev != is_space => {
                tokens.push(make_token(&text[run_start..i], prev, measure, segmentation));
                run_start = i;
            }
            _ => {}
        }
        run_is_space = Some(is_space);
    }
    if let Some(is_space) = run_is_space {
        tokens.push(make_token(&text[run_start..], is_space, measure, segmentation));
    }
    tokens
}

fn make_token<'a, M>(
    run: &'a str,
    is_space: bool,
    measure: &M,
    segmentation: Segmentation,
) -> Token<'a>
where
    M: Measure + ?Sized,
{
    if is_space {
        let w = measure.measure(run);
        return Token::Space(if usable_width(w) { w } else { 0.0 });
    }

    let mut clusters = Vec::new();
    let mut width = 0.0;
    for cluster in split_clusters(run, segmentation) {
        let w = measure.measure(cluster);
        if usable_width(w) {
            clusters.push((cluster, w));
            width += w;
        } else {
            debug!(cluster, width = w, "dropping unmeasurable glyph");
        }
    }
    Token::Word(Word { clusters, width })
}

fn split_clusters(word: &str, segmentation: Segmentation) -> Vec<&str> {
    match segmentation {
        Segmentation::Graphemes => word.graphemes(true).collect(),
        Segmentation::CodePoints => word
            .char_indices()
            .map(|(i, ch)| &word[i..i + ch.len_utf8()])
            .collect(),
    }
}

fn usable_width(w: f32) -> bool {
    w.is_finite() && w >= 0.0
}

fn wrap<'t, 'a>(tokens: &'t [Token<'a>], target_width: f32) -> Vec<Line<'t, 'a>> {
    let mut lines = Vec::new();
    let mut current = Line::default();

    for token in tokens {
        match token {
            Token::Space(w) => {
                // Lines never start with whitespace.
                if current.items.is_empty() {
                    continue;
                }
                current.width += w;
                current.items.push(token);
            }
            Token::Word(word) => {
                if word.clusters.is_empty() {
                    continue;
                }
                if !current.items.is_empty() && current.width + word.width > target_width {
                    current.trim_trailing_space();
                    lines.push(std::mem::take(&mut current));
                }
                current.width += word.width;
                current.items.push(token);
            }
        }
    }

    current.trim_trailing_space();
    if !current.items.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measure::MonospaceMeasure;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn rng() -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(42)
    }

    fn layout(text: &str, width: f32) -> LayoutPlan {
        build_layout(
            text,
            &MonospaceMeasure::new(10.0),
            &LayoutOptions::for_width(width),
            &mut rng(),
        )
    }

    #[test]
    fn test_whitespace_produces_no_clusters() {
        assert!(layout("", 100.0).is_empty());
        assert!(layout("   \t\n ", 100.0).is_empty());
        assert!(layout("   ", 100.0).is_exhausted());
    }

    #[test]
    fn test_single_line_offsets_are_contiguous() {
        let plan = layout("ab cd", 1000.0);
        assert_eq!(plan.len(), 4);
        assert_eq!(plan.line_count(), 1);

        let offsets: Vec<f32> = plan.glyphs().map(|g| g.offset).collect();
        let start = offsets[0] - 5.0;
        let expected = [5.0, 15.0, 35.0, 45.0].map(|o| start + o);
        for (got, want) in offsets.iter().zip(expected) {
            assert!((got - want).abs() < 1e-4, "{got} != {want}");
        }
        assert!(start >= 0.0 && start + 50.0 <= 1000.0);
    }

    #[test]
    fn test_wraps_and_keeps_lines_on_surface() {
        // Each word is 50px; three words with spaces need 170px.
        let plan = layout("aaaaa bbbbb ccccc", 120.0);
        assert_eq!(plan.line_count(), 2);

        for g in plan.glyphs() {
            assert!(g.offset - g.width / 2.0 >= -1e-4);
            assert!(g.offset + g.width / 2.0 <= 120.0 + 1e-4);
        }
        let second_line: Vec<&str> =
            plan.glyphs().filter(|g| g.line == 1).map(|g| g.glyph).collect();
        assert_eq!(second_line.concat(), "ccccc");
    }

    #[test]
    fn test_oversized_word_gets_its_own_line_at_zero() {
        let plan = layout("tiny enormousword", 60.0);
        let long: Vec<_> = plan.glyphs().filter(|g| g.line == 1).collect();
        assert_eq!(long.len(), 12);
        assert!((long[0].offset - 5.0).abs() < 1e-4);
    }

    #[test]
    fn test_grapheme_clusters_stay_whole() {
        let text = "e\u{301}\u{1F468}\u{200D}\u{1F469}\u{200D}\u{1F467}";
        let plan = layout(text, 500.0);
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.glyph(0).unwrap().glyph, "e\u{301}");
    }

    #[test]
    fn test_code_point_mode_splits_combining_marks() {
        let options = LayoutOptions {
            segmentation: Segmentation::CodePoints,
            ..LayoutOptions::for_width(500.0)
        };
        let plan = build_layout("e\u{301}", &MonospaceMeasure::new(10.0), &options, &mut rng());
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn test_glyph_cap_truncates() {
        let options = LayoutOptions {
            max_glyphs: 3,
            ..LayoutOptions::for_width(500.0)
        };
        let plan = build_layout("abcdef", &MonospaceMeasure::new(10.0), &options, &mut rng());
        assert_eq!(plan.len(), 3);
        assert_eq!(plan.remaining(), 3);
    }

    #[test]
    fn test_unmeasurable_glyphs_are_dropped() {
        let measure = |s: &str| if s == "x" { f32::NAN } else { 10.0 * s.chars().count() as f32 };
        let plan = build_layout("axb", &measure, &LayoutOptions::for_width(500.0), &mut rng());
        let glyphs: Vec<&str> = plan.glyphs().map(|g| g.glyph).collect();
        assert_eq!(glyphs, ["a", "b"]);
    }

    #[test]
    fn test_take_random_drains_every_index_once() {
        let mut plan = layout("hello world", 1000.0);
        let mut r = ChaCha8Rng::seed_from_u64(9);
        let mut taken = Vec::new();
        while let Some(i) = plan.take_random(&mut r) {
            taken.push(i);
        }
        taken.sort_unstable();
        assert_eq!(taken, (0..10).collect::<Vec<_>>());
        assert!(plan.is_exhausted());
    }

    #[test]
    fn test_same_seed_same_plan() {
        let a = layout("the quick brown fox jumps", 90.0);
        let b = layout("the quick brown fox jumps", 90.0);
        assert_eq!(a.color(), b.color());
        assert!(a.glyphs().eq(b.glyphs()));
    }
}
