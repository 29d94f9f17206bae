//! Case-insensitive multi-keyword search.
//!
//! Keywords come from a whitespace separated phrase. Both the keywords and the
//! searched text are lower-cased with full Unicode case mapping before substring
//! search, and every match is mapped back onto byte ranges of the original text
//! so it can be sliced for highlighting.

/// A matched range inside a source string, in UTF-8 bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SearchMatch {
    pub offset: usize,
    pub length: usize,
}

impl SearchMatch {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// A source string together with its ordered, non-overlapping matches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HighlightedText {
    pub text: String,
    pub matches: Vec<SearchMatch>,
}

/// A run of a [`HighlightedText`], either plain or highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub highlighted: bool,
}

impl HighlightedText {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            matches: Vec::new(),
        }
    }

    /// Splits the text into alternating plain and highlighted runs, skipping empty runs.
    pub fn segments(&self) -> Vec<Segment<'_>> {
        let mut segments = Vec::with_capacity(self.matches.len() * 2 + 1);
        let mut cursor = 0;
        for m in &self.matches {
            if m.offset > cursor {
                segments.push(Segment {
                    text: &self.text[cursor..m.offset],
                    highlighted: false,
                });
            }
            segments.push(Segment {
                text: &self.text[m.offset..m.end()],
                highlighted: true,
            });
            cursor = m.end();
        }
        if cursor < self.text.len() {
            segments.push(Segment {
                text: &self.text[cursor..],
                highlighted: false,
            });
        }
        segments
    }
}

/// Records that can be filtered by [`Keywords::matches`].
pub trait Searchable {
    /// The text fields a keyword may be found in.
    fn search_fields(&self) -> Vec<&str>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Keyword {
    text: String,
    folded: String,
}

/// Parsed keyword phrase, ordered longest keyword first.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Keywords {
    terms: Vec<Keyword>,
}

impl Keywords {
    /// Splits `input` on runs of whitespace, dropping empty tokens.
    pub fn parse(input: &str) -> Self {
        Self::from_terms(input.split_whitespace())
    }

    pub fn from_terms<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut terms: Vec<Keyword> = terms
            .into_iter()
            .filter(|term| !term.as_ref().is_empty())
            .map(|term| Keyword {
                text: term.as_ref().to_owned(),
                folded: fold(term.as_ref()),
            })
            .collect();
        // Stable, so equally long keywords keep their input order.
        terms.sort_by(|a, b| b.folded.chars().count().cmp(&a.folded.chars().count()));
        Self { terms }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Keywords as typed, longest first.
    pub fn terms(&self) -> impl Iterator<Item = &str> {
        self.terms.iter().map(|term| term.text.as_str())
    }

    /// True when every keyword occurs in `text`.
    pub fn found_in(&self, text: &str) -> bool {
        let folded = fold(text);
        self.terms
            .iter()
            .all(|term| folded.contains(term.folded.as_str()))
    }

    /// True when every keyword occurs in at least one of the record's fields.
    pub fn matches<R: Searchable + ?Sized>(&self, record: &R) -> bool {
        if self.terms.is_empty() {
            return true;
        }
        let fields: Vec<String> = record.search_fields().into_iter().map(fold).collect();
        self.terms.iter().all(|term| {
            fields
                .iter()
                .any(|field| field.contains(term.folded.as_str()))
        })
    }

    /// Non-overlapping ranges of `text` covered by any keyword, left to right.
    pub fn find_all(&self, text: &str) -> Vec<SearchMatch> {
        if self.terms.is_empty() {
            return Vec::new();
        }
        let folded = FoldedText::new(text);
        let mut matches = Vec::new();
        let mut pos = 0;
        while pos < folded.folded.len() {
            let mut best: Option<(usize, usize)> = None;
            for term in &self.terms {
                let Some(rel) = folded.folded[pos..].find(term.folded.as_str()) else {
                    continue;
                };
                let start = pos + rel;
                // Strict comparison keeps the earlier, longer keyword on ties.
                if best.is_none_or(|(best_start, _)| start < best_start) {
                    best = Some((start, start + term.folded.len()));
                }
            }
            let Some((start, end)) = best else {
                break;
            };
            let range = folded.source_range(start, end);
            matches.push(range);
            pos = folded.next_position_after(range.end(), end);
        }
        matches
    }

    pub fn highlight(&self, text: &str) -> HighlightedText {
        HighlightedText {
            text: text.to_owned(),
            matches: self.find_all(text),
        }
    }
}

fn fold(text: &str) -> String {
    text.chars().flat_map(fold_char).collect()
}

/// Lower-cases `ch`, mapping the final sigma onto the medial one so that
/// upper-case Greek keywords find word-final letters.
fn fold_char(ch: char) -> impl Iterator<Item = char> {
    ch.to_lowercase()
        .map(|lower| if lower == 'ς' { 'σ' } else { lower })
}

/// Lower-cased copy of a source string that remembers, for every folded byte,
/// where the originating source character starts.
struct FoldedText<'a> {
    source: &'a str,
    folded: String,
    origin: Vec<usize>,
}

impl<'a> FoldedText<'a> {
    fn new(source: &'a str) -> Self {
        let mut folded = String::with_capacity(source.len());
        let mut origin = Vec::with_capacity(source.len());
        for (idx, ch) in source.char_indices() {
            for lower in fold_char(ch) {
                folded.push(lower);
                origin.resize(folded.len(), idx);
            }
        }
        Self {
            source,
            folded,
            origin,
        }
    }

    /// Maps a non-empty folded range onto whole source characters.
    fn source_range(&self, start: usize, end: usize) -> SearchMatch {
        let source_start = self.origin[start];
        let last = self.origin[end - 1];
        let last_len = self.source[last..]
            .chars()
            .next()
            .map_or(0, char::len_utf8);
        SearchMatch {
            offset: source_start,
            length: last + last_len - source_start,
        }
    }

    /// First folded position at or after `end` that belongs to a source
    /// character starting at or after `source_end`.
    fn next_position_after(&self, source_end: usize, end: usize) -> usize {
        let mut pos = end;
        while pos < self.origin.len() && self.origin[pos] < source_end {
            pos += 1;
        }
        pos
    }
}
