//! Dependency alignment for package descriptors.
//!
//! Rewrites the `dependencies:` block of a `package.yaml` so that pinned
//! dependencies use their canonical versions and sort by priority within
//! their group. The transform works on the raw text rather than a parsed
//! YAML tree, so everything outside the dependency block (header fields,
//! packaging rules, comments, line endings) survives byte for byte.
//!
//! Alignment is idempotent: aligning already-aligned text returns it
//! unchanged.

pub mod table;

use crate::descriptor::{Dependency, Ecosystem};
use crate::error::PublisherError;
use camino::Utf8Path;
use std::borrow::Cow;
use table::{CANONICAL_DEPENDENCIES, CanonicalDependency, lookup};
use thiserror::Error;

/// Errors arising from dependency alignment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AlignError {
    /// A line inside the dependency block is neither a group header, a list
    /// item, a comment, nor blank.
    #[error("line {line_number}: expected a `- ` list item, found {line:?}")]
    MalformedLine {
        /// 1-based line number in the descriptor.
        line_number: usize,
        /// The offending line, without its terminator.
        line: String,
    },
}

/// Rewrites descriptor dependency blocks against a table of pins.
#[derive(Debug, Clone, Copy)]
pub struct DependencyAligner<'t> {
    table: &'t [CanonicalDependency],
}

impl Default for DependencyAligner<'static> {
    fn default() -> Self {
        Self::new(CANONICAL_DEPENDENCIES)
    }
}

impl<'t> DependencyAligner<'t> {
    /// Create an aligner using `table` as the source of pins.
    #[must_use]
    pub const fn new(table: &'t [CanonicalDependency]) -> Self {
        Self { table }
    }

    /// Align the dependency block of `text`.
    ///
    /// Text without a top-level `dependencies:` key is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`AlignError::MalformedLine`] when the dependency block
    /// contains a line that is not a list item, group header, comment, or
    /// blank line. Nothing is rewritten in that case.
    ///
    /// # Examples
    ///
    /// ```
    /// use gallery_publisher::align::DependencyAligner;
    ///
    /// let text = concat!(
    ///     "name: alpha\n",
    ///     "dependencies:\n",
    ///     "  conda-forge:\n",
    ///     "    - uv=0.1.0\n",
    ///     "    - python=3.9\n",
    /// );
    /// let aligned = DependencyAligner::default().align(text)?;
    /// assert!(aligned.contains("    - python=3.10.14\n    - uv=0.4.17\n"));
    /// # Ok::<(), gallery_publisher::align::AlignError>(())
    /// ```
    pub fn align(&self, text: &str) -> Result<String, AlignError> {
        let lines = split_lines(text);
        let Some(start) = lines.iter().position(|l| is_dependencies_key(l.content)) else {
            return Ok(text.to_owned());
        };
        let end = lines
            .iter()
            .skip(start + 1)
            .position(|l| is_top_level(l.content))
            .map_or(lines.len(), |offset| start + 1 + offset);

        let block = self.parse_block(&lines[start + 1..end], start + 1)?;

        let mut out: Vec<OutLine<'_>> = Vec::with_capacity(lines.len());
        out.extend(lines[..=start].iter().map(OutLine::verbatim));
        block.render_into(&mut out);
        out.extend(lines[end..].iter().map(OutLine::verbatim));

        let final_eol = lines.last().map_or("", |l| l.eol);
        let default_eol = lines
            .iter()
            .map(|l| l.eol)
            .find(|eol| !eol.is_empty())
            .unwrap_or("\n");
        Ok(join(out, final_eol, default_eol))
    }

    /// Align the descriptor at `path` in place.
    ///
    /// Returns true when the file was out of alignment. With `check_only`
    /// the file is never written.
    ///
    /// # Errors
    ///
    /// Returns [`PublisherError::Align`] for a malformed dependency block and
    /// [`PublisherError::Io`] when the file cannot be read or written.
    pub fn align_file(&self, path: &Utf8Path, check_only: bool) -> Result<bool, PublisherError> {
        let text = std::fs::read_to_string(path)?;
        let aligned = self.align(&text).map_err(|source| PublisherError::Align {
            path: path.to_owned(),
            source,
        })?;
        if aligned == text {
            return Ok(false);
        }
        if !check_only {
            std::fs::write(path, aligned)?;
        }
        Ok(true)
    }

    fn parse_block<'a>(
        &self,
        lines: &[Line<'a>],
        first_index: usize,
    ) -> Result<Block<'a>, AlignError> {
        let mut block = Block::default();
        let mut current: Option<GroupBuilder<'a>> = None;

        for (offset, line) in lines.iter().enumerate() {
            let trimmed = line.content.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                match current.as_mut() {
                    Some(group) => group.tail.push(*line),
                    None => block.preamble.push(*line),
                }
            } else if is_list_item(trimmed) {
                let Some(group) = current.as_mut().filter(|group| !group.inline) else {
                    return Err(malformed(first_index + offset, line));
                };
                group.push_item(*line, self.table);
            } else if let Some((name, inline)) = group_header(trimmed) {
                if let Some(done) = current.take() {
                    block.groups.push(done.finish());
                }
                let mut group = GroupBuilder::new(*line, name);
                group.inline = inline;
                current = Some(group);
            } else {
                return Err(malformed(first_index + offset, line));
            }
        }

        if let Some(done) = current.take() {
            block.groups.push(done.finish());
        }
        Ok(block)
    }
}

fn malformed(index: usize, line: &Line<'_>) -> AlignError {
    AlignError::MalformedLine {
        line_number: index + 1,
        line: line.content.to_owned(),
    }
}

/// A source line split from its terminator.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    content: &'a str,
    eol: &'a str,
}

/// A line on its way out, possibly rewritten.
struct OutLine<'a> {
    content: Cow<'a, str>,
    eol: &'a str,
}

impl<'a> OutLine<'a> {
    fn verbatim(line: &Line<'a>) -> Self {
        Self {
            content: Cow::Borrowed(line.content),
            eol: line.eol,
        }
    }
}

fn split_lines(text: &str) -> Vec<Line<'_>> {
    text.split_inclusive('\n')
        .map(|raw| {
            let content = raw
                .strip_suffix("\r\n")
                .or_else(|| raw.strip_suffix('\n'))
                .unwrap_or(raw);
            Line {
                content,
                eol: &raw[content.len()..],
            }
        })
        .collect()
}

/// Reassemble lines; only the very last line may lack a terminator.
fn join(out: Vec<OutLine<'_>>, final_eol: &str, default_eol: &str) -> String {
    let count = out.len();
    let mut text = String::new();
    for (index, line) in out.into_iter().enumerate() {
        text.push_str(&line.content);
        if index + 1 == count {
            text.push_str(final_eol);
        } else if line.eol.is_empty() {
            text.push_str(default_eol);
        } else {
            text.push_str(line.eol);
        }
    }
    text
}

fn is_dependencies_key(content: &str) -> bool {
    content
        .strip_prefix("dependencies:")
        .is_some_and(|rest| rest.trim().is_empty() || rest.trim_start().starts_with('#'))
}

fn is_top_level(content: &str) -> bool {
    !content.trim().is_empty() && !content.starts_with([' ', '\t', '#'])
}

fn is_list_item(trimmed: &str) -> bool {
    trimmed.starts_with("- ") || trimmed.starts_with("-\t")
}

/// Return the group name if `trimmed` is a `name:` header.
///
/// An empty flow sequence (`name: []`) is also a header; the flag is set for
/// it because such a group cannot take `- ` items.
fn group_header(trimmed: &str) -> Option<(&str, bool)> {
    let header = strip_comment(trimmed).trim_end();
    let (key, inline) = match header.strip_suffix(':') {
        Some(key) => (key, false),
        None => {
            let key = header.strip_suffix("[]")?.trim_end().strip_suffix(':')?;
            (key, true)
        }
    };
    (!key.is_empty() && !key.starts_with('-') && !key.contains(char::is_whitespace))
        .then_some((key, inline))
}

/// Cut a trailing ` # comment` from a YAML scalar line.
fn strip_comment(value: &str) -> &str {
    comment_start(value).map_or(value, |index| &value[..index])
}

/// Index of a `#` that starts a comment (preceded by whitespace).
fn comment_start(value: &str) -> Option<usize> {
    let mut previous_is_space = false;
    for (index, ch) in value.char_indices() {
        if ch == '#' && previous_is_space {
            return Some(index);
        }
        previous_is_space = ch.is_whitespace();
    }
    None
}

#[derive(Default)]
struct Block<'a> {
    /// Blank and comment lines before the first group header.
    preamble: Vec<Line<'a>>,
    groups: Vec<Group<'a>>,
}

impl<'a> Block<'a> {
    fn render_into(self, out: &mut Vec<OutLine<'a>>) {
        out.extend(self.preamble.iter().map(OutLine::verbatim));
        for group in self.groups {
            group.render_into(out);
        }
    }
}

struct Entry<'a> {
    comments: Vec<Line<'a>>,
    line: Line<'a>,
    rewritten: Option<String>,
    priority: u32,
}

struct GroupBuilder<'a> {
    header: Line<'a>,
    ecosystem: Ecosystem,
    entries: Vec<Entry<'a>>,
    moved_blanks: Vec<Line<'a>>,
    /// Blank and comment lines seen since the last item, in order.
    tail: Vec<Line<'a>>,
    /// Written as `name: []`.
    inline: bool,
}

impl<'a> GroupBuilder<'a> {
    fn new(header: Line<'a>, name: &str) -> Self {
        Self {
            header,
            ecosystem: Ecosystem::from_group(name),
            entries: Vec::new(),
            moved_blanks: Vec::new(),
            tail: Vec::new(),
            inline: false,
        }
    }

    fn push_item(&mut self, line: Line<'a>, table: &[CanonicalDependency]) {
        let (blanks, comments): (Vec<Line<'a>>, Vec<Line<'a>>) = self
            .tail
            .drain(..)
            .partition(|l| l.content.trim().is_empty());
        self.moved_blanks.extend(blanks);

        let (rewritten, priority) = match canonicalise(line.content, &self.ecosystem, table) {
            Some((text, priority)) => (Some(text), priority),
            None => (None, u32::MAX),
        };
        self.entries.push(Entry {
            comments,
            line,
            rewritten,
            priority,
        });
    }

    fn finish(mut self) -> Group<'a> {
        self.entries.sort_by_key(|entry| entry.priority);
        Group {
            header: self.header,
            entries: self.entries,
            moved_blanks: self.moved_blanks,
            trailing: self.tail,
        }
    }
}

struct Group<'a> {
    header: Line<'a>,
    entries: Vec<Entry<'a>>,
    moved_blanks: Vec<Line<'a>>,
    trailing: Vec<Line<'a>>,
}

impl<'a> Group<'a> {
    fn render_into(self, out: &mut Vec<OutLine<'a>>) {
        out.push(OutLine::verbatim(&self.header));
        for entry in self.entries {
            out.extend(entry.comments.iter().map(OutLine::verbatim));
            out.push(OutLine {
                content: entry
                    .rewritten
                    .map_or(Cow::Borrowed(entry.line.content), Cow::Owned),
                eol: entry.line.eol,
            });
        }
        out.extend(self.moved_blanks.iter().map(OutLine::verbatim));
        out.extend(self.trailing.iter().map(OutLine::verbatim));
    }
}

/// Rewrite a known list item to its canonical pin.
///
/// Returns the new line content and the pin's priority, or `None` when the
/// dependency is not in the table. Indentation, the list marker, and any
/// trailing comment are kept.
fn canonicalise(
    content: &str,
    ecosystem: &Ecosystem,
    table: &[CanonicalDependency],
) -> Option<(String, u32)> {
    let indent_len = content.len() - content.trim_start().len();
    let (indent, item) = content.split_at(indent_len);
    let after_dash = item.strip_prefix('-')?;
    let value = after_dash.trim_start();
    let marker = &item[..item.len() - value.len()];

    let spec = strip_comment(value).trim_end();
    let suffix = &value[spec.len()..];

    let dependency = Dependency::parse(ecosystem.clone(), spec);
    let pin = lookup(table, ecosystem, &dependency.name)?;
    Some((format!("{indent}{marker}{}{suffix}", pin.spec()), pin.priority))
}

#[cfg(test)]
#[path = "align_tests.rs"]
mod tests;
