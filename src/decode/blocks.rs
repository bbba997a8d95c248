use std::collections::HashSet;

use smol_str::SmolStr;

use crate::decode::header::{is_header_candidate, parse_header, Header};
use crate::decode::manifest::{build_manifest_index, ManifestIndex};
use crate::decode::scan::ScanLine;
use crate::{Error, Result};

/// A located block: header fields plus its unparsed CSV body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock<'a> {
    pub name: &'a str,
    pub metadata_raw: &'a str,
    /// 0-based index of the header line.
    pub header_line: usize,
    /// Body text without leading and trailing blank lines.
    pub body: &'a str,
    /// 1-based line the body text starts on.
    pub body_line: usize,
    span_end: usize,
}

impl RawBlock<'_> {
    /// 1-based line of the header.
    pub fn line_no(&self) -> usize {
        self.header_line + 1
    }
}

#[derive(Debug, Default)]
pub struct Located<'a> {
    /// Blocks in file order, manifest excluded.
    pub blocks: Vec<RawBlock<'a>>,
    pub descriptions: Vec<(SmolStr, String)>,
    pub errors: Vec<Error>,
}

/// Partitions scanned lines into blocks, through the manifest index when
/// one is present and usable, by a linear walk otherwise.
pub struct BlockScanner<'a> {
    input: &'a str,
    lines: &'a [ScanLine],
    strict: bool,
    errors: Vec<Error>,
}

impl<'a> BlockScanner<'a> {
    pub fn new(input: &'a str, lines: &'a [ScanLine], strict: bool) -> Self {
        Self {
            input,
            lines,
            strict,
            errors: Vec::new(),
        }
    }

    pub fn locate(mut self, use_manifest: bool) -> Result<Located<'a>> {
        let Some(first) = self.next_candidate(0) else {
            self.check_preamble(self.lines.len())?;
            return Ok(Located {
                errors: self.errors,
                ..Located::default()
            });
        };
        self.check_preamble(first)?;

        let manifest = match parse_header(self.text(first), first + 1) {
            Ok(header) if header.is_manifest() => Some(self.block_at(first, header)),
            _ => None,
        };
        let Some(manifest) = manifest else {
            tracing::debug!("no manifest, scanning for headers");
            let blocks = self.scan(first, &HashSet::new())?;
            return Ok(Located {
                blocks,
                descriptions: Vec::new(),
                errors: self.errors,
            });
        };

        if !use_manifest {
            tracing::debug!("manifest present but indexing disabled");
            let blocks = self.scan(manifest.span_end, &HashSet::new())?;
            return Ok(Located {
                blocks,
                descriptions: Vec::new(),
                errors: self.errors,
            });
        }

        let (index, manifest_errors) =
            build_manifest_index(manifest.body, manifest.body_line, manifest.line_no());
        for error in manifest_errors {
            tracing::warn!(%error, "manifest inconsistency, falling back to scan");
            self.errors.push(error);
        }
        if index.is_empty() {
            tracing::debug!("manifest lists no usable tables, scanning");
            let blocks = self.scan(manifest.span_end, &HashSet::new())?;
            return Ok(Located {
                blocks,
                descriptions: Vec::new(),
                errors: self.errors,
            });
        }
        tracing::debug!(entries = index.len(), "using manifest index");
        let blocks = self.locate_indexed(&index, manifest.span_end)?;
        let descriptions = blocks
            .iter()
            .filter_map(|block| index.get(block.name))
            .map(|entry| (entry.table.clone(), entry.description.clone()))
            .collect();
        Ok(Located {
            blocks,
            descriptions,
            errors: self.errors,
        })
    }

    fn locate_indexed(
        &mut self,
        index: &ManifestIndex,
        from: usize,
    ) -> Result<Vec<RawBlock<'a>>> {
        let mut seeked = Vec::new();
        let mut claimed = HashSet::new();
        for entry in index.entries() {
            let Some(start_line) = entry.start_line else {
                tracing::trace!(table = %entry.table, "no start_line, left to the sweep");
                continue;
            };
            match self.seek(start_line, &entry.table, from) {
                Ok(block) => {
                    claimed.insert(block.header_line);
                    seeked.push(block);
                }
                Err(reason) => {
                    let error =
                        Error::manifest(Some(entry.table.as_str()), entry.line, reason);
                    tracing::warn!(%error, "manifest entry falling back to scan");
                    self.errors.push(error);
                }
            }
        }

        // Tables without a usable start_line and tables the manifest omits.
        let mut blocks = self.scan(from, &claimed)?;
        blocks.extend(seeked);
        blocks.sort_by_key(|block| block.header_line);

        for entry in index.entries() {
            if !blocks.iter().any(|block| block.name == entry.table.as_str()) {
                self.errors.push(Error::manifest(
                    Some(entry.table.as_str()),
                    entry.line,
                    format!("table `{}` is not in the file", entry.table),
                ));
            }
        }
        Ok(blocks)
    }

    fn seek(
        &self,
        start_line: usize,
        expected: &str,
        from: usize,
    ) -> std::result::Result<RawBlock<'a>, String> {
        let idx = start_line - 1;
        if idx < from || idx >= self.lines.len() {
            return Err(format!("start_line {start_line} is outside the table area"));
        }
        if !self.is_candidate(idx) {
            return Err(format!("line {start_line} is not a block header"));
        }
        let header = parse_header(self.text(idx), start_line).map_err(|err| err.to_string())?;
        if header.name != expected {
            return Err(format!(
                "line {start_line} holds `{}`, expected `{expected}`",
                header.name
            ));
        }
        Ok(self.block_at(idx, header))
    }

    /// Walk header candidates from `from`, skipping the `claimed` ones.
    fn scan(&mut self, from: usize, claimed: &HashSet<usize>) -> Result<Vec<RawBlock<'a>>> {
        let mut blocks = Vec::new();
        let mut cursor = self.next_candidate(from);
        while let Some(idx) = cursor {
            if claimed.contains(&idx) {
                cursor = self.next_candidate(idx + 1);
                continue;
            }
            match parse_header(self.text(idx), idx + 1) {
                Ok(header) if header.is_manifest() => {
                    return Err(Error::ReservedNameMisuse { line: idx + 1 });
                }
                Ok(header) => {
                    let block = self.block_at(idx, header);
                    tracing::trace!(block = block.name, line = block.line_no(), "found block");
                    cursor = self.next_candidate(block.span_end);
                    blocks.push(block);
                }
                Err(error) => {
                    self.report(error)?;
                    cursor = self.next_candidate(idx + 1);
                }
            }
        }
        Ok(blocks)
    }

    fn check_preamble(&mut self, first: usize) -> Result<()> {
        if let Some(idx) = (0..first).find(|&idx| !self.lines[idx].is_blank) {
            self.report(Error::malformed_header(
                idx + 1,
                "content before the first block header",
            ))?;
        }
        Ok(())
    }

    fn report(&mut self, error: Error) -> Result<()> {
        if self.strict {
            return Err(error);
        }
        tracing::warn!(%error, "skipping malformed span");
        self.errors.push(error);
        Ok(())
    }

    fn block_at(&self, idx: usize, header: Header<'a>) -> RawBlock<'a> {
        let span_end = self.next_candidate(idx + 1).unwrap_or(self.lines.len());
        let mut start = idx + 1;
        let mut end = span_end;
        while start < end && self.lines[start].is_blank {
            start += 1;
        }
        while end > start && self.lines[end - 1].is_blank {
            end -= 1;
        }
        let body = if start < end {
            &self.input[self.lines[start].start..self.lines[end - 1].end]
        } else {
            ""
        };
        RawBlock {
            name: header.name,
            metadata_raw: header.metadata_raw,
            header_line: idx,
            body,
            body_line: start + 1,
            span_end,
        }
    }

    fn text(&self, idx: usize) -> &'a str {
        let line = self.lines[idx];
        &self.input[line.start..line.end]
    }

    fn is_candidate(&self, idx: usize) -> bool {
        is_header_candidate(self.text(idx))
    }

    fn next_candidate(&self, from: usize) -> Option<usize> {
        (from..self.lines.len()).find(|&idx| self.is_candidate(idx))
    }
}
