//! Streaming byte substitution.
//!
//! # Design
//! - Each rule is one `SubstitutingReader` stage; stages are chained in declared order.
//! - A stage holds at most `needle.len() - 1` bytes of look-behind plus one read chunk.
//! - Matching is literal, non-overlapping, and left to right.

use std::io::{self, Read};

use courier_config::TransformPreset;

use crate::error::{RelocateError, RelocateResult};

const CHUNK_SIZE: usize = 8 * 1024;

/// Replace every occurrence of one literal byte sequence with another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstitutionRule {
    needle: Vec<u8>,
    replacement: Vec<u8>,
}

impl SubstitutionRule {
    /// Build a rule.
    ///
    /// # Errors
    ///
    /// Returns [`RelocateError::InvalidRule`] when `needle` is empty.
    pub fn new(
        needle: impl Into<Vec<u8>>,
        replacement: impl Into<Vec<u8>>,
    ) -> RelocateResult<Self> {
        let needle = needle.into();
        if needle.is_empty() {
            return Err(RelocateError::InvalidRule {
                reason: "empty_needle",
            });
        }
        Ok(Self {
            needle,
            replacement: replacement.into(),
        })
    }

    /// Sequence being searched for.
    #[must_use]
    pub fn needle(&self) -> &[u8] {
        &self.needle
    }

    /// Sequence written in its place.
    #[must_use]
    pub fn replacement(&self) -> &[u8] {
        &self.replacement
    }
}

/// Ordered chain of substitution rules; empty means identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteTransform {
    rules: Vec<SubstitutionRule>,
}

impl ByteTransform {
    /// Transform that passes bytes through unchanged.
    #[must_use]
    pub const fn identity() -> Self {
        Self { rules: Vec::new() }
    }

    /// Rewrite `~~` to `,`, then `"",""` to `","`.
    #[must_use]
    pub fn escape_rewrite() -> Self {
        Self {
            rules: vec![
                SubstitutionRule {
                    needle: b"~~".to_vec(),
                    replacement: b",".to_vec(),
                },
                SubstitutionRule {
                    needle: br#""","""#.to_vec(),
                    replacement: br#"",""#.to_vec(),
                },
            ],
        }
    }

    /// Transform selected by a configured preset.
    #[must_use]
    pub fn from_preset(preset: TransformPreset) -> Self {
        match preset {
            TransformPreset::None => Self::identity(),
            TransformPreset::EscapeRewrite => Self::escape_rewrite(),
        }
    }

    /// Append a rule that runs on the output of every earlier rule.
    #[must_use]
    pub fn then(mut self, rule: SubstitutionRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Whether the transform leaves bytes unchanged.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules in application order.
    #[must_use]
    pub fn rules(&self) -> &[SubstitutionRule] {
        &self.rules
    }

    /// Wrap `input` in one substituting stage per rule.
    pub fn apply<'a, R>(&self, input: R) -> Box<dyn Read + Send + 'a>
    where
        R: Read + Send + 'a,
    {
        let mut reader: Box<dyn Read + Send + 'a> = Box::new(input);
        for rule in &self.rules {
            reader = Box::new(SubstitutingReader::new(reader, rule.clone()));
        }
        reader
    }

    /// Run `input` through the chain and collect the result.
    ///
    /// # Errors
    ///
    /// Propagates read errors from the chain.
    pub fn apply_to_vec(&self, input: &[u8]) -> io::Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len());
        self.apply(input).read_to_end(&mut output)?;
        Ok(output)
    }
}

/// `Read` adapter that applies one [`SubstitutionRule`] to its inner reader.
#[derive(Debug)]
pub struct SubstitutingReader<R> {
    inner: R,
    rule: SubstitutionRule,
    pending: Vec<u8>,
    output: Vec<u8>,
    output_pos: usize,
    eof: bool,
}

impl<R: Read> SubstitutingReader<R> {
    /// Wrap `inner`.
    pub const fn new(inner: R, rule: SubstitutionRule) -> Self {
        Self {
            inner,
            rule,
            pending: Vec::new(),
            output: Vec::new(),
            output_pos: 0,
            eof: false,
        }
    }

    fn fill_pending(&mut self) -> io::Result<()> {
        let mut chunk = [0_u8; CHUNK_SIZE];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(read) => {
                    self.pending.extend_from_slice(&chunk[..read]);
                    return Ok(());
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err),
            }
        }
    }

    /// Move every byte that can no longer start a match into `output`.
    fn scan_pending(&mut self) {
        let needle = self.rule.needle.as_slice();
        let mut index = 0;
        while index + needle.len() <= self.pending.len() {
            if self.pending[index..].starts_with(needle) {
                self.output.extend_from_slice(&self.rule.replacement);
                index += needle.len();
            } else {
                self.output.push(self.pending[index]);
                index += 1;
            }
        }
        if self.eof {
            self.output.extend_from_slice(&self.pending[index..]);
            index = self.pending.len();
        }
        self.pending.drain(..index);
    }
}

impl<R: Read> Read for SubstitutingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if self.output_pos < self.output.len() {
                let available = &self.output[self.output_pos..];
                let count = available.len().min(buf.len());
                buf[..count].copy_from_slice(&available[..count]);
                self.output_pos += count;
                if self.output_pos == self.output.len() {
                    self.output.clear();
                    self.output_pos = 0;
                }
                return Ok(count);
            }
            if self.eof {
                return Ok(0);
            }
            self.fill_pending()?;
            self.scan_pending();
        }
    }
}
