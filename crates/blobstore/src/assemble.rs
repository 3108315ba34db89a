//! Content assembly - payload plus ordered prefix/suffix fragments

use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::hash::hash_content;

/// A piece of content joined before or after the payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub value: Vec<u8>,
    /// Defaults to the value itself
    pub sorting_key: Option<Vec<u8>>,
}

impl Fragment {
    pub fn new(value: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            sorting_key: None,
        }
    }

    pub fn keyed(value: impl Into<Vec<u8>>, sorting_key: impl Into<Vec<u8>>) -> Self {
        Self {
            value: value.into(),
            sorting_key: Some(sorting_key.into()),
        }
    }

    fn sort_key(&self) -> (&[u8], &[u8]) {
        (
            self.sorting_key.as_deref().unwrap_or(&self.value),
            &self.value,
        )
    }
}

/// Primary content of a file-like resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Bytes(Vec<u8>),
    /// Read from this local path before assembly
    LocalFile(PathBuf),
    /// Not resolvable yet; the resource must be skipped
    Deferred(String),
}

/// Final bytes and their content address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Content {
    pub bytes: Vec<u8>,
    pub hash: String,
}

impl Content {
    pub fn new(bytes: Vec<u8>) -> Self {
        let hash = hash_content(&bytes);
        Self { bytes, hash }
    }
}

/// Result of assembling a payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembled {
    Content(Content),
    Deferred(String),
}

/// Builds final content from a payload and fragments
#[derive(Debug, Clone)]
pub struct Assembler {
    separator: Vec<u8>,
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new("\n")
    }
}

impl Assembler {
    pub fn new(separator: impl Into<Vec<u8>>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    /// Sort fragments by (sorting key, value), join them and add one trailing separator
    pub fn join(&self, fragments: &[Fragment]) -> Vec<u8> {
        let mut sorted: Vec<&Fragment> = fragments.iter().collect();
        sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

        let mut out = Vec::new();
        for (i, fragment) in sorted.iter().enumerate() {
            if i > 0 {
                out.extend_from_slice(&self.separator);
            }
            out.extend_from_slice(&fragment.value);
        }
        out.extend_from_slice(&self.separator);
        out
    }

    /// Produce the exact bytes to materialize and their hash
    ///
    /// Prefixes are joined and placed before the payload; suffixes are
    /// joined and placed after it with one separator in between.
    pub fn assemble(
        &self,
        payload: &Payload,
        prefixes: &[Fragment],
        suffixes: &[Fragment],
    ) -> Result<Assembled> {
        let body = match payload {
            Payload::Deferred(reason) => return Ok(Assembled::Deferred(reason.clone())),
            Payload::Bytes(bytes) => bytes.clone(),
            Payload::LocalFile(path) => std::fs::read(path).map_err(|source| Error::ReadFailed {
                path: path.clone(),
                source,
            })?,
        };

        let mut bytes = Vec::with_capacity(body.len());
        if !prefixes.is_empty() {
            bytes.extend(self.join(prefixes));
        }
        bytes.extend_from_slice(&body);
        if !suffixes.is_empty() {
            bytes.extend_from_slice(&self.separator);
            bytes.extend(self.join(suffixes));
        }

        let content = Content::new(bytes);
        log::debug!("assembled {} bytes as {}", content.bytes.len(), content.hash);
        Ok(Assembled::Content(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn content(assembled: Assembled) -> Content {
        match assembled {
            Assembled::Content(c) => c,
            Assembled::Deferred(r) => panic!("unexpected deferred: {r}"),
        }
    }

    #[test]
    fn test_plain_payload() {
        let c = content(
            Assembler::default()
                .assemble(&Payload::Bytes(b"abc".to_vec()), &[], &[])
                .unwrap(),
        );
        assert_eq!(c.bytes, b"abc");
        assert_eq!(c.hash, "a9993e364706816aba3e25717850c26c9cd0d89d");
    }

    #[test]
    fn test_prefix_and_suffix_layout() {
        let assembler = Assembler::new("\n");
        let c = content(
            assembler
                .assemble(
                    &Payload::Bytes(b"body".to_vec()),
                    &[Fragment::new("b"), Fragment::new("a")],
                    &[Fragment::new("z")],
                )
                .unwrap(),
        );
        assert_eq!(c.bytes, b"a\nb\nbody\nz\n");
        assert_eq!(c.hash, hash_content(&c.bytes));
    }

    #[test]
    fn test_deterministic_regardless_of_input_order() {
        let assembler = Assembler::new(",");
        let one = [
            Fragment::keyed("x", "2"),
            Fragment::new("m"),
            Fragment::keyed("y", "1"),
        ];
        let two = [one[2].clone(), one[0].clone(), one[1].clone()];
        let payload = Payload::Bytes(b"p".to_vec());
        assert_eq!(
            assembler.assemble(&payload, &one, &[]).unwrap(),
            assembler.assemble(&payload, &two, &[]).unwrap()
        );
        assert_eq!(assembler.join(&one), b"y,x,m,");
    }

    #[test]
    fn test_sorting_key_ties_break_by_value() {
        let assembler = Assembler::new(" ");
        let joined = assembler.join(&[
            Fragment::keyed("beta", "k"),
            Fragment::keyed("alpha", "k"),
            Fragment::new("k"),
        ]);
        // "k" without a key sorts as ("k", "k"), after ("k", "beta")
        assert_eq!(joined, b"alpha beta k ");
    }

    #[test]
    fn test_keyed_fragment_orders_by_key_not_value() {
        let assembler = Assembler::new("|");
        let joined = assembler.join(&[Fragment::new("a"), Fragment::keyed("a", "0")]);
        assert_eq!(joined, b"a|a|");
        let joined = assembler.join(&[Fragment::keyed("b", "z"), Fragment::new("c")]);
        assert_eq!(joined, b"c|b|");
    }

    #[test]
    fn test_deferred_propagates() {
        let out = Assembler::default()
            .assemble(
                &Payload::Deferred("template input".into()),
                &[Fragment::new("a")],
                &[],
            )
            .unwrap();
        assert_eq!(out, Assembled::Deferred("template input".into()));
    }

    #[test]
    fn test_local_file_payload() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"from disk").unwrap();
        let c = content(
            Assembler::default()
                .assemble(&Payload::LocalFile(file.path().to_path_buf()), &[], &[])
                .unwrap(),
        );
        assert_eq!(c.bytes, b"from disk");

        let missing = Payload::LocalFile(PathBuf::from("/nonexistent/converge/file"));
        assert!(matches!(
            Assembler::default().assemble(&missing, &[], &[]),
            Err(Error::ReadFailed { .. })
        ));
    }
}
