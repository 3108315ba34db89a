//! Descriptor preparation - turns declared file content into a stored hash
//!
//! A file descriptor may declare its content instead of a hash:
//!
//! - `content`: text payload, or a deferred value
//! - `source`: local path whose bytes are the payload
//! - `prefix_content` / `suffix_content`: fragment lists, each item either a
//!   string or `{ "value": ..., "sorting_key": ... }`
//! - `content_separator`: separator between fragments
//!
//! Preparation assembles the bytes, uploads them to the content store when
//! absent, and replaces those attributes with `hash`. A deferred payload
//! becomes a deferred `hash`, so the resource is skipped at reconcile time.

use anyhow::{Context, Result, anyhow, bail};
use rayon::prelude::*;

use blobstore::{Assembled, Assembler, ContentStore, Fragment, Payload};
use declarative::{Plan, ResourceDescriptor, ResourceKind, Value};

use crate::paths;

const CONTENT: &str = "content";
const SOURCE: &str = "source";
const PREFIX: &str = "prefix_content";
const SUFFIX: &str = "suffix_content";
const SEPARATOR: &str = "content_separator";

/// Attributes consumed by preparation
const CONTENT_ATTRIBUTES: [&str; 5] = [CONTENT, SOURCE, PREFIX, SUFFIX, SEPARATOR];

pub struct Preparer<'a> {
    store: &'a dyn ContentStore,
    separator: String,
}

impl<'a> Preparer<'a> {
    pub fn new(store: &'a dyn ContentStore, separator: impl Into<String>) -> Self {
        Self {
            store,
            separator: separator.into(),
        }
    }

    /// Prepare every descriptor; the first failure aborts the whole plan
    pub fn prepare_plan(&self, plan: Plan) -> Result<Plan> {
        let descriptors = plan
            .descriptors
            .into_par_iter()
            .map(|desired| {
                let name = desired.resource_ref();
                self.prepare(desired)
                    .with_context(|| format!("Failed to prepare {name}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Plan::new(descriptors))
    }

    /// Prepare one descriptor; anything but a file with declared content passes through
    pub fn prepare(&self, mut desired: ResourceDescriptor) -> Result<ResourceDescriptor> {
        if desired.kind() != ResourceKind::File || !declares_content(&desired) {
            return Ok(desired);
        }
        if desired.has("hash") {
            bail!("declares both hash and content");
        }

        let separator = match desired.opt_text(SEPARATOR)? {
            Some(sep) => sep.to_string(),
            None => self.separator.clone(),
        };
        let prefixes = fragments(desired.get(PREFIX), PREFIX)?;
        let suffixes = fragments(desired.get(SUFFIX), SUFFIX)?;

        let hash = match (prefixes, suffixes) {
            (Ok(prefixes), Ok(suffixes)) => {
                let payload = payload(&desired)?;
                match Assembler::new(separator).assemble(&payload, &prefixes, &suffixes)? {
                    Assembled::Content(content) => {
                        if self.store.upload_if_absent(&content.hash, &content.bytes)? {
                            log::info!("{}: uploaded {}", desired.resource_ref(), content.hash);
                        }
                        Value::Text(content.hash)
                    }
                    Assembled::Deferred(reason) => Value::deferred(reason),
                }
            }
            (Err(reason), _) | (_, Err(reason)) => Value::deferred(reason),
        };

        for name in CONTENT_ATTRIBUTES {
            desired.attributes.shift_remove(name);
        }
        desired.attributes.insert("hash".to_string(), hash);
        Ok(desired)
    }
}

fn declares_content(desired: &ResourceDescriptor) -> bool {
    desired.has(CONTENT) || desired.has(SOURCE)
}

fn payload(desired: &ResourceDescriptor) -> Result<Payload> {
    match (desired.get(CONTENT), desired.get(SOURCE)) {
        (Some(_), Some(_)) => bail!("declares both content and source"),
        (Some(value), None) => match value {
            Value::Text(text) => Ok(Payload::Bytes(text.clone().into_bytes())),
            other => match other.deferred_reason() {
                Some(reason) => Ok(Payload::Deferred(reason.to_string())),
                None => bail!("content must be text"),
            },
        },
        (None, Some(value)) => match value {
            Value::Text(path) => Ok(Payload::LocalFile(paths::expand(path))),
            other => match other.deferred_reason() {
                Some(reason) => Ok(Payload::Deferred(reason.to_string())),
                None => bail!("source must be a path"),
            },
        },
        (None, None) => bail!("declares neither content nor source"),
    }
}

/// Parse a fragment list
///
/// The inner `Err` carries the reason of a deferred fragment.
fn fragments(value: Option<&Value>, attribute: &str) -> Result<std::result::Result<Vec<Fragment>, String>> {
    let Some(value) = value else {
        return Ok(Ok(Vec::new()));
    };
    if let Some(reason) = value.deferred_reason() {
        return Ok(Err(reason.to_string()));
    }
    let Value::List(items) = value else {
        bail!("{attribute} must be a list");
    };
    items
        .iter()
        .map(|item| fragment(item).ok_or_else(|| anyhow!("invalid {attribute} item: {item}")))
        .collect::<Result<Vec<_>>>()
        .map(Ok)
}

fn fragment(item: &Value) -> Option<Fragment> {
    match item {
        Value::Text(text) => Some(Fragment::new(text.as_bytes())),
        Value::Map(map) => {
            let value = map.get("value")?.as_str()?;
            match map.get("sorting_key") {
                None => Some(Fragment::new(value.as_bytes())),
                Some(key) => Some(Fragment::keyed(value.as_bytes(), key.as_str()?.as_bytes())),
            }
        }
        _ => None,
    }
}
