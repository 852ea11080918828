//! Download spec model: source identifier → plain destination or zip routing rules.
//!
//! The shape of each target is decided once, at deserialisation time, so the
//! download loop never inspects raw config values.

use indexmap::IndexMap;
use regex::Regex;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::io;

use crate::checksum;
use crate::error::{GrabError, Result};

/// Ordered mapping of source identifier to target. Order drives processing and logs.
pub type DownloadSpec = IndexMap<String, Target>;

#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawTarget")]
pub enum Target {
    /// A single file written to one destination template.
    Plain(String),
    /// A zip archive whose members are routed by ordered regex rules.
    Zip(ZipRules),
}

impl Target {
    /// Human readable form used in error context.
    pub fn describe(&self) -> String {
        match self {
            Target::Plain(dest) => dest.clone(),
            Target::Zip(rules) => {
                let patterns: Vec<&str> = rules.rules.iter().map(|r| r.pattern.as_str()).collect();
                format!("zip rules [{}]", patterns.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ZipRule {
    pub pattern: Regex,
    /// `None` means matching members are explicitly ignored.
    pub targets: Option<Vec<String>>,
    /// Whether the config gave a list rather than a single string.
    list_form: bool,
}

impl ZipRule {
    pub fn new(pattern: &str, targets: Option<Vec<String>>) -> Result<Self, regex::Error> {
        let list_form = targets.as_ref().map_or(false, |t| t.len() != 1);
        Ok(Self {
            pattern: Regex::new(pattern)?,
            targets,
            list_form,
        })
    }

    /// True when the rule matches at the start of `member`.
    pub fn matches(&self, member: &str) -> bool {
        self.pattern.find(member).map_or(false, |m| m.start() == 0)
    }

    fn json_value(&self) -> serde_json::Value {
        match &self.targets {
            None => serde_json::Value::Null,
            Some(t) if t.len() == 1 && !self.list_form => serde_json::Value::String(t[0].clone()),
            Some(t) => serde_json::Value::Array(
                t.iter().cloned().map(serde_json::Value::String).collect(),
            ),
        }
    }
}

/// Routing rules for one archive, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ZipRules {
    pub rules: Vec<ZipRule>,
}

impl ZipRules {
    /// Keys-sorted JSON rendering with `", "` and `": "` separators, so lock
    /// files stay interchangeable with ones written by earlier grablib releases.
    pub fn canonical_json(&self) -> Result<String> {
        let sorted: BTreeMap<&str, serde_json::Value> = self
            .rules
            .iter()
            .map(|r| (r.pattern.as_str(), r.json_value()))
            .collect();
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
        serde::Serialize::serialize(&sorted, &mut ser)
            .map_err(|e| GrabError::config(format!("unable to render zip rules: {}", e)))?;
        String::from_utf8(buf)
            .map_err(|e| GrabError::config(format!("unable to render zip rules: {}", e)))
    }

    /// Digest stored under the `:zip-lookup` lock sentinel.
    pub fn digest(&self) -> Result<String> {
        Ok(checksum::md5_hex(self.canonical_json()?.as_bytes()))
    }
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W: ?Sized + io::Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTarget {
    Plain(String),
    Zip(IndexMap<String, Option<RawDestinations>>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDestinations {
    One(String),
    Many(Vec<String>),
}

impl TryFrom<RawTarget> for Target {
    type Error = String;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        match raw {
            RawTarget::Plain(dest) => Ok(Target::Plain(dest)),
            RawTarget::Zip(map) => {
                let mut rules = Vec::with_capacity(map.len());
                for (pattern, dest) in map {
                    let (targets, list_form) = match dest {
                        None => (None, false),
                        Some(RawDestinations::One(d)) => (Some(vec![d]), false),
                        Some(RawDestinations::Many(v)) => (Some(v), true),
                    };
                    let mut rule = ZipRule::new(&pattern, targets)
                        .map_err(|e| format!("invalid zip pattern \"{}\": {}", pattern, e))?;
                    rule.list_form = list_form;
                    rules.push(rule);
                }
                Ok(Target::Zip(ZipRules { rules }))
            }
        }
    }
}
