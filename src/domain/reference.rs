//! Typed cross-resource references
//!
//! A reference is a soft pointer written as `kind:id` (e.g. `task:12`,
//! `prompt:3`) inside a `related` header list. It is resolved at read time;
//! the target may have been deleted, and that is not an error here.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of resource a reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Task,
    Prompt,
    Document,
}

impl ResourceKind {
    /// Returns the singular name used in reference syntax.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Task => "task",
            ResourceKind::Prompt => "prompt",
            ResourceKind::Document => "document",
        }
    }

    /// Returns the directory name this kind lives under in a workspace.
    pub fn dir_name(&self) -> &'static str {
        match self {
            ResourceKind::Task => "tasks",
            ResourceKind::Prompt => "prompts",
            ResourceKind::Document => "documents",
        }
    }

    /// Returns all kinds in declaration order.
    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Task,
            ResourceKind::Prompt,
            ResourceKind::Document,
        ]
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "task" | "tasks" => Ok(ResourceKind::Task),
            "prompt" | "prompts" => Ok(ResourceKind::Prompt),
            "document" | "documents" => Ok(ResourceKind::Document),
            other => Err(format!("unknown resource kind: {}", other)),
        }
    }
}

/// A typed reference to another resource, written `kind:id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Reference {
    pub kind: ResourceKind,
    pub id: u32,
}

impl Reference {
    pub fn new(kind: ResourceKind, id: u32) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

impl FromStr for Reference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("invalid reference (expected kind:id): {}", s))?;

        let kind: ResourceKind = kind.parse()?;
        let id: u32 = id
            .trim()
            .parse()
            .map_err(|_| format!("invalid reference id: {}", s))?;

        Ok(Self { kind, id })
    }
}

impl TryFrom<String> for Reference {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Reference> for String {
    fn from(r: Reference) -> Self {
        r.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_roundtrip() {
        let r = Reference::new(ResourceKind::Prompt, 7);
        assert_eq!(r.to_string(), "prompt:7");
        assert_eq!("prompt:7".parse::<Reference>().unwrap(), r);
    }

    #[test]
    fn reference_tolerates_whitespace() {
        let r: Reference = " task: 12 ".parse().unwrap();
        assert_eq!(r, Reference::new(ResourceKind::Task, 12));
    }

    #[test]
    fn reference_rejects_unknown_kind() {
        assert!("ticket:1".parse::<Reference>().is_err());
    }

    #[test]
    fn reference_rejects_bad_id() {
        assert!("task:abc".parse::<Reference>().is_err());
        assert!("task:".parse::<Reference>().is_err());
        assert!("task".parse::<Reference>().is_err());
    }

    #[test]
    fn kind_parses_plural_forms() {
        assert_eq!("prompts".parse::<ResourceKind>().unwrap(), ResourceKind::Prompt);
        assert_eq!("task".parse::<ResourceKind>().unwrap(), ResourceKind::Task);
    }

    #[test]
    fn serde_roundtrip() {
        let r = Reference::new(ResourceKind::Document, 3);
        let json = serde_json::to_string(&r).unwrap();
        assert_eq!(json, "\"document:3\"");
        let parsed: Reference = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, r);
    }
}
