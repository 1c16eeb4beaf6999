//! Destination naming and eligibility.
//!
//! # Design
//! - `DestinationNamer::decide` is pure: it runs before any network call.
//! - Eligibility (extension suffixes, delimiter rule) is checked before the naming strategy.
//! - A strategy that cannot produce a name skips the object; skipping is not an error.

use courier_config::{DelimiterRule, NamingMode, RelocationPolicy};
use serde::Serialize;

use crate::error::{RelocateError, RelocateResult};

/// How a destination name is derived from a source name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingPolicy {
    /// Destination equals source.
    Passthrough,
    /// Strip a literal prefix from the full source name.
    ///
    /// The prefix is matched against the whole object name, folders included,
    /// so `exports/0000a.csv` does not match prefix `0000`. Configure
    /// `exports/0000` to trim inside a folder.
    PrefixTrim {
        /// Prefix to remove.
        prefix: String,
    },
    /// Keep the part of the last path segment before the delimiter.
    DelimiterCut {
        /// Reserved delimiter.
        delimiter: char,
        /// Extension appended when missing; `None` uses the matched eligible extension.
        extension: Option<String>,
    },
}

/// Which names are processed at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eligibility {
    /// Accepted suffixes; empty accepts every name.
    pub extensions: Vec<String>,
    /// Reserved delimiter checked by `rule`.
    pub delimiter: char,
    /// Whether the delimiter must, must not, or may appear.
    pub rule: DelimiterRule,
}

impl Eligibility {
    /// Accept every name.
    #[must_use]
    pub const fn any() -> Self {
        Self {
            extensions: Vec::new(),
            delimiter: '|',
            rule: DelimiterRule::Ignored,
        }
    }

    fn check(&self, name: &str) -> Result<Option<String>, SkipReason> {
        let matched = if self.extensions.is_empty() {
            None
        } else {
            Some(
                self.extensions
                    .iter()
                    .find(|extension| name.ends_with(extension.as_str()))
                    .cloned()
                    .ok_or(SkipReason::ExtensionNotEligible)?,
            )
        };
        let has_delimiter = name.contains(self.delimiter);
        match self.rule {
            DelimiterRule::Required if !has_delimiter => Err(SkipReason::DelimiterMissing),
            DelimiterRule::Forbidden if has_delimiter => Err(SkipReason::DelimiterPresent),
            _ => Ok(matched),
        }
    }
}

/// Why an object was not relocated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// No configured extension matched.
    ExtensionNotEligible,
    /// The delimiter is required but absent.
    DelimiterMissing,
    /// The delimiter is forbidden but present.
    DelimiterPresent,
    /// The trim prefix is absent.
    PrefixAbsent,
    /// The derived name would be empty.
    EmptyName,
}

impl SkipReason {
    /// Stable label for logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ExtensionNotEligible => "extension_not_eligible",
            Self::DelimiterMissing => "delimiter_missing",
            Self::DelimiterPresent => "delimiter_present",
            Self::PrefixAbsent => "prefix_absent",
            Self::EmptyName => "empty_name",
        }
    }
}

/// Result of [`DestinationNamer::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingDecision {
    /// Relocate the object to `destination`.
    Relocate {
        /// Destination object name or share-relative path.
        destination: String,
        /// Eligible extension the source name matched, if any were configured.
        matched_extension: Option<String>,
    },
    /// Leave the object alone.
    Skip {
        /// Why the object was skipped.
        reason: SkipReason,
    },
}

/// Eligibility gate plus naming strategy for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationNamer {
    policy: NamingPolicy,
    eligibility: Eligibility,
}

impl DestinationNamer {
    /// Combine a strategy with an eligibility gate.
    #[must_use]
    pub const fn new(policy: NamingPolicy, eligibility: Eligibility) -> Self {
        Self {
            policy,
            eligibility,
        }
    }

    /// Build from a configured relocation policy.
    ///
    /// # Errors
    ///
    /// Returns [`RelocateError::InvalidInput`] when prefix trimming has no prefix.
    pub fn from_policy(policy: &RelocationPolicy) -> RelocateResult<Self> {
        let naming = match policy.naming {
            NamingMode::Passthrough => NamingPolicy::Passthrough,
            NamingMode::PrefixTrim => NamingPolicy::PrefixTrim {
                prefix: policy
                    .trim_prefix
                    .clone()
                    .filter(|prefix| !prefix.is_empty())
                    .ok_or(RelocateError::InvalidInput {
                        field: "trim_prefix",
                        reason: "missing",
                        value: None,
                    })?,
            },
            NamingMode::DelimiterCut => NamingPolicy::DelimiterCut {
                delimiter: policy.delimiter,
                extension: policy.target_extension.clone(),
            },
        };
        Ok(Self::new(
            naming,
            Eligibility {
                extensions: policy.extensions.clone(),
                delimiter: policy.delimiter,
                rule: policy.delimiter_rule,
            },
        ))
    }

    /// Naming strategy in use.
    #[must_use]
    pub const fn policy(&self) -> &NamingPolicy {
        &self.policy
    }

    /// Eligibility gate in use.
    #[must_use]
    pub const fn eligibility(&self) -> &Eligibility {
        &self.eligibility
    }

    /// Decide whether and where `name` is relocated.
    #[must_use]
    pub fn decide(&self, name: &str) -> NamingDecision {
        let matched_extension = match self.eligibility.check(name) {
            Ok(matched) => matched,
            Err(reason) => return NamingDecision::Skip { reason },
        };
        let destination = match &self.policy {
            NamingPolicy::Passthrough => Ok(name.to_string()),
            NamingPolicy::PrefixTrim { prefix } => trim_prefix(name, prefix),
            NamingPolicy::DelimiterCut {
                delimiter,
                extension,
            } => cut_at_delimiter(
                name,
                *delimiter,
                extension.as_deref().or(matched_extension.as_deref()),
            ),
        };
        match destination {
            Ok(destination) => NamingDecision::Relocate {
                destination,
                matched_extension,
            },
            Err(reason) => NamingDecision::Skip { reason },
        }
    }
}

fn trim_prefix(name: &str, prefix: &str) -> Result<String, SkipReason> {
    let rest = name.strip_prefix(prefix).ok_or(SkipReason::PrefixAbsent)?;
    if rest.is_empty() {
        return Err(SkipReason::EmptyName);
    }
    Ok(rest.to_string())
}

fn cut_at_delimiter(
    name: &str,
    delimiter: char,
    extension: Option<&str>,
) -> Result<String, SkipReason> {
    let (directory, file_name) = name
        .rfind('/')
        .map_or(("", name), |index| name.split_at(index + 1));
    let (stem, _) = file_name
        .split_once(delimiter)
        .ok_or(SkipReason::DelimiterMissing)?;
    if stem.is_empty() {
        return Err(SkipReason::EmptyName);
    }
    let mut destination = format!("{directory}{stem}");
    if let Some(extension) = extension
        && !stem.ends_with(extension)
    {
        destination.push_str(extension);
    }
    Ok(destination)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relocated(decision: NamingDecision) -> Option<String> {
        match decision {
            NamingDecision::Relocate { destination, .. } => Some(destination),
            NamingDecision::Skip { .. } => None,
        }
    }

    fn delimiter_cut(extensions: &[&str]) -> DestinationNamer {
        DestinationNamer::new(
            NamingPolicy::DelimiterCut {
                delimiter: '|',
                extension: None,
            },
            Eligibility {
                extensions: extensions.iter().map(ToString::to_string).collect(),
                delimiter: '|',
                rule: DelimiterRule::Required,
            },
        )
    }

    #[test]
    fn prefix_trim_strips_literal_prefix() {
        let namer = DestinationNamer::new(
            NamingPolicy::PrefixTrim {
                prefix: "0000".into(),
            },
            Eligibility::any(),
        );
        assert_eq!(relocated(namer.decide("0000invoice.csv")).as_deref(), Some("invoice.csv"));
        assert_eq!(
            namer.decide("invoice.csv"),
            NamingDecision::Skip {
                reason: SkipReason::PrefixAbsent
            }
        );
        assert_eq!(
            namer.decide("0000"),
            NamingDecision::Skip {
                reason: SkipReason::EmptyName
            }
        );
    }

    #[test]
    fn prefix_trim_matches_the_whole_object_name() {
        let bare = DestinationNamer::new(
            NamingPolicy::PrefixTrim {
                prefix: "0000".into(),
            },
            Eligibility::any(),
        );
        assert_eq!(
            bare.decide("exports/0000invoice.csv"),
            NamingDecision::Skip {
                reason: SkipReason::PrefixAbsent
            }
        );

        let foldered = DestinationNamer::new(
            NamingPolicy::PrefixTrim {
                prefix: "exports/0000".into(),
            },
            Eligibility::any(),
        );
        assert_eq!(
            relocated(foldered.decide("exports/0000invoice.csv")).as_deref(),
            Some("invoice.csv")
        );
    }

    #[test]
    fn delimiter_cut_keeps_directory_and_appends_extension() {
        let namer = delimiter_cut(&[".csv", ".txt"]);
        assert_eq!(
            namer.decide("folder/66000_report|2023.csv"),
            NamingDecision::Relocate {
                destination: "folder/66000_report.csv".into(),
                matched_extension: Some(".csv".into()),
            }
        );
        assert_eq!(
            relocated(namer.decide("a/b/notes.txt|v2.txt")).as_deref(),
            Some("a/b/notes.txt")
        );
        assert_eq!(
            relocated(namer.decide("x|y|z.txt")).as_deref(),
            Some("x.txt")
        );
    }

    #[test]
    fn delimiter_cut_uses_configured_extension_over_matched_one() {
        let namer = DestinationNamer::new(
            NamingPolicy::DelimiterCut {
                delimiter: '#',
                extension: Some(".dat".into()),
            },
            Eligibility {
                extensions: vec![".csv".into()],
                delimiter: '#',
                rule: DelimiterRule::Required,
            },
        );
        assert_eq!(
            relocated(namer.decide("in/feed#1.csv")).as_deref(),
            Some("in/feed.dat")
        );
    }

    #[test]
    fn delimiter_only_in_directory_is_not_cut() {
        let namer = DestinationNamer::new(
            NamingPolicy::DelimiterCut {
                delimiter: '|',
                extension: None,
            },
            Eligibility::any(),
        );
        assert_eq!(
            namer.decide("odd|dir/report.csv"),
            NamingDecision::Skip {
                reason: SkipReason::DelimiterMissing
            }
        );
        assert_eq!(
            namer.decide("dir/|tail.csv"),
            NamingDecision::Skip {
                reason: SkipReason::EmptyName
            }
        );
    }

    #[test]
    fn eligibility_gates_before_naming() {
        let namer = delimiter_cut(&[".csv"]);
        assert_eq!(
            namer.decide("folder/report|2023.json"),
            NamingDecision::Skip {
                reason: SkipReason::ExtensionNotEligible
            }
        );
        assert_eq!(
            namer.decide("folder/report.csv"),
            NamingDecision::Skip {
                reason: SkipReason::DelimiterMissing
            }
        );

        let forbid = DestinationNamer::new(
            NamingPolicy::Passthrough,
            Eligibility {
                extensions: vec![".csv".into(), ".txt".into()],
                delimiter: '|',
                rule: DelimiterRule::Forbidden,
            },
        );
        assert_eq!(
            forbid.decide("daily/a|b.csv"),
            NamingDecision::Skip {
                reason: SkipReason::DelimiterPresent
            }
        );
        assert_eq!(
            relocated(forbid.decide("daily/a.txt")).as_deref(),
            Some("daily/a.txt")
        );
    }

    #[test]
    fn from_policy_maps_configuration() -> RelocateResult<()> {
        let policy = RelocationPolicy {
            naming: NamingMode::DelimiterCut,
            extensions: vec![".csv".into()],
            delimiter_rule: DelimiterRule::Required,
            ..RelocationPolicy::default()
        };
        let namer = DestinationNamer::from_policy(&policy)?;
        assert_eq!(
            namer.policy(),
            &NamingPolicy::DelimiterCut {
                delimiter: '|',
                extension: None
            }
        );
        assert_eq!(namer.eligibility().extensions, [".csv"]);

        let missing_prefix = RelocationPolicy {
            naming: NamingMode::PrefixTrim,
            ..RelocationPolicy::default()
        };
        assert!(matches!(
            DestinationNamer::from_policy(&missing_prefix),
            Err(RelocateError::InvalidInput {
                field: "trim_prefix",
                ..
            })
        ));
        Ok(())
    }
}
