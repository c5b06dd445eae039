// src/core/validators.rs

use crate::models::OutputFormat;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use thiserror::Error;

lazy_static! {
    /// `<area>-<direction>-<n>`; matches regions newer than [`KNOWN_REGIONS`].
    static ref REGION_PATTERN: Regex = Regex::new(
        r"^(us|eu|ap|sa|ca|me|af|il)-(north|south|east|west|central|northeast|southeast|southwest|northwest)-\d+$"
    )
    .expect("Region pattern must compile");
    static ref PROFILE_PATTERN: Regex =
        Regex::new(r"^[a-zA-Z0-9_-]+$").expect("Profile pattern must compile");
}

pub const KNOWN_REGIONS: &[&str] = &[
    "us-east-1",
    "us-east-2",
    "us-west-1",
    "us-west-2",
    "eu-west-1",
    "eu-west-2",
    "eu-west-3",
    "eu-central-1",
    "eu-central-2",
    "eu-north-1",
    "eu-south-1",
    "eu-south-2",
    "ap-south-1",
    "ap-south-2",
    "ap-northeast-1",
    "ap-northeast-2",
    "ap-northeast-3",
    "ap-southeast-1",
    "ap-southeast-2",
    "ap-southeast-3",
    "ap-southeast-4",
    "ap-east-1",
    "ca-central-1",
    "ca-west-1",
    "sa-east-1",
    "me-south-1",
    "me-central-1",
    "af-south-1",
    "il-central-1",
    "us-gov-east-1",
    "us-gov-west-1",
    "cn-north-1",
    "cn-northwest-1",
];

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Regions must be comma-separated, not space-separated (e.g. 'eu-west-1,eu-west-2').")]
    SpaceSeparatedRegions,
    #[error("Invalid region code(s): {}.{}", .invalid.join(", "), format_suggestions(.suggestions))]
    InvalidRegions {
        invalid: Vec<String>,
        suggestions: Vec<(String, Vec<String>)>,
    },
    #[error("Invalid profile name '{0}'. Use only letters, numbers, hyphens and underscores.")]
    InvalidProfile(String),
    #[error("Invalid output format '{0}'. Valid formats: json, table.")]
    InvalidOutputFormat(String),
    #[error("Expected 'on' or 'off', got '{0}'.")]
    InvalidToggle(String),
}

fn format_suggestions(suggestions: &[(String, Vec<String>)]) -> String {
    suggestions
        .iter()
        .map(|(bad, good)| format!(" Did you mean {} instead of '{}'?", good.join(" or "), bad))
        .collect()
}

/// Parses a comma-separated region list. Empty input means "no override".
pub fn validate_regions(input: &str) -> Result<Vec<String>, ValidationError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Vec::new());
    }
    if input.contains(' ') && !input.contains(',') {
        return Err(ValidationError::SpaceSeparatedRegions);
    }

    let regions: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect();

    let invalid: Vec<String> = regions
        .iter()
        .filter(|r| !KNOWN_REGIONS.contains(&r.as_str()) && !REGION_PATTERN.is_match(r))
        .cloned()
        .collect();

    if invalid.is_empty() {
        return Ok(regions);
    }

    let suggestions = invalid
        .iter()
        .filter_map(|bad| {
            let close = suggest_regions(bad);
            (!close.is_empty()).then(|| (bad.clone(), close))
        })
        .collect();
    Err(ValidationError::InvalidRegions {
        invalid,
        suggestions,
    })
}

/// Up to three known regions containing `bad`, or sharing its three-letter prefix.
fn suggest_regions(bad: &str) -> Vec<String> {
    let lowered = bad.to_lowercase();
    let prefix: String = lowered.chars().take(3).collect();
    KNOWN_REGIONS
        .iter()
        .filter(|known| known.contains(lowered.as_str()) || known.starts_with(prefix.as_str()))
        .map(|known| known.to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(3)
        .collect()
}

pub fn validate_profile(input: &str) -> Result<String, ValidationError> {
    let profile = input.trim();
    if PROFILE_PATTERN.is_match(profile) {
        Ok(profile.to_string())
    } else {
        Err(ValidationError::InvalidProfile(profile.to_string()))
    }
}

pub fn validate_output_format(input: &str) -> Result<OutputFormat, ValidationError> {
    match input.trim().to_lowercase().as_str() {
        "table" => Ok(OutputFormat::Table),
        "json" => Ok(OutputFormat::Json),
        other => Err(ValidationError::InvalidOutputFormat(other.to_string())),
    }
}

pub fn parse_toggle(input: &str) -> Result<bool, ValidationError> {
    match input.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Ok(true),
        "off" | "false" | "no" | "0" => Ok(false),
        other => Err(ValidationError::InvalidToggle(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_regions_accepts_known_and_pattern_regions() {
        assert_eq!(
            validate_regions("us-east-1, eu-west-2").unwrap(),
            vec!["us-east-1", "eu-west-2"]
        );
        // Not in the known list but well-formed.
        assert_eq!(validate_regions("eu-west-9").unwrap(), vec!["eu-west-9"]);
        assert_eq!(validate_regions("us-gov-west-1").unwrap(), vec!["us-gov-west-1"]);
        assert!(validate_regions("  ").unwrap().is_empty());
    }

    #[test]
    fn test_validate_regions_rejects_space_separated() {
        assert_eq!(
            validate_regions("eu-west-1 eu-west-2"),
            Err(ValidationError::SpaceSeparatedRegions)
        );
    }

    #[test]
    fn test_validate_regions_suggests_corrections() {
        match validate_regions("us-east-1,eu-wst-1") {
            Err(ValidationError::InvalidRegions {
                invalid,
                suggestions,
            }) => {
                assert_eq!(invalid, vec!["eu-wst-1"]);
                assert_eq!(suggestions.len(), 1);
                assert_eq!(
                    suggestions[0].1,
                    vec!["eu-central-1", "eu-central-2", "eu-north-1"]
                );
            }
            other => panic!("expected invalid regions, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_profile() {
        assert_eq!(validate_profile(" prod_admin-2 ").unwrap(), "prod_admin-2");
        assert!(matches!(
            validate_profile("bad profile"),
            Err(ValidationError::InvalidProfile(_))
        ));
        assert!(validate_profile("").is_err());
    }

    #[test]
    fn test_validate_output_format_and_toggle() {
        assert_eq!(validate_output_format("JSON"), Ok(OutputFormat::Json));
        assert_eq!(validate_output_format("table"), Ok(OutputFormat::Table));
        assert!(validate_output_format("yaml").is_err());
        assert_eq!(parse_toggle("on"), Ok(true));
        assert_eq!(parse_toggle("Off"), Ok(false));
        assert!(parse_toggle("maybe").is_err());
    }
}
