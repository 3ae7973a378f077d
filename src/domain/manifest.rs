//! Manifest parser
//!
//! Loads one declarative manifest (TOML or YAML) into a [`RawManifest`].
//! Parsing is a pure transform: duplicate requirement names are kept as-is,
//! and option values are validated later by the option engine.
//!
//! ```toml
//! settings = ["os", "compiler", "build_type", "arch"]
//! generators = "cmake"
//! requires = [
//!     ["openssl/1.1.1i", "override"],
//!     "qt/6.0.2",
//!     { ref = "pdcurses/3.9@zethon/stable", when = "os == Windows" },
//! ]
//!
//! [options]
//! "qt:shared" = true
//! ```

use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use super::error::ResolveError;
use super::requirement::{ConditionalRequirement, ManifestRequirement, Modifier, RequirementSpec};
use super::settings::{Clause, Predicate, SettingAxis};

/// Serialization format of a manifest document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifestFormat {
    #[default]
    Toml,
    Yaml,
}

impl ManifestFormat {
    /// Picks the format from a file extension, defaulting to TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => ManifestFormat::Yaml,
            _ => ManifestFormat::Toml,
        }
    }
}

/// An option assignment as declared, before value validation
#[derive(Debug, Clone, PartialEq)]
pub struct OptionEntry {
    pub package: String,
    pub key: String,
    pub value: serde_json::Value,
}

impl OptionEntry {
    /// Splits a namespaced `package:key` option name
    pub fn from_key(name: &str, value: serde_json::Value) -> Result<Self, ResolveError> {
        let invalid = || {
            ResolveError::malformed(format!(
                "option '{}' must have the form package:key",
                name
            ))
        };

        let (package, key) = name.split_once(':').ok_or_else(invalid)?;
        let (package, key) = (package.trim(), key.trim());
        if package.is_empty() || key.is_empty() || key.contains(':') {
            return Err(invalid());
        }

        Ok(Self {
            package: package.to_string(),
            key: key.to_string(),
            value,
        })
    }

    /// Parses a `package:key=value` assignment; the value stays a string
    pub fn parse_assignment(assignment: &str) -> Result<Self, ResolveError> {
        let (name, value) = assignment.split_once('=').ok_or_else(|| {
            ResolveError::malformed(format!(
                "option '{}' must have the form package:key=value",
                assignment
            ))
        })?;

        Self::from_key(name, serde_json::Value::String(value.trim().to_string()))
    }
}

/// A parsed manifest
#[derive(Debug, Clone, PartialEq)]
pub struct RawManifest {
    pub settings_axes: Vec<SettingAxis>,
    pub requirements: Vec<ManifestRequirement>,
    pub options: Vec<OptionEntry>,
    pub generators: BTreeSet<String>,
}

impl RawManifest {
    /// Parses manifest text in the given format
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self, ResolveError> {
        let document: ManifestDocument = match format {
            ManifestFormat::Toml => {
                toml::from_str(content).map_err(|e| ResolveError::malformed(e.message()))?
            }
            ManifestFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| ResolveError::malformed(e.to_string()))?
            }
        };

        Self::from_document(document)
    }

    fn from_document(document: ManifestDocument) -> Result<Self, ResolveError> {
        let declared = document
            .settings
            .ok_or_else(|| ResolveError::malformed("manifest has no settings section"))?;

        let mut settings_axes = Vec::new();
        for name in declared.into_vec() {
            let axis: SettingAxis = name.parse()?;
            if !settings_axes.contains(&axis) {
                settings_axes.push(axis);
            }
        }

        let missing: Vec<&str> = SettingAxis::ALL
            .iter()
            .filter(|axis| !settings_axes.contains(axis))
            .map(SettingAxis::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(ResolveError::malformed(format!(
                "settings must declare os, compiler, build_type and arch (missing: {})",
                missing.join(", ")
            )));
        }

        let requirements = document
            .requirements
            .into_iter()
            .map(RequirementEntry::into_requirement)
            .collect::<Result<Vec<_>, _>>()?;

        let options = match document.options {
            OptionsSection::Table(entries) => entries
                .into_iter()
                .map(|(name, value)| OptionEntry::from_key(&name, value))
                .collect::<Result<Vec<_>, _>>()?,
            OptionsSection::Assignments(assignments) => assignments
                .iter()
                .map(|assignment| OptionEntry::parse_assignment(assignment))
                .collect::<Result<Vec<_>, _>>()?,
        };

        let mut generators = BTreeSet::new();
        for name in document.generators.into_vec() {
            let name = name.trim();
            if name.is_empty() {
                return Err(ResolveError::malformed("generator names must not be empty"));
            }
            generators.insert(name.to_string());
        }

        Ok(Self {
            settings_axes,
            requirements,
            options,
            generators,
        })
    }
}

// =============================================================================
// Document shape
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestDocument {
    #[serde(default)]
    settings: Option<OneOrMany>,

    #[serde(default, alias = "requires")]
    requirements: Vec<RequirementEntry>,

    #[serde(default, alias = "default_options")]
    options: OptionsSection,

    #[serde(default)]
    generators: OneOrMany,
}

/// Either `"cmake"` or `["cmake", "json"]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl Default for OneOrMany {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(value) => vec![value],
            OneOrMany::Many(values) => values,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RequirementEntry {
    /// `"qt/6.0.2"`
    Plain(String),

    /// `["openssl/1.1.1i", "override"]`
    Tagged(String, String),

    /// `{ ref = "...", override = true, when = "..." }`
    Detailed(DetailedRequirement),
}

/// Misspelled keys are rejected rather than read as a plain requirement
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DetailedRequirement {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default, rename = "override")]
    pinned: bool,
    #[serde(default)]
    when: Option<Condition>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Condition {
    /// `"os == Windows && arch != x86"`
    Expression(String),
    /// `{ os = "Windows" }`
    Table(BTreeMap<String, String>),
}

impl Condition {
    fn into_predicate(self) -> Result<Predicate, ResolveError> {
        match self {
            Condition::Expression(expression) => expression.parse(),
            Condition::Table(table) => {
                let clauses = table
                    .into_iter()
                    .map(|(axis, value)| Ok(Clause::equals(axis.parse()?, value)))
                    .collect::<Result<Vec<_>, ResolveError>>()?;
                if clauses.is_empty() {
                    return Err(ResolveError::malformed("condition table must not be empty"));
                }
                Ok(Predicate::new(clauses))
            }
        }
    }
}

impl RequirementEntry {
    fn into_requirement(self) -> Result<ManifestRequirement, ResolveError> {
        let (reference, modifier, when) = match self {
            RequirementEntry::Plain(reference) => (reference, Modifier::Normal, None),
            RequirementEntry::Tagged(reference, modifier) => (reference, modifier.parse()?, None),
            RequirementEntry::Detailed(DetailedRequirement {
                reference,
                pinned,
                when,
            }) => {
                let modifier = if pinned {
                    Modifier::Override
                } else {
                    Modifier::Normal
                };
                (reference, modifier, when)
            }
        };

        let spec = RequirementSpec::new(reference.parse()?, modifier);

        Ok(match when {
            Some(condition) => ManifestRequirement::When(ConditionalRequirement {
                spec,
                predicate: condition.into_predicate()?,
            }),
            None => ManifestRequirement::Always(spec),
        })
    }
}

/// Option declarations, either a `package:key` table or a list of assignments
#[derive(Debug)]
enum OptionsSection {
    Table(Vec<(String, serde_json::Value)>),
    Assignments(Vec<String>),
}

impl Default for OptionsSection {
    fn default() -> Self {
        OptionsSection::Table(Vec::new())
    }
}

impl<'de> Deserialize<'de> for OptionsSection {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{MapAccess, SeqAccess, Visitor};

        struct OptionsVisitor;

        impl<'de> Visitor<'de> for OptionsVisitor {
            type Value = OptionsSection;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a table of package:key options or a list of package:key=value strings")
            }

            // Tables keep document order so later entries win
            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((name, value)) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push((name, value));
                }
                Ok(OptionsSection::Table(entries))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut assignments = Vec::new();
                while let Some(assignment) = seq.next_element::<String>()? {
                    assignments.push(assignment);
                }
                Ok(OptionsSection::Assignments(assignments))
            }
        }

        deserializer.deserialize_any(OptionsVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SETTINGS: &str = r#"settings = ["os", "compiler", "build_type", "arch"]"#;

    fn parse_toml(body: &str) -> Result<RawManifest, ResolveError> {
        RawManifest::parse(&format!("{}\n{}", SETTINGS, body), ManifestFormat::Toml)
    }

    #[test]
    fn parse_requirement_forms() {
        let manifest = parse_toml(
            r#"
requires = [
    ["openssl/1.1.1i", "override"],
    "qt/6.0.2",
    "libhunspell/1.7.0@owl/stable",
    { ref = "zlib/1.2.11", override = true },
]
"#,
        )
        .unwrap();

        let specs: Vec<_> = manifest.requirements.iter().map(|r| r.spec().clone()).collect();
        assert_eq!(specs.len(), 4);
        assert!(specs[0].is_override());
        assert_eq!(specs[0].version, "1.1.1i");
        assert!(!specs[1].is_override());
        assert_eq!(specs[2].channel.as_deref(), Some("owl/stable"));
        assert!(specs[3].is_override());
    }

    #[test]
    fn parse_conditional_requirements() {
        let manifest = parse_toml(
            r#"
requires = [
    { ref = "pdcurses/3.9@zethon/stable", when = "os == Windows" },
    { ref = "ncurses/6.1@conan/stable", when = { os = "Linux" } },
]
"#,
        )
        .unwrap();

        assert!(manifest
            .requirements
            .iter()
            .all(|r| matches!(r, ManifestRequirement::When(_))));
    }

    #[test]
    fn duplicate_names_are_kept() {
        let manifest = parse_toml(r#"requires = ["boost/1.68.0", "boost/1.74.0"]"#).unwrap();
        assert_eq!(manifest.requirements.len(), 2);
    }

    #[test]
    fn options_table_keeps_order() {
        let manifest = parse_toml(
            r#"
[default_options]
"qt:shared" = true
"boost:without_thread" = "True"
"boost:shared" = false
"#,
        )
        .unwrap();

        let names: Vec<_> = manifest
            .options
            .iter()
            .map(|o| format!("{}:{}", o.package, o.key))
            .collect();
        assert_eq!(names, vec!["qt:shared", "boost:without_thread", "boost:shared"]);
        assert_eq!(manifest.options[1].value, json!("True"));
    }

    #[test]
    fn options_as_assignment_list() {
        let manifest = parse_toml(r#"options = ["boost:shared=False", "qt:shared = True"]"#).unwrap();
        assert_eq!(manifest.options[0].value, json!("False"));
        assert_eq!(manifest.options[1].package, "qt");
        assert_eq!(manifest.options[1].value, json!("True"));
    }

    #[test]
    fn generators_string_or_list() {
        let single = parse_toml(r#"generators = "cmake""#).unwrap();
        assert!(single.generators.contains("cmake"));

        let many = parse_toml(r#"generators = ["json", "cmake", "json"]"#).unwrap();
        assert_eq!(many.generators.len(), 2);
    }

    #[test]
    fn missing_settings_is_malformed() {
        let result = RawManifest::parse(r#"requires = ["qt/6.0.2"]"#, ManifestFormat::Toml);
        assert!(matches!(result, Err(ResolveError::MalformedManifest(_))));
    }

    #[test]
    fn incomplete_settings_is_malformed() {
        let result = RawManifest::parse(r#"settings = ["os", "arch"]"#, ManifestFormat::Toml);
        match result {
            Err(ResolveError::MalformedManifest(message)) => {
                assert!(message.contains("compiler, build_type"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn unknown_axis_in_settings() {
        let result = RawManifest::parse(
            r#"settings = ["os", "compiler", "build_type", "arch", "libc"]"#,
            ManifestFormat::Toml,
        );
        assert_eq!(result, Err(ResolveError::UnknownSettingAxis("libc".to_string())));
    }

    #[test]
    fn bad_requirement_string_is_malformed() {
        let result = parse_toml(r#"requires = ["qt-6.0.2"]"#);
        assert!(matches!(result, Err(ResolveError::MalformedManifest(_))));
    }

    #[test]
    fn bad_modifier_is_malformed() {
        let result = parse_toml(r#"requires = [["openssl/1.1.1i", "pin"]]"#);
        assert!(matches!(result, Err(ResolveError::MalformedManifest(_))));
    }

    #[test]
    fn bad_option_key_is_malformed() {
        for body in [
            "[options]\n\"shared\" = true",
            "[options]\n\":shared\" = true",
            "[options]\n\"qt:\" = true",
            "options = [\"qt:shared\"]",
        ] {
            assert!(
                matches!(parse_toml(body), Err(ResolveError::MalformedManifest(_))),
                "expected malformed for {:?}",
                body
            );
        }
    }

    #[test]
    fn misspelled_requirement_key_is_malformed() {
        for body in [
            r#"requires = [{ ref = "openssl/1.1.1i", overide = true }]"#,
            r#"requires = [{ ref = "pdcurses/3.9", whne = "os == Windows" }]"#,
        ] {
            assert!(
                matches!(parse_toml(body), Err(ResolveError::MalformedManifest(_))),
                "expected malformed for {:?}",
                body
            );
        }

        let yaml = "settings: [os, compiler, build_type, arch]\nrequires:\n  - ref: qt/6.0.2\n    overrides: true\n";
        assert!(matches!(
            RawManifest::parse(yaml, ManifestFormat::Yaml),
            Err(ResolveError::MalformedManifest(_))
        ));
    }

    #[test]
    fn unknown_section_is_malformed() {
        let result = parse_toml(r#"build_requires = ["cmake/3.19.0"]"#);
        assert!(matches!(result, Err(ResolveError::MalformedManifest(_))));
    }

    #[test]
    fn parse_yaml_manifest() {
        let yaml = r#"
settings: [os, compiler, build_type, arch]
requires:
  - [openssl/1.1.1i, override]
  - qt/6.0.2
  - ref: ncurses/6.1@conan/stable
    when: os != Windows
options:
  qt:shared: true
  boost:without_test: false
generators: [cmake]
"#;

        let manifest = RawManifest::parse(yaml, ManifestFormat::Yaml).unwrap();
        assert_eq!(manifest.requirements.len(), 3);
        assert_eq!(manifest.options.len(), 2);
        assert_eq!(manifest.options[0].value, json!(true));
        assert!(manifest.generators.contains("cmake"));
    }

    #[test]
    fn format_from_path() {
        assert_eq!(ManifestFormat::from_path(Path::new("deps.yml")), ManifestFormat::Yaml);
        assert_eq!(ManifestFormat::from_path(Path::new("deps.yaml")), ManifestFormat::Yaml);
        assert_eq!(ManifestFormat::from_path(Path::new("deps.toml")), ManifestFormat::Toml);
        assert_eq!(ManifestFormat::from_path(Path::new("depfile")), ManifestFormat::Toml);
    }
}
