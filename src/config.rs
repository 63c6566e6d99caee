use crate::defaults;
use crate::error::{IpaError, Result};
use crate::language;
use crate::types::ToneNotation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Language assumed when an utterance carries no hint.
    pub default_language: String,
    pub render: RenderConfig,
    pub assembly: AssemblyConfig,
    pub tone: ToneConfig,
    pub stress: StressConfig,
    pub length: LengthConfig,
    pub mapping: MappingConfig,
    pub rules: RulesConfig,
    pub registry: RegistryConfig,
    /// Per-language overrides of any section above, plus `rule_set`.
    /// Keys are normalized language codes.
    #[serde(deserialize_with = "normalized_languages")]
    pub languages: BTreeMap<String, toml::Table>,
}

/// Uncertainty rendering thresholds
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub confident_min: f32,
    pub uncertain_min: f32,
    pub max_alternatives: usize,
}

/// Transcript assembly behavior
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssemblyConfig {
    /// Collapse runs of identical glyphs into one long glyph.
    pub collapse_repeats: bool,
    /// Merge duplicated glyphs at adjacent segment boundaries.
    pub smooth_boundaries: bool,
    pub boundary_tolerance_ms: u64,
}

/// Tone quantization
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToneConfig {
    pub enabled: bool,
    pub levels: u8,
    pub notation: ToneNotation,
    /// Fixed pitch range; derived from each utterance when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_floor_hz: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_ceiling_hz: Option<f32>,
}

/// Stress assignment over supplied syllables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StressConfig {
    pub enabled: bool,
    pub secondary_ratio: f32,
}

/// Per-language phone duration distribution for length marking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LengthConfig {
    pub mean_ms: f32,
    pub stddev_ms: f32,
    pub z_threshold: f32,
}

/// Cluster-to-IPA mapping
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MappingConfig {
    pub distance_threshold: f32,
    /// Directory of persisted mapping tables; in-memory only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<PathBuf>,
}

/// Allophone rule sources
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RulesConfig {
    /// Load the built-in rule sets.
    pub builtin: bool,
    /// Additional rule file layered on the built-ins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Symbol inventory extension
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RegistryConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inventory: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_language: defaults::UNKNOWN_LANGUAGE.to_string(),
            render: RenderConfig::default(),
            assembly: AssemblyConfig::default(),
            tone: ToneConfig::default(),
            stress: StressConfig::default(),
            length: LengthConfig::default(),
            mapping: MappingConfig::default(),
            rules: RulesConfig::default(),
            registry: RegistryConfig::default(),
            languages: BTreeMap::new(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            confident_min: defaults::CONFIDENT_MIN,
            uncertain_min: defaults::UNCERTAIN_MIN,
            max_alternatives: defaults::MAX_ALTERNATIVES,
        }
    }
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            collapse_repeats: false,
            smooth_boundaries: true,
            boundary_tolerance_ms: defaults::BOUNDARY_TOLERANCE_MS,
        }
    }
}

impl Default for ToneConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            levels: defaults::TONE_LEVELS,
            notation: ToneNotation::Level,
            pitch_floor_hz: None,
            pitch_ceiling_hz: None,
        }
    }
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            secondary_ratio: defaults::SECONDARY_STRESS_RATIO,
        }
    }
}

impl Default for LengthConfig {
    fn default() -> Self {
        Self {
            mean_ms: defaults::LENGTH_MEAN_MS,
            stddev_ms: defaults::LENGTH_STDDEV_MS,
            z_threshold: defaults::LENGTH_Z_THRESHOLD,
        }
    }
}

impl LengthConfig {
    /// Duration above which a phone is marked long.
    pub fn threshold_ms(&self) -> f32 {
        self.mean_ms + self.z_threshold * self.stddev_ms
    }
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            distance_threshold: defaults::FEATURE_DISTANCE_THRESHOLD,
            store_dir: None,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            path: None,
        }
    }
}

/// Fully resolved settings for one language.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct LanguageProfile {
    #[serde(skip)]
    pub language: String,
    /// Rule set to use instead of the language's own.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<String>,
    pub render: RenderConfig,
    pub assembly: AssemblyConfig,
    pub tone: ToneConfig,
    pub stress: StressConfig,
    pub length: LengthConfig,
    pub mapping: MappingConfig,
}

impl LanguageProfile {
    pub fn validate(&self) -> Result<()> {
        let scope = if self.language.is_empty() {
            String::new()
        } else {
            format!("languages.{}.", self.language)
        };
        let render = &self.render;
        if !(0.0..=1.0).contains(&render.confident_min) {
            return Err(IpaError::invalid_value(
                format!("{scope}render.confident_min"),
                "must be in [0, 1]",
            ));
        }
        if !(0.0..=1.0).contains(&render.uncertain_min) {
            return Err(IpaError::invalid_value(
                format!("{scope}render.uncertain_min"),
                "must be in [0, 1]",
            ));
        }
        if render.uncertain_min > render.confident_min {
            return Err(IpaError::invalid_value(
                format!("{scope}render.uncertain_min"),
                "must not exceed confident_min",
            ));
        }
        if !(2..=9).contains(&self.tone.levels) {
            return Err(IpaError::invalid_value(
                format!("{scope}tone.levels"),
                "must be between 2 and 9",
            ));
        }
        if let (Some(floor), Some(ceiling)) = (self.tone.pitch_floor_hz, self.tone.pitch_ceiling_hz)
            && floor >= ceiling
        {
            return Err(IpaError::invalid_value(
                format!("{scope}tone.pitch_floor_hz"),
                "must be below pitch_ceiling_hz",
            ));
        }
        if !(self.stress.secondary_ratio > 0.0 && self.stress.secondary_ratio <= 1.0) {
            return Err(IpaError::invalid_value(
                format!("{scope}stress.secondary_ratio"),
                "must be in (0, 1]",
            ));
        }
        if self.length.stddev_ms < 0.0 {
            return Err(IpaError::invalid_value(
                format!("{scope}length.stddev_ms"),
                "must not be negative",
            ));
        }
        if self.mapping.distance_threshold < 0.0 {
            return Err(IpaError::invalid_value(
                format!("{scope}mapping.distance_threshold"),
                "must not be negative",
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML or invalid values.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(IpaError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - IPAFLOW_LANGUAGE → default_language
    /// - IPAFLOW_RULES → rules.path
    /// - IPAFLOW_MAPPING_DIR → mapping.store_dir
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(language) = std::env::var("IPAFLOW_LANGUAGE")
            && !language.is_empty()
        {
            self.default_language = language::normalize(Some(&language));
        }

        if let Ok(rules) = std::env::var("IPAFLOW_RULES")
            && !rules.is_empty()
        {
            self.rules.path = Some(PathBuf::from(rules));
        }

        if let Ok(dir) = std::env::var("IPAFLOW_MAPPING_DIR")
            && !dir.is_empty()
        {
            self.mapping.store_dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/ipaflow/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ipaflow")
            .join("config.toml")
    }

    /// Check every profile, global and per language.
    pub fn validate(&self) -> Result<()> {
        self.profile(defaults::UNKNOWN_LANGUAGE)?.validate()?;
        for code in self.languages.keys() {
            if language::is_unknown(code) || language::normalize(Some(code)) != *code {
                return Err(IpaError::invalid_value(
                    format!("languages.{code}"),
                    "not a normalized language code",
                ));
            }
            self.profile(code)?.validate()?;
        }
        Ok(())
    }

    /// Resolve the settings for a language.
    ///
    /// The global sections are overlaid with `[languages.<base>]` and then
    /// `[languages.<code>]`, so `pt-br` inherits from `pt`.
    pub fn profile(&self, code: &str) -> Result<LanguageProfile> {
        let code = language::normalize(Some(code));
        let mut merged = toml::Table::new();
        merged.insert("render".into(), to_value(&self.render)?);
        merged.insert("assembly".into(), to_value(&self.assembly)?);
        merged.insert("tone".into(), to_value(&self.tone)?);
        merged.insert("stress".into(), to_value(&self.stress)?);
        merged.insert("length".into(), to_value(&self.length)?);
        merged.insert("mapping".into(), to_value(&self.mapping)?);

        for key in language::fallback_chain(&code).iter().rev() {
            if let Some(overrides) = self.languages.get(key) {
                merge_tables(&mut merged, overrides);
            }
        }

        let mut profile: LanguageProfile = toml::Value::Table(merged).try_into()?;
        profile.language = code;
        Ok(profile)
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| IpaError::ConfigParse {
            message: e.to_string(),
        })
    }
}

fn to_value<T: Serialize>(section: &T) -> Result<toml::Value> {
    toml::Value::try_from(section).map_err(|e| IpaError::ConfigParse {
        message: e.to_string(),
    })
}

/// `[languages.*]` keyed by normalized code, so `[languages.pt_BR]` applies to `pt-br`.
fn normalized_languages<'de, D>(
    deserializer: D,
) -> std::result::Result<BTreeMap<String, toml::Table>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = BTreeMap::<String, toml::Table>::deserialize(deserializer)?;
    let mut languages = BTreeMap::new();
    for (key, table) in raw {
        let code = language::normalize(Some(&key));
        if languages.insert(code.clone(), table).is_some() {
            return Err(serde::de::Error::custom(format!(
                "language '{key}' is configured twice (as '{code}')"
            )));
        }
    }
    Ok(languages)
}

fn merge_tables(base: &mut toml::Table, overlay: &toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(nested)) => {
                merge_tables(existing, nested);
            }
            _ => {
                base.insert(key.clone(), value.clone());
            }
        }
    }
}
