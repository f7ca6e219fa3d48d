//! Structs to serialize and deserialize the maf-rs config options.
//!

use std::io;
use std::path::{Path, PathBuf};

use clap::{Command, Parser};
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::{Deserialize, Serialize};
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry, fmt};

use crate::error::Error::{ArgParseError, TracingError};
use crate::error::Result;

/// The usage string for maf-rs.
pub const USAGE: &str =
  "To configure maf-rs use a config file or environment variables prefixed with MAF_. \
See the documentation of the maf-config crate for more information.";

/// Default capacity of the decompressed-chunk LRU cache (§4.8 of the spec).
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// The command line arguments allowed for the maf-rs executables.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = USAGE)]
struct Args {
  #[arg(
    short,
    long,
    env = "MAF_CONFIG",
    help = "Set the location of the config file"
  )]
  config: Option<PathBuf>,
  #[arg(short, long, exclusive = true, help = "Print a default config file")]
  print_default_config: bool,
}

/// Location of a TAF file and its companion `.tai` index (§6: `tafGzLocation` / `taiLocation`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TafLocation {
  pub taf_gz_location: PathBuf,
  pub tai_location: PathBuf,
}

/// Location of a bgzip-compressed, Tabix-indexed MafTabix BED (§6: `bedGzLocation` / `indexLocation`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MafTabixLocation {
  pub bed_gz_location: PathBuf,
  pub index_location: PathBuf,
}

/// A single entry of the `{id, label?, color?}[]` variant of the `samples` config key.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SampleDescriptor {
  pub id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
}

/// The `samples` config key (§6), either a bare id list or a described list. Both forms carry
/// display order and act as the visibility filter used by the FASTA materializer and the pixel-
/// span emitter (§10 of `SPEC_FULL.md`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum SampleSelection {
  Ids(Vec<String>),
  Described(Vec<SampleDescriptor>),
}

impl Default for SampleSelection {
  fn default() -> Self {
    Self::Ids(Vec::new())
  }
}

impl SampleSelection {
  /// The sample ids in display order, regardless of which variant was configured.
  pub fn ids(&self) -> Vec<&str> {
    match self {
      Self::Ids(ids) => ids.iter().map(String::as_str).collect(),
      Self::Described(described) => described.iter().map(|d| d.id.as_str()).collect(),
    }
  }

  /// True if no samples were configured, i.e. "all rows are visible".
  pub fn is_empty(&self) -> bool {
    match self {
      Self::Ids(ids) => ids.is_empty(),
      Self::Described(described) => described.is_empty(),
    }
  }
}

/// Top-level configuration for the MAF query engine (§6 of `spec.md`).
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
  pub taf: Option<TafLocation>,
  pub big_maf: Option<PathBuf>,
  pub maf_tabix: Option<MafTabixLocation>,
  pub samples: SampleSelection,
  pub nh_location: Option<PathBuf>,
  pub ref_assembly_name: Option<String>,
  #[serde(default = "default_cache_capacity")]
  pub cache_capacity: usize,
}

fn default_cache_capacity() -> usize {
  DEFAULT_CACHE_CAPACITY
}

// `#[serde(default = "...")]` only fires when a field is missing from deserialized input; it has
// no bearing on this struct's own `Default` impl, so that impl is hand-written to keep the two in
// sync.
impl Default for Config {
  fn default() -> Self {
    Self {
      taf: None,
      big_maf: None,
      maf_tabix: None,
      samples: SampleSelection::default(),
      nh_location: None,
      ref_assembly_name: None,
      cache_capacity: DEFAULT_CACHE_CAPACITY,
    }
  }
}

impl Config {
  pub fn samples(&self) -> &SampleSelection {
    &self.samples
  }

  pub fn ref_assembly_name(&self) -> Option<&str> {
    self.ref_assembly_name.as_deref()
  }

  pub fn cache_capacity(&self) -> usize {
    self.cache_capacity
  }

  /// Parse command line arguments, returning the config path to load, or `None` if the process
  /// should exit early (e.g. `--print-default-config` was passed).
  pub fn parse_args_with_command(augment_args: Command) -> Result<Option<PathBuf>> {
    let args = Args::from_arg_matches(&augment_args.get_matches())
      .map_err(|err| ArgParseError(err.to_string()))?;

    if args.print_default_config {
      println!(
        "{}",
        toml::to_string_pretty(&Config::default()).map_err(|err| ArgParseError(err.to_string()))?
      );
      return Ok(None);
    }

    Ok(Some(args.config.unwrap_or_else(|| PathBuf::from("config.toml"))))
  }

  pub fn parse_args() -> Option<PathBuf> {
    Args::try_parse().ok().and_then(|args| args.config)
  }

  /// Read a config from a toml file, falling back to `MAF_`-prefixed environment variables.
  pub fn from_path(path: &Path) -> io::Result<Self> {
    Figment::new()
      .merge(Toml::file(path))
      .merge(Env::prefixed("MAF_").split("_"))
      .extract()
      .map_err(|err| io::Error::other(err.to_string()))
  }

  /// Set up a global tracing subscriber, following the teacher's registry + env-filter layering.
  pub fn setup_tracing(&self) -> Result<()> {
    let subscriber = Registry::default()
      .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
      .with(fmt::layer());

    set_global_default(subscriber).map_err(|err| TracingError(err.to_string()))
  }
}

use clap::FromArgMatches;

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_config_has_default_cache_capacity() {
    let config = Config::default();
    assert_eq!(config.cache_capacity(), DEFAULT_CACHE_CAPACITY);
  }

  #[test]
  fn sample_selection_ids_from_bare_list() {
    let selection = SampleSelection::Ids(vec!["hg38".to_string(), "mm10".to_string()]);
    assert_eq!(selection.ids(), vec!["hg38", "mm10"]);
    assert!(!selection.is_empty());
  }

  #[test]
  fn sample_selection_ids_from_described_list() {
    let selection = SampleSelection::Described(vec![
      SampleDescriptor {
        id: "hg38".to_string(),
        label: Some("Human".to_string()),
        color: None,
      },
      SampleDescriptor {
        id: "mm10".to_string(),
        label: None,
        color: Some("#ff0000".to_string()),
      },
    ]);
    assert_eq!(selection.ids(), vec!["hg38", "mm10"]);
  }

  #[test]
  fn sample_selection_default_is_empty() {
    assert!(SampleSelection::default().is_empty());
  }

  #[test]
  fn config_round_trips_through_toml() {
    let config = Config {
      taf: Some(TafLocation {
        taf_gz_location: PathBuf::from("/data/alignment.taf.gz"),
        tai_location: PathBuf::from("/data/alignment.tai"),
      }),
      big_maf: None,
      maf_tabix: None,
      samples: SampleSelection::Ids(vec!["hg38".to_string()]),
      nh_location: None,
      ref_assembly_name: Some("hg38".to_string()),
      cache_capacity: 50,
    };

    let serialized = toml::to_string(&config).unwrap();
    let deserialized: Config = toml::from_str(&serialized).unwrap();
    assert_eq!(deserialized.ref_assembly_name(), Some("hg38"));
    assert_eq!(deserialized.cache_capacity(), 50);
  }
}
