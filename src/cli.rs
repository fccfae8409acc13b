use clap::Parser;

use crate::config::{DEFAULT_MAX_MANIFEST_SIZE, DependencyPolicy, ExtractorConfig, ManifestSelection};
use crate::package::PackageFormat;

#[derive(Parser, Debug)]
#[command(name = "nupkg-meta")]
#[command(version)]
#[command(about = "Extract manifest metadata from NuGet packages", long_about = None)]
#[command(after_help = "Examples:\n  \
  nupkg-meta Foo.1.0.0.nupkg                     print metadata as JSON\n  \
  nupkg-meta --pretty Foo.1.0.0.nupkg            indented JSON\n  \
  nupkg-meta -l https://example.com/Foo.nupkg    list entries of a remote package")]
pub struct Cli {
    /// Package file path or HTTP URL
    #[arg(value_name = "FILE")]
    pub file: String,

    /// List archive entries instead of extracting metadata
    #[arg(short = 'l')]
    pub list: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Declared package format (default: inferred from the file extension)
    #[arg(long, value_name = "TAG")]
    pub format: Option<PackageFormat>,

    /// Largest declared manifest size to accept, in bytes
    #[arg(
        long,
        value_name = "BYTES",
        env = "NUPKG_MAX_MANIFEST_SIZE",
        default_value_t = DEFAULT_MAX_MANIFEST_SIZE
    )]
    pub max_manifest_size: u64,

    /// Fail when a dependency has no id instead of skipping it
    #[arg(long)]
    pub strict_dependencies: bool,

    /// Fail when the archive holds more than one root manifest
    #[arg(long)]
    pub reject_multiple_manifests: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.file.starts_with("http://") || self.file.starts_with("https://")
    }

    /// Format the package claims to be.
    pub fn declared_format(&self) -> PackageFormat {
        self.format.clone().unwrap_or_else(|| {
            let path = self.file.split(['?', '#']).next().unwrap_or(&self.file);
            PackageFormat::from_file_name(path)
        })
    }

    pub fn log_directive(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "debug",
            _ => "trace",
        }
    }

    pub fn extractor_config(&self) -> ExtractorConfig {
        ExtractorConfig::default()
            .with_max_manifest_size(self.max_manifest_size)
            .with_dependency_policy(if self.strict_dependencies {
                DependencyPolicy::Reject
            } else {
                DependencyPolicy::Skip
            })
            .with_manifest_selection(if self.reject_multiple_manifests {
                ManifestSelection::RejectMultiple
            } else {
                ManifestSelection::FirstValid
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_onto_config() {
        let cli = Cli::parse_from([
            "nupkg-meta",
            "--max-manifest-size",
            "1024",
            "--strict-dependencies",
            "--reject-multiple-manifests",
            "Foo.nupkg",
        ]);
        let config = cli.extractor_config();

        assert_eq!(config.max_manifest_size, 1024);
        assert_eq!(config.dependency_policy, DependencyPolicy::Reject);
        assert_eq!(config.manifest_selection, ManifestSelection::RejectMultiple);
    }

    #[test]
    fn format_is_inferred_unless_given() {
        let cli = Cli::parse_from(["nupkg-meta", "https://example.com/Foo.1.0.0.nupkg?sig=abc"]);
        assert!(cli.is_http_url());
        assert_eq!(cli.declared_format(), PackageFormat::Nuget);

        let cli = Cli::parse_from(["nupkg-meta", "--format", "maven", "Foo.nupkg"]);
        assert_eq!(cli.declared_format(), PackageFormat::Maven);
    }

    #[test]
    fn verbosity_selects_log_level() {
        assert_eq!(Cli::parse_from(["nupkg-meta", "a"]).log_directive(), "warn");
        assert_eq!(Cli::parse_from(["nupkg-meta", "-vv", "a"]).log_directive(), "trace");
    }
}
