use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::assembler::RenderOptions;
use crate::error::{ApiError, Result};

lazy_static::lazy_static! {
    /// Dotted Python identifier, such as `pkg.sub_mod`
    static ref MODULE_NAME: Regex = Regex::new(r"^[^\W\d]\w*(?:\.[^\W\d]\w*)*$").unwrap();
}

/// Prefix of environment variables overriding file settings.
pub const ENV_PREFIX: &str = "APIDOC";

/// A document to generate: its title and the root module it covers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootEntry {
    pub title: String,
    pub module: String,
}

/// A module to load and the file holding its source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleEntry {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Heading level of document titles
    pub level: usize,
    /// Emit anchors below section headings
    pub link: bool,
    /// Emit a table of contents
    pub toc: bool,
    /// Output directory
    pub dir: PathBuf,
    /// Print documents instead of writing them
    pub dry: bool,
    /// Documents to generate, in order
    pub roots: Vec<RootEntry>,
    /// Module sources, loaded in order
    pub modules: Vec<ModuleEntry>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            level: 1,
            link: true,
            toc: false,
            dir: PathBuf::from("docs"),
            dry: false,
            roots: Vec::new(),
            modules: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Load settings from an optional TOML file, then from `APIDOC_*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(config::Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        let settings = builder
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| ApiError::Config(e.to_string()))
    }

    /// Check heading level and every module name.
    pub fn validate(&self) -> Result<()> {
        if self.level == 0 {
            return Err(ApiError::Config(
                "heading level must be at least 1".to_string(),
            ));
        }
        for root in &self.roots {
            validate_module_name(&root.module)?;
        }
        for module in &self.modules {
            validate_module_name(&module.name)?;
        }
        Ok(())
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            level: self.level,
            link: self.link,
            toc: self.toc,
        }
    }

    /// Output file of the document of `root`.
    pub fn output_path(&self, root: &str) -> PathBuf {
        self.dir.join(format!("{}-api.md", root.replace('_', "-")))
    }
}

pub fn validate_module_name(name: &str) -> Result<()> {
    if MODULE_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ApiError::InvalidModuleName(name.to_string()))
    }
}

/// Parse a `Title=root` argument; a bare `root` is its own title.
pub fn parse_root(arg: &str) -> Result<RootEntry> {
    let (title, module) = match arg.split_once('=') {
        Some((title, "")) => (title, title),
        Some((title, module)) => (title, module),
        None => (arg, arg),
    };
    validate_module_name(module)?;
    Ok(RootEntry {
        title: title.to_string(),
        module: module.to_string(),
    })
}

/// Parse a `module=path` argument.
pub fn parse_module(arg: &str) -> Result<ModuleEntry> {
    let Some((name, path)) = arg.split_once('=') else {
        return Err(ApiError::Config(format!(
            "expected MODULE=PATH, got '{}'",
            arg
        )));
    };
    validate_module_name(name)?;
    Ok(ModuleEntry {
        name: name.to_string(),
        path: PathBuf::from(path),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.level, 1);
        assert!(config.link);
        assert_eq!(config.dir, PathBuf::from("docs"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_module_names() {
        assert!(validate_module_name("pkg.sub_mod").is_ok());
        assert!(validate_module_name("_private").is_ok());
        assert!(validate_module_name("1pkg").is_err());
        assert!(validate_module_name("pkg..mod").is_err());
        assert!(validate_module_name("pkg-name").is_err());
    }

    #[test]
    fn test_parse_root() {
        assert_eq!(
            parse_root("My Lib=my_lib").unwrap(),
            RootEntry {
                title: "My Lib".to_string(),
                module: "my_lib".to_string()
            }
        );
        assert_eq!(parse_root("pkg").unwrap().title, "pkg");
        assert!(parse_root("Title=not valid").is_err());
    }

    #[test]
    fn test_parse_module() {
        let entry = parse_module("pkg.mod=src/pkg/mod.py").unwrap();
        assert_eq!(entry.name, "pkg.mod");
        assert_eq!(entry.path, PathBuf::from("src/pkg/mod.py"));
        assert!(matches!(parse_module("pkg.mod"), Err(ApiError::Config(_))));
    }

    #[test]
    fn test_level_zero_is_rejected() {
        let config = ApiConfig {
            level: 0,
            ..ApiConfig::default()
        };
        assert!(matches!(config.validate(), Err(ApiError::Config(_))));
    }

    #[test]
    fn test_output_path() {
        let config = ApiConfig::default();
        assert_eq!(config.output_path("my_lib"), PathBuf::from("docs/my-lib-api.md"));
    }
}
