//! File-level collaborator: reads module sources and writes documents.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::builder::{ModuleSource, TableBuilder};
use crate::config::{ApiConfig, ModuleEntry};

/// A `__init__.py`/`__init__.pyi` file is a package.
fn is_package_path(path: &Path) -> bool {
    path.file_stem().and_then(|stem| stem.to_str()) == Some("__init__")
}

/// Parse every module into its own partial table and merge them in order.
///
/// An unreadable file only drops that module; a syntax error aborts.
pub fn load_modules(modules: &[ModuleEntry]) -> Result<TableBuilder> {
    let mut builder = TableBuilder::new();
    for entry in modules {
        let source = match fs::read_to_string(&entry.path) {
            Ok(source) => source,
            Err(e) => {
                warn!("no source or module for {} ({})", entry.name, e);
                continue;
            }
        };
        debug!("{} <= {}", entry.name, entry.path.display());
        let mut module = ModuleSource::new(entry.name.as_str(), source);
        if is_package_path(&entry.path) {
            module = module.package();
        }
        let mut partial = TableBuilder::new();
        partial
            .parse(&module)
            .with_context(|| format!("Failed to parse {}", entry.path.display()))?;
        builder
            .merge(partial)
            .with_context(|| format!("Failed to merge module {}", entry.name))?;
    }
    Ok(builder)
}

/// Generate one document per configured root.
///
/// Documents are written below `config.dir` unless `config.dry` is set;
/// either way the generated documents are returned in root order.
pub fn gen_api(config: &ApiConfig, docstrings: Option<&HashMap<String, String>>) -> Result<Vec<String>> {
    config.validate()?;
    let mut builder = load_modules(&config.modules)?;
    if let Some(docstrings) = docstrings {
        for module in &config.modules {
            builder.load_docstring(&module.name, docstrings);
        }
    }
    let table = builder.finish();
    let options = config.render_options();

    if !config.dry && !config.dir.is_dir() {
        debug!("Create directory: {}", config.dir.display());
        fs::create_dir_all(&config.dir)
            .with_context(|| format!("Failed to create {}", config.dir.display()))?;
    }

    let mut docs = Vec::with_capacity(config.roots.len());
    for root in &config.roots {
        debug!("Load root: {} ({})", root.module, root.title);
        let Some(doc) = table.render_document(&root.title, &root.module, &options) else {
            continue;
        };
        if !config.dry {
            let path = config.output_path(&root.module);
            debug!("Write file: {}", path.display());
            fs::write(&path, &doc).with_context(|| format!("Failed to write {}", path.display()))?;
        }
        docs.push(doc);
    }
    info!("Generated {} of {} documents", docs.len(), config.roots.len());
    Ok(docs)
}

/// Read a JSON map of full dotted names to docstrings.
pub fn load_docstrings(path: &Path) -> Result<HashMap<String, String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read docstrings from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse docstrings in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_paths() {
        assert!(is_package_path(Path::new("pkg/__init__.py")));
        assert!(is_package_path(Path::new("pkg/__init__.pyi")));
        assert!(!is_package_path(Path::new("pkg/mod.py")));
    }
}
