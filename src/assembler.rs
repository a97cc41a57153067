//! Document assembly: one Markdown reference per root module.

use log::warn;
use std::collections::HashSet;

use crate::markdown::{code, esc_underscore, link_id, table};
use crate::symbols::{is_within, Fragment, ResolvedTable, Symbol, SymbolKind};

/// How sections are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOptions {
    /// Heading level of the document title; sections go one level deeper.
    pub level: usize,
    /// Emit an `<a id>` anchor below each heading.
    pub link: bool,
    /// Start the document with a table of contents.
    pub toc: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            level: 1,
            link: true,
            toc: false,
        }
    }
}

fn anchor(name: &str) -> String {
    format!("\n<a id=\"{}\"></a>", link_id(name))
}

/// Whether `doc` mentions `[title]` as a shortcut reference link.
///
/// Escaped brackets, inline links, subscripts such as `list[title]` and
/// link definitions do not count.
fn mentions(doc: &str, title: &str) -> bool {
    let pattern = format!("[{}]", title);
    doc.match_indices(&pattern).any(|(at, _)| {
        let before = doc[..at].chars().next_back();
        let after = doc[at + pattern.len()..].chars().next();
        let attached = before.is_some_and(|c| c == '\\' || c == '_' || c == ']' || c.is_alphanumeric());
        !attached && !matches!(after, Some('(' | '[' | ':'))
    })
}

/// Name of a symbol relative to its owning module.
fn short_name<'n>(name: &'n str, symbol: &Symbol) -> &'n str {
    name.strip_prefix(symbol.root.as_str())
        .and_then(|rest| rest.strip_prefix('.'))
        .unwrap_or(name)
}

impl ResolvedTable {
    /// Public sections below `root`, in document order.
    pub fn sections(&self, root: &str) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .table
            .symbols()
            .filter(|(name, symbol)| {
                symbol.kind() != SymbolKind::Field && is_within(name, root) && self.is_public(name)
            })
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_by_cached_key(|name| self.sort_key(name));
        names
    }

    /// Assemble the body of the reference of `root`, empty when nothing
    /// below it is public.
    pub fn compile(&self, root: &str, options: &RenderOptions) -> String {
        let names = self.sections(root);
        if names.is_empty() {
            return String::new();
        }
        let mut docs = Vec::with_capacity(names.len() + 1);
        if options.toc {
            docs.push(self.table_of_contents(&names, options));
        }
        for name in &names {
            let Some(symbol) = self.table.symbol(name) else {
                continue;
            };
            if symbol.docstring.is_none() {
                warn!("Missing documentation for {}", name);
            }
            docs.push(self.section(name, symbol, options));
        }
        let mut doc = docs
            .iter()
            .map(|section| section.trim_end())
            .collect::<Vec<_>>()
            .join("\n\n");
        doc.push('\n');
        if options.link {
            let references = self.references(&names, &doc);
            if !references.is_empty() {
                doc.push('\n');
                doc.push_str(&references);
            }
        }
        doc
    }

    /// The complete document of `root` under the title `<title> API`.
    ///
    /// Returns `None` (and logs a warning) when `root` documents nothing.
    pub fn render_document(&self, title: &str, root: &str, options: &RenderOptions) -> Option<String> {
        let body = self.compile(root, options);
        if body.is_empty() {
            warn!("'{}' can not be found", root);
            return None;
        }
        Some(format!("{} {} API\n\n{}", "#".repeat(options.level), title, body))
    }

    fn section(&self, name: &str, symbol: &Symbol, options: &RenderOptions) -> String {
        let mut doc = String::new();
        match &symbol.fragment {
            Fragment::Module => {
                doc.push_str(&format!("{} Module `{}`", "#".repeat(options.level + 1), name));
                if options.link {
                    doc.push_str(&anchor(name));
                }
                doc.push_str("\n\n");
                if let Some(docstring) = &symbol.docstring {
                    doc.push_str(docstring);
                    doc.push_str("\n\n");
                }
                doc.push_str(&self.constants(name));
            }
            Fragment::Function { tables, .. } | Fragment::Class { tables } => {
                let short = short_name(name, symbol);
                let depth = if short.contains('.') { 3 } else { 2 };
                let title = match symbol.fragment {
                    Fragment::Function { is_async: true, .. } => {
                        format!("async {}()", esc_underscore(short))
                    }
                    Fragment::Function { .. } => format!("{}()", esc_underscore(short)),
                    _ => format!("class {}", esc_underscore(short)),
                };
                doc.push_str(&format!(
                    "{} {}\n\n*Full name:* `{}`",
                    "#".repeat(options.level + depth),
                    title,
                    name
                ));
                if options.link {
                    doc.push_str(&anchor(name));
                }
                doc.push_str("\n\n");
                doc.push_str(tables);
                if let Some(docstring) = &symbol.docstring {
                    doc.push_str(docstring);
                }
            }
            Fragment::Field { .. } => {}
        }
        doc
    }

    /// `Constants | Type` table of the public constants owned by `module`.
    fn constants(&self, module: &str) -> String {
        let rows: Vec<Vec<String>> = self
            .table
            .symbols()
            .filter(|(name, symbol)| symbol.root == module && self.is_public(name))
            .filter_map(|(name, symbol)| match &symbol.fragment {
                Fragment::Field { type_hint } => {
                    Some(vec![code(short_name(name, symbol)), code(type_hint)])
                }
                _ => None,
            })
            .collect();
        if rows.is_empty() {
            String::new()
        } else {
            table(&["Constants", "Type"], rows)
        }
    }

    /// Reference definitions for every section mentioned as `[full.name]`
    /// or, when unambiguous, by its short name.
    fn references(&self, names: &[&str], doc: &str) -> String {
        let mut defined = HashSet::new();
        let mut references = String::new();
        for name in names {
            let Some(symbol) = self.table.symbol(name) else {
                continue;
            };
            let title = if mentions(doc, name) {
                *name
            } else if symbol.is_module() {
                continue;
            } else {
                let short = short_name(name, symbol);
                if names.contains(&short) || !mentions(doc, short) {
                    continue;
                }
                short
            };
            if defined.insert(title) {
                references.push_str(&format!("[{}]: #{}\n", title, link_id(name)));
            }
        }
        references
    }

    fn table_of_contents(&self, names: &[&str], options: &RenderOptions) -> String {
        let mut lines = vec!["**Table of contents:**".to_string()];
        for name in names {
            let Some(symbol) = self.table.symbol(name) else {
                continue;
            };
            let (depth, text) = if symbol.is_module() {
                (0, esc_underscore(name))
            } else {
                let short = short_name(name, symbol);
                (1 + short.matches('.').count(), esc_underscore(short))
            };
            let indent = " ".repeat(4 * depth);
            if options.link {
                lines.push(format!("{}+ [{}](#{})", indent, text, link_id(name)));
            } else {
                lines.push(format!("{}+ {}", indent, text));
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::{ModuleSource, TableBuilder};

    fn resolved(modules: &[(&str, &str)]) -> ResolvedTable {
        let mut builder = TableBuilder::new();
        for (name, source) in modules {
            builder.parse(&ModuleSource::new(*name, *source)).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn test_module_section_with_constants() {
        let table = resolved(&[(
            "m",
            "\"\"\"Module doc.\"\"\"\nMAX = 3\n_MIN = 1\ndef run(): ...\n",
        )]);
        let doc = table.compile("m", &RenderOptions::default());
        assert!(doc.starts_with(
            "## Module `m`\n<a id=\"m\"></a>\n\nModule doc.\n\n| Constants | Type |\n|:---------:|:----:|\n| `MAX` | `int` |\n\n### run()"
        ));
        assert!(!doc.contains("_MIN"));
    }

    #[test]
    fn test_nested_heading_depth_and_async() {
        let table = resolved(&[(
            "m",
            "class Client:\n    \"\"\"A client.\"\"\"\n    async def fetch_all_items(self): ...\n",
        )]);
        let options = RenderOptions {
            level: 2,
            link: false,
            toc: false,
        };
        let doc = table.compile("m", &options);
        assert!(doc.contains("#### class Client\n\n*Full name:* `m.Client`\n\nA client."));
        assert!(doc.contains("##### async Client.fetch\\_all\\_items()\n\n*Full name:* `m.Client.fetch_all_items`\n\n"));
        assert!(!doc.contains("<a id"));
    }

    #[test]
    fn test_table_of_contents() {
        let table = resolved(&[("m", "class A:\n    def b(self): ...\n")]);
        let options = RenderOptions {
            toc: true,
            ..RenderOptions::default()
        };
        let doc = table.compile("m", &options);
        assert!(doc.starts_with(
            "**Table of contents:**\n+ [m](#m)\n    + [A](#m-a)\n        + [A.b](#m-a-b)\n\n## Module `m`"
        ));
    }

    #[test]
    fn test_mentions() {
        assert!(mentions("See [m.Client].", "m.Client"));
        assert!(mentions("[helper] does it", "helper"));
        assert!(!mentions("not \\[helper]", "helper"));
        assert!(!mentions("[helper](#m-helper)", "helper"));
        assert!(!mentions("list[helper]", "helper"));
        assert!(!mentions("[helper]: #m-helper", "helper"));
    }

    #[test]
    fn test_reference_links_are_appended() {
        let table = resolved(&[(
            "m",
            "\"\"\"See [m.Client] and [helper].\"\"\"\nclass Client:\n    \"\"\"A client.\"\"\"\ndef helper(items: list[Client]) -> None: ...\n",
        )]);
        let doc = table.compile("m", &RenderOptions::default());
        assert!(doc.ends_with(
            "| `list[Client]` | `None` |\n\n[m.Client]: #m-client\n[helper]: #m-helper\n"
        ));

        let options = RenderOptions {
            link: false,
            ..RenderOptions::default()
        };
        assert!(!table.compile("m", &options).contains("]: #"));
    }

    #[test]
    fn test_missing_root_renders_nothing() {
        let table = resolved(&[("m", "def f(): ...\n")]);
        assert_eq!(table.render_document("Other", "other", &RenderOptions::default()), None);
        let doc = table
            .render_document("M", "m", &RenderOptions::default())
            .unwrap();
        assert!(doc.starts_with("# M API\n\n## Module `m`"));
        assert!(doc.ends_with("|\n") && !doc.ends_with("\n\n"));
    }

    #[test]
    fn test_root_filter_respects_dot_boundary() {
        let table = resolved(&[("pkg", "def f(): ...\n"), ("pkg2", "def g(): ...\n")]);
        let sections = table.sections("pkg");
        assert_eq!(sections, vec!["pkg", "pkg.f"]);
    }
}
