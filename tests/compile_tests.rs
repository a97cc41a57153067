//! End-to-end compilation of in-memory modules into reference documents.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag};

use apidoc_ultra::{ModuleSource, RenderOptions, ResolvedTable, TableBuilder};

fn resolved(modules: &[(&str, &str, bool)]) -> ResolvedTable {
    let mut builder = TableBuilder::new();
    for (name, source, is_package) in modules {
        let mut module = ModuleSource::new(*name, *source);
        if *is_package {
            module = module.package();
        }
        builder.parse(&module).unwrap();
    }
    builder.finish()
}

#[test]
fn test_single_function_document() {
    let table = resolved(&[(
        "demo",
        "\"\"\"Demo module.\"\"\"\n\ndef add(a: int, b: int = 1) -> int:\n    \"\"\"Add numbers.\"\"\"\n\ndef _hidden(): ...\n",
        false,
    )]);
    let doc = table
        .render_document("Demo", "demo", &RenderOptions::default())
        .unwrap();
    assert_eq!(
        doc,
        "# Demo API\n\n\
         ## Module `demo`\n<a id=\"demo\"></a>\n\nDemo module.\n\n\
         ### add()\n\n*Full name:* `demo.add`\n<a id=\"demo-add\"></a>\n\n\
         | a | b | return |\n|:---:|:---:|:------:|\n| `int` | `int` | `int` |\n|   | `1` |   |\n\n\
         Add numbers.\n"
    );
}

#[test]
fn test_functions_sorted_case_insensitively() {
    let table = resolved(&[(
        "m",
        "def Plain():\n    \"\"\"Example.\"\"\"\n\ndef f(x, y=1): ...\n",
        false,
    )]);
    let doc = table
        .render_document("M", "m", &RenderOptions::default())
        .unwrap();
    assert_eq!(
        doc,
        "# M API\n\n\
         ## Module `m`\n<a id=\"m\"></a>\n\n\
         ### f()\n\n*Full name:* `m.f`\n<a id=\"m-f\"></a>\n\n\
         | x | y | return |\n|:---:|:---:|:------:|\n| `Any` | `Any` | `Any` |\n|   | `1` |   |\n\n\
         ### Plain()\n\n*Full name:* `m.Plain`\n<a id=\"m-plain\"></a>\n\n\
         | return |\n|:------:|\n| `Any` |\n\n\
         Example.\n"
    );
}

#[test]
fn test_docstring_mentions_become_reference_links() {
    let table = resolved(&[
        ("pkg", "\"\"\"Start with [Engine].\"\"\"\nfrom .core import Engine\n", true),
        ("pkg.core", "class Engine:\n    \"\"\"See [pkg.Engine.run].\"\"\"\n    def run(self): ...\n", false),
    ]);
    let doc = table
        .render_document("Pkg", "pkg", &RenderOptions::default())
        .unwrap();
    assert!(doc.ends_with("\n\n[Engine]: #pkg-engine\n[pkg.Engine.run]: #pkg-engine-run\n"));
}

#[test]
fn test_export_set_limits_document() {
    let table = resolved(&[(
        "lib",
        "__all__ = ['Client']\n\nclass Client:\n    def connect(self) -> None: ...\n\nclass Internal: ...\n\ndef helper(): ...\n",
        false,
    )]);
    let sections = table.sections("lib");
    assert_eq!(sections, vec!["lib", "lib.Client", "lib.Client.connect"]);
}

#[test]
fn test_reexported_class_is_documented_once() {
    let table = resolved(&[
        ("pkg", "\"\"\"Package.\"\"\"\nfrom .core import Engine\n", true),
        (
            "pkg.core",
            "class Engine:\n    \"\"\"Runs jobs.\"\"\"\n    def start(self, jobs: list[int]) -> bool: ...\n",
            false,
        ),
    ]);
    let doc = table
        .render_document("Pkg", "pkg", &RenderOptions::default())
        .unwrap();
    assert!(doc.contains("### class Engine\n\n*Full name:* `pkg.Engine`"));
    assert!(doc.contains("#### Engine.start()\n\n*Full name:* `pkg.Engine.start`"));
    assert!(doc.contains("| `Self` | `list[int]` | `bool` |"));
    assert!(!doc.contains("pkg.core"));
}

#[test]
fn test_annotations_are_normalized() {
    let table = resolved(&[(
        "m",
        "from typing import List, Optional, Union\nimport typing as t\nfrom .models import User as Person\n\n\
         def find(names: List[str], limit: Optional[int] = None) -> Union[Person, t.Any]: ...\n",
        false,
    )]);
    let doc = table.compile("m", &RenderOptions::default());
    assert!(doc.contains(
        "| names | limit | return |\n|:-----:|:-----:|:------:|\n\
         | `list[str]` | <code>int &#124; None</code> | <code>models.User &#124; Any</code> |\n\
         |   | `None` |   |\n"
    ));
}

#[test]
fn test_document_headings_parse_as_markdown() {
    let table = resolved(&[(
        "shapes",
        "\"\"\"Shapes.\"\"\"\n\nclass Circle:\n    \"\"\"A circle.\"\"\"\n    radius: float\n    def area(self) -> float: ...\n",
        false,
    )]);
    let doc = table
        .render_document("Shapes", "shapes", &RenderOptions::default())
        .unwrap();

    let mut headings = Vec::new();
    let mut tables = 0;
    for event in Parser::new_ext(&doc, Options::ENABLE_TABLES) {
        match event {
            Event::Start(Tag::Heading { level, .. }) => headings.push(level),
            Event::Start(Tag::Table(_)) => tables += 1,
            _ => {}
        }
    }
    assert_eq!(
        headings,
        vec![
            HeadingLevel::H1,
            HeadingLevel::H2,
            HeadingLevel::H3,
            HeadingLevel::H4
        ]
    );
    // members of Circle, signature of area
    assert_eq!(tables, 2);
}

#[test]
fn test_table_of_contents_without_links() {
    let table = resolved(&[("m", "def run(): ...\n", false)]);
    let options = RenderOptions {
        level: 1,
        link: false,
        toc: true,
    };
    let doc = table.render_document("M", "m", &options).unwrap();
    assert!(doc.starts_with("# M API\n\n**Table of contents:**\n+ m\n    + run\n\n## Module `m`\n\n"));
}
