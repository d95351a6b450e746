//! Small inheritance-capable HTML template engine for the Dashium dashboard.
//!
//! Supported syntax:
//! `{% extends "name" %}`, `{% block name %}…{% endblock %}`,
//! `{% for x in items %}…{% endfor %}`, `{% if cond %}…{% else %}…{% endif %}`,
//! `{{ path }}` and `{{ path | default }}`.
//!
//! # Examples
//!
//! ```
//! use dashium_template::{Context, MemorySource, TemplateEngine};
//!
//! let source = MemorySource::new()
//!     .with("base.html", "<title>{% block title %}Dashium{% endblock %}</title>")
//!     .with("home.html", "{% extends \"base.html\" %}{% block title %}{{ name }}{% endblock %}");
//! let engine = TemplateEngine::with_source(source, true);
//!
//! let mut context = Context::new();
//! context.insert("name", "Home");
//! assert_eq!(engine.render("home.html", &context), "<title>Home</title>");
//! ```

pub mod context;
pub mod error;
pub mod parser;
mod render;
pub mod source;
pub mod tokenizer;
pub mod value;

pub use context::Context;
pub use error::{Result, TemplateError};
pub use parser::Template;
pub use source::{DirectorySource, MemorySource, TemplateSource};

use std::{
    collections::HashMap,
    path::PathBuf,
    sync::{Arc, PoisonError, RwLock},
};

/// Renders templates from a [`TemplateSource`], caching parsed trees.
///
/// With caching disabled (development mode) every render re-reads the source.
#[derive(Debug)]
pub struct TemplateEngine {
    source: Box<dyn TemplateSource>,
    cache: RwLock<HashMap<String, Arc<Template>>>,
    caching: bool,
}

impl TemplateEngine {
    /// Engine over a template directory
    pub fn new(templates_dir: impl Into<PathBuf>, development_mode: bool) -> Self {
        let templates_dir = templates_dir.into();
        if development_mode {
            tracing::info!("Template hot reload enabled (development mode)");
        } else {
            tracing::info!("Templates cached after first load");
        }
        Self::with_source(DirectorySource::new(templates_dir), !development_mode)
    }

    pub fn with_source(source: impl TemplateSource + 'static, caching: bool) -> Self {
        Self {
            source: Box::new(source),
            cache: RwLock::new(HashMap::new()),
            caching,
        }
    }

    /// Render, degrading any failure to an inline HTML error fragment
    pub fn render(&self, name: &str, context: &Context) -> String {
        self.try_render(name, context).unwrap_or_else(|e| {
            tracing::error!(template = %name, "Error rendering template: {}", e);
            error_fragment(&e)
        })
    }

    pub fn try_render(&self, name: &str, context: &Context) -> Result<String> {
        let chain = self.resolve_chain(name)?;
        tracing::debug!(
            chain = %chain.iter().map(|t| t.name.as_str()).collect::<Vec<_>>().join(" -> "),
            "Inheritance chain"
        );
        render::render_chain(&chain, context.as_map())
    }

    /// Follow `extends` from `name` to the root. Revisiting a name is an error.
    fn resolve_chain(&self, name: &str) -> Result<Vec<Arc<Template>>> {
        let mut chain = Vec::new();
        let mut visited: Vec<String> = Vec::new();
        let mut current = Some(name.to_string());

        while let Some(template_name) = current {
            if visited.contains(&template_name) {
                visited.push(template_name);
                return Err(TemplateError::CircularInheritance(visited));
            }

            let template = self.template(&template_name)?;
            current = template.parent().map(str::to_string);
            visited.push(template_name);
            chain.push(template);
        }

        Ok(chain)
    }

    fn template(&self, name: &str) -> Result<Arc<Template>> {
        if self.caching {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(template) = cache.get(name) {
                return Ok(Arc::clone(template));
            }
        }

        let source = self.source.load(name)?;
        let template = Arc::new(parser::parse(name, &source)?);

        if !self.caching {
            return Ok(template);
        }

        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(
            cache.entry(name.to_string()).or_insert(template),
        ))
    }

    /// Drop all parsed templates
    pub fn clear_cache(&self) {
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

fn error_fragment(error: &TemplateError) -> String {
    format!(
        "<h1>Template Error</h1><p>Error rendering template: {}</p>",
        html_escape::encode_text(&error.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn engine(templates: &[(&str, &str)]) -> TemplateEngine {
        let mut source = MemorySource::new();
        for (name, text) in templates {
            source.insert(*name, *text);
        }
        TemplateEngine::with_source(source, true)
    }

    fn context(value: serde_json::Value) -> Context {
        Context::try_from(value).unwrap()
    }

    #[test]
    fn test_plain_variable_substitution() {
        let engine = engine(&[("t", "Hello {{ name }}, {{ user.role }}!")]);
        let ctx = context(json!({"name": "Ada", "user": {"role": "admin"}}));

        assert_eq!(engine.render("t", &ctx), "Hello Ada, admin!");
    }

    #[test]
    fn test_missing_variable_with_and_without_default() {
        let engine = engine(&[("t", "[{{ missing | fallback text }}][{{ missing }}][{{missing.deep}}]")]);

        assert_eq!(
            engine.render("t", &Context::new()),
            "[fallback text][{{ missing }}][{{ missing.deep }}]"
        );
    }

    #[test]
    fn test_value_formatting() {
        let engine = engine(&[("t", "{{ yes }} {{ no }} [{{ nothing }}] {{ n }} {{ f }}")]);
        let ctx = context(json!({"yes": true, "no": false, "nothing": null, "n": 42, "f": 0.5}));

        assert_eq!(engine.render("t", &ctx), "true false [] 42 0.5");
    }

    #[test]
    fn test_null_with_default_prints_empty() {
        let engine = engine(&[("t", "[{{ value | dflt }}]")]);
        let ctx = context(json!({"value": null}));

        assert_eq!(engine.render("t", &ctx), "[]");
    }

    #[test]
    fn test_stray_opening_braces_keep_later_directives_live() {
        let engine = engine(&[
            ("a", "a {{ oops {% if on %}Y{% endif %} {{ name }}"),
            ("b", "{{ x } then {{ name }}"),
        ]);
        let ctx = context(json!({"on": true, "name": "N"}));

        assert_eq!(engine.render("a", &ctx), "a {{ oops Y N");
        assert_eq!(engine.render("b", &ctx), "{{ x } then N");
    }

    #[test]
    fn test_default_text_is_not_reinterpreted() {
        let engine = engine(&[("t", "{{ missing | {% if x %} }}")]);
        assert_eq!(engine.render("t", &Context::new()), "{% if x %}");
    }

    #[test]
    fn test_substituted_output_is_not_reinterpreted() {
        let engine = engine(&[("t", "{{ payload }}")]);
        let ctx = context(json!({"payload": "{{ secret }}{% if a %}x{% endif %}"}));

        assert_eq!(
            engine.render("t", &ctx),
            "{{ secret }}{% if a %}x{% endif %}"
        );
    }

    #[test]
    fn test_three_level_inheritance() {
        let engine = engine(&[
            (
                "c.html",
                "<h1>{% block title %}C title{% endblock %}</h1><main>{% block body %}C body{% endblock %}</main><footer>{% block footer %}C footer{% endblock %}</footer>",
            ),
            ("b.html", "{% extends \"c.html\" %}{% block body %}B body{% endblock %}"),
            ("a.html", "{% extends \"b.html\" %}{% block body %}A body{% endblock %}{% block footer %}A footer{% endblock %}"),
        ]);

        assert_eq!(
            engine.render("a.html", &Context::new()),
            "<h1>C title</h1><main>A body</main><footer>A footer</footer>"
        );
        assert_eq!(
            engine.render("b.html", &Context::new()),
            "<h1>C title</h1><main>B body</main><footer>C footer</footer>"
        );
    }

    #[test]
    fn test_block_defined_only_in_middle_of_chain() {
        let engine = engine(&[
            ("c.html", "[{% block side %}root{% endblock %}]"),
            ("b.html", "{% extends \"c.html\" %}{% block side %}middle{% endblock %}"),
            ("a.html", "{% extends \"b.html\" %}"),
        ]);

        assert_eq!(engine.render("a.html", &Context::new()), "[middle]");
    }

    #[test]
    fn test_block_content_is_trimmed() {
        let engine = engine(&[
            ("base.html", "<title>{% block title %}\n  Default\n{% endblock %}</title>"),
            ("page.html", "{% extends 'base.html' %}{% block title %}\n    Page {{ n }}\n{% endblock %}"),
        ]);
        let ctx = context(json!({"n": 2}));

        assert_eq!(engine.render("page.html", &ctx), "<title>Page 2</title>");
        assert_eq!(engine.render("base.html", &ctx), "<title>Default</title>");
    }

    #[test]
    fn test_derived_text_outside_blocks_is_ignored() {
        let engine = engine(&[
            ("base.html", "<{% block x %}{% endblock %}>"),
            ("page.html", "{% extends \"base.html\" %}ignored{% block x %}kept{% endblock %}ignored"),
        ]);
        assert_eq!(engine.render("page.html", &Context::new()), "<kept>");
    }

    #[test]
    fn test_nested_blocks_override_independently() {
        let engine = engine(&[
            (
                "base.html",
                "{% block outer %}({% block inner %}base inner{% endblock %}){% endblock %}",
            ),
            ("page.html", "{% extends \"base.html\" %}{% block inner %}page inner{% endblock %}"),
        ]);
        assert_eq!(engine.render("page.html", &Context::new()), "(page inner)");
    }

    #[test]
    fn test_circular_inheritance_is_an_error() {
        let engine = engine(&[
            ("a.html", "{% extends \"b.html\" %}"),
            ("b.html", "{% extends \"a.html\" %}"),
        ]);

        let err = engine.try_render("a.html", &Context::new()).unwrap_err();
        match err {
            TemplateError::CircularInheritance(chain) => {
                assert_eq!(chain, vec!["a.html", "b.html", "a.html"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let html = engine.render("a.html", &Context::new());
        assert!(html.starts_with("<h1>Template Error</h1><p>Error rendering template: Circular inheritance"));
    }

    #[test]
    fn test_self_extension_is_circular() {
        let engine = engine(&[("a.html", "{% extends \"a.html\" %}")]);
        assert!(matches!(
            engine.try_render("a.html", &Context::new()),
            Err(TemplateError::CircularInheritance(_))
        ));
    }

    #[test]
    fn test_missing_template_degrades_to_fragment() {
        let engine = engine(&[("a.html", "{% extends \"nope.html\" %}")]);

        assert!(matches!(
            engine.try_render("a.html", &Context::new()),
            Err(TemplateError::TemplateNotFound(name)) if name == "nope.html"
        ));
        assert_eq!(
            engine.render("a.html", &Context::new()),
            "<h1>Template Error</h1><p>Error rendering template: Template not found: nope.html</p>"
        );
    }

    #[test]
    fn test_error_fragment_is_escaped() {
        let engine = engine(&[("<x>.html", "{% if a %}")]);
        let html = engine.render("<x>.html", &Context::new());

        assert!(html.contains("&lt;x&gt;.html"));
        assert!(!html.contains("<x>"));
    }

    #[test]
    fn test_if_comparison() {
        let engine = engine(&[("t", "{% if a.b == \"x\" %}Y{% else %}N{% endif %}")]);

        assert_eq!(engine.render("t", &context(json!({"a": {"b": "x"}}))), "Y");
        assert_eq!(engine.render("t", &context(json!({"a": {}}))), "N");
        assert_eq!(engine.render("t", &Context::new()), "N");
    }

    #[test]
    fn test_if_not_equal_and_literals() {
        let engine = engine(&[(
            "t",
            "{% if count != 3 %}a{% endif %}{% if ratio == 0.5 %}b{% endif %}{% if on == TRUE %}c{% endif %}{% if kind == other %}d{% endif %}",
        )]);
        let ctx = context(json!({"count": 3, "ratio": 0.5, "on": true, "kind": "k", "other": "k"}));

        assert_eq!(engine.render("t", &ctx), "bcd");
    }

    #[test]
    fn test_truthiness_conditions() {
        let engine = engine(&[("t", "{% if items %}some{% else %}none{% endif %}")]);

        assert_eq!(engine.render("t", &context(json!({"items": [1]}))), "some");
        assert_eq!(engine.render("t", &context(json!({"items": []}))), "none");
        assert_eq!(engine.render("t", &context(json!({"items": ""}))), "none");
        assert_eq!(engine.render("t", &Context::new()), "none");
    }

    #[test]
    fn test_nested_ifs_resolve_innermost_first() {
        let engine = engine(&[(
            "t",
            "{% if a %}A{% if b %}B{% else %}b{% endif %}{% else %}{% if b %}x{% endif %}{% endif %}",
        )]);

        assert_eq!(engine.render("t", &context(json!({"a": true, "b": false}))), "Ab");
        assert_eq!(engine.render("t", &context(json!({"a": true, "b": true}))), "AB");
        assert_eq!(engine.render("t", &context(json!({"a": false, "b": true}))), "x");
    }

    #[test]
    fn test_for_with_nested_if() {
        let engine = engine(&[(
            "t",
            "{% for item in items %}{% if item.active %}{{item.name}}{% endif %}{% endfor %}",
        )]);
        let ctx = context(json!({
            "items": [{"name": "p", "active": true}, {"name": "q", "active": false}]
        }));

        assert_eq!(engine.render("t", &ctx), "p");
    }

    #[test]
    fn test_loop_metadata_and_outer_scope() {
        let engine = engine(&[(
            "t",
            "{% for x in xs %}{{ loop.index0 }}/{{ loop.index1 }}:{{ x }}{{ sep }}{% endfor %}",
        )]);
        let ctx = context(json!({"xs": ["a", "b"], "sep": ";"}));

        assert_eq!(engine.render("t", &ctx), "0/1:a;1/2:b;");
    }

    #[test]
    fn test_loop_variable_shadows_context() {
        let engine = engine(&[("t", "{% for name in names %}{{ name }}{% endfor %}-{{ name }}")]);
        let ctx = context(json!({"names": ["x", "y"], "name": "outer"}));

        assert_eq!(engine.render("t", &ctx), "xy-outer");
    }

    #[test]
    fn test_nested_loops_and_dotted_source() {
        let engine = engine(&[(
            "t",
            "{% for row in grid.rows %}[{% for cell in row.cells %}{{ cell }}{{ loop.index }}{% endfor %}]{% endfor %}",
        )]);
        let ctx = context(json!({"grid": {"rows": [{"cells": ["a", "b"]}, {"cells": ["c"]}]}}));

        assert_eq!(engine.render("t", &ctx), "[a0b1][c0]");
    }

    #[test]
    fn test_loop_over_object_yields_keys() {
        let engine = engine(&[("t", "{% for k in map %}{{ k }},{% endfor %}")]);
        let ctx = context(json!({"map": {"alpha": 1, "beta": 2}}));

        assert_eq!(engine.render("t", &ctx), "alpha,beta,");
    }

    #[test]
    fn test_missing_or_scalar_loop_source_expands_empty() {
        let engine = engine(&[("t", "[{% for x in xs %}{{ x }}{% endfor %}]")]);

        assert_eq!(engine.render("t", &Context::new()), "[]");
        assert_eq!(engine.render("t", &context(json!({"xs": "abc"}))), "[]");
        assert_eq!(engine.render("t", &context(json!({"xs": 5}))), "[]");
    }

    #[test]
    fn test_unknown_tags_pass_through() {
        let engine = engine(&[("t", "{% raw %}{{ a b }}")]);
        assert_eq!(engine.render("t", &Context::new()), "{% raw %}{{ a b }}");
    }

    #[test]
    fn test_directory_engine_reads_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("base.html"), "<b>{% block x %}{% endblock %}</b>").unwrap();
        fs::write(
            dir.path().join("page.html"),
            "{% extends \"base.html\" %}{% block x %}{{ v }}{% endblock %}",
        )
        .unwrap();

        let engine = TemplateEngine::new(dir.path(), false);
        let ctx = context(json!({"v": "ok"}));
        assert_eq!(engine.render("page.html", &ctx), "<b>ok</b>");
    }

    #[test]
    fn test_cache_serves_stale_until_cleared() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.html");
        fs::write(&path, "one").unwrap();

        let engine = TemplateEngine::new(dir.path(), false);
        assert_eq!(engine.render("t.html", &Context::new()), "one");

        fs::write(&path, "two").unwrap();
        assert_eq!(engine.render("t.html", &Context::new()), "one");

        engine.clear_cache();
        assert_eq!(engine.render("t.html", &Context::new()), "two");
    }

    #[test]
    fn test_development_mode_reloads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("t.html");
        fs::write(&path, "one").unwrap();

        let engine = TemplateEngine::new(dir.path(), true);
        assert_eq!(engine.render("t.html", &Context::new()), "one");

        fs::write(&path, "two").unwrap();
        assert_eq!(engine.render("t.html", &Context::new()), "two");
    }

    #[test]
    fn test_concurrent_renders_share_cache() {
        let engine = Arc::new(engine(&[
            ("base.html", "<{% block b %}{% endblock %}>"),
            ("page.html", "{% extends \"base.html\" %}{% block b %}{{ n }}{% endblock %}"),
        ]));

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let engine = Arc::clone(&engine);
                std::thread::spawn(move || {
                    let ctx = context(json!({"n": n}));
                    engine.render("page.html", &ctx)
                })
            })
            .collect();

        for (n, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.join().unwrap(), format!("<{}>", n));
        }
    }
}
