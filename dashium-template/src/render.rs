use serde_json::{json, Map, Value};
use std::{borrow::Cow, collections::HashMap, sync::Arc};
use tracing::{debug, warn};

use crate::{
    error::{Result, TemplateError},
    parser::{CompareOp, Condition, Node, Operand, Template},
    value,
};

const MAX_BLOCK_DEPTH: usize = 64;

/// Lookup environment: the render context plus any enclosing loop frames
#[derive(Clone, Copy)]
struct Scope<'s> {
    vars: &'s Map<String, Value>,
    frame: Option<&'s LoopFrame<'s>>,
}

struct LoopFrame<'s> {
    var: &'s str,
    item: Cow<'s, Value>,
    meta: Value,
    parent: Option<&'s LoopFrame<'s>>,
}

impl<'s> Scope<'s> {
    fn resolve_root(&self, key: &str) -> Option<&'s Value> {
        let mut frame = self.frame;
        while let Some(current) = frame {
            if current.var == key {
                return Some(&*current.item);
            }
            if key == "loop" {
                return Some(&current.meta);
            }
            frame = current.parent;
        }
        self.vars.get(key)
    }

    fn lookup(&self, path: &str) -> Option<&'s Value> {
        let mut segments = path.split('.');
        let root = self.resolve_root(segments.next()?)?;
        value::walk(root, segments)
    }
}

struct Renderer<'t> {
    blocks: HashMap<&'t str, &'t [Node]>,
    active: Vec<&'t str>,
}

/// Render an inheritance chain (most-derived first) against a context.
///
/// Blocks are gathered from the root down so the most-derived definition
/// of each name wins; the root template supplies the document.
pub(crate) fn render_chain(chain: &[Arc<Template>], context: &Map<String, Value>) -> Result<String> {
    let root = chain
        .last()
        .ok_or_else(|| TemplateError::RenderFailure("empty inheritance chain".to_string()))?;

    let mut blocks = HashMap::new();
    for template in chain.iter().rev() {
        collect_blocks(&template.nodes, &mut blocks);
    }
    debug!(
        template = %root.name,
        blocks = ?blocks.keys().collect::<Vec<_>>(),
        "Resolved blocks"
    );

    let mut renderer = Renderer {
        blocks,
        active: Vec::new(),
    };
    let scope = Scope {
        vars: context,
        frame: None,
    };

    let mut out = String::new();
    renderer.render_nodes(&root.nodes, scope, &mut out)?;
    Ok(out)
}

fn collect_blocks<'t>(nodes: &'t [Node], blocks: &mut HashMap<&'t str, &'t [Node]>) {
    for node in nodes {
        match node {
            Node::Block { name, body } => {
                blocks.insert(name.as_str(), body.as_slice());
                collect_blocks(body, blocks);
            }
            Node::For { body, .. } => collect_blocks(body, blocks),
            Node::If {
                then_branch,
                else_branch,
                ..
            } => {
                collect_blocks(then_branch, blocks);
                collect_blocks(else_branch, blocks);
            }
            Node::Text(_) | Node::Var { .. } | Node::Extends(_) => {}
        }
    }
}

impl<'t> Renderer<'t> {
    fn render_nodes(&mut self, nodes: &'t [Node], scope: Scope<'_>, out: &mut String) -> Result<()> {
        for node in nodes {
            match node {
                Node::Text(text) => out.push_str(text),
                Node::Extends(_) => {}
                Node::Var { path, default } => match scope.lookup(path) {
                    Some(value) => out.push_str(&value::display(value)),
                    None => match default {
                        Some(default) => out.push_str(default),
                        None => {
                            warn!(variable = %path, "Variable not found in context");
                            out.push_str(&format!("{{{{ {} }}}}", path));
                        }
                    },
                },
                Node::If {
                    condition,
                    then_branch,
                    else_branch,
                } => {
                    let branch = if evaluate(condition, scope) {
                        then_branch
                    } else {
                        else_branch
                    };
                    self.render_nodes(branch, scope, out)?;
                }
                Node::For {
                    var,
                    iterable,
                    body,
                } => self.render_loop(var, iterable, body, scope, out)?,
                Node::Block { name, body } => self.render_block(name, body, scope, out)?,
            }
        }
        Ok(())
    }

    fn render_block(
        &mut self,
        name: &'t str,
        own_body: &'t [Node],
        scope: Scope<'_>,
        out: &mut String,
    ) -> Result<()> {
        // A block reached again from inside its own override renders its literal body
        if self.active.contains(&name) {
            return self.render_nodes(own_body, scope, out);
        }
        if self.active.len() >= MAX_BLOCK_DEPTH {
            return Err(TemplateError::RenderFailure(format!(
                "block nesting exceeds {} levels at '{}'",
                MAX_BLOCK_DEPTH, name
            )));
        }

        let body = self.blocks.get(name).copied().unwrap_or(own_body);
        self.active.push(name);
        let result = self.render_nodes(body, scope, out);
        self.active.pop();
        result
    }

    fn render_loop(
        &mut self,
        var: &'t str,
        iterable: &str,
        body: &'t [Node],
        scope: Scope<'_>,
        out: &mut String,
    ) -> Result<()> {
        let items: Vec<Cow<'_, Value>> = match scope.lookup(iterable) {
            Some(Value::Array(items)) => items.iter().map(Cow::Borrowed).collect(),
            Some(Value::Object(map)) => map
                .keys()
                .map(|key| Cow::Owned(Value::String(key.clone())))
                .collect(),
            Some(_) => {
                warn!(iterable = %iterable, "Loop source is not iterable");
                return Ok(());
            }
            None => {
                warn!(iterable = %iterable, "Loop source not found in context");
                return Ok(());
            }
        };

        for (index, item) in items.into_iter().enumerate() {
            let frame = LoopFrame {
                var,
                item,
                meta: json!({
                    "index": index,
                    "index0": index,
                    "index1": index + 1,
                }),
                parent: scope.frame,
            };
            let child = Scope {
                vars: scope.vars,
                frame: Some(&frame),
            };
            self.render_nodes(body, child, out)?;
        }
        Ok(())
    }
}

fn evaluate(condition: &Condition, scope: Scope<'_>) -> bool {
    match condition {
        Condition::Truthy(path) => value::is_truthy(scope.lookup(path)),
        Condition::Compare { lhs, op, rhs } => {
            let left = scope.lookup(lhs);
            let right = match rhs {
                Operand::Literal(literal) => Some(literal),
                Operand::Path(path) => scope.lookup(path),
            };
            let equal = value::values_equal(left, right);
            match op {
                CompareOp::Eq => equal,
                CompareOp::Ne => !equal,
            }
        }
    }
}
