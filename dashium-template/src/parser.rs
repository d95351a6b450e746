use serde_json::Value;

use crate::{
    error::{Result, TemplateError},
    tokenizer::{tokenize, Token},
    value::parse_literal,
};

/// A parsed template: its name and node tree
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub nodes: Vec<Node>,
}

impl Template {
    /// Name of the parent template, from the first top-level `extends`
    pub fn parent(&self) -> Option<&str> {
        self.nodes.iter().find_map(|node| match node {
            Node::Extends(parent) => Some(parent.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Var {
        path: String,
        default: Option<String>,
    },
    If {
        condition: Condition,
        then_branch: Vec<Node>,
        else_branch: Vec<Node>,
    },
    For {
        var: String,
        iterable: String,
        body: Vec<Node>,
    },
    Block {
        name: String,
        body: Vec<Node>,
    },
    Extends(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Truthy(String),
    Compare {
        lhs: String,
        op: CompareOp,
        rhs: Operand,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Path(String),
}

impl Condition {
    /// `lhs == rhs`, then `lhs != rhs`, else a bare truthiness test
    pub fn parse(expr: &str) -> Self {
        let compare = |lhs: &str, op, rhs: &str| Condition::Compare {
            lhs: lhs.trim().to_string(),
            op,
            rhs: Operand::parse(rhs.trim()),
        };

        if let Some((lhs, rhs)) = expr.split_once(" == ") {
            compare(lhs, CompareOp::Eq, rhs)
        } else if let Some((lhs, rhs)) = expr.split_once(" != ") {
            compare(lhs, CompareOp::Ne, rhs)
        } else {
            Condition::Truthy(expr.trim().to_string())
        }
    }
}

impl Operand {
    pub fn parse(text: &str) -> Self {
        match parse_literal(text) {
            Some(value) => Operand::Literal(value),
            None => Operand::Path(text.to_string()),
        }
    }
}

enum Frame {
    Block {
        name: String,
        body: Vec<Node>,
    },
    For {
        var: String,
        iterable: String,
        body: Vec<Node>,
    },
    If {
        condition: Condition,
        then_branch: Vec<Node>,
        else_branch: Option<Vec<Node>>,
    },
}

impl Frame {
    fn describe(&self) -> String {
        match self {
            Frame::Block { name, .. } => format!("block '{}'", name),
            Frame::For { var, iterable, .. } => format!("for '{} in {}'", var, iterable),
            Frame::If { .. } => "if".to_string(),
        }
    }
}

struct Parser<'a> {
    template: &'a str,
    root: Vec<Node>,
    stack: Vec<Frame>,
}

/// Parse template source into a node tree.
///
/// Unknown tags and malformed expressions are kept as literal text.
/// Unbalanced block, for and if tags are syntax errors.
pub fn parse(name: &str, source: &str) -> Result<Template> {
    let mut parser = Parser {
        template: name,
        root: Vec::new(),
        stack: Vec::new(),
    };

    for token in tokenize(source) {
        match token {
            Token::Text(text) => parser.push(Node::Text(text)),
            Token::Expression { inner, raw } => {
                let node = parse_expression(&inner).unwrap_or(Node::Text(raw));
                parser.push(node);
            }
            Token::Tag { inner, raw } => parser.tag(&inner, raw)?,
        }
    }

    if let Some(frame) = parser.stack.last() {
        return Err(parser.error(format!("unclosed {}", frame.describe())));
    }

    Ok(Template {
        name: name.to_string(),
        nodes: parser.root,
    })
}

impl Parser<'_> {
    fn current(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            None => &mut self.root,
            Some(Frame::Block { body, .. }) | Some(Frame::For { body, .. }) => body,
            Some(Frame::If {
                then_branch,
                else_branch,
                ..
            }) => match else_branch {
                Some(nodes) => nodes,
                None => then_branch,
            },
        }
    }

    fn push(&mut self, node: Node) {
        self.current().push(node);
    }

    fn error(&self, message: impl Into<String>) -> TemplateError {
        TemplateError::Syntax {
            template: self.template.to_string(),
            message: message.into(),
        }
    }

    fn tag(&mut self, inner: &str, raw: String) -> Result<()> {
        let inner = inner.trim();
        let (keyword, args) = match inner.split_once(char::is_whitespace) {
            Some((keyword, args)) => (keyword, args.trim()),
            None => (inner, ""),
        };

        match keyword {
            "extends" => match unquote(args) {
                Some(parent) => self.push(Node::Extends(parent.to_string())),
                None => self.push(Node::Text(raw)),
            },
            "block" if is_identifier(args) => self.stack.push(Frame::Block {
                name: args.to_string(),
                body: Vec::new(),
            }),
            "endblock" => match self.stack.pop() {
                Some(Frame::Block { name, mut body }) => {
                    trim_edges(&mut body);
                    self.push(Node::Block { name, body });
                }
                other => return Err(self.unexpected("endblock", other)),
            },
            "for" => match parse_for(args) {
                Some((var, iterable)) => self.stack.push(Frame::For {
                    var,
                    iterable,
                    body: Vec::new(),
                }),
                None => self.push(Node::Text(raw)),
            },
            "endfor" => match self.stack.pop() {
                Some(Frame::For {
                    var,
                    iterable,
                    body,
                }) => self.push(Node::For {
                    var,
                    iterable,
                    body,
                }),
                other => return Err(self.unexpected("endfor", other)),
            },
            "if" if !args.is_empty() => self.stack.push(Frame::If {
                condition: Condition::parse(args),
                then_branch: Vec::new(),
                else_branch: None,
            }),
            "else" if args.is_empty() => {
                let opened = match self.stack.last_mut() {
                    Some(Frame::If { else_branch, .. }) if else_branch.is_none() => {
                        *else_branch = Some(Vec::new());
                        true
                    }
                    _ => false,
                };
                if !opened {
                    return Err(self.error("unexpected else"));
                }
            }
            "endif" => match self.stack.pop() {
                Some(Frame::If {
                    condition,
                    then_branch,
                    else_branch,
                }) => self.push(Node::If {
                    condition,
                    then_branch,
                    else_branch: else_branch.unwrap_or_default(),
                }),
                other => return Err(self.unexpected("endif", other)),
            },
            _ => self.push(Node::Text(raw)),
        }

        Ok(())
    }

    fn unexpected(&self, tag: &str, open: Option<Frame>) -> TemplateError {
        match open {
            Some(frame) => self.error(format!("{} closes {}", tag, frame.describe())),
            None => self.error(format!("unexpected {}", tag)),
        }
    }
}

/// `path` or `path | default`
fn parse_expression(inner: &str) -> Option<Node> {
    let (path, default) = match inner.split_once('|') {
        Some((path, default)) => (path.trim(), Some(default.trim().to_string())),
        None => (inner.trim(), None),
    };

    is_path(path).then(|| Node::Var {
        path: path.to_string(),
        default,
    })
}

/// `x in items` or `x in a.b`
fn parse_for(args: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = args.split_whitespace().collect();
    match parts.as_slice() {
        [var, "in", iterable] if is_identifier(var) && is_path(iterable) => {
            Some((var.to_string(), iterable.to_string()))
        }
        _ => None,
    }
}

fn unquote(text: &str) -> Option<&str> {
    let inner = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .or_else(|| text.strip_prefix('\'').and_then(|t| t.strip_suffix('\'')))?;
    (!inner.is_empty() && !inner.contains(['"', '\''])).then_some(inner)
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_')
}

fn is_path(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// Strip leading and trailing whitespace of a block body
fn trim_edges(body: &mut Vec<Node>) {
    if let Some(Node::Text(text)) = body.first_mut() {
        *text = text.trim_start().to_string();
        if text.is_empty() {
            body.remove(0);
        }
    }
    if let Some(Node::Text(text)) = body.last_mut() {
        *text = text.trim_end().to_string();
        if text.is_empty() {
            body.pop();
        }
    }
}
