/// A lexical unit of template source
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Literal text between directives
    Text(String),
    /// `{{ ... }}` with its inner text and the raw source
    Expression { inner: String, raw: String },
    /// `{% ... %}` with its inner text and the raw source
    Tag { inner: String, raw: String },
}

impl Token {
    /// Returns the raw source text of the token
    pub fn as_str(&self) -> &str {
        match self {
            Token::Text(s) => s,
            Token::Expression { raw, .. } => raw,
            Token::Tag { raw, .. } => raw,
        }
    }
}

/// Split template source into text, expression and tag tokens.
///
/// An opening delimiter without a matching close, or whose close comes after
/// another opening delimiter of the same kind, is kept as text and scanning
/// resumes right after it.
pub fn tokenize(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut rest = source;

    while let Some(start) = find_opening(rest) {
        let is_expression = rest[start..].starts_with("{{");
        let (open, close) = if is_expression {
            ("{{", "}}")
        } else {
            ("{%", "%}")
        };
        let body = &rest[start + 2..];

        let end = match (body.find(close), body.find(open)) {
            (Some(end), Some(next)) if next < end => None,
            (end, _) => end,
        };

        text.push_str(&rest[..start]);

        let Some(end) = end else {
            text.push_str(&rest[start..start + 2]);
            rest = body;
            continue;
        };

        if !text.is_empty() {
            tokens.push(Token::Text(std::mem::take(&mut text)));
        }

        let raw = rest[start..start + 2 + end + 2].to_string();
        let inner = body[..end].to_string();
        tokens.push(if is_expression {
            Token::Expression { inner, raw }
        } else {
            Token::Tag { inner, raw }
        });

        rest = &body[end + 2..];
    }

    text.push_str(rest);
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }

    tokens
}

fn find_opening(s: &str) -> Option<usize> {
    match (s.find("{{"), s.find("{%")) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
