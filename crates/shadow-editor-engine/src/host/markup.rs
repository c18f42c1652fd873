//! Minimal markup fragment parser and serializer.
//!
//! Covers what the editor inserts and snapshots: elements with quoted or bare
//! attributes, void and self-closing elements, comments and entity-encoded
//! text. It is not a conforming HTML parser; unclosed elements are closed at
//! the end of the fragment and a stray closing tag is an error.

use thiserror::Error;

use super::VOID_ELEMENTS;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarkupError {
    #[error("unterminated tag starting at byte {0}")]
    UnterminatedTag(usize),

    #[error("unterminated comment starting at byte {0}")]
    UnterminatedComment(usize),

    #[error("closing tag </{tag}> at byte {offset} has no matching open tag")]
    UnmatchedClose { tag: String, offset: usize },
}

/// Parsed fragment node, before it is materialized in a host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Text(String),
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    },
    Comment(String),
}

#[derive(Debug, PartialEq, Eq)]
enum Token {
    Text(String),
    Open {
        tag: String,
        attributes: Vec<(String, String)>,
        self_closing: bool,
    },
    Close {
        tag: String,
        offset: usize,
    },
    Comment(String),
}

pub fn is_void_tag(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| v.eq_ignore_ascii_case(tag))
}

/// Parses a fragment into a forest of [`MarkupNode`]s.
pub fn parse(markup: &str) -> Result<Vec<MarkupNode>, MarkupError> {
    struct Frame {
        tag: String,
        attributes: Vec<(String, String)>,
        children: Vec<MarkupNode>,
    }

    let mut top: Vec<MarkupNode> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    fn push(stack: &mut [Frame], top: &mut Vec<MarkupNode>, node: MarkupNode) {
        match stack.last_mut() {
            Some(frame) => frame.children.push(node),
            None => top.push(node),
        }
    }

    for token in tokenize(markup)? {
        match token {
            Token::Text(text) => push(&mut stack, &mut top, MarkupNode::Text(text)),
            Token::Comment(text) => push(&mut stack, &mut top, MarkupNode::Comment(text)),
            Token::Open {
                tag,
                attributes,
                self_closing,
            } => {
                if self_closing || is_void_tag(&tag) {
                    let element = MarkupNode::Element {
                        tag,
                        attributes,
                        children: Vec::new(),
                    };
                    push(&mut stack, &mut top, element);
                } else {
                    stack.push(Frame {
                        tag,
                        attributes,
                        children: Vec::new(),
                    });
                }
            }
            Token::Close { tag, offset } => {
                if is_void_tag(&tag) {
                    continue;
                }
                let Some(depth) = stack.iter().rposition(|frame| frame.tag == tag) else {
                    return Err(MarkupError::UnmatchedClose { tag, offset });
                };
                while stack.len() > depth {
                    let Some(frame) = stack.pop() else { break };
                    let element = MarkupNode::Element {
                        tag: frame.tag,
                        attributes: frame.attributes,
                        children: frame.children,
                    };
                    push(&mut stack, &mut top, element);
                }
            }
        }
    }

    while let Some(frame) = stack.pop() {
        let element = MarkupNode::Element {
            tag: frame.tag,
            attributes: frame.attributes,
            children: frame.children,
        };
        push(&mut stack, &mut top, element);
    }

    Ok(top)
}

fn tokenize(markup: &str) -> Result<Vec<Token>, MarkupError> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < markup.len() {
        let rest = &markup[pos..];

        if let Some(body) = rest.strip_prefix("<!--") {
            let end = body.find("-->").ok_or(MarkupError::UnterminatedComment(pos))?;
            tokens.push(Token::Comment(body[..end].to_string()));
            pos += 4 + end + 3;
            continue;
        }

        let mut chars = rest.chars();
        let opens_tag = chars.next() == Some('<')
            && chars
                .next()
                .is_some_and(|c| c == '/' || c.is_ascii_alphabetic());

        if opens_tag {
            let close = find_tag_end(rest).ok_or(MarkupError::UnterminatedTag(pos))?;
            let inner = &rest[1..close];
            if let Some(name) = inner.strip_prefix('/') {
                tokens.push(Token::Close {
                    tag: name.trim().to_ascii_lowercase(),
                    offset: pos,
                });
            } else {
                tokens.push(parse_open_tag(inner));
            }
            pos += close + 1;
            continue;
        }

        // Text runs until the next tag opener. A lone '<' is literal text.
        let first = rest.chars().next().map_or(1, char::len_utf8);
        let next = rest[first..]
            .find('<')
            .map(|index| index + first)
            .unwrap_or(rest.len());
        let decoded = html_escape::decode_html_entities(&rest[..next]).into_owned();
        match tokens.last_mut() {
            Some(Token::Text(previous)) => previous.push_str(&decoded),
            _ => tokens.push(Token::Text(decoded)),
        }
        pos += next;
    }

    Ok(tokens)
}

/// Byte index of the `>` closing the tag that starts at `rest[0]`, skipping
/// quoted attribute values.
fn find_tag_end(rest: &str) -> Option<usize> {
    let mut quote: Option<char> = None;
    for (index, c) in rest.char_indices().skip(1) {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(index),
            None => {}
        }
    }
    None
}

fn parse_open_tag(inner: &str) -> Token {
    let trimmed = inner.trim_end();
    let (body, self_closing) = match trimmed.strip_suffix('/') {
        Some(body) => (body, true),
        None => (trimmed, false),
    };

    let name_end = body
        .find(|c: char| c.is_whitespace())
        .unwrap_or(body.len());
    let tag = body[..name_end].to_ascii_lowercase();
    let attributes = parse_attributes(&body[name_end..]);

    Token::Open {
        tag,
        attributes,
        self_closing,
    }
}

fn parse_attributes(source: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();
    let mut chars = source.char_indices().peekable();

    loop {
        while chars.next_if(|(_, c)| c.is_whitespace() || *c == '/').is_some() {}
        let Some(&(start, _)) = chars.peek() else {
            break;
        };

        let mut end = source.len();
        while let Some(&(index, c)) = chars.peek() {
            if c.is_whitespace() || c == '=' {
                end = index;
                break;
            }
            chars.next();
        }
        let name = source[start..end].to_ascii_lowercase();

        while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
        let mut value = String::new();
        if chars.next_if(|(_, c)| *c == '=').is_some() {
            while chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}
            match chars.peek().map(|&(_, c)| c) {
                Some(q @ ('"' | '\'')) => {
                    chars.next();
                    for (_, c) in chars.by_ref() {
                        if c == q {
                            break;
                        }
                        value.push(c);
                    }
                }
                Some(_) => {
                    while let Some((_, c)) = chars.next_if(|(_, c)| !c.is_whitespace()) {
                        value.push(c);
                    }
                }
                None => {}
            }
        }

        if !name.is_empty() {
            attributes.push((name, html_escape::decode_html_entities(&value).into_owned()));
        }
    }

    attributes
}

pub(crate) fn escape_text(text: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_text(text)
}

pub(crate) fn escape_attribute(value: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_double_quoted_attribute(value)
}
