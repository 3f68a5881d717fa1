//! Minimal XML-RPC codec
//!
//! Requests and responses are modelled as `serde_json::Value`:
//!
//! | XML-RPC               | JSON               |
//! |-----------------------|--------------------|
//! | `int`, `i4`, `i8`     | integer            |
//! | `double`              | float              |
//! | `boolean`             | bool               |
//! | `string`, untyped     | string             |
//! | `dateTime.iso8601`    | string             |
//! | `base64`              | string (as sent)   |
//! | `array`               | array              |
//! | `struct`              | object             |
//! | `nil`                 | null               |

use quick_xml::escape::escape;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Number, Value};
use std::fmt::Write;
use zonesync_core::{Error, Result};

/// Encode a `methodCall` document
pub fn encode_call(method: &str, params: &[Value]) -> String {
    let mut body = String::with_capacity(256);
    body.push_str("<?xml version=\"1.0\"?><methodCall><methodName>");
    body.push_str(&escape(method));
    body.push_str("</methodName><params>");
    for param in params {
        body.push_str("<param>");
        encode_value(&mut body, param);
        body.push_str("</param>");
    }
    body.push_str("</params></methodCall>");
    body
}

fn encode_value(out: &mut String, value: &Value) {
    out.push_str("<value>");
    match value {
        Value::Null => out.push_str("<nil/>"),
        Value::Bool(b) => {
            let _ = write!(out, "<boolean>{}</boolean>", u8::from(*b));
        }
        Value::Number(n) => match n.as_i64() {
            Some(i) if i32::try_from(i).is_ok() => {
                let _ = write!(out, "<int>{}</int>", i);
            }
            Some(i) => {
                let _ = write!(out, "<i8>{}</i8>", i);
            }
            None => {
                let _ = write!(out, "<double>{}</double>", n);
            }
        },
        Value::String(s) => {
            let _ = write!(out, "<string>{}</string>", escape(s.as_str()));
        }
        Value::Array(items) => {
            out.push_str("<array><data>");
            for item in items {
                encode_value(out, item);
            }
            out.push_str("</data></array>");
        }
        Value::Object(members) => {
            out.push_str("<struct>");
            for (name, member) in members {
                let _ = write!(out, "<member><name>{}</name>", escape(name.as_str()));
                encode_value(out, member);
                out.push_str("</member>");
            }
            out.push_str("</struct>");
        }
    }
    out.push_str("</value>");
}

/// Decode a `methodResponse` document
///
/// # Returns
///
/// - `Ok(Value)`: The single response parameter
/// - `Err(Error::Rpc)`: The server answered with a fault
/// - `Err(Error::Other)`: The document is not a valid response
pub fn decode_response(xml: &str) -> Result<Value> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(malformed(format!("unexpected root element <{}>", root.name)));
    }

    if let Some(fault) = root.child("fault") {
        let value = decode_value(fault.child("value").ok_or_else(|| malformed("empty fault"))?)?;
        let code = value.get("faultCode").and_then(Value::as_i64).unwrap_or_default();
        let message = value
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or("unknown fault")
            .to_string();
        return Err(Error::rpc(code, message));
    }

    let value = root
        .child("params")
        .and_then(|p| p.child("param"))
        .and_then(|p| p.child("value"))
        .ok_or_else(|| malformed("response has no value"))?;
    decode_value(value)
}

fn malformed(msg: impl std::fmt::Display) -> Error {
    Error::Other(format!("Malformed XML-RPC response: {}", msg))
}

#[derive(Debug, Default)]
struct Node {
    name: String,
    text: String,
    children: Vec<Node>,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }
}

fn parse_tree(xml: &str) -> Result<Node> {
    // Text is kept as sent: string values may carry significant whitespace.
    // Whitespace between container elements is ignored when decoding.
    let mut reader = Reader::from_str(xml);

    // Sentinel parent collecting the root element
    let mut stack = vec![Node::default()];

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(e) => stack.push(Node {
                name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                ..Node::default()
            }),
            Event::Empty(e) => {
                let node = Node {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ..Node::default()
                };
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_else(|| malformed("unbalanced tags"))?;
                let parent = stack.last_mut().ok_or_else(|| malformed("unbalanced tags"))?;
                parent.children.push(node);
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(malformed)?;
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&text);
                }
            }
            Event::CData(c) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(malformed("truncated document"));
    }
    stack
        .pop()
        .and_then(|sentinel| sentinel.children.into_iter().next())
        .ok_or_else(|| malformed("empty document"))
}

fn decode_value(value: &Node) -> Result<Value> {
    // A <value> without a type element is a string; its layout text is
    // ignored otherwise
    let Some(typed) = value.children.first() else {
        return Ok(Value::String(value.text.clone()));
    };

    match typed.name.as_str() {
        "int" | "i4" | "i8" => typed
            .text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| malformed(format!("bad integer {:?}: {}", typed.text, e))),
        "double" => {
            let f = typed
                .text
                .trim()
                .parse::<f64>()
                .map_err(|e| malformed(format!("bad double {:?}: {}", typed.text, e)))?;
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| malformed(format!("non-finite double {}", f)))
        }
        "boolean" => match typed.text.trim() {
            "1" => Ok(Value::Bool(true)),
            "0" => Ok(Value::Bool(false)),
            other => Err(malformed(format!("bad boolean {:?}", other))),
        },
        "string" | "dateTime.iso8601" | "base64" => Ok(Value::String(typed.text.clone())),
        "nil" => Ok(Value::Null),
        "array" => {
            let items = match typed.child("data") {
                Some(data) => data
                    .children
                    .iter()
                    .filter(|c| c.name == "value")
                    .map(decode_value)
                    .collect::<Result<Vec<_>>>()?,
                None => Vec::new(),
            };
            Ok(Value::Array(items))
        }
        "struct" => {
            let mut members = Map::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member
                    .child("name")
                    .ok_or_else(|| malformed("struct member without name"))?;
                let value = member
                    .child("value")
                    .ok_or_else(|| malformed(format!("struct member {} without value", name.text)))?;
                members.insert(name.text.trim().to_string(), decode_value(value)?);
            }
            Ok(Value::Object(members))
        }
        other => Err(malformed(format!("unknown value type <{}>", other))),
    }
}
