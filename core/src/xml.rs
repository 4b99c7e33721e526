//! XML codec built on `quick_xml`.
//!
//! # Design
//! A document has exactly one root, so only a parameter set with exactly one
//! top-level key can be encoded: the key names the root element and its
//! value becomes the content. Decoding mirrors that and returns
//! `{root_name: content}`.
//!
//! Value mapping, both directions:
//! - object: one child element per field; `"@attributes"` holds attributes
//!   and `"#text"` holds text that sits next to child elements
//! - array under a field: the element is repeated once per item
//! - scalar: element text (decoded text is always a string)
//! - null: empty element (decodes to `""`)
//!
//! A parameter set therefore comes back unchanged only when its leaves are
//! strings, every object has at least one field and every array has at
//! least two items. A one-item array decodes as its item, and an empty
//! object or array decodes as `""`.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Value};

use crate::codec::Codec;
use crate::error::RestError;
use crate::types::Params;

const ATTRIBUTES: &str = "@attributes";
const TEXT: &str = "#text";
/// Element name for items of an array that is itself the root's content.
const ITEM: &str = "item";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn encode(&self, params: &Params) -> Result<Vec<u8>, RestError> {
        let mut entries = params.iter();
        let (root, content) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(RestError::Encode(format!(
                    "XML body needs exactly one root parameter, got {}",
                    params.len()
                )))
            }
        };

        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(encode_error)?;
        match content {
            Value::Array(items) => {
                write_start(&mut writer, root, None)?;
                for item in items {
                    write_element(&mut writer, ITEM, item)?;
                }
                write_end(&mut writer, root)?;
            }
            other => write_element(&mut writer, root, other)?,
        }
        Ok(writer.into_inner())
    }

    fn decode(&self, body: &[u8]) -> Result<Value, RestError> {
        let text = std::str::from_utf8(body).map_err(|e| RestError::Decode(e.to_string()))?;
        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<Frame> = Vec::new();
        let mut root: Option<(String, Value)> = None;

        loop {
            match reader.read_event().map_err(decode_error)? {
                Event::Start(start) => stack.push(Frame::open(&start)?),
                Event::Empty(start) => {
                    let frame = Frame::open(&start)?;
                    close(frame, &mut stack, &mut root)?;
                }
                Event::End(_) => {
                    let frame = stack
                        .pop()
                        .ok_or_else(|| RestError::Decode("unbalanced closing tag".to_string()))?;
                    close(frame, &mut stack, &mut root)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(decode_error)?;
                    append_text(&mut stack, &text)?;
                }
                Event::CData(cdata) => {
                    let text = String::from_utf8_lossy(&cdata).into_owned();
                    append_text(&mut stack, &text)?;
                }
                Event::Eof => break,
                // Declarations, comments, processing instructions, doctype.
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(RestError::Decode("unexpected end of document".to_string()));
        }
        let (name, value) =
            root.ok_or_else(|| RestError::Decode("document has no root element".to_string()))?;
        let mut map = Map::new();
        map.insert(name, value);
        Ok(Value::Object(map))
    }
}

/// Element being decoded.
struct Frame {
    name: String,
    fields: Map<String, Value>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, RestError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(decode_error)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(decode_error)?;
            attributes.insert(key, Value::String(value.into_owned()));
        }
        let mut fields = Map::new();
        if !attributes.is_empty() {
            fields.insert(ATTRIBUTES.to_string(), Value::Object(attributes));
        }
        Ok(Self {
            name,
            fields,
            text: String::new(),
        })
    }

    fn into_value(mut self) -> Value {
        if self.fields.is_empty() {
            return Value::String(self.text);
        }
        if !self.text.is_empty() {
            self.fields.insert(TEXT.to_string(), Value::String(self.text));
        }
        Value::Object(self.fields)
    }
}

fn close(
    frame: Frame,
    stack: &mut [Frame],
    root: &mut Option<(String, Value)>,
) -> Result<(), RestError> {
    let name = frame.name.clone();
    let value = frame.into_value();
    match stack.last_mut() {
        Some(parent) => {
            insert_child(&mut parent.fields, name, value);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some((name, value));
            Ok(())
        }
        None => Err(RestError::Decode("document has more than one root element".to_string())),
    }
}

/// Repeated sibling names collapse into an array.
fn insert_child(fields: &mut Map<String, Value>, name: String, value: Value) {
    match fields.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            fields.insert(name, value);
        }
    }
}

fn append_text(stack: &mut [Frame], text: &str) -> Result<(), RestError> {
    match stack.last_mut() {
        Some(frame) => {
            frame.text.push_str(text);
            Ok(())
        }
        None => Err(RestError::Decode("text outside the root element".to_string())),
    }
}

fn write_element(writer: &mut Writer<Vec<u8>>, name: &str, value: &Value) -> Result<(), RestError> {
    match value {
        Value::Null => {
            check_name(name)?;
            writer
                .write_event(Event::Empty(BytesStart::new(name)))
                .map_err(encode_error)?;
        }
        Value::Object(fields) => {
            write_start(writer, name, fields.get(ATTRIBUTES))?;
            if let Some(text) = fields.get(TEXT) {
                write_text(writer, text)?;
            }
            for (key, child) in fields {
                if key == ATTRIBUTES || key == TEXT {
                    continue;
                }
                match child {
                    Value::Array(items) => {
                        for item in items {
                            write_element(writer, key, item)?;
                        }
                    }
                    other => write_element(writer, key, other)?,
                }
            }
            write_end(writer, name)?;
        }
        // Nested arrays have no element name of their own.
        Value::Array(items) => {
            for item in items {
                write_element(writer, name, item)?;
            }
        }
        scalar => {
            write_start(writer, name, None)?;
            write_text(writer, scalar)?;
            write_end(writer, name)?;
        }
    }
    Ok(())
}

fn write_start(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    attributes: Option<&Value>,
) -> Result<(), RestError> {
    check_name(name)?;
    let mut start = BytesStart::new(name);
    if let Some(Value::Object(attributes)) = attributes {
        for (key, value) in attributes {
            check_name(key)?;
            let value = scalar_text(value);
            start.push_attribute((key.as_str(), value.as_str()));
        }
    }
    writer.write_event(Event::Start(start)).map_err(encode_error)
}

fn write_end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), RestError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(encode_error)
}

fn write_text(writer: &mut Writer<Vec<u8>>, value: &Value) -> Result<(), RestError> {
    let text = scalar_text(value);
    writer
        .write_event(Event::Text(BytesText::new(&text)))
        .map_err(encode_error)
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Conservative XML name check: letter or `_` first, then letters, digits, `-._:`.
fn check_name(name: &str) -> Result<(), RestError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(RestError::Encode(format!("{name:?} is not a valid XML element name")))
    }
}

fn encode_error(e: impl std::fmt::Display) -> RestError {
    RestError::Encode(e.to_string())
}

fn decode_error(e: impl std::fmt::Display) -> RestError {
    RestError::Decode(e.to_string())
}
