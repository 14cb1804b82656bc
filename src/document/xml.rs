//! XML 部件模型
//!
//! 把一个 XML 部件读成事件序列，选中的文本元素内容被收集为可替换的文本槽。
//! 未修改的事件原样写回，因此没有改动的内容保持逐字节一致。

use crate::error::DocumentError;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, BytesText, Event};
use quick_xml::name::QName;
use quick_xml::{Reader, Writer};
use std::borrow::Cow;
use std::fmt::Display;

fn xml_error(part: &str, error: impl Display) -> DocumentError {
    DocumentError::Xml {
        part: part.to_string(),
        message: error.to_string(),
    }
}

#[derive(Debug, Clone)]
enum Node {
    Event(Event<'static>),
    Slot(usize),
}

#[derive(Debug, Clone)]
struct TextSlot {
    original: Vec<Event<'static>>,
    text: String,
    replacement: Option<String>,
}

/// One parsed XML part.
#[derive(Debug, Clone)]
pub struct XmlPart {
    name: String,
    nodes: Vec<Node>,
    slots: Vec<TextSlot>,
    dirty: bool,
}

impl XmlPart {
    /// Parse `bytes`, turning the content of every element for which
    /// `is_text_element` returns true into a text slot.
    ///
    /// `is_text_element` receives the local names of the open elements,
    /// innermost last.
    pub fn parse<F>(name: &str, bytes: &[u8], is_text_element: F) -> Result<Self, DocumentError>
    where
        F: Fn(&[Vec<u8>]) -> bool,
    {
        let mut reader = Reader::from_reader(bytes);
        let mut buf = Vec::new();
        let mut stack: Vec<Vec<u8>> = Vec::new();
        let mut part = Self {
            name: name.to_string(),
            nodes: Vec::new(),
            slots: Vec::new(),
            dirty: false,
        };
        let mut content: Option<Vec<Event<'static>>> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| xml_error(name, e))?
                .into_owned();
            buf.clear();

            match event {
                Event::Eof => break,
                Event::Start(ref start) => {
                    if let Some(events) = content.take() {
                        part.push_slot(events)?;
                    }
                    stack.push(start.local_name().as_ref().to_vec());
                    let selected = is_text_element(&stack);
                    part.nodes.push(Node::Event(event));
                    if selected {
                        content = Some(Vec::new());
                    }
                }
                Event::End(_) => {
                    if let Some(events) = content.take() {
                        part.push_slot(events)?;
                    }
                    stack.pop();
                    part.nodes.push(Node::Event(event));
                }
                Event::Text(_)
                | Event::GeneralRef(_)
                | Event::CData(_)
                | Event::Comment(_)
                | Event::PI(_)
                    if content.is_some() =>
                {
                    if let Some(events) = content.as_mut() {
                        events.push(event);
                    }
                }
                other => part.nodes.push(Node::Event(other)),
            }
        }

        if !stack.is_empty() {
            return Err(xml_error(name, "unexpected end of document"));
        }
        Ok(part)
    }

    fn push_slot(&mut self, original: Vec<Event<'static>>) -> Result<(), DocumentError> {
        let text = decode_content(&self.name, &original)?;
        self.nodes.push(Node::Slot(self.slots.len()));
        self.slots.push(TextSlot {
            original,
            text,
            replacement: None,
        });
        Ok(())
    }

    /// Current text of a slot.
    pub fn text(&self, slot: usize) -> Option<&str> {
        self.slots
            .get(slot)
            .map(|slot| slot.replacement.as_deref().unwrap_or(&slot.text))
    }

    /// Slots inside each element with the given local name, in document
    /// order. Elements without any slot are left out.
    pub fn slot_groups(&self, local_name: &[u8]) -> Vec<Vec<usize>> {
        let mut groups = Vec::new();
        let mut current: Option<Vec<usize>> = None;
        for node in &self.nodes {
            match node {
                Node::Event(Event::Start(start)) if start.local_name().as_ref() == local_name => {
                    current = Some(Vec::new());
                }
                Node::Event(Event::End(end)) if end.local_name().as_ref() == local_name => {
                    if let Some(group) = current.take().filter(|group| !group.is_empty()) {
                        groups.push(group);
                    }
                }
                Node::Slot(index) => {
                    if let Some(group) = current.as_mut() {
                        group.push(*index);
                    }
                }
                _ => {}
            }
        }
        groups
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Replace the text of a slot. Writing back the current value is a no-op.
    pub fn set_text(&mut self, slot: usize, value: &str) -> Result<(), DocumentError> {
        let name = &self.name;
        let slot = self
            .slots
            .get_mut(slot)
            .ok_or_else(|| xml_error(name, format!("no text slot {}", slot)))?;
        if slot.text == value && slot.replacement.is_none() {
            return Ok(());
        }
        slot.replacement = Some(value.to_string());
        self.dirty = true;
        Ok(())
    }

    /// Node ids of the start or empty elements with the given local name.
    pub fn elements(&self, local_name: &[u8]) -> Vec<usize> {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, node)| match node {
                Node::Event(Event::Start(start)) | Node::Event(Event::Empty(start))
                    if start.local_name().as_ref() == local_name =>
                {
                    Some(index)
                }
                _ => None,
            })
            .collect()
    }

    pub fn attribute(&self, node: usize, key: &[u8]) -> Result<Option<String>, DocumentError> {
        let start = self.start_at(node)?;
        let attribute = start
            .try_get_attribute(key)
            .map_err(|e| xml_error(&self.name, e))?;
        match attribute {
            Some(attribute) => {
                let value = attribute
                    .unescape_value()
                    .map_err(|e| xml_error(&self.name, e))?;
                Ok(Some(value.into_owned()))
            }
            None => Ok(None),
        }
    }

    /// Set an attribute, keeping every other attribute and their order.
    pub fn set_attribute(&mut self, node: usize, key: &str, value: &str) -> Result<(), DocumentError> {
        if self.attribute(node, key.as_bytes())?.as_deref() == Some(value) {
            return Ok(());
        }

        let start = self.start_at(node)?;
        let mut rebuilt = BytesStart::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        let mut replaced = false;
        for attribute in start.attributes() {
            let attribute = attribute.map_err(|e| xml_error(&self.name, e))?;
            if attribute.key.as_ref() == key.as_bytes() {
                rebuilt.push_attribute((key, value));
                replaced = true;
            } else {
                rebuilt.push_attribute(Attribute {
                    key: QName(attribute.key.as_ref()),
                    value: Cow::Borrowed(attribute.value.as_ref()),
                });
            }
        }
        if !replaced {
            rebuilt.push_attribute((key, value));
        }

        let event = match &self.nodes[node] {
            Node::Event(Event::Start(_)) => Event::Start(rebuilt),
            _ => Event::Empty(rebuilt),
        };
        self.nodes[node] = Node::Event(event);
        self.dirty = true;
        Ok(())
    }

    fn start_at(&self, node: usize) -> Result<&BytesStart<'static>, DocumentError> {
        match self.nodes.get(node) {
            Some(Node::Event(Event::Start(start))) | Some(Node::Event(Event::Empty(start))) => {
                Ok(start)
            }
            _ => Err(xml_error(&self.name, format!("node {} is not an element", node))),
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        let mut writer = Writer::new(Vec::new());
        for node in &self.nodes {
            match node {
                Node::Event(event) => writer
                    .write_event(event.borrow())
                    .map_err(|e| xml_error(&self.name, e))?,
                Node::Slot(index) => {
                    let slot = &self.slots[*index];
                    match &slot.replacement {
                        Some(value) => writer
                            .write_event(Event::Text(BytesText::new(value)))
                            .map_err(|e| xml_error(&self.name, e))?,
                        None => {
                            for event in &slot.original {
                                writer
                                    .write_event(event.borrow())
                                    .map_err(|e| xml_error(&self.name, e))?;
                            }
                        }
                    }
                }
            }
        }
        Ok(writer.into_inner())
    }
}

/// Concatenate text, entity references and CDATA into plain text.
fn decode_content(part: &str, events: &[Event<'_>]) -> Result<String, DocumentError> {
    let mut text = String::new();
    for event in events {
        match event {
            Event::Text(content) => {
                text.push_str(&content.decode().map_err(|e| xml_error(part, e))?);
            }
            Event::CData(content) => {
                text.push_str(&content.decode().map_err(|e| xml_error(part, e))?);
            }
            Event::GeneralRef(reference) => {
                if let Some(ch) = reference
                    .resolve_char_ref()
                    .map_err(|e| xml_error(part, e))?
                {
                    text.push(ch);
                    continue;
                }
                let entity = reference.decode().map_err(|e| xml_error(part, e))?;
                match resolve_predefined_entity(&entity) {
                    Some(resolved) => text.push_str(resolved),
                    None => return Err(xml_error(part, format!("unknown entity &{};", entity))),
                }
            }
            _ => {}
        }
    }
    Ok(text)
}
