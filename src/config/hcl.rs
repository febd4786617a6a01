// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration document model and its HCL rendering.
//!
//! Generators build a [`Body`] tree with consuming builder calls and never
//! touch text; [`render`] turns the finished tree into HCL. Items are
//! written in insertion order, so equal trees always render to equal text.

use std::fmt::Write;

/// An attribute value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Bool(bool),
    Number(i64),
    List(Vec<Value>),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&[String]> for Value {
    fn from(values: &[String]) -> Self {
        Self::List(values.iter().map(|v| Value::String(v.clone())).collect())
    }
}

/// `name = value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: Value,
}

/// `kind "label" { body }`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub kind: String,
    pub labels: Vec<String>,
    pub body: Body,
}

impl Block {
    pub fn new(kind: &str, body: Body) -> Self {
        Self {
            kind: kind.to_string(),
            labels: Vec::new(),
            body,
        }
    }

    pub fn labeled(kind: &str, label: &str, body: Body) -> Self {
        Self {
            kind: kind.to_string(),
            labels: vec![label.to_string()],
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Attribute(Attribute),
    Block(Block),
}

/// Ordered attributes and blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Body {
    items: Vec<Item>,
}

impl Body {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute. Setting a name again replaces the value in place.
    pub fn attr(mut self, name: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        let existing = self.items.iter_mut().find_map(|item| match item {
            Item::Attribute(attr) if attr.name == name => Some(attr),
            _ => None,
        });
        match existing {
            Some(attr) => attr.value = value,
            None => self.items.push(Item::Attribute(Attribute {
                name: name.to_string(),
                value,
            })),
        }
        self
    }

    /// Set an attribute only when `condition` holds.
    pub fn attr_if(self, condition: bool, name: &str, value: impl Into<Value>) -> Self {
        if condition {
            self.attr(name, value)
        } else {
            self
        }
    }

    /// Set a string attribute unless `value` is empty.
    pub fn non_empty(self, name: &str, value: &str) -> Self {
        self.attr_if(!value.is_empty(), name, value)
    }

    /// Set a list attribute unless `values` is empty.
    pub fn non_empty_list(self, name: &str, values: &[String]) -> Self {
        self.attr_if(!values.is_empty(), name, values)
    }

    /// Append a block. Blocks with an empty body are dropped.
    pub fn block(mut self, block: Block) -> Self {
        if !block.body.is_empty() {
            self.items.push(Item::Block(block));
        }
        self
    }

    /// Append the block built by `build` only when `condition` holds.
    pub fn block_if(self, condition: bool, build: impl FnOnce() -> Block) -> Self {
        if condition {
            self.block(build())
        } else {
            self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Value of the attribute `name`, if set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.items.iter().find_map(|item| match item {
            Item::Attribute(attr) if attr.name == name => Some(&attr.value),
            _ => None,
        })
    }

    /// Blocks of the given kind, in order.
    pub fn blocks<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a Block> + 'a {
        self.items.iter().filter_map(move |item| match item {
            Item::Block(block) if block.kind == kind => Some(block),
            _ => None,
        })
    }

    /// First block of the given kind.
    pub fn find_block<'a>(&'a self, kind: &'a str) -> Option<&'a Block> {
        self.blocks(kind).next()
    }
}

/// Comment placed at the top of every generated file.
pub const BANNER: &str = "# generated with hashi-up\n\n";

/// Render `body` as an HCL document, prefixed with [`BANNER`].
pub fn render(body: &Body) -> String {
    let mut out = String::from(BANNER);
    write_body(&mut out, body, 0);
    out
}

fn write_body(out: &mut String, body: &Body, depth: usize) {
    let indent = "  ".repeat(depth);
    let items = body.items();
    let mut i = 0;

    while i < items.len() {
        match &items[i] {
            Item::Attribute(_) => {
                // Align `=` across a run of consecutive attributes.
                let run_end = items[i..]
                    .iter()
                    .position(|item| matches!(item, Item::Block(_)))
                    .map_or(items.len(), |offset| i + offset);
                let width = items[i..run_end]
                    .iter()
                    .filter_map(|item| match item {
                        Item::Attribute(attr) => Some(attr.name.len()),
                        Item::Block(_) => None,
                    })
                    .max()
                    .unwrap_or(0);

                for item in &items[i..run_end] {
                    if let Item::Attribute(attr) = item {
                        let _ = writeln!(
                            out,
                            "{indent}{:<width$} = {}",
                            attr.name,
                            format_value(&attr.value)
                        );
                    }
                }
                i = run_end;
            }
            Item::Block(block) => {
                if i > 0 {
                    out.push('\n');
                }
                out.push_str(&indent);
                out.push_str(&block.kind);
                for label in &block.labels {
                    let _ = write!(out, " {}", quote(label));
                }
                out.push_str(" {\n");
                write_body(out, &block.body, depth + 1);
                out.push_str(&indent);
                out.push_str("}\n");
                i += 1;
            }
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(s) => quote(s),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::List(values) => format!(
            "[{}]",
            values.iter().map(format_value).collect::<Vec<_>>().join(", ")
        ),
    }
}

/// Quote a string literal. `${` and `%{` are escaped so values are never
/// interpreted as templates.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
