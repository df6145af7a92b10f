#![forbid(unsafe_code)]

//! JSON-to-binary engine.
//!
//! An explicit frame stack bounds the walk at 128 levels regardless of input
//! shape. Array element counts are not known until `]` arrives, so each array
//! records a size insertion instead of patching the buffer in place; a single
//! splice on finalization weaves the varuint32 prefixes into the output.

use std::fmt::Write;

use crate::binary::BinWriter;
use crate::contract::{Contract, StructLayout, TypeKind, TypeNode};
use crate::json::{JsonEvent, JsonTokenizer};
use crate::{telemetry, Error, Result, MAX_STACK_SIZE};

struct SizeInsertion {
    position: usize,
    size: u32,
}

struct Frame<'a> {
    ty: &'a TypeNode,
    position: i32,
    size_insertion_index: usize,
}

struct EncodeState<'a> {
    bin: BinWriter,
    size_insertions: Vec<SizeInsertion>,
    stack: Vec<Frame<'a>>,
}

impl Contract {
    /// Translate a JSON document conforming to `type_name` into its wire
    /// form.
    ///
    /// Errors are prefixed with a navigation path (`type.field[index]`)
    /// assembled from the walker stack at the point of failure.
    pub fn json_to_bin(&self, type_name: &str, json: &str) -> Result<Vec<u8>> {
        let result = self.json_to_bin_inner(type_name, json);
        telemetry::record(
            "json_to_bin",
            result.is_ok(),
            result.as_ref().map(Vec::len).unwrap_or(0),
        );
        result
    }

    fn json_to_bin_inner(&self, type_name: &str, json: &str) -> Result<Vec<u8>> {
        let root = self.resolve_root(type_name, 0)?;
        let root_node = self.root_node(&root);

        let mut tokenizer = JsonTokenizer::new(json);
        let mut state = EncodeState {
            bin: BinWriter::new(),
            size_insertions: Vec::new(),
            stack: vec![Frame {
                ty: root_node,
                position: -1,
                size_insertion_index: 0,
            }],
        };

        let mut start = true;
        let outcome = loop {
            match tokenizer.next_event() {
                Err(err) => break Err(err),
                Ok(None) => break Ok(()),
                Ok(Some(event)) => {
                    if let Err(err) = state.receive_event(self, &event, start) {
                        break Err(err);
                    }
                    start = false;
                }
            }
        };
        match outcome {
            Ok(()) => Ok(state.splice()),
            Err(err) => Err(wrap_with_path(&state.stack, err)),
        }
    }
}

impl<'a> EncodeState<'a> {
    fn receive_event(
        &mut self,
        contract: &'a Contract,
        event: &JsonEvent<'_>,
        start: bool,
    ) -> Result<()> {
        let ty = match self.stack.last() {
            Some(frame) => frame.ty,
            None => return Err(Error::ExtraData),
        };
        if start {
            // The root frame only carried the starting type; the handlers
            // push their own frames from here on.
            self.stack.clear();
        }
        if self.stack.len() > MAX_STACK_SIZE {
            return Err(Error::RecursionLimit);
        }
        self.dispatch(contract, ty, event, start)
    }

    fn dispatch(
        &mut self,
        contract: &'a Contract,
        ty: &'a TypeNode,
        event: &JsonEvent<'_>,
        start: bool,
    ) -> Result<()> {
        match &ty.kind {
            TypeKind::Primitive(primitive) => primitive.json_to_bin(&mut self.bin, event),
            TypeKind::Alias(target) => self.dispatch(contract, contract.node(*target), event, start),
            TypeKind::Optional(inner) => {
                if matches!(event, JsonEvent::Null) {
                    self.bin.write_u8(0);
                    Ok(())
                } else {
                    self.bin.write_u8(1);
                    self.dispatch(contract, contract.node(*inner), event, true)
                }
            }
            TypeKind::Struct(layout) => self.handle_struct(contract, ty, layout, event, start),
            TypeKind::Array(element) => self.handle_array(contract, ty, *element, event, start),
        }
    }

    fn handle_struct(
        &mut self,
        contract: &'a Contract,
        ty: &'a TypeNode,
        layout: &'a StructLayout,
        event: &JsonEvent<'_>,
        start: bool,
    ) -> Result<()> {
        if start {
            if !matches!(event, JsonEvent::StartObject) {
                return Err(Error::ExpectedObject);
            }
            self.stack.push(Frame {
                ty,
                position: -1,
                size_insertion_index: 0,
            });
            return Ok(());
        }
        match event {
            JsonEvent::EndObject => {
                let frame = self.stack.last().expect("struct frame on stack");
                let next = (frame.position + 1) as usize;
                if next != layout.fields.len() {
                    return Err(Error::ExpectedField(layout.fields[next].name.clone()));
                }
                self.stack.pop();
                Ok(())
            }
            JsonEvent::Key(key) => {
                // Fields are consumed strictly in declared order.
                let frame = self.stack.last_mut().expect("struct frame on stack");
                frame.position += 1;
                let Some(field) = layout.fields.get(frame.position as usize) else {
                    return Err(Error::UnexpectedField((*key).to_owned()));
                };
                if *key != field.name {
                    return Err(Error::ExpectedField(field.name.clone()));
                }
                Ok(())
            }
            _ => {
                let position = self.stack.last().expect("struct frame on stack").position;
                let field = match usize::try_from(position).map(|i| layout.fields.get(i)) {
                    Ok(Some(field)) => field,
                    _ => return Err(Error::ExpectedObject),
                };
                self.dispatch(contract, contract.node(field.type_id), event, true)
            }
        }
    }

    fn handle_array(
        &mut self,
        contract: &'a Contract,
        ty: &'a TypeNode,
        element: usize,
        event: &JsonEvent<'_>,
        start: bool,
    ) -> Result<()> {
        if start {
            if !matches!(event, JsonEvent::StartArray) {
                return Err(Error::ExpectedArray);
            }
            let index = self.size_insertions.len();
            self.size_insertions.push(SizeInsertion {
                position: self.bin.len(),
                size: 0,
            });
            self.stack.push(Frame {
                ty,
                position: -1,
                size_insertion_index: index,
            });
            return Ok(());
        }
        match event {
            JsonEvent::EndArray => {
                let frame = self.stack.pop().expect("array frame on stack");
                self.size_insertions[frame.size_insertion_index].size =
                    (frame.position + 1) as u32;
                Ok(())
            }
            _ => {
                self.stack
                    .last_mut()
                    .expect("array frame on stack")
                    .position += 1;
                self.dispatch(contract, contract.node(element), event, true)
            }
        }
    }

    /// Weave the recorded varuint32 array sizes into the scratch buffer.
    fn splice(self) -> Vec<u8> {
        let scratch = self.bin.finish();
        if self.size_insertions.is_empty() {
            return scratch;
        }
        let mut out = BinWriter::new();
        let mut consumed = 0;
        for insertion in &self.size_insertions {
            out.write_raw(&scratch[consumed..insertion.position]);
            out.write_varuint32(insertion.size);
            consumed = insertion.position;
        }
        out.write_raw(&scratch[consumed..]);
        out.finish()
    }
}

/// Assemble `type.field[index]` from the stack at the point of failure.
fn wrap_with_path(stack: &[Frame<'_>], err: Error) -> Error {
    let mut path = String::new();
    if let Some(first) = stack.first() {
        if matches!(first.ty.kind, TypeKind::Struct(_)) {
            path.push_str(&first.ty.name);
        }
    }
    for frame in stack {
        match &frame.ty.kind {
            TypeKind::Array(_) => {
                let _ = write!(path, "[{}]", frame.position);
            }
            TypeKind::Struct(layout) => {
                if frame.position >= 0 && (frame.position as usize) < layout.fields.len() {
                    path.push('.');
                    path.push_str(&layout.fields[frame.position as usize].name);
                }
            }
            _ => path.push_str("<?>"),
        }
    }
    if path.is_empty() {
        err
    } else {
        Error::Path {
            path,
            source: Box::new(err),
        }
    }
}
