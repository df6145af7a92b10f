#![forbid(unsafe_code)]

//! Binary-to-JSON engine.
//!
//! The walker drives a [`JsonWriter`] from an explicit frame stack; depth is
//! capped at 128 frames so hostile payloads cannot recurse the call stack.

use crate::binary::BinReader;
use crate::contract::{Contract, TypeKind, TypeNode};
use crate::json::JsonWriter;
use crate::{telemetry, Error, Result, MAX_STACK_SIZE};

struct Frame<'a> {
    ty: &'a TypeNode,
    position: i64,
    array_size: u32,
}

struct DecodeState<'a, 'b> {
    reader: BinReader<'b>,
    writer: JsonWriter,
    stack: Vec<Frame<'a>>,
}

impl Contract {
    /// Translate a wire-form payload of `type_name` into JSON text.
    pub fn bin_to_json(&self, type_name: &str, bin: &[u8]) -> Result<String> {
        let result = self.bin_to_json_inner(type_name, bin);
        telemetry::record("bin_to_json", result.is_ok(), bin.len());
        result
    }

    fn bin_to_json_inner(&self, type_name: &str, bin: &[u8]) -> Result<String> {
        let root = self.resolve_root(type_name, 0)?;
        let root_node = self.root_node(&root);

        let mut state = DecodeState {
            reader: BinReader::new(bin),
            writer: JsonWriter::new(),
            stack: Vec::new(),
        };
        state.step(self, root_node, true)?;
        loop {
            let ty = match state.stack.last() {
                Some(frame) => frame.ty,
                None => break,
            };
            state.step(self, ty, false)?;
            if state.stack.len() > MAX_STACK_SIZE {
                return Err(Error::RecursionLimit);
            }
        }
        Ok(state.writer.finish())
    }
}

impl<'a, 'b> DecodeState<'a, 'b> {
    fn step(&mut self, contract: &'a Contract, ty: &'a TypeNode, start: bool) -> Result<()> {
        match &ty.kind {
            TypeKind::Primitive(primitive) => {
                primitive.bin_to_json(&mut self.reader, &mut self.writer)
            }
            TypeKind::Alias(target) => self.step(contract, contract.node(*target), start),
            TypeKind::Optional(inner) => match self.reader.read_u8()? {
                0 => {
                    self.writer.null();
                    Ok(())
                }
                1 => self.step(contract, contract.node(*inner), true),
                other => Err(Error::InvalidOptionalTag(other)),
            },
            TypeKind::Struct(layout) => {
                if start {
                    self.writer.begin_object();
                    self.stack.push(Frame {
                        ty,
                        position: -1,
                        array_size: 0,
                    });
                    return Ok(());
                }
                let frame = self.stack.last_mut().expect("struct frame on stack");
                frame.position += 1;
                let position = frame.position as usize;
                if let Some(field) = layout.fields.get(position) {
                    self.writer.object_key(&field.name);
                    self.step(contract, contract.node(field.type_id), true)
                } else {
                    self.stack.pop();
                    self.writer.end_object();
                    Ok(())
                }
            }
            TypeKind::Array(element) => {
                if start {
                    let size = self.reader.read_varuint32()?;
                    self.writer.begin_array();
                    self.stack.push(Frame {
                        ty,
                        position: -1,
                        array_size: size,
                    });
                    return Ok(());
                }
                let frame = self.stack.last_mut().expect("array frame on stack");
                frame.position += 1;
                if (frame.position as u64) < u64::from(frame.array_size) {
                    self.step(contract, contract.node(*element), true)
                } else {
                    self.stack.pop();
                    self.writer.end_array();
                    Ok(())
                }
            }
        }
    }
}
