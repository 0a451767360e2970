//! Translator state: the emission target stack and loop/switch back-patch
//! frames. Mirrors the teacher's `codegen/state.rs` role of holding the
//! core mutable struct and small helper types shared by the other
//! `translator` submodules.

use crate::constant_pool::ConstantPool;
use crate::cursor::TokenCursor;
use crate::function_table::FunctionTable;
use crate::instruction::Instruction;
use crate::symbol::SymbolTables;
use crate::types::Type;

/// One loop or switch nesting frame, holding the not-yet-patched jump
/// indices for `break`/`continue` at this depth.
pub(crate) struct Frame {
    pub(crate) is_loop: bool,
    pub(crate) breaks: Vec<usize>,
    pub(crate) continues: Vec<usize>,
}

impl Frame {
    fn new(is_loop: bool) -> Self {
        Frame {
            is_loop,
            breaks: Vec::new(),
            continues: Vec::new(),
        }
    }
}

pub struct Translator {
    pub(crate) cursor: TokenCursor,
    pub(crate) pool: ConstantPool,
    pub(crate) symbols: SymbolTables,
    pub(crate) functions: FunctionTable,

    pub(crate) start_code: Vec<Instruction>,
    pub(crate) function_code: Vec<Vec<Instruction>>,

    /// The non-scratch instruction vector currently being built: the
    /// start-code accumulator until the first function definition, then
    /// one function body at a time.
    pub(crate) current: Vec<Instruction>,
    /// Nested scratch buffers used by the binary-operator staging
    /// discipline (§4.5): emission redirects here while translating a
    /// right-hand operand, then the buffer is appended to whatever was
    /// below it.
    pub(crate) scratch_stack: Vec<Vec<Instruction>>,

    pub(crate) loops: Vec<Frame>,

    /// Return type of the function body currently being translated, used
    /// to validate `return` statements. Meaningless outside a function body.
    pub(crate) current_function_return_type: Type,

    /// Set once the first function definition closes out start-code.
    pub(crate) start_code_closed: bool,
}

impl Translator {
    pub fn new(cursor: TokenCursor) -> Self {
        Translator {
            cursor,
            pool: ConstantPool::new(),
            symbols: SymbolTables::new(),
            functions: FunctionTable::new(),
            start_code: Vec::new(),
            function_code: Vec::new(),
            current: Vec::new(),
            scratch_stack: Vec::new(),
            loops: Vec::new(),
            current_function_return_type: Type::Void,
            start_code_closed: false,
        }
    }

    pub(crate) fn emit(&mut self, instr: Instruction) {
        match self.scratch_stack.last_mut() {
            Some(top) => top.push(instr),
            None => self.current.push(instr),
        }
    }

    /// Emit into the target one level *below* the active scratch buffer —
    /// i.e. "the left operand's target" while translating its right-hand
    /// side in a freshly pushed scratch buffer.
    pub(crate) fn emit_parent(&mut self, instr: Instruction) {
        let len = self.scratch_stack.len();
        if len >= 2 {
            self.scratch_stack[len - 2].push(instr);
        } else {
            self.current.push(instr);
        }
    }

    /// Index the *next* emitted instruction will occupy in the active
    /// non-scratch target. Only valid when no scratch buffer is active.
    pub(crate) fn current_ip(&self) -> usize {
        debug_assert!(self.scratch_stack.is_empty());
        self.current.len()
    }

    pub(crate) fn push_scratch(&mut self) {
        self.scratch_stack.push(Vec::new());
    }

    pub(crate) fn pop_scratch(&mut self) -> Vec<Instruction> {
        self.scratch_stack.pop().expect("scratch stack underflow")
    }

    /// Append instructions onto whatever is at the top of the emission
    /// stack right now (a scratch buffer or `current`).
    pub(crate) fn append(&mut self, instrs: Vec<Instruction>) {
        match self.scratch_stack.last_mut() {
            Some(top) => top.extend(instrs),
            None => self.current.extend(instrs),
        }
    }

    /// Back-patch the `x` operand of a previously emitted jump at `index`
    /// in the active non-scratch target.
    pub(crate) fn patch(&mut self, index: usize, target: i32) {
        debug_assert!(self.scratch_stack.is_empty());
        self.current[index].x = target;
    }

    pub(crate) fn begin_function_body(&mut self) {
        debug_assert!(self.scratch_stack.is_empty());
        let start = std::mem::take(&mut self.current);
        self.start_code = start;
        self.start_code_closed = true;
    }

    pub(crate) fn end_function_body(&mut self) -> Vec<Instruction> {
        debug_assert!(self.scratch_stack.is_empty());
        std::mem::take(&mut self.current)
    }

    pub(crate) fn push_loop(&mut self) {
        self.loops.push(Frame::new(true));
    }

    pub(crate) fn push_switch(&mut self) {
        self.loops.push(Frame::new(false));
    }

    pub(crate) fn in_loop_or_switch(&self) -> bool {
        !self.loops.is_empty()
    }

    pub(crate) fn has_enclosing_loop(&self) -> bool {
        self.loops.iter().any(|f| f.is_loop)
    }

    pub(crate) fn record_break(&mut self) -> usize {
        let ip = self.current_ip();
        self.loops.last_mut().expect("break outside loop/switch").breaks.push(ip);
        ip
    }

    pub(crate) fn record_continue(&mut self) -> usize {
        let ip = self.current_ip();
        self.loops
            .last_mut()
            .expect("continue outside loop/switch")
            .continues
            .push(ip);
        ip
    }

    /// Pop the current loop frame, returning its (breaks, continues).
    pub(crate) fn pop_loop(&mut self) -> (Vec<usize>, Vec<usize>) {
        let frame = self.loops.pop().expect("loop frame underflow");
        (frame.breaks, frame.continues)
    }

    /// Pop the current switch frame, patching its breaks to `break_target`
    /// and re-attaching its continues to the next frame out (per §8's
    /// back-patch closure invariant).
    pub(crate) fn pop_switch(&mut self, break_target: i32) {
        let frame = self.loops.pop().expect("switch frame underflow");
        for idx in frame.breaks {
            self.patch(idx, break_target);
        }
        if !frame.continues.is_empty() {
            let outer = self.loops.last_mut().expect(
                "continue inside switch with no enclosing loop should have been rejected earlier",
            );
            outer.continues.extend(frame.continues);
        }
    }
}
