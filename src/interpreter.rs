use crate::program::{ArithOp, InstrId, InstrKind, Instruction, Loc, Operand, Program, VarId};
use log::debug;
use std::collections::HashMap;
use std::fmt;
use std::io::{self, Write};
use thiserror::Error;

/// A literal value of the two-sort domain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Value {
	Int(i64),
	Bool(bool),
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Value::Int(i) => write!(f, "{}", i),
			Value::Bool(b) => write!(f, "{}", b),
		}
	}
}

/// An execution-time semantic error, recorded on the state that hit it.
///
/// In concrete mode any of these is fatal to the run; in symbolic mode it only
/// terminates the branch it occurred on.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum EvalError {
	#[error("using unknown value: {0}")]
	UnknownValue(String),
	#[error("reading uninitialized variable: {0}")]
	UninitializedRead(String),
	#[error("division by zero: {0}")]
	DivisionByZero(String),
	#[error("assertion failed: {0}")]
	AssertionFailed(String),
	#[error("condition is not a boolean: {0}")]
	InvalidCondition(String),
	#[error("expected an integer operand: {0}")]
	NotAnInteger(String),
}

/// Fatal failure of a concrete run, naming the failing instruction.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("execution error at '{instruction}': {reason}")]
pub struct Diagnostic {
	pub instruction: String,
	pub reason: EvalError,
}

/// Outcome of a single [`Interpreter::step`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StepResult {
	Continue,
	Done,
}

/// Mutable state of one concrete execution: program counter, variable store,
/// register file and an error slot.
pub struct ExecutionState {
	pc: Option<Loc>,
	variables: HashMap<VarId, Value>,
	values: HashMap<InstrId, Value>,
	error: Option<EvalError>,
}

impl ExecutionState {
	pub fn new(pc: Loc) -> Self {
		ExecutionState {
			pc: Some(pc),
			variables: HashMap::new(),
			values: HashMap::new(),
			error: None,
		}
	}

	pub fn pc(&self) -> Option<Loc> {
		self.pc
	}

	pub fn error(&self) -> Option<&EvalError> {
		self.error.as_ref()
	}

	pub fn read(&self, var: VarId) -> Option<Value> {
		self.variables.get(&var).copied()
	}

	pub fn write(&mut self, var: VarId, value: Value) {
		self.variables.insert(var, value);
	}

	/// Resolve an operand: literals directly, instruction references through
	/// the register file. `None` means "used before defined".
	pub fn eval(&self, op: &Operand) -> Option<Value> {
		match *op {
			Operand::Int(i) => Some(Value::Int(i)),
			Operand::Bool(b) => Some(Value::Bool(b)),
			Operand::Instr(id) => self.values.get(&id).copied(),
		}
	}

	pub fn set(&mut self, id: InstrId, value: Value) {
		self.values.insert(id, value);
	}
}

/// Drives a single [`ExecutionState`] through a program on literal values.
///
/// Printed output goes to `out`; [`Interpreter::new`] wires it to stdout.
pub struct Interpreter<'p, W> {
	program: &'p Program,
	out: W,
}

impl<'p> Interpreter<'p, io::Stdout> {
	pub fn new(program: &'p Program) -> Self {
		Self::with_output(program, io::stdout())
	}
}

impl<'p, W: Write> Interpreter<'p, W> {
	pub fn with_output(program: &'p Program, out: W) -> Self {
		Interpreter { program, out }
	}

	/// Run to completion. Any error recorded during execution aborts the run
	/// with a diagnostic naming the failing instruction; concrete mode assumes
	/// full information, so there is nothing to recover to.
	pub fn run(&mut self) -> Result<(), Diagnostic> {
		let program = self.program;
		let entry = match program.entry() {
			Some(entry) => entry,
			None => return Ok(()),
		};
		let mut state = ExecutionState::new(entry);

		loop {
			let loc = match state.pc {
				Some(loc) => loc,
				None => return Ok(()),
			};
			let result = self.step(&mut state);
			if let Some(reason) = state.error.clone() {
				return Err(Diagnostic {
					instruction: program.display_instr(program.instruction(loc)),
					reason,
				});
			}
			if result == StepResult::Done {
				return Ok(());
			}
		}
	}

	/// Execute the instruction at the program counter and advance it.
	///
	/// On error the program counter is left in place and the error is recorded
	/// on the state; the caller decides what to do with it.
	pub fn step(&mut self, state: &mut ExecutionState) -> StepResult {
		let program = self.program;
		let loc = match state.pc {
			Some(loc) => loc,
			None => return StepResult::Done,
		};
		let instr = program.instruction(loc);
		debug!("executing: {}", program.display_instr(instr));

		match instr.kind() {
			InstrKind::Jump(..) => return self.execute_jump(state, instr),
			InstrKind::Halt => {
				state.pc = None;
				return StepResult::Done;
			}
			InstrKind::Arith(..) => self.execute_arith(state, instr),
			InstrKind::Cmp(..) => self.execute_cmp(state, instr),
			InstrKind::Load(..) | InstrKind::Store(..) => self.execute_mem(state, instr),
			InstrKind::Print(..) => self.execute_print(state, instr),
			InstrKind::Assert(..) => self.execute_assert(state, instr),
		}

		if state.error.is_none() {
			state.pc = program.next(loc);
			if state.pc.is_none() {
				return StepResult::Done;
			}
		}
		StepResult::Continue
	}

	fn resolve_int(&self, state: &mut ExecutionState, op: &Operand) -> Option<i64> {
		match state.eval(op) {
			Some(Value::Int(i)) => Some(i),
			Some(Value::Bool(_)) => {
				state.error = Some(EvalError::NotAnInteger(self.program.display_operand(op)));
				None
			}
			None => {
				state.error = Some(EvalError::UnknownValue(self.program.display_operand(op)));
				None
			}
		}
	}

	fn resolve_bool(&self, state: &mut ExecutionState, op: &Operand) -> Option<bool> {
		match state.eval(op) {
			Some(Value::Bool(b)) => Some(b),
			Some(Value::Int(_)) => {
				state.error = Some(EvalError::InvalidCondition(self.program.display_operand(op)));
				None
			}
			None => {
				state.error = Some(EvalError::UnknownValue(self.program.display_operand(op)));
				None
			}
		}
	}

	fn execute_arith(&mut self, state: &mut ExecutionState, instr: &Instruction) {
		let (op, a, b) = match instr.kind() {
			InstrKind::Arith(op, a, b) => (*op, a, b),
			_ => unreachable!(),
		};
		let a = match self.resolve_int(state, a) {
			Some(a) => a,
			None => return,
		};
		let b = match self.resolve_int(state, b) {
			Some(b) => b,
			None => return,
		};

		let result = match op {
			ArithOp::Add => a.wrapping_add(b),
			ArithOp::Sub => a.wrapping_sub(b),
			ArithOp::Mul => a.wrapping_mul(b),
			ArithOp::Div => {
				if b == 0 {
					state.error = Some(EvalError::DivisionByZero(
						self.program.display_instr(instr),
					));
					return;
				}
				a.wrapping_div(b)
			}
		};
		state.set(instr.id(), Value::Int(result));
	}

	fn execute_cmp(&mut self, state: &mut ExecutionState, instr: &Instruction) {
		let (pred, a, b) = match instr.kind() {
			InstrKind::Cmp(pred, a, b) => (*pred, a, b),
			_ => unreachable!(),
		};
		let a = match self.resolve_int(state, a) {
			Some(a) => a,
			None => return,
		};
		let b = match self.resolve_int(state, b) {
			Some(b) => b,
			None => return,
		};
		state.set(instr.id(), Value::Bool(pred.eval(a, b)));
	}

	fn execute_mem(&mut self, state: &mut ExecutionState, instr: &Instruction) {
		match instr.kind() {
			InstrKind::Load(var) => match state.read(*var) {
				Some(value) => state.set(instr.id(), value),
				None => {
					state.error = Some(EvalError::UninitializedRead(
						self.program.variable(*var).name().to_string(),
					));
				}
			},
			InstrKind::Store(val, var) => match state.eval(val) {
				// the write is suppressed on an unresolved value; nothing
				// null-like ever enters the variable store
				Some(value) => state.write(*var, value),
				None => {
					state.error =
						Some(EvalError::UnknownValue(self.program.display_operand(val)));
				}
			},
			_ => unreachable!(),
		}
	}

	fn execute_print(&mut self, state: &mut ExecutionState, instr: &Instruction) {
		let ops = match instr.kind() {
			InstrKind::Print(ops) => ops,
			_ => unreachable!(),
		};

		let mut vals = Vec::with_capacity(ops.len());
		for op in ops {
			match state.eval(op) {
				Some(value) => vals.push(value.to_string()),
				None => {
					// all or nothing: an unresolved operand skips the print
					state.error =
						Some(EvalError::UnknownValue(self.program.display_operand(op)));
					return;
				}
			}
		}

		if !vals.is_empty() {
			writeln!(self.out, "{}", vals.join(" ")).ok();
		}
	}

	fn execute_assert(&mut self, state: &mut ExecutionState, instr: &Instruction) {
		let cond = match instr.kind() {
			InstrKind::Assert(cond) => cond,
			_ => unreachable!(),
		};
		match self.resolve_bool(state, cond) {
			Some(true) | None => {}
			Some(false) => {
				state.error = Some(EvalError::AssertionFailed(
					self.program.display_instr(instr),
				));
			}
		}
	}

	fn execute_jump(&mut self, state: &mut ExecutionState, instr: &Instruction) -> StepResult {
		let (cond, t, f) = match instr.kind() {
			InstrKind::Jump(cond, t, f) => (cond, *t, *f),
			_ => unreachable!(),
		};
		if let Some(taken) = self.resolve_bool(state, cond) {
			let target = if taken { t } else { f };
			state.pc = self.program.block_entry(target);
			if state.pc.is_none() {
				return StepResult::Done;
			}
		}
		StepResult::Continue
	}
}
