use crate::interpreter::EvalError;
use crate::program::{ArithOp, InstrId, InstrKind, Instruction, Loc, Operand, Program, VarId};
use crate::solver::{ConstraintSolver, Feasibility};
use crate::term::{Sort, Term};
use log::{debug, warn};
use std::collections::HashMap;
use std::io::{self, Write};

/// Mutable state of one symbolic execution branch.
///
/// Same shape as the concrete [`ExecutionState`](crate::ExecutionState), but
/// the variable store and register file hold symbolic [`Term`]s, and the state
/// additionally carries its path condition: the ordered list of boolean terms
/// whose conjunction must be satisfiable for this branch to be feasible.
pub struct SymbolicState {
	pc: Option<Loc>,
	variables: HashMap<VarId, Term>,
	values: HashMap<InstrId, Term>,
	path_condition: Vec<Term>,
	error: Option<EvalError>,
}

impl SymbolicState {
	pub fn new(pc: Loc) -> Self {
		SymbolicState {
			pc: Some(pc),
			variables: HashMap::new(),
			values: HashMap::new(),
			path_condition: Vec::new(),
			error: None,
		}
	}

	/// Split off an independent copy. All per-state containers are copied;
	/// only the program graph stays shared, and it is read-only.
	pub fn fork(&self) -> SymbolicState {
		SymbolicState {
			pc: self.pc,
			variables: self.variables.clone(),
			values: self.values.clone(),
			path_condition: self.path_condition.clone(),
			error: self.error.clone(),
		}
	}

	pub fn pc(&self) -> Option<Loc> {
		self.pc
	}

	pub fn error(&self) -> Option<&EvalError> {
		self.error.as_ref()
	}

	pub fn path_condition(&self) -> &[Term] {
		&self.path_condition
	}

	/// Append a constraint to the path condition.
	pub fn assume(&mut self, constraint: Term) {
		self.path_condition.push(constraint);
	}

	pub fn read(&self, var: VarId) -> Option<&Term> {
		self.variables.get(&var)
	}

	pub fn write(&mut self, var: VarId, value: Term) {
		self.variables.insert(var, value);
	}

	pub fn eval(&self, op: &Operand) -> Option<Term> {
		match op {
			Operand::Int(i) => Some(Term::Int(*i)),
			Operand::Bool(b) => Some(Term::Bool(*b)),
			Operand::Instr(id) => self.values.get(id).cloned(),
		}
	}

	pub fn set(&mut self, id: InstrId, value: Term) {
		self.values.insert(id, value);
	}
}

/// Counters reported at the end of a symbolic run.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SymbolicReport {
	/// Paths that ran to completion (halt, block end, or a dead end).
	pub executed_paths: usize,
	/// Paths on which an assertion violation was feasible.
	pub error_paths: usize,
}

/// Explores all feasible paths of a program over symbolic values.
///
/// States are driven from an explicit stack, most recently forked first, so
/// exploration is depth first and its depth is independent of the call stack.
/// Every conditional forks into at most two successor states, and forks whose
/// extended path condition the solver rejects are pruned immediately.
pub struct SymbolicExecutor<'p, S, W> {
	program: &'p Program,
	solver: S,
	out: W,
	executed_paths: usize,
	error_paths: usize,
}

impl<'p, S: ConstraintSolver> SymbolicExecutor<'p, S, io::Stdout> {
	pub fn new(program: &'p Program, solver: S) -> Self {
		Self::with_output(program, solver, io::stdout())
	}
}

impl<'p, S: ConstraintSolver, W: Write> SymbolicExecutor<'p, S, W> {
	pub fn with_output(program: &'p Program, solver: S, out: W) -> Self {
		SymbolicExecutor {
			program,
			solver,
			out,
			executed_paths: 0,
			error_paths: 0,
		}
	}

	pub fn executed_paths(&self) -> usize {
		self.executed_paths
	}

	pub fn error_paths(&self) -> usize {
		self.error_paths
	}

	/// Explore every feasible path, print the two counters and return them.
	pub fn run(&mut self) -> SymbolicReport {
		if let Some(entry) = self.program.entry() {
			let mut worklist = vec![SymbolicState::new(entry)];
			while let Some(state) = worklist.pop() {
				worklist.extend(self.step(state));
			}
		}

		writeln!(self.out, "Executed paths: {}", self.executed_paths).ok();
		writeln!(self.out, "Error paths: {}", self.error_paths).ok();
		SymbolicReport {
			executed_paths: self.executed_paths,
			error_paths: self.error_paths,
		}
	}

	/// Execute one instruction of `state`, producing its 0 to 2 successors.
	///
	/// A state with no successors has terminated and is accounted for in the
	/// counters; the caller only has to keep pushing successors.
	pub fn step(&mut self, mut state: SymbolicState) -> Vec<SymbolicState> {
		let program = self.program;
		let loc = match state.pc {
			Some(loc) => loc,
			None => {
				self.executed_paths += 1;
				return vec![];
			}
		};
		let instr = program.instruction(loc);
		debug!("executing: {}", program.display_instr(instr));

		match instr.kind() {
			InstrKind::Jump(..) => return self.execute_jump(state, instr),
			InstrKind::Assert(..) => return self.execute_assert(state, instr, loc),
			InstrKind::Halt => {
				self.executed_paths += 1;
				return vec![];
			}
			InstrKind::Arith(..) => self.execute_arith(&mut state, instr),
			InstrKind::Cmp(..) => self.execute_cmp(&mut state, instr),
			InstrKind::Load(..) | InstrKind::Store(..) => self.execute_mem(&mut state, instr),
			InstrKind::Print(..) => self.execute_print(&mut state, instr),
		}

		if let Some(error) = &state.error {
			// an error terminates only this branch
			debug!("branch ended with error: {}", error);
			self.executed_paths += 1;
			return vec![];
		}

		state.pc = program.next(loc);
		if state.pc.is_none() {
			self.executed_paths += 1;
			return vec![];
		}
		vec![state]
	}

	/// Whether a path condition is worth exploring. A solver "unknown" prunes
	/// like unsat, but loudly.
	fn feasible(&self, path_condition: &[Term]) -> bool {
		match self.solver.check(path_condition) {
			Feasibility::Sat => true,
			Feasibility::Unsat => false,
			Feasibility::Unknown => {
				warn!("solver returned unknown, pruning branch");
				false
			}
		}
	}

	fn resolve_int(&self, state: &mut SymbolicState, op: &Operand) -> Option<Term> {
		match state.eval(op) {
			Some(term) => {
				if term.sort() == Sort::Int {
					Some(term)
				} else {
					state.error =
						Some(EvalError::NotAnInteger(self.program.display_operand(op)));
					None
				}
			}
			None => {
				state.error = Some(EvalError::UnknownValue(self.program.display_operand(op)));
				None
			}
		}
	}

	fn resolve_bool(&self, state: &mut SymbolicState, op: &Operand) -> Option<Term> {
		match state.eval(op) {
			Some(term) => {
				if term.sort() == Sort::Bool {
					Some(term)
				} else {
					state.error =
						Some(EvalError::InvalidCondition(self.program.display_operand(op)));
					None
				}
			}
			None => {
				state.error = Some(EvalError::UnknownValue(self.program.display_operand(op)));
				None
			}
		}
	}

	fn execute_arith(&mut self, state: &mut SymbolicState, instr: &Instruction) {
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

		if op == ArithOp::Div && b == Term::Int(0) {
			state.error = Some(EvalError::DivisionByZero(
				self.program.display_instr(instr),
			));
			return;
		}
		state.set(instr.id(), Term::arith(op, a, b));
	}

	fn execute_cmp(&mut self, state: &mut SymbolicState, instr: &Instruction) {
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
		state.set(instr.id(), Term::cmp(pred, a, b));
	}

	fn execute_mem(&mut self, state: &mut SymbolicState, instr: &Instruction) {
		match instr.kind() {
			InstrKind::Load(var) => match state.read(*var) {
				Some(value) => {
					let value = value.clone();
					state.set(instr.id(), value);
				}
				// a variable that was never written is an unconstrained
				// input: synthesize a free term named after it
				None => {
					let free = Term::var(self.program.variable(*var).name());
					state.set(instr.id(), free);
				}
			},
			InstrKind::Store(val, var) => match state.eval(val) {
				Some(value) => state.write(*var, value),
				None => {
					state.error =
						Some(EvalError::UnknownValue(self.program.display_operand(val)));
				}
			},
			_ => unreachable!(),
		}
	}

	fn execute_print(&mut self, state: &mut SymbolicState, instr: &Instruction) {
		let ops = match instr.kind() {
			InstrKind::Print(ops) => ops,
			_ => unreachable!(),
		};

		let mut vals = Vec::with_capacity(ops.len());
		for op in ops {
			match state.eval(op) {
				Some(term) => vals.push(term.to_string()),
				None => {
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

	/// Fork at a two-way branch: extend one side's path condition with the
	/// condition and the other's with its negation, keep the sides the solver
	/// considers feasible, and advance each kept side to its target block.
	fn execute_jump(&mut self, mut state: SymbolicState, instr: &Instruction) -> Vec<SymbolicState> {
		let (cond, t, f) = match instr.kind() {
			InstrKind::Jump(cond, t, f) => (cond, *t, *f),
			_ => unreachable!(),
		};
		let cond = match self.resolve_bool(&mut state, cond) {
			Some(cond) => cond,
			None => {
				// an unevaluable condition is a dead end, not a fork
				debug!("branch ended with error: {}", state.error.as_ref().unwrap());
				self.executed_paths += 1;
				return vec![];
			}
		};

		let mut false_state = state.fork();
		let mut true_state = state;
		true_state.assume(cond.clone());
		false_state.assume(Term::not(cond));

		let mut successors = Vec::with_capacity(2);
		if self.feasible(true_state.path_condition()) {
			true_state.pc = self.program.block_entry(t);
			successors.push(true_state);
		}
		if self.feasible(false_state.path_condition()) {
			false_state.pc = self.program.block_entry(f);
			successors.push(false_state);
		}

		if successors.is_empty() {
			// both polarities infeasible: the branch point is dead code
			// under the current path condition
			self.executed_paths += 1;
		}
		successors
	}

	/// Check both polarities of an assertion. A feasible violation is counted
	/// as an error path and discarded; a feasible pass continues with the
	/// assertion recorded in its path condition.
	fn execute_assert(
		&mut self,
		mut state: SymbolicState,
		instr: &Instruction,
		loc: Loc,
	) -> Vec<SymbolicState> {
		let cond = match instr.kind() {
			InstrKind::Assert(cond) => cond,
			_ => unreachable!(),
		};
		let cond = match self.resolve_bool(&mut state, cond) {
			Some(cond) => cond,
			None => {
				debug!("branch ended with error: {}", state.error.as_ref().unwrap());
				self.executed_paths += 1;
				return vec![];
			}
		};

		let mut violated = state.fork();
		violated.assume(Term::not(cond.clone()));
		state.assume(cond);

		let violation_feasible = self.feasible(violated.path_condition());
		if violation_feasible {
			debug!(
				"feasible assertion violation: {}",
				self.program.display_instr(instr)
			);
			self.error_paths += 1;
		}

		if self.feasible(state.path_condition()) {
			state.pc = self.program.next(loc);
			if state.pc.is_none() {
				self.executed_paths += 1;
				return vec![];
			}
			vec![state]
		} else {
			if !violation_feasible {
				// neither polarity is reachable: dead code
				self.executed_paths += 1;
			}
			vec![]
		}
	}
}
