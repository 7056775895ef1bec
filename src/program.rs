use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Identifier of a variable declared in a [`Program`].
///
/// Variables are named scalar storage locations with a flat whole-program
/// namespace; there is no shadowing.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct VarId(pub(crate) u32);

/// Identifier of a block inside a [`Program`]. Block 0 is the entry block.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct BlockId(pub(crate) u32);

/// Unique identifier of an instruction, handed out by the [`ProgramBuilder`].
///
/// The identifier doubles as the default display name (`x<id>`) and as the
/// register under which other instructions reference this instruction's result.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct InstrId(pub(crate) u32);

impl fmt::Display for InstrId {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "x{}", self.0)
	}
}

/// Program counter: a position inside a block.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Loc {
	pub block: BlockId,
	pub index: usize,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ArithOp {
	Add,
	Sub,
	Mul,
	Div,
}

impl ArithOp {
	pub fn mnemonic(self) -> &'static str {
		match self {
			ArithOp::Add => "add",
			ArithOp::Sub => "sub",
			ArithOp::Mul => "mul",
			ArithOp::Div => "div",
		}
	}

	pub fn symbol(self) -> &'static str {
		match self {
			ArithOp::Add => "+",
			ArithOp::Sub => "-",
			ArithOp::Mul => "*",
			ArithOp::Div => "/",
		}
	}
}

impl fmt::Display for ArithOp {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.mnemonic())
	}
}

/// The six comparison predicates of the `cmp` instruction.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Predicate {
	Lt,
	Le,
	Gt,
	Ge,
	Eq,
	Ne,
}

impl Predicate {
	pub fn eval(self, a: i64, b: i64) -> bool {
		match self {
			Predicate::Lt => a < b,
			Predicate::Le => a <= b,
			Predicate::Gt => a > b,
			Predicate::Ge => a >= b,
			Predicate::Eq => a == b,
			Predicate::Ne => a != b,
		}
	}

	pub fn mnemonic(self) -> &'static str {
		match self {
			Predicate::Lt => "lt",
			Predicate::Le => "le",
			Predicate::Gt => "gt",
			Predicate::Ge => "ge",
			Predicate::Eq => "eq",
			Predicate::Ne => "ne",
		}
	}

	pub fn symbol(self) -> &'static str {
		match self {
			Predicate::Lt => "<",
			Predicate::Le => "<=",
			Predicate::Gt => ">",
			Predicate::Ge => ">=",
			Predicate::Eq => "=",
			Predicate::Ne => "!=",
		}
	}
}

impl fmt::Display for Predicate {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.mnemonic())
	}
}

/// A value operand: a literal or the result register of a prior instruction.
///
/// Variable and block references are not operands; the instruction kinds that
/// need them (`Load`, `Store`, `Jump`) carry them directly.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operand {
	Int(i64),
	Bool(bool),
	Instr(InstrId),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum InstrKind {
	Arith(ArithOp, Operand, Operand),
	Cmp(Predicate, Operand, Operand),
	Load(VarId),
	Store(Operand, VarId),
	Jump(Operand, BlockId, BlockId),
	Print(Vec<Operand>),
	Assert(Operand),
	Halt,
}

impl InstrKind {
	/// Whether this instruction transfers control and so may end a block.
	pub fn is_terminator(&self) -> bool {
		match self {
			InstrKind::Jump(..) | InstrKind::Halt => true,
			_ => false,
		}
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Instruction {
	id: InstrId,
	kind: InstrKind,
	name: Option<String>,
}

impl Instruction {
	pub fn id(&self) -> InstrId {
		self.id
	}

	pub fn kind(&self) -> &InstrKind {
		&self.kind
	}

	/// The user-given name, or `x<id>` if none was set.
	pub fn display_name(&self) -> String {
		match &self.name {
			Some(name) => name.clone(),
			None => self.id.to_string(),
		}
	}
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Variable {
	name: String,
}

impl Variable {
	pub fn name(&self) -> &str {
		&self.name
	}
}

/// A named, ordered sequence of instructions.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Block {
	name: String,
	instructions: Vec<Instruction>,
}

impl Block {
	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn len(&self) -> usize {
		self.instructions.len()
	}

	pub fn is_empty(&self) -> bool {
		self.instructions.is_empty()
	}

	pub fn instructions(&self) -> &[Instruction] {
		&self.instructions
	}
}

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ProgramError {
	#[error("program has no blocks")]
	Empty,
	#[error("duplicate block name: '{0}'")]
	DuplicateBlock(String),
	#[error("duplicate variable name: '{0}'")]
	DuplicateVariable(String),
	#[error("block '{0}' does not end in a control transfer")]
	MissingTerminator(String),
	#[error("jump in block '{0}' targets a block outside this program")]
	UndeclaredBlock(String),
	#[error("instruction {0} references a variable outside this program")]
	UndeclaredVariable(String),
	#[error("instruction {0} references an instruction outside this program")]
	UndeclaredInstr(String),
}

/// An immutable program: ordered blocks (the first is the entry block) plus
/// the declared variables.
///
/// Programs are only obtainable through [`ProgramBuilder::finish`], which
/// validates the structural invariants, so execution never has to deal with
/// malformed control flow.
#[derive(Clone, Debug)]
pub struct Program {
	blocks: Vec<Block>,
	variables: Vec<Variable>,
	instr_names: HashMap<InstrId, String>,
}

impl Program {
	/// Location of the first instruction of the entry block, or `None` if the
	/// entry block is empty.
	pub fn entry(&self) -> Option<Loc> {
		if self.blocks[0].is_empty() {
			None
		} else {
			Some(Loc {
				block: BlockId(0),
				index: 0,
			})
		}
	}

	pub fn block(&self, id: BlockId) -> &Block {
		&self.blocks[id.0 as usize]
	}

	pub fn blocks(&self) -> &[Block] {
		&self.blocks
	}

	pub fn variable(&self, id: VarId) -> &Variable {
		&self.variables[id.0 as usize]
	}

	pub fn variables(&self) -> &[Variable] {
		&self.variables
	}

	pub fn instruction(&self, loc: Loc) -> &Instruction {
		&self.block(loc.block).instructions[loc.index]
	}

	/// The instruction following `loc` in the same block, or `None` if `loc`
	/// is the last one.
	pub fn next(&self, loc: Loc) -> Option<Loc> {
		if loc.index + 1 < self.block(loc.block).len() {
			Some(Loc {
				block: loc.block,
				index: loc.index + 1,
			})
		} else {
			None
		}
	}

	/// Location of the first instruction of `block`.
	///
	/// Jump targets are validated to be non-empty, so this only returns `None`
	/// for empty unreachable blocks.
	pub fn block_entry(&self, block: BlockId) -> Option<Loc> {
		if self.block(block).is_empty() {
			None
		} else {
			Some(Loc { block, index: 0 })
		}
	}

	pub fn display_operand(&self, op: &Operand) -> String {
		match *op {
			Operand::Int(i) => i.to_string(),
			Operand::Bool(b) => b.to_string(),
			Operand::Instr(id) => match self.instr_names.get(&id) {
				Some(name) => name.clone(),
				None => id.to_string(),
			},
		}
	}

	/// Render an instruction in its textual form, e.g. `x3 = add x1 x2`.
	pub fn display_instr(&self, instr: &Instruction) -> String {
		match instr.kind() {
			InstrKind::Arith(op, a, b) => format!(
				"{} = {} {} {}",
				instr.display_name(),
				op,
				self.display_operand(a),
				self.display_operand(b)
			),
			InstrKind::Cmp(pred, a, b) => format!(
				"{} = cmp {} {} {}",
				instr.display_name(),
				pred,
				self.display_operand(a),
				self.display_operand(b)
			),
			InstrKind::Load(var) => {
				format!("{} = load {}", instr.display_name(), self.variable(*var).name())
			}
			InstrKind::Store(val, var) => format!(
				"store {} to {}",
				self.display_operand(val),
				self.variable(*var).name()
			),
			InstrKind::Jump(cond, t, f) => format!(
				"jump {} {} {}",
				self.display_operand(cond),
				self.block(*t).name(),
				self.block(*f).name()
			),
			InstrKind::Print(ops) => {
				let mut parts = vec!["print".to_string()];
				parts.extend(ops.iter().map(|op| self.display_operand(op)));
				parts.join(" ")
			}
			InstrKind::Assert(cond) => format!("assert {}", self.display_operand(cond)),
			InstrKind::Halt => "halt".to_string(),
		}
	}
}

impl fmt::Display for Program {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		let names: Vec<_> = self.variables.iter().map(|v| v.name()).collect();
		writeln!(f, "variables: {}", names.join(" "))?;
		for block in &self.blocks {
			writeln!(f)?;
			writeln!(f, "block {}:", block.name())?;
			for instr in block.instructions() {
				writeln!(f, "  {}", self.display_instr(instr))?;
			}
		}
		Ok(())
	}
}

/// Builds a [`Program`], handing out instruction identifiers from a counter
/// owned by the builder so independently built programs never share ids.
pub struct ProgramBuilder {
	blocks: Vec<Block>,
	block_names: HashMap<String, BlockId>,
	variables: Vec<Variable>,
	variable_names: HashMap<String, VarId>,
	next_id: u32,
}

impl ProgramBuilder {
	pub fn new() -> Self {
		ProgramBuilder {
			blocks: Vec::new(),
			block_names: HashMap::new(),
			variables: Vec::new(),
			variable_names: HashMap::new(),
			// ids start at 1 so default names read x1, x2, ...
			next_id: 1,
		}
	}

	pub fn add_variable(&mut self, name: &str) -> Result<VarId, ProgramError> {
		if self.variable_names.contains_key(name) {
			return Err(ProgramError::DuplicateVariable(name.to_string()));
		}
		let id = VarId(self.variables.len() as u32);
		self.variables.push(Variable {
			name: name.to_string(),
		});
		self.variable_names.insert(name.to_string(), id);
		Ok(id)
	}

	pub fn add_block(&mut self, name: &str) -> Result<BlockId, ProgramError> {
		if self.block_names.contains_key(name) {
			return Err(ProgramError::DuplicateBlock(name.to_string()));
		}
		let id = BlockId(self.blocks.len() as u32);
		self.blocks.push(Block {
			name: name.to_string(),
			instructions: Vec::new(),
		});
		self.block_names.insert(name.to_string(), id);
		Ok(id)
	}

	pub fn push(&mut self, block: BlockId, kind: InstrKind) -> InstrId {
		self.push_instruction(block, kind, None)
	}

	pub fn push_named(&mut self, block: BlockId, kind: InstrKind, name: &str) -> InstrId {
		self.push_instruction(block, kind, Some(name.to_string()))
	}

	fn push_instruction(&mut self, block: BlockId, kind: InstrKind, name: Option<String>) -> InstrId {
		let id = InstrId(self.next_id);
		self.next_id += 1;
		self.blocks[block.0 as usize].instructions.push(Instruction { id, kind, name });
		id
	}

	/// Validate the structural invariants and produce the program.
	///
	/// Checks that block and variable names are unique (enforced on insertion),
	/// that every operand and jump target refers into this program, and that
	/// every block reachable from the entry ends in `jump` or `halt`.
	pub fn finish(self) -> Result<Program, ProgramError> {
		if self.blocks.is_empty() {
			return Err(ProgramError::Empty);
		}

		let n_blocks = self.blocks.len() as u32;
		let n_variables = self.variables.len() as u32;

		for block in &self.blocks {
			for instr in block.instructions() {
				let name = instr.display_name();
				let check_op = |op: &Operand| match op {
					Operand::Instr(id) if id.0 >= self.next_id => {
						Err(ProgramError::UndeclaredInstr(name.clone()))
					}
					_ => Ok(()),
				};
				let check_var = |var: &VarId| {
					if var.0 >= n_variables {
						Err(ProgramError::UndeclaredVariable(name.clone()))
					} else {
						Ok(())
					}
				};
				match instr.kind() {
					InstrKind::Arith(_, a, b) | InstrKind::Cmp(_, a, b) => {
						check_op(a)?;
						check_op(b)?;
					}
					InstrKind::Load(var) => check_var(var)?,
					InstrKind::Store(val, var) => {
						check_op(val)?;
						check_var(var)?;
					}
					InstrKind::Jump(cond, t, f) => {
						check_op(cond)?;
						if t.0 >= n_blocks || f.0 >= n_blocks {
							return Err(ProgramError::UndeclaredBlock(block.name().to_string()));
						}
					}
					InstrKind::Print(ops) => {
						for op in ops {
							check_op(op)?;
						}
					}
					InstrKind::Assert(cond) => check_op(cond)?,
					InstrKind::Halt => {}
				}
			}
		}

		// every block reachable from the entry must end in a control transfer
		let mut reachable = vec![false; self.blocks.len()];
		let mut worklist = vec![BlockId(0)];
		while let Some(id) = worklist.pop() {
			if reachable[id.0 as usize] {
				continue;
			}
			reachable[id.0 as usize] = true;

			let block = &self.blocks[id.0 as usize];
			match block.instructions().last().map(Instruction::kind) {
				Some(InstrKind::Jump(_, t, f)) => {
					worklist.push(*t);
					worklist.push(*f);
				}
				Some(InstrKind::Halt) => {}
				_ => return Err(ProgramError::MissingTerminator(block.name().to_string())),
			}
		}

		let mut instr_names = HashMap::new();
		for block in &self.blocks {
			for instr in block.instructions() {
				if let Some(name) = &instr.name {
					instr_names.insert(instr.id, name.clone());
				}
			}
		}

		Ok(Program {
			blocks: self.blocks,
			variables: self.variables,
			instr_names,
		})
	}
}

impl Default for ProgramBuilder {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_program_rejected() {
		assert_eq!(ProgramBuilder::new().finish().unwrap_err(), ProgramError::Empty);
	}

	#[test]
	fn duplicate_names_rejected() {
		let mut builder = ProgramBuilder::new();
		builder.add_block("entry").unwrap();
		assert_eq!(
			builder.add_block("entry").unwrap_err(),
			ProgramError::DuplicateBlock("entry".to_string())
		);

		builder.add_variable("a").unwrap();
		assert_eq!(
			builder.add_variable("a").unwrap_err(),
			ProgramError::DuplicateVariable("a".to_string())
		);
	}

	#[test]
	fn missing_terminator_rejected() {
		let mut builder = ProgramBuilder::new();
		let entry = builder.add_block("entry").unwrap();
		builder.push(
			entry,
			InstrKind::Arith(ArithOp::Add, Operand::Int(1), Operand::Int(2)),
		);
		assert_eq!(
			builder.finish().unwrap_err(),
			ProgramError::MissingTerminator("entry".to_string())
		);
	}

	#[test]
	fn unreachable_block_may_lack_terminator() {
		let mut builder = ProgramBuilder::new();
		let entry = builder.add_block("entry").unwrap();
		let dead = builder.add_block("dead").unwrap();
		builder.push(entry, InstrKind::Halt);
		builder.push(
			dead,
			InstrKind::Arith(ArithOp::Add, Operand::Int(1), Operand::Int(2)),
		);
		assert!(builder.finish().is_ok());
	}

	#[test]
	fn jump_targets_are_reachable() {
		let mut builder = ProgramBuilder::new();
		let entry = builder.add_block("entry").unwrap();
		let target = builder.add_block("target").unwrap();
		builder.push(entry, InstrKind::Jump(Operand::Bool(true), target, target));
		// target is reachable and empty, so it has no terminator
		assert_eq!(
			builder.finish().unwrap_err(),
			ProgramError::MissingTerminator("target".to_string())
		);
	}

	#[test]
	fn ids_are_per_builder() {
		let mut a = ProgramBuilder::new();
		let entry = a.add_block("entry").unwrap();
		let first = a.push(entry, InstrKind::Halt);

		let mut b = ProgramBuilder::new();
		let entry = b.add_block("entry").unwrap();
		let second = b.push(entry, InstrKind::Halt);

		assert_eq!(first, second);
	}

	#[test]
	fn instruction_rendering() {
		let mut builder = ProgramBuilder::new();
		let entry = builder.add_block("entry").unwrap();
		let exit = builder.add_block("exit").unwrap();
		let v = builder.add_variable("a").unwrap();

		let sum = builder.push_named(
			entry,
			InstrKind::Arith(ArithOp::Add, Operand::Int(2), Operand::Int(3)),
			"sum",
		);
		let cmp = builder.push(
			entry,
			InstrKind::Cmp(Predicate::Lt, Operand::Instr(sum), Operand::Int(10)),
		);
		builder.push(entry, InstrKind::Store(Operand::Instr(sum), v));
		builder.push(entry, InstrKind::Jump(Operand::Instr(cmp), exit, exit));
		builder.push(exit, InstrKind::Halt);

		let program = builder.finish().unwrap();
		let entry = program.block(BlockId(0));
		let rendered: Vec<_> = entry
			.instructions()
			.iter()
			.map(|i| program.display_instr(i))
			.collect();
		assert_eq!(
			rendered,
			vec![
				"sum = add 2 3",
				"x2 = cmp lt sum 10",
				"store sum to a",
				"jump x2 exit exit",
			]
		);
	}
}
