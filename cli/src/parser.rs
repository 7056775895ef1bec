//! Parser for the textual program format.
//!
//! The format is line oriented: `;` starts a comment, `variables: a b c`
//! declares the variables, `block name:` opens a block and every following
//! line up to the next block header is an instruction of that block.
//! Instructions producing a value are written `name = <op> ...` and are
//! referenced by that name in later operands.

use std::collections::HashMap;
use symvm::{
	ArithOp, BlockId, InstrId, InstrKind, Operand, Predicate, Program, ProgramBuilder,
	ProgramError, VarId,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
	#[error("line {line}: {message}")]
	Syntax { line: usize, message: String },
	#[error(transparent)]
	Program(#[from] ProgramError),
}

fn syntax(line: usize, message: impl Into<String>) -> ParseError {
	ParseError::Syntax {
		line,
		message: message.into(),
	}
}

/// Non-empty, non-comment lines with their 1-based line numbers.
fn lines(source: &str) -> impl Iterator<Item = (usize, &str)> {
	source
		.lines()
		.enumerate()
		.map(|(i, line)| (i + 1, line.trim()))
		.filter(|(_, line)| !line.is_empty() && !line.starts_with(';'))
}

fn parse_block_name(line_no: usize, line: &str) -> Result<&str, ParseError> {
	let parts: Vec<_> = line.split_whitespace().collect();
	match parts.as_slice() {
		["block", name] if name.ends_with(':') && name.len() > 1 => {
			Ok(&name[..name.len() - 1])
		}
		_ => Err(syntax(line_no, "invalid block statement: should be 'block name:'")),
	}
}

struct Parser<'a> {
	builder: ProgramBuilder,
	blocks: HashMap<String, BlockId>,
	variables: HashMap<String, VarId>,
	instructions: HashMap<&'a str, InstrId>,
}

impl<'a> Parser<'a> {
	fn new() -> Self {
		Parser {
			builder: ProgramBuilder::new(),
			blocks: HashMap::new(),
			variables: HashMap::new(),
			instructions: HashMap::new(),
		}
	}

	/// A value operand: an integer literal or a named instruction result.
	fn operand(&self, line_no: usize, token: &str) -> Result<Operand, ParseError> {
		if let Ok(i) = token.parse::<i64>() {
			return Ok(Operand::Int(i));
		}
		self.instructions
			.get(token)
			.map(|id| Operand::Instr(*id))
			.ok_or_else(|| syntax(line_no, format!("invalid operand: '{}'", token)))
	}

	/// Like [`Parser::operand`], but also accepts the boolean literals.
	fn condition(&self, line_no: usize, token: &str) -> Result<Operand, ParseError> {
		match token {
			"true" | "True" => Ok(Operand::Bool(true)),
			"false" | "False" => Ok(Operand::Bool(false)),
			_ => self
				.operand(line_no, token)
				.map_err(|_| syntax(line_no, format!("invalid condition: '{}'", token))),
		}
	}

	fn variable(&self, line_no: usize, token: &str) -> Result<VarId, ParseError> {
		self.variables
			.get(token)
			.copied()
			.ok_or_else(|| syntax(line_no, format!("unknown variable: '{}'", token)))
	}

	fn block(&self, line_no: usize, token: &str) -> Result<BlockId, ParseError> {
		self.blocks
			.get(token)
			.copied()
			.ok_or_else(|| syntax(line_no, format!("invalid jump target: '{}'", token)))
	}

	fn parse_variables(&mut self, line_no: usize, line: &str) -> Result<(), ParseError> {
		for name in line["variables:".len()..].split_whitespace() {
			let id = self
				.builder
				.add_variable(name)
				.map_err(|e| syntax(line_no, e.to_string()))?;
			self.variables.insert(name.to_string(), id);
		}
		Ok(())
	}

	/// An instruction of the form `name = <op> ...`.
	fn parse_named(
		&mut self,
		line_no: usize,
		block: BlockId,
		lhs: &'a str,
		rhs: &str,
	) -> Result<(), ParseError> {
		if lhs.is_empty() || lhs.contains(char::is_whitespace) {
			return Err(syntax(line_no, format!("invalid instruction name: '{}'", lhs)));
		}
		if self.instructions.contains_key(lhs) {
			return Err(syntax(line_no, format!("duplicate instruction name: '{}'", lhs)));
		}

		let parts: Vec<_> = rhs.split_whitespace().collect();
		let kind = match parts.as_slice() {
			["load", var] => InstrKind::Load(self.variable(line_no, var)?),
			["load", ..] => {
				return Err(syntax(line_no, "invalid load: should be 'x = load var'"));
			}
			["cmp", pred, a, b] => {
				let pred = match *pred {
					"lt" => Predicate::Lt,
					"le" => Predicate::Le,
					"gt" => Predicate::Gt,
					"ge" => Predicate::Ge,
					"eq" => Predicate::Eq,
					"ne" => Predicate::Ne,
					other => {
						return Err(syntax(
							line_no,
							format!("invalid cmp predicate: '{}'", other),
						));
					}
				};
				InstrKind::Cmp(pred, self.operand(line_no, a)?, self.operand(line_no, b)?)
			}
			["cmp", ..] => {
				return Err(syntax(line_no, "invalid cmp: should be 'x = cmp pred a b'"));
			}
			[op @ ("add" | "sub" | "mul" | "div"), a, b] => {
				let op = match *op {
					"add" => ArithOp::Add,
					"sub" => ArithOp::Sub,
					"mul" => ArithOp::Mul,
					"div" => ArithOp::Div,
					_ => unreachable!(),
				};
				InstrKind::Arith(op, self.operand(line_no, a)?, self.operand(line_no, b)?)
			}
			[("add" | "sub" | "mul" | "div"), ..] => {
				return Err(syntax(line_no, "invalid arithmetic: should be 'x = op a b'"));
			}
			[other, ..] => {
				return Err(syntax(
					line_no,
					format!("unrecognized instruction: '{}'", other),
				));
			}
			[] => return Err(syntax(line_no, "missing instruction after '='")),
		};

		let id = self.builder.push_named(block, kind, lhs);
		self.instructions.insert(lhs, id);
		Ok(())
	}

	fn parse_instruction(
		&mut self,
		line_no: usize,
		block: BlockId,
		line: &'a str,
	) -> Result<(), ParseError> {
		if let Some(eq) = line.find('=') {
			let lhs = line[..eq].trim();
			let rhs = line[eq + 1..].trim();
			if rhs.contains('=') {
				return Err(syntax(line_no, format!("invalid instruction: '{}'", line)));
			}
			return self.parse_named(line_no, block, lhs, rhs);
		}

		let parts: Vec<_> = line.split_whitespace().collect();
		let kind = match parts.as_slice() {
			["halt"] => InstrKind::Halt,
			["store", val, "to", var] => InstrKind::Store(
				self.operand(line_no, val)?,
				self.variable(line_no, var)?,
			),
			["store", ..] => {
				return Err(syntax(line_no, "invalid store: should be 'store val to var'"));
			}
			["jump", cond, t, f] => InstrKind::Jump(
				self.condition(line_no, cond)?,
				self.block(line_no, t)?,
				self.block(line_no, f)?,
			),
			["jump", ..] => {
				return Err(syntax(line_no, "invalid jump: should be 'jump cond t f'"));
			}
			["print", ops @ ..] => {
				let ops = ops
					.iter()
					.map(|op| self.operand(line_no, op))
					.collect::<Result<Vec<_>, _>>()?;
				InstrKind::Print(ops)
			}
			["assert", cond] => InstrKind::Assert(self.condition(line_no, cond)?),
			["assert", ..] => {
				return Err(syntax(line_no, "invalid assert: should be 'assert cond'"));
			}
			[other, ..] => {
				return Err(syntax(
					line_no,
					format!("unrecognized instruction: '{}'", other),
				));
			}
			[] => unreachable!("blank lines are filtered out"),
		};

		self.builder.push(block, kind);
		Ok(())
	}

	fn parse(mut self, source: &'a str) -> Result<Program, ParseError> {
		// blocks first, so forward jump targets resolve
		for (line_no, line) in lines(source) {
			if line.starts_with("block") {
				let name = parse_block_name(line_no, line)?;
				let id = self
					.builder
					.add_block(name)
					.map_err(|e| syntax(line_no, e.to_string()))?;
				self.blocks.insert(name.to_string(), id);
			}
		}

		let mut current: Option<BlockId> = None;
		for (line_no, line) in lines(source) {
			if line.starts_with("block") {
				current = Some(self.blocks[parse_block_name(line_no, line)?]);
			} else if line.starts_with("variables:") {
				self.parse_variables(line_no, line)?;
			} else {
				let block = current
					.ok_or_else(|| syntax(line_no, "instruction outside of a block"))?;
				self.parse_instruction(line_no, block, line)?;
			}
		}

		Ok(self.builder.finish()?)
	}
}

pub fn parse_program(source: &str) -> Result<Program, ParseError> {
	Parser::new().parse(source)
}
