//! A tiny instruction-level VM executed two ways over one control-flow
//! representation: a concrete interpreter over literal integer/boolean values,
//! and a symbolic executor that runs the same program on path-condition
//! constrained terms, forking at every branch whose outcome is not statically
//! determined and pruning infeasible forks with Z3.
//!
//! Programs are built through [`ProgramBuilder`] (typically by a parser);
//! the library itself never reads program text.

mod interpreter;
mod program;
mod solver;
mod symbolic;
mod term;

pub use crate::{
	interpreter::{Diagnostic, EvalError, ExecutionState, Interpreter, StepResult, Value},
	program::{
		ArithOp, Block, BlockId, InstrId, InstrKind, Instruction, Loc, Operand, Predicate,
		Program, ProgramBuilder, ProgramError, VarId, Variable,
	},
	solver::{ConstraintSolver, Feasibility, Z3Solver},
	symbolic::{SymbolicExecutor, SymbolicReport, SymbolicState},
	term::{Sort, Term},
};
