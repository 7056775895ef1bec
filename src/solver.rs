use crate::program::{ArithOp, Predicate};
use crate::term::Term;
use z3::ast::{Ast, Bool, Int};
use z3::{Config, Context, SatResult, Solver};

/// Answer of a satisfiability query.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Feasibility {
	Sat,
	Unsat,
	Unknown,
}

/// Decision procedure for path conditions.
///
/// `constraints` is interpreted as a conjunction of boolean terms; the empty
/// conjunction is trivially satisfiable.
pub trait ConstraintSolver {
	fn check(&self, constraints: &[Term]) -> Feasibility;
}

/// [`ConstraintSolver`] backed by Z3.
///
/// Each query gets a fresh `Solver` over a shared context; free variables of
/// the same name lower to the same Z3 constant, so constraints over one
/// program input line up across the conjunction.
pub struct Z3Solver {
	ctx: Context,
}

impl Z3Solver {
	pub fn new() -> Self {
		Z3Solver {
			ctx: Context::new(&Config::new()),
		}
	}
}

impl Default for Z3Solver {
	fn default() -> Self {
		Self::new()
	}
}

impl ConstraintSolver for Z3Solver {
	fn check(&self, constraints: &[Term]) -> Feasibility {
		let solver = Solver::new(&self.ctx);
		for constraint in constraints {
			solver.assert(&lower_bool(&self.ctx, constraint));
		}
		match solver.check() {
			SatResult::Sat => Feasibility::Sat,
			SatResult::Unsat => Feasibility::Unsat,
			SatResult::Unknown => Feasibility::Unknown,
		}
	}
}

fn lower_int<'ctx>(ctx: &'ctx Context, term: &Term) -> Int<'ctx> {
	match term {
		Term::Int(i) => Int::from_i64(ctx, *i),
		Term::Var(name) => Int::new_const(ctx, name.as_str()),
		Term::Arith(op, a, b) => {
			let a = lower_int(ctx, a);
			let b = lower_int(ctx, b);
			match op {
				ArithOp::Add => Int::add(ctx, &[&a, &b]),
				ArithOp::Sub => Int::sub(ctx, &[&a, &b]),
				ArithOp::Mul => Int::mul(ctx, &[&a, &b]),
				ArithOp::Div => a.div(&b),
			}
		}
		// the executors only build sort-correct terms
		Term::Bool(_) | Term::Cmp(..) | Term::Not(_) => {
			unreachable!("boolean term in integer position: {}", term)
		}
	}
}

fn lower_bool<'ctx>(ctx: &'ctx Context, term: &Term) -> Bool<'ctx> {
	match term {
		Term::Bool(b) => Bool::from_bool(ctx, *b),
		Term::Cmp(pred, a, b) => {
			let a = lower_int(ctx, a);
			let b = lower_int(ctx, b);
			match pred {
				Predicate::Lt => a.lt(&b),
				Predicate::Le => a.le(&b),
				Predicate::Gt => a.gt(&b),
				Predicate::Ge => a.ge(&b),
				Predicate::Eq => a._eq(&b),
				Predicate::Ne => a._eq(&b).not(),
			}
		}
		Term::Not(t) => lower_bool(ctx, t).not(),
		Term::Int(_) | Term::Var(_) | Term::Arith(..) => {
			unreachable!("integer term in boolean position: {}", term)
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn gt_zero(name: &str) -> Term {
		Term::cmp(Predicate::Gt, Term::var(name), Term::Int(0))
	}

	#[test]
	fn empty_conjunction_is_sat() {
		assert_eq!(Z3Solver::new().check(&[]), Feasibility::Sat);
	}

	#[test]
	fn free_variable_is_sat() {
		assert_eq!(Z3Solver::new().check(&[gt_zero("x")]), Feasibility::Sat);
	}

	#[test]
	fn contradiction_is_unsat() {
		let solver = Z3Solver::new();
		assert_eq!(
			solver.check(&[gt_zero("x"), Term::not(gt_zero("x"))]),
			Feasibility::Unsat
		);
		assert_eq!(solver.check(&[Term::Bool(false)]), Feasibility::Unsat);
	}

	#[test]
	fn same_name_means_same_variable() {
		// x > 0 and x + 1 <= 1 contradict only if both x are one constant
		let solver = Z3Solver::new();
		let sum = Term::arith(ArithOp::Add, Term::var("x"), Term::Int(1));
		let le_one = Term::cmp(Predicate::Le, sum, Term::Int(1));
		assert_eq!(solver.check(&[gt_zero("x"), le_one]), Feasibility::Unsat);
	}
}
