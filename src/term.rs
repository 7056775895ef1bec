use crate::program::{ArithOp, Predicate};
use std::fmt;
use std::rc::Rc;

/// The two sorts of the value domain.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sort {
	Int,
	Bool,
}

/// A symbolic value: an immutable expression over literals, free variables and
/// the VM's operators.
///
/// Subterms are reference counted, so cloning a term (and with it a whole
/// register file on a fork) is cheap; terms are never mutated after creation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Term {
	Int(i64),
	Bool(bool),
	/// A free integer variable, introduced when a program reads a variable
	/// that was never written: an unconstrained input.
	Var(String),
	Arith(ArithOp, Rc<Term>, Rc<Term>),
	Cmp(Predicate, Rc<Term>, Rc<Term>),
	Not(Rc<Term>),
}

impl Term {
	pub fn var(name: &str) -> Term {
		Term::Var(name.to_string())
	}

	/// Build an arithmetic term, folding literal operands.
	///
	/// Division is only folded for a non-zero divisor; the zero case is caught
	/// by the executors before a term is built.
	pub fn arith(op: ArithOp, a: Term, b: Term) -> Term {
		if let (Term::Int(a), Term::Int(b)) = (&a, &b) {
			match op {
				ArithOp::Add => return Term::Int(a.wrapping_add(*b)),
				ArithOp::Sub => return Term::Int(a.wrapping_sub(*b)),
				ArithOp::Mul => return Term::Int(a.wrapping_mul(*b)),
				ArithOp::Div if *b != 0 => return Term::Int(a.wrapping_div(*b)),
				ArithOp::Div => {}
			}
		}
		Term::Arith(op, Rc::new(a), Rc::new(b))
	}

	/// Build a comparison term, folding literal operands.
	pub fn cmp(pred: Predicate, a: Term, b: Term) -> Term {
		if let (Term::Int(a), Term::Int(b)) = (&a, &b) {
			return Term::Bool(pred.eval(*a, *b));
		}
		Term::Cmp(pred, Rc::new(a), Rc::new(b))
	}

	/// Boolean negation, folding literals and double negation.
	pub fn not(t: Term) -> Term {
		match t {
			Term::Bool(b) => Term::Bool(!b),
			Term::Not(inner) => (*inner).clone(),
			t => Term::Not(Rc::new(t)),
		}
	}

	pub fn sort(&self) -> Sort {
		match self {
			Term::Int(_) | Term::Var(_) | Term::Arith(..) => Sort::Int,
			Term::Bool(_) | Term::Cmp(..) | Term::Not(_) => Sort::Bool,
		}
	}
}

impl fmt::Display for Term {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Term::Int(i) => write!(f, "{}", i),
			Term::Bool(b) => write!(f, "{}", b),
			Term::Var(name) => f.write_str(name),
			Term::Arith(op, a, b) => write!(f, "({} {} {})", a, op.symbol(), b),
			Term::Cmp(pred, a, b) => write!(f, "({} {} {})", a, pred.symbol(), b),
			Term::Not(t) => write!(f, "!{}", t),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn literal_folding() {
		assert_eq!(
			Term::arith(ArithOp::Add, Term::Int(2), Term::Int(3)),
			Term::Int(5)
		);
		assert_eq!(
			Term::cmp(Predicate::Lt, Term::Int(2), Term::Int(3)),
			Term::Bool(true)
		);
		assert_eq!(Term::not(Term::Bool(true)), Term::Bool(false));

		// division by a literal zero must not fold
		let t = Term::arith(ArithOp::Div, Term::Int(1), Term::Int(0));
		assert_eq!(t.sort(), Sort::Int);
		assert_ne!(t, Term::Int(0));
	}

	#[test]
	fn free_terms_stay_symbolic() {
		let t = Term::arith(ArithOp::Add, Term::var("x"), Term::Int(1));
		assert_eq!(t.sort(), Sort::Int);
		assert_eq!(t.to_string(), "(x + 1)");

		let c = Term::cmp(Predicate::Gt, Term::var("x"), Term::Int(0));
		assert_eq!(c.sort(), Sort::Bool);
		assert_eq!(Term::not(c.clone()).to_string(), "!(x > 0)");
		assert_eq!(Term::not(Term::not(c.clone())), c);
	}
}
