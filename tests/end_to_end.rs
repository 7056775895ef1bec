use symvm::{
	ArithOp, InstrKind, Interpreter, Operand, Predicate, Program, ProgramBuilder,
	SymbolicExecutor, Z3Solver,
};

fn interpret(program: &Program) -> String {
	let mut out = Vec::new();
	Interpreter::with_output(program, &mut out).run().unwrap();
	String::from_utf8(out).unwrap()
}

fn execute_symbolically(program: &Program) -> (usize, usize, String) {
	let mut out = Vec::new();
	let report = SymbolicExecutor::with_output(program, Z3Solver::new(), &mut out).run();
	(
		report.executed_paths,
		report.error_paths,
		String::from_utf8(out).unwrap(),
	)
}

/// Sums the integers 1..=3 in a loop and prints the result.
fn counting_loop() -> Program {
	let mut builder = ProgramBuilder::new();
	let entry = builder.add_block("entry").unwrap();
	let header = builder.add_block("header").unwrap();
	let body = builder.add_block("body").unwrap();
	let exit = builder.add_block("exit").unwrap();
	let i = builder.add_variable("i").unwrap();
	let acc = builder.add_variable("acc").unwrap();

	builder.push(entry, InstrKind::Store(Operand::Int(1), i));
	builder.push(entry, InstrKind::Store(Operand::Int(0), acc));
	builder.push(entry, InstrKind::Jump(Operand::Bool(true), header, header));

	let iv = builder.push(header, InstrKind::Load(i));
	let in_bounds = builder.push(
		header,
		InstrKind::Cmp(Predicate::Le, Operand::Instr(iv), Operand::Int(3)),
	);
	builder.push(header, InstrKind::Jump(Operand::Instr(in_bounds), body, exit));

	let iv = builder.push(body, InstrKind::Load(i));
	let av = builder.push(body, InstrKind::Load(acc));
	let sum = builder.push(
		body,
		InstrKind::Arith(ArithOp::Add, Operand::Instr(av), Operand::Instr(iv)),
	);
	builder.push(body, InstrKind::Store(Operand::Instr(sum), acc));
	let next = builder.push(
		body,
		InstrKind::Arith(ArithOp::Add, Operand::Instr(iv), Operand::Int(1)),
	);
	builder.push(body, InstrKind::Store(Operand::Instr(next), i));
	builder.push(body, InstrKind::Jump(Operand::Bool(true), header, header));

	let result = builder.push(exit, InstrKind::Load(acc));
	builder.push(exit, InstrKind::Print(vec![Operand::Instr(result)]));
	builder.push(exit, InstrKind::Halt);
	builder.finish().unwrap()
}

#[test]
fn concrete_loop_sums() {
	assert_eq!(interpret(&counting_loop()), "6\n");
}

#[test]
fn fully_determined_loop_is_one_symbolic_path() {
	// every branch outcome is forced, so no fork ever survives on both sides
	let (executed, errors, output) = execute_symbolically(&counting_loop());
	assert_eq!(executed, 1);
	assert_eq!(errors, 0);
	assert_eq!(output, "6\nExecuted paths: 1\nError paths: 0\n");
}

#[test]
fn both_modes_print_the_same_straight_line_output() {
	let mut builder = ProgramBuilder::new();
	let entry = builder.add_block("entry").unwrap();
	let v = builder.add_variable("x").unwrap();
	let sum = builder.push(
		entry,
		InstrKind::Arith(ArithOp::Add, Operand::Int(2), Operand::Int(3)),
	);
	builder.push(entry, InstrKind::Store(Operand::Instr(sum), v));
	let x = builder.push(entry, InstrKind::Load(v));
	let twice = builder.push(
		entry,
		InstrKind::Arith(ArithOp::Mul, Operand::Instr(x), Operand::Int(2)),
	);
	builder.push(
		entry,
		InstrKind::Print(vec![Operand::Instr(x), Operand::Instr(twice)]),
	);
	builder.push(entry, InstrKind::Halt);
	let program = builder.finish().unwrap();

	let concrete = interpret(&program);
	assert_eq!(concrete, "5 10\n");

	let (executed, errors, symbolic) = execute_symbolically(&program);
	assert_eq!(executed, 1);
	assert_eq!(errors, 0);
	assert_eq!(symbolic, format!("{}Executed paths: 1\nError paths: 0\n", concrete));
}

#[test]
fn guarded_division_never_faults_symbolically() {
	// d = load d; if d != 0 { print 100 / d } else { print 0 }; halt
	let mut builder = ProgramBuilder::new();
	let entry = builder.add_block("entry").unwrap();
	let then = builder.add_block("then").unwrap();
	let els = builder.add_block("else").unwrap();
	let d = builder.add_variable("d").unwrap();

	let dv = builder.push(entry, InstrKind::Load(d));
	let nonzero = builder.push(
		entry,
		InstrKind::Cmp(Predicate::Ne, Operand::Instr(dv), Operand::Int(0)),
	);
	builder.push(entry, InstrKind::Jump(Operand::Instr(nonzero), then, els));

	let dv2 = builder.push(then, InstrKind::Load(d));
	let q = builder.push(
		then,
		InstrKind::Arith(ArithOp::Div, Operand::Int(100), Operand::Instr(dv2)),
	);
	builder.push(then, InstrKind::Print(vec![Operand::Instr(q)]));
	builder.push(then, InstrKind::Halt);

	builder.push(els, InstrKind::Print(vec![Operand::Int(0)]));
	builder.push(els, InstrKind::Halt);
	let program = builder.finish().unwrap();

	let (executed, errors, output) = execute_symbolically(&program);
	assert_eq!(executed, 2);
	assert_eq!(errors, 0);
	assert!(output.contains("(100 / d)"));
	assert!(output.contains("0\n"));
}

#[test]
fn assertion_in_one_branch_counts_once() {
	// branch on y > 10, assert y > 0 only in the then-branch
	let mut builder = ProgramBuilder::new();
	let entry = builder.add_block("entry").unwrap();
	let then = builder.add_block("then").unwrap();
	let els = builder.add_block("else").unwrap();
	let y = builder.add_variable("y").unwrap();

	let yv = builder.push(entry, InstrKind::Load(y));
	let big = builder.push(
		entry,
		InstrKind::Cmp(Predicate::Gt, Operand::Instr(yv), Operand::Int(10)),
	);
	builder.push(entry, InstrKind::Jump(Operand::Instr(big), then, els));

	let yv2 = builder.push(then, InstrKind::Load(y));
	let pos = builder.push(
		then,
		InstrKind::Cmp(Predicate::Gt, Operand::Instr(yv2), Operand::Int(0)),
	);
	builder.push(then, InstrKind::Assert(Operand::Instr(pos)));
	builder.push(then, InstrKind::Halt);
	builder.push(els, InstrKind::Halt);
	let program = builder.finish().unwrap();

	// y > 10 implies y > 0, so the then-branch assertion cannot fire
	let (executed, errors, _) = execute_symbolically(&program);
	assert_eq!(executed, 2);
	assert_eq!(errors, 0);
}
