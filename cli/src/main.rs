use clap::{crate_description, crate_version, App, Arg, ArgMatches};
use std::{
	fs,
	io::{stdin, Read},
	process::exit,
};
use symvm::{Interpreter, SymbolicExecutor, Z3Solver};

mod parser;

fn main() {
	env_logger::init();

	let args = App::new("symvm")
		.version(crate_version!())
		.about(crate_description!())
		.arg(
			Arg::with_name("STDIN")
				.long("--stdin")
				.help("Read the program from stdin"),
		)
		.arg(
			Arg::with_name("INPUT")
				.help("Program file to execute")
				.required_unless("STDIN")
				.index(1),
		)
		.arg(
			Arg::with_name("SYMBOLIC")
				.short("s")
				.long("symbolic")
				.help("Explore all feasible paths symbolically instead of running concretely"),
		)
		.get_matches();

	exit(match rmain(args) {
		Ok(()) => 0,
		Err(e) => {
			eprintln!("{}", e);
			1
		}
	})
}

fn rmain(args: ArgMatches) -> Result<(), String> {
	let source = if let Some(path) = args.value_of("INPUT") {
		fs::read_to_string(path)
			.map_err(|e| format!("Could not read input file: {}", e.to_string()))?
	} else {
		let mut buffer = String::new();
		stdin()
			.read_to_string(&mut buffer)
			.map_err(|e| format!("Could not read stdin: {}", e.to_string()))?;
		buffer
	};

	let program = parser::parse_program(&source)
		.map_err(|e| format!("Program parsing failed!\n{}", e.to_string()))?;

	if args.is_present("SYMBOLIC") {
		SymbolicExecutor::new(&program, Z3Solver::new()).run();
		Ok(())
	} else {
		Interpreter::new(&program).run().map_err(|e| e.to_string())
	}
}
