#[cfg(test)]
mod integration {
	const STRAIGHT_LINE: &str = "
variables: x

block entry:
  sum = add 2 3
  store sum to x
  v = load x
  print v
  halt
";

	const FREE_BRANCH: &str = "
variables: x

block entry:
  v = load x
  c = cmp gt v 0
  jump c then else

block then:
  halt

block else:
  halt
";

	#[test]
	fn concrete_run_prints_result() {
		assert_cli::Assert::main_binary()
			.succeeds()
			.with_args(&["--stdin"])
			.stdin(STRAIGHT_LINE)
			.stdout()
			.is("5")
			.unwrap();
	}

	#[test]
	fn symbolic_run_reports_counters() {
		assert_cli::Assert::main_binary()
			.succeeds()
			.with_args(&["--stdin", "--symbolic"])
			.stdin(FREE_BRANCH)
			.stdout()
			.is("Executed paths: 2\nError paths: 0")
			.unwrap();
	}

	#[test]
	fn division_by_zero_fails_the_run() {
		assert_cli::Assert::main_binary()
			.fails_with(1)
			.with_args(&["--stdin"])
			.stdin("block entry:\n  q = div 1 0\n  halt")
			.stderr()
			.contains("division by zero")
			.unwrap();
	}

	#[test]
	fn parse_failure_exits_nonzero() {
		assert_cli::Assert::main_binary()
			.fails_with(1)
			.with_args(&["--stdin"])
			.stdin("block entry:\n  bogus 1 2\n  halt")
			.stderr()
			.contains("Program parsing failed!")
			.unwrap();
	}

	#[test]
	fn missing_input_is_a_usage_error() {
		assert_cli::Assert::main_binary().fails_with(1).unwrap();
	}
}
