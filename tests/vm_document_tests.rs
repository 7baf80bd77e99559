//! Virtual machine tests driven by hand-written program documents
use parhl::compiler::Address;
use parhl::runtime::{BufferedConsole, ExecState, VirtualMachine};
use parhl::{CompileOptions, CompiledProgram, Compiler, Error};

fn run_document(json: &str) -> (parhl::Result<()>, Vec<String>) {
    let program = CompiledProgram::from_json(json).expect("document should parse");
    let mut vm = VirtualMachine::new(&program, BufferedConsole::new());
    let result = vm.run();
    (result, vm.into_console().output().to_vec())
}

#[test]
fn test_block_with_its_own_segment() {
    // segment 1 is a block: reserved and activated on entry, dropped on exit
    let (result, output) = run_document(
        r#"{"func_dir": [1, 1], "quads": [
            ["CONST", 1, null, [0, 0, false]],
            ["STRTBLK", null, null, 1],
            ["CONST", 2, null, [1, 0, false]],
            ["PLUS", [0, 0, false], [1, 0, false], [1, 0, false]],
            ["PRINT", null, null, [1, 0, false]],
            ["ENDBLK", null, null, 1],
            ["PRINT", null, null, [0, 0, false]]
        ]}"#,
    );
    result.unwrap();
    assert_eq!(output, ["3", "1"]);
}

#[test]
fn test_block_storage_is_gone_after_endblk() {
    let (result, _) = run_document(
        r#"{"func_dir": [0, 1], "quads": [
            ["STRTBLK", null, null, 1],
            ["CONST", 2, null, [1, 0, false]],
            ["ENDBLK", null, null, 1],
            ["PRINT", null, null, [1, 0, false]]
        ]}"#,
    );
    let err = result.unwrap_err();
    assert!(matches!(err, Error::Execution { index: 3, .. }));
    assert_eq!(err.root_cause(), &Error::NoActiveFrame { segment: 1 });
}

#[test]
fn test_indirect_reads_follow_addr_pointers() {
    // a 3-slot tensor at (0,0); ADDR points (0,4) at element 1
    let (result, output) = run_document(
        r#"{"func_dir": [5], "quads": [
            ["CONST", 7, null, [0, 1, false]],
            ["CONST", 1, null, [0, 3, false]],
            ["ADDR", [0, 0, false], [0, 3, false], [0, 4, false]],
            ["PRINT", null, null, [0, 4, true]],
            ["CONST", 8, null, [0, 4, true]],
            ["PRINT", null, null, [0, 1, false]]
        ]}"#,
    );
    result.unwrap();
    assert_eq!(output, ["7", "8"]);
}

#[test]
fn test_indirect_through_unset_or_plain_slots() {
    let (result, _) = run_document(
        r#"{"func_dir": [1], "quads": [
            ["PRINT", null, null, [0, 0, true]]
        ]}"#,
    );
    assert_eq!(
        result.unwrap_err().root_cause(),
        &Error::UninitializedMemory {
            address: Address::new(0, 0)
        }
    );

    let (result, _) = run_document(
        r#"{"func_dir": [1], "quads": [
            ["CONST", 3, null, [0, 0, false]],
            ["PRINT", null, null, [0, 0, true]]
        ]}"#,
    );
    assert_eq!(
        result.unwrap_err().root_cause(),
        &Error::InvalidIndirection {
            address: Address::indirect(0, 0)
        }
    );
}

#[test]
fn test_running_off_the_end_inside_a_callee_halts() {
    // the callee has no ENDFUNC; the caller's PRINT after GOSUB must not run
    let program = CompiledProgram::from_json(
        r#"{"func_dir": [1, 1], "quads": [
            ["ERA", null, null, 1],
            ["GOSUB", 3, null, 1],
            ["PRINT", null, null, [0, 0, false]],
            ["CONST", "callee", null, [1, 0, false]],
            ["PRINT", null, null, [1, 0, false]]
        ]}"#,
    )
    .unwrap();
    let mut vm = VirtualMachine::new(&program, BufferedConsole::new());
    vm.run().unwrap();
    assert_eq!(vm.state(), ExecState::Halted);
    assert_eq!(vm.instructions_executed(), 4);
    assert_eq!(vm.console().output(), ["callee"]);
}

#[test]
fn test_param_without_era_has_no_dormant_frame() {
    let (result, _) = run_document(
        r#"{"func_dir": [1, 1], "quads": [
            ["CONST", 5, null, [0, 0, false]],
            ["PARAM", [0, 0, false], null, [1, 0, false]]
        ]}"#,
    );
    assert_eq!(
        result.unwrap_err().root_cause(),
        &Error::NoDormantFrame { segment: 1 }
    );
}

#[test]
fn test_legacy_assign_name_and_gotof() {
    let (result, output) = run_document(
        r#"{"func_dir": [3], "quads": [
            ["CONST", false, null, [0, 0, false]],
            ["CONST", "skipped", null, [0, 1, false]],
            ["CONST", "kept", null, [0, 2, false]],
            ["GOTOF", [0, 0, false], null, 5],
            ["PRINT", null, null, [0, 1, false]],
            ["ASSIG", [0, 2, false], null, [0, 1, false]],
            ["PRINT", null, null, [0, 1, false]]
        ]}"#,
    );
    result.unwrap();
    assert_eq!(output, ["kept"]);
}

#[test]
fn test_malformed_quadruple_names_the_opcode() {
    let (result, _) = run_document(
        r#"{"func_dir": [1], "quads": [
            ["GOTO", null, null, [0, 0, false]]
        ]}"#,
    );
    let err = result.unwrap_err();
    assert!(matches!(err.root_cause(), Error::MalformedQuadruple { opcode, .. } if opcode == "GOTO"));
}

#[test]
fn test_compiled_document_survives_persistence() {
    let program = Compiler::new(CompileOptions::default())
        .compile_json(
            r#"{"statements": [
                {"FuncDecl": {"name": "sq", "return_type": "INT",
                    "params": [{"name": "v", "ty": "INT"}],
                    "body": [{"Return": {"value": {"Binary": {"op": "MULT",
                        "left": {"Variable": {"name": "v"}},
                        "right": {"Variable": {"name": "v"}}}}}}]}},
                {"Expression": {"Builtin": {"func": "print", "args": [
                    {"Call": {"name": "sq", "args": [{"Literal": 7}]}}]}}}
            ]}"#,
        )
        .unwrap();

    let dir = std::env::temp_dir().join(format!("parhl-doc-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("sq.json");
    program.save(&path).unwrap();
    let loaded = CompiledProgram::load(&path).unwrap();
    std::fs::remove_dir_all(&dir).unwrap();
    assert_eq!(loaded, program);

    let mut vm = VirtualMachine::new(&loaded, BufferedConsole::new());
    vm.run().unwrap();
    assert_eq!(vm.state(), ExecState::Halted);
    // the function body is jumped over once and entered once
    assert_eq!(vm.instructions_executed(), 9);
    assert_eq!(vm.console().output(), ["49"]);
}
