//! Property-based tests for code generation and execution
//!
//! These tests use proptest to generate random programs and verify that:
//! 1. Straight-line programs emit exactly the per-statement quadruple counts
//! 2. Every jump emitted by a control-flow construct is patched
//! 3. Integer arithmetic in the VM agrees with host arithmetic

use parhl::ast::{Conditional, Expression, Program, Statement};
use parhl::runtime::{BufferedConsole, VirtualMachine};
use parhl::types::{DataType, Operator};
use parhl::{CompileOptions, CompiledProgram, Compiler};
use proptest::prelude::*;

fn compile(statements: Vec<Statement>) -> CompiledProgram {
    Compiler::new(CompileOptions::default())
        .compile(&Program::new(statements))
        .expect("generated program should compile")
}

fn run(statements: Vec<Statement>) -> Vec<String> {
    let program = compile(statements);
    let mut vm = VirtualMachine::new(&program, BufferedConsole::new());
    vm.run().expect("generated program should run");
    vm.into_console().output().to_vec()
}

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

/// One straight-line statement over the variable `v`, paired with the number
/// of quadruples it must emit
fn straight_line_statement() -> impl Strategy<Value = (Statement, usize)> {
    prop_oneof![
        // CONST ASSIGN
        any::<i32>().prop_map(|n| (
            Statement::assign("v", Expression::int(n as i64)),
            2
        )),
        // CONST PLUS ASSIGN
        any::<i32>().prop_map(|n| (
            Statement::assign(
                "v",
                Expression::binary(Operator::Plus, Expression::var("v"), Expression::int(n as i64))
            ),
            3
        )),
        // PRINT
        Just((Statement::print(vec![Expression::var("v")]), 1)),
        // CONST CONST MULT PRINT
        (any::<i16>(), any::<i16>()).prop_map(|(a, b)| (
            Statement::print(vec![Expression::binary(
                Operator::Mult,
                Expression::int(a as i64),
                Expression::int(b as i64)
            )]),
            4
        )),
    ]
}

/// Control-flow statement that prints `tag` somewhere inside
fn control_statement(tag: i64) -> impl Strategy<Value = Statement> {
    let body = move || vec![Statement::print(vec![Expression::int(tag)])];
    prop_oneof![
        any::<bool>().prop_map(move |b| Statement::If(Conditional::new(
            Expression::boolean(b),
            body()
        ))),
        (any::<bool>(), any::<bool>()).prop_map(move |(a, b)| Statement::If(
            Conditional::new(Expression::boolean(a), body())
                .else_if(Expression::boolean(b), body())
                .otherwise(body())
        )),
        Just(Statement::while_loop(Expression::boolean(false), body())),
        (0i64..4).prop_map(move |n| Statement::for_loop(
            Statement::declare("i", DataType::Int, Some(Expression::int(0))),
            Expression::binary(Operator::Lt, Expression::var("i"), Expression::int(n)),
            Statement::assign(
                "i",
                Expression::binary(Operator::Plus, Expression::var("i"), Expression::int(1))
            ),
            body()
        )),
    ]
}

fn arith_operator() -> impl Strategy<Value = (Operator, fn(i64, i64) -> Option<i64>)> {
    prop_oneof![
        Just((Operator::Plus, (|a, b| Some(a + b)) as fn(i64, i64) -> Option<i64>)),
        Just((Operator::Minus, (|a, b| Some(a - b)) as fn(i64, i64) -> Option<i64>)),
        Just((Operator::Mult, (|a, b| Some(a * b)) as fn(i64, i64) -> Option<i64>)),
        Just((Operator::Div, (|a, b| a.checked_div(b)) as fn(i64, i64) -> Option<i64>)),
        Just((Operator::Mod, (|a, b| a.checked_rem(b)) as fn(i64, i64) -> Option<i64>)),
    ]
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #[test]
    fn straight_line_quad_count(statements in prop::collection::vec(straight_line_statement(), 0..20)) {
        let expected: usize = statements.iter().map(|(_, n)| n).sum();
        let mut program = vec![Statement::declare("v", DataType::Int, None)];
        program.extend(statements.into_iter().map(|(s, _)| s));

        let compiled = compile(program);
        prop_assert_eq!(compiled.quads.len(), expected);
        prop_assert!(compiled.quads.iter().all(|q| !q.op.is_jump()));
    }

    #[test]
    fn all_jumps_patched(statements in prop::collection::vec(control_statement(1), 1..8)) {
        // each construct gets its own scope for `i`
        let wrapped = statements
            .into_iter()
            .map(|s| Statement::If(Conditional::new(Expression::boolean(true), vec![s])))
            .collect();
        let compiled = compile(wrapped);

        for quad in compiled.quads.iter().filter(|q| q.op.is_jump()) {
            let target = quad.result_index();
            prop_assert!(target.is_ok());
            prop_assert!(target.unwrap() <= compiled.quads.len());
        }
    }

    #[test]
    fn vm_arithmetic_matches_host(a in -10_000i64..10_000, b in -10_000i64..10_000, (op, host) in arith_operator()) {
        prop_assume!(host(a, b).is_some());
        let output = run(vec![
            Statement::declare("a", DataType::Int, Some(Expression::int(a))),
            Statement::declare("b", DataType::Int, Some(Expression::int(b))),
            Statement::print(vec![Expression::binary(op, Expression::var("a"), Expression::var("b"))]),
        ]);
        prop_assert_eq!(output, vec![host(a, b).unwrap().to_string()]);
    }

    #[test]
    fn countdown_prints_every_value(n in 0i64..30) {
        let output = run(vec![
            Statement::declare("i", DataType::Int, Some(Expression::int(n))),
            Statement::while_loop(
                Expression::binary(Operator::Gt, Expression::var("i"), Expression::int(0)),
                vec![
                    Statement::print(vec![Expression::var("i")]),
                    Statement::assign("i", Expression::binary(Operator::Minus, Expression::var("i"), Expression::int(1))),
                ],
            ),
        ]);
        let expected: Vec<String> = (1..=n).rev().map(|i| i.to_string()).collect();
        prop_assert_eq!(output, expected);
    }

    #[test]
    fn tensor_bounds_are_enforced(size in 1usize..6, index in -3i64..9) {
        let program = compile(vec![
            Statement::declare_tensor("t", DataType::Int, vec![size]),
            Statement::assign_index("t", vec![Expression::int(index)], Expression::int(42)),
            Statement::print(vec![Expression::index("t", vec![Expression::int(index)])]),
        ]);
        let mut vm = VirtualMachine::new(&program, BufferedConsole::new());
        let result = vm.run();

        if index >= 0 && (index as usize) < size {
            prop_assert!(result.is_ok());
            prop_assert_eq!(vm.console().output(), ["42"]);
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(
                err.root_cause(),
                &parhl::Error::IndexOutOfBounds { index, bound: size as i64 }
            );
            prop_assert!(vm.console().output().is_empty());
        }
    }
}
