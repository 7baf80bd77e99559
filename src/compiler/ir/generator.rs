//! Code generator - transforms the AST into quadruples
//!
//! One pass, one rule per AST node. Each rule may declare or resolve names in
//! the [`FuncDir`], consult the [`TypeOracle`], and append quadruples to a
//! single globally indexed list. Expression rules return the [`Var`] holding
//! their result (or `None` for void calls and `print`).
//!
//! ## Control flow layout
//!
//! ```text
//! if c1 {A} elseif c2 {B} else {C}     while c {A}          for (i; c; s) {A}
//!
//!     c1                               L: c                 i
//!     GOTOF c1 -> E1                      GOTOF c -> X      L: c
//!     A                                   A                    GOTOF c -> X
//!     GOTO -> END                         GOTO -> L            A
//! E1: c2                               X:                      s
//!     GOTOF c2 -> E2                                           GOTO -> L
//!     B                                                     X:
//!     GOTO -> END
//! E2: C
//! END:
//! ```
//!
//! ## Calling convention
//!
//! ```text
//! <arguments>
//! ERA    _      _  seg          reserve a dormant frame of the callee
//! PARAM  arg_i  _  param_i      one per argument, into the dormant frame
//! GOSUB  entry  _  seg          activate, run until RETURN/ENDFUNC, deactivate
//! ASSIGN ret    _  tmp          non-void callees only
//! ```
//!
//! A function body is preceded by a `GOTO` past its `ENDFUNC`, so it only runs
//! when called.

use super::instruction::{Address, Literal, OpCode, Operand, Quadruple};
use super::program::CompiledProgram;
use crate::ast::{Alternative, Builtin, Conditional, Expression, LValue, Param, Program, Statement};
use crate::compiler::func_dir::{FuncDir, Typed, Var};
use crate::error::{Error, Result};
use crate::types::{DataType, Operator, TypeOracle};

/// Code generation context for one compilation
pub struct CodeGenerator<'a> {
    /// Scoped symbol table
    func_dir: FuncDir,
    /// Generated instructions
    quads: Vec<Quadruple>,
    /// Type-compatibility rules
    oracle: &'a dyn TypeOracle,
}

impl<'a> CodeGenerator<'a> {
    /// Create a generator checking types against `oracle`
    pub fn new(oracle: &'a dyn TypeOracle) -> Self {
        CodeGenerator {
            func_dir: FuncDir::new(),
            quads: Vec::new(),
            oracle,
        }
    }

    /// Generate a whole program
    pub fn generate(mut self, program: &Program) -> Result<CompiledProgram> {
        self.generate_statements(&program.statements)?;
        tracing::debug!(
            quads = self.quads.len(),
            segments = self.func_dir.segment_sizes().len(),
            "generated program"
        );
        Ok(self.into_program())
    }

    /// Generate statements into the current scope
    pub fn generate_statements(&mut self, statements: &[Statement]) -> Result<()> {
        for stmt in statements {
            self.statement(stmt)?;
        }
        Ok(())
    }

    /// Symbol table as built so far
    pub fn func_dir(&self) -> &FuncDir {
        &self.func_dir
    }

    /// Quadruples emitted so far
    pub fn quads(&self) -> &[Quadruple] {
        &self.quads
    }

    /// Finish generation
    pub fn into_program(self) -> CompiledProgram {
        CompiledProgram::new(self.func_dir.segment_sizes(), self.quads)
    }

    // =========================================================================
    // EMISSION
    // =========================================================================

    fn next_index(&self) -> usize {
        self.quads.len()
    }

    fn emit(&mut self, quad: Quadruple) -> usize {
        let index = self.quads.len();
        tracing::trace!(index, %quad, "emit");
        self.quads.push(quad);
        index
    }

    fn emit_op(
        &mut self,
        op: OpCode,
        operand1: Option<Address>,
        operand2: Option<Address>,
        result: Address,
    ) -> usize {
        self.emit(Quadruple::new(
            op,
            operand1.map(Operand::Address),
            operand2.map(Operand::Address),
            Some(Operand::Address(result)),
        ))
    }

    /// Point the jump at `at` to `target`
    fn patch(&mut self, at: usize, target: usize) {
        self.quads[at].set_target(target);
    }

    fn check(&self, op: Operator, left: DataType, right: DataType) -> Result<DataType> {
        self.oracle.lookup(op, left, right)
    }

    // =========================================================================
    // STATEMENTS
    // =========================================================================

    fn statement(&mut self, stmt: &Statement) -> Result<()> {
        match stmt {
            Statement::VarDecl {
                name,
                ty,
                dims,
                init,
            } => self.var_decl(name, *ty, dims, init.as_ref()).map(|_| ()),

            Statement::Assign { target, value } => self.assignment(target, value),

            Statement::If(chain) => self.conditional(chain),

            Statement::While { condition, body } => self.while_loop(condition, body),

            Statement::For {
                init,
                condition,
                step,
                body,
            } => self.for_loop(init, condition, step, body),

            Statement::FuncDecl {
                name,
                return_type,
                params,
                body,
            } => self.function_decl(name, *return_type, params, body),

            Statement::Return { value } => self.return_stmt(value),

            Statement::Expression(expr) => self.expression(expr).map(|_| ()),
        }
    }

    fn scoped_body(&mut self, body: &[Statement]) -> Result<()> {
        self.func_dir.enter_block();
        self.generate_statements(body)?;
        self.func_dir.leave_block()
    }

    fn var_decl(
        &mut self,
        name: &str,
        ty: DataType,
        dims: &[usize],
        init: Option<&Expression>,
    ) -> Result<Var> {
        if !dims.is_empty() {
            if init.is_some() {
                return Err(Error::TensorShape {
                    name: name.to_string(),
                    expected: dims.len(),
                    got: 0,
                });
            }
            return self.func_dir.declare_tensor(name, ty, dims);
        }

        let source = init.map(|expr| self.value(expr)).transpose()?;
        let var = self.func_dir.declare_variable(name, ty)?;
        if let Some(source) = source {
            self.store(&var, source)?;
        }
        Ok(var)
    }

    fn assignment(&mut self, target: &LValue, value: &Expression) -> Result<()> {
        let source = self.value(value)?;
        let dest = self.variable(&target.name, &target.indices)?;
        self.store(&dest, source)
    }

    fn store(&mut self, dest: &Var, source: Var) -> Result<()> {
        let source = self.convert(dest.ty(), source)?;
        self.emit_op(OpCode::Assign, Some(source.address), None, dest.address);
        Ok(())
    }

    /// Check that `source` may be stored into a `target` slot
    ///
    /// An integer stored into a float slot is widened first, by adding a
    /// float zero, so the slot holds a float at run time.
    fn convert(&mut self, target: DataType, source: Var) -> Result<Var> {
        self.check(Operator::Assign, target, source.ty())?;
        if target.host() != DataType::Float || source.ty().host() != DataType::Int {
            return Ok(source);
        }
        let zero = self.literal(Literal::Float(0.0))?;
        let widened = self.func_dir.new_temporary(target, None)?;
        self.emit_op(
            OpCode::Plus,
            Some(source.address),
            Some(zero.address),
            widened.address,
        );
        Ok(widened)
    }

    fn condition(&mut self, expr: &Expression) -> Result<Address> {
        let var = self.value(expr)?;
        if !var.ty().is_boolean() {
            return Err(Error::NonBooleanCondition {
                found: var.ty().to_string(),
            });
        }
        Ok(var.address)
    }

    /// One link of an if/elseif/else chain
    ///
    /// The link's exit GOTO is patched only after every following link has
    /// been generated, so all exits land after the whole chain.
    fn conditional(&mut self, link: &Conditional) -> Result<()> {
        let cond = self.condition(&link.condition)?;
        let gotof = self.emit(Quadruple::jump(OpCode::Gotof, Some(cond)));
        self.scoped_body(&link.body)?;
        let exit = self.emit(Quadruple::jump(OpCode::Goto, None));
        self.patch(gotof, self.next_index());

        match link.alternative.as_deref() {
            Some(Alternative::ElseIf(next)) => self.conditional(next)?,
            Some(Alternative::Else(body)) => self.scoped_body(body)?,
            None => {}
        }

        self.patch(exit, self.next_index());
        Ok(())
    }

    fn while_loop(&mut self, condition: &Expression, body: &[Statement]) -> Result<()> {
        let start = self.next_index();
        let cond = self.condition(condition)?;
        let gotof = self.emit(Quadruple::jump(OpCode::Gotof, Some(cond)));
        self.scoped_body(body)?;
        let back = self.emit(Quadruple::jump(OpCode::Goto, None));
        self.patch(back, start);
        self.patch(gotof, self.next_index());
        Ok(())
    }

    fn for_loop(
        &mut self,
        init: &Statement,
        condition: &Expression,
        step: &Statement,
        body: &[Statement],
    ) -> Result<()> {
        // the induction variable is visible to condition, body and step
        self.func_dir.enter_block();
        self.statement(init)?;

        let start = self.next_index();
        let cond = self.condition(condition)?;
        let gotof = self.emit(Quadruple::jump(OpCode::Gotof, Some(cond)));
        self.scoped_body(body)?;
        self.statement(step)?;
        let back = self.emit(Quadruple::jump(OpCode::Goto, None));
        self.patch(back, start);
        self.patch(gotof, self.next_index());

        self.func_dir.leave_block()
    }

    fn function_decl(
        &mut self,
        name: &str,
        return_type: DataType,
        params: &[Param],
        body: &[Statement],
    ) -> Result<()> {
        let skip = self.emit(Quadruple::jump(OpCode::Goto, None));
        let entry = skip + 1;
        let id = self.func_dir.declare_function(name, return_type, entry)?;

        let params = params
            .iter()
            .map(|p| self.func_dir.declare_variable(&p.name, p.ty))
            .collect::<Result<Vec<_>>>()?;
        self.func_dir.set_params(params);

        self.generate_statements(body)?;

        let ends_in_return = matches!(self.quads.last(), Some(q) if q.op == OpCode::Return);
        if return_type != DataType::Void && !ends_in_return {
            return Err(Error::MissingReturn {
                function: name.to_string(),
            });
        }

        self.emit(Quadruple::new(
            OpCode::EndFunc,
            None,
            None,
            Some(Operand::index(id)),
        ));
        self.func_dir.leave_function()?;
        self.patch(skip, self.next_index());
        Ok(())
    }

    fn return_stmt(&mut self, value: &Expression) -> Result<()> {
        let func = self.func_dir.current_func();
        if self.func_dir.current_func_id() == 0 {
            return Err(Error::ReturnOutsideFunction);
        }
        let (name, ty, slot) = (func.name().to_string(), func.ty(), func.return_slot);
        let slot = match slot {
            Some(slot) if ty != DataType::Void => slot,
            _ => return Err(Error::VoidReturn { function: name }),
        };

        let result = self.value(value)?;
        let result = self.convert(ty, result)?;
        self.emit_op(OpCode::Return, Some(result.address), None, slot);
        Ok(())
    }

    // =========================================================================
    // EXPRESSIONS
    // =========================================================================

    fn expression(&mut self, expr: &Expression) -> Result<Option<Var>> {
        match expr {
            Expression::Literal(lit) => self.literal(lit.clone()).map(Some),

            Expression::Variable { name, indices } => self.variable(name, indices).map(Some),

            Expression::Binary { op, left, right } => {
                if *op == Operator::Assign {
                    return Err(Error::TypeMismatch {
                        op: op.to_string(),
                        left: "expression".to_string(),
                        right: "expression".to_string(),
                    });
                }
                let left = self.value(left)?;
                let right = self.value(right)?;
                let ty = self.check(*op, left.ty(), right.ty())?;
                let result = self.func_dir.new_temporary(ty, None)?;
                self.emit_op(
                    OpCode::from(*op),
                    Some(left.address),
                    Some(right.address),
                    result.address,
                );
                Ok(Some(result))
            }

            Expression::Unary { op, operand } => {
                let operand = self.value(operand)?;
                let ty = self.check(*op, operand.ty(), DataType::Void)?;
                let result = self.func_dir.new_temporary(ty, None)?;
                self.emit_op(OpCode::from(*op), Some(operand.address), None, result.address);
                Ok(Some(result))
            }

            Expression::Call { name, args } => self.call(name, args),

            Expression::Builtin { func, args } => self.builtin(*func, args),
        }
    }

    /// Expression that must produce a value
    fn value(&mut self, expr: &Expression) -> Result<Var> {
        let name = match expr {
            Expression::Call { name, .. } => name.clone(),
            Expression::Builtin { func, .. } => func.name().to_string(),
            _ => String::new(),
        };
        self.expression(expr)?
            .ok_or(Error::VoidValue { function: name })
    }

    fn literal(&mut self, lit: Literal) -> Result<Var> {
        let temp = self.func_dir.new_temporary(lit.data_type(), Some(lit.clone()))?;
        self.emit(Quadruple::new(
            OpCode::Const,
            Some(Operand::Literal(lit)),
            None,
            Some(Operand::Address(temp.address)),
        ));
        Ok(temp)
    }

    /// Scalar variable or tensor element
    fn variable(&mut self, name: &str, indices: &[Expression]) -> Result<Var> {
        let var = self.func_dir.resolve_variable(name)?.clone();
        if indices.is_empty() && !var.is_tensor() {
            return Ok(var);
        }
        if indices.len() != var.dims.len() {
            return Err(Error::TensorShape {
                name: name.to_string(),
                expected: var.dims.len(),
                got: indices.len(),
            });
        }
        self.element(&var, indices)
    }

    /// Row-major element access
    ///
    /// Every index is VERIFY-checked against its dimension before it is
    /// folded into the offset; ADDR then stores a pointer to the element in a
    /// temporary, and the element is addressed indirectly through it.
    fn element(&mut self, tensor: &Var, indices: &[Expression]) -> Result<Var> {
        let mut offset: Option<Var> = None;

        for (index, &dim) in indices.iter().zip(&tensor.dims) {
            let index = self.value(index)?;
            if !index.ty().is_integer() {
                return Err(Error::NonIntegerIndex {
                    found: index.ty().to_string(),
                });
            }
            let dim = i64::try_from(dim).map_err(|_| Error::StorageOverflow {
                name: tensor.name().to_string(),
            })?;
            let bound = self.literal(Literal::Int(dim))?;
            self.emit_op(OpCode::Verify, Some(bound.address), None, index.address);

            offset = Some(match offset {
                None => index,
                Some(acc) => {
                    let scaled = self.func_dir.new_temporary(DataType::Int, None)?;
                    self.emit_op(OpCode::Mult, Some(acc.address), Some(bound.address), scaled.address);
                    let sum = self.func_dir.new_temporary(DataType::Int, None)?;
                    self.emit_op(OpCode::Plus, Some(scaled.address), Some(index.address), sum.address);
                    sum
                }
            });
        }

        let offset = offset.ok_or_else(|| Error::TensorShape {
            name: tensor.name().to_string(),
            expected: tensor.dims.len(),
            got: 0,
        })?;
        let pointer = self.func_dir.new_temporary(tensor.ty(), None)?;
        self.emit_op(
            OpCode::Addr,
            Some(tensor.address),
            Some(offset.address),
            pointer.address,
        );

        Ok(Var {
            typed: Typed {
                name: format!("{}[]", tensor.name()),
                ty: tensor.ty(),
            },
            address: Address::indirect(pointer.address.segment, pointer.address.offset),
            dims: Vec::new(),
            value: None,
        })
    }

    fn call(&mut self, name: &str, args: &[Expression]) -> Result<Option<Var>> {
        let id = self.func_dir.resolve_function_id(name)?;
        let func = self.func_dir.func(id).clone();

        if args.len() != func.params.len() {
            return Err(Error::ArityMismatch {
                function: name.to_string(),
                expected: func.params.len(),
                got: args.len(),
            });
        }

        let mut values = Vec::with_capacity(args.len());
        for (arg, param) in args.iter().zip(&func.params) {
            let value = self.value(arg)?;
            values.push(self.convert(param.ty(), value)?);
        }

        self.emit(Quadruple::new(OpCode::Era, None, None, Some(Operand::index(id))));
        for (value, param) in values.iter().zip(&func.params) {
            self.emit_op(OpCode::Param, Some(value.address), None, param.address);
        }
        self.emit(Quadruple::new(
            OpCode::Gosub,
            Some(Operand::index(func.entry)),
            None,
            Some(Operand::index(id)),
        ));

        match func.return_slot {
            Some(slot) => {
                let result = self.func_dir.new_temporary(func.ty(), None)?;
                self.emit_op(OpCode::Assign, Some(slot), None, result.address);
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    fn builtin(&mut self, func: Builtin, args: &[Expression]) -> Result<Option<Var>> {
        match func {
            Builtin::Print => {
                let values = args
                    .iter()
                    .map(|arg| self.value(arg))
                    .collect::<Result<Vec<_>>>()?;
                for value in values {
                    self.emit(Quadruple::new(
                        OpCode::Print,
                        None,
                        None,
                        Some(Operand::Address(value.address)),
                    ));
                }
                Ok(None)
            }

            Builtin::ReadLine => {
                if !args.is_empty() {
                    return Err(Error::ArityMismatch {
                        function: func.name().to_string(),
                        expected: 0,
                        got: args.len(),
                    });
                }
                let line = self.func_dir.new_temporary(DataType::String, None)?;
                self.emit(Quadruple::new(
                    OpCode::ReadLine,
                    None,
                    None,
                    Some(Operand::Address(line.address)),
                ));
                Ok(Some(line))
            }

            Builtin::ReadFile => {
                if args.len() != 1 {
                    return Err(Error::ArityMismatch {
                        function: func.name().to_string(),
                        expected: 1,
                        got: args.len(),
                    });
                }
                let path = self.value(&args[0])?;
                self.check(Operator::Assign, DataType::String, path.ty())?;
                let contents = self.func_dir.new_temporary(DataType::String, None)?;
                self.emit_op(OpCode::ReadFile, Some(path.address), None, contents.address);
                Ok(Some(contents))
            }
        }
    }
}
