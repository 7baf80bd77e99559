//! Function directory: the scoped symbol table used during code generation
//!
//! Scopes form a tree (global -> functions -> nested blocks) stored in an
//! arena; the active chain being generated against is a stack of block ids.
//! Only the innermost scope is ever written to, and lookups walk the stack
//! from innermost to outermost.
//!
//! Every function owns one memory segment whose id is its [`FuncId`]; the
//! implicit global function `glob` is segment 0. Variables of nested blocks
//! are laid out in their function's segment, so slot offsets are unique
//! within a frame while names stay lexically isolated.

use std::collections::HashMap;

use crate::compiler::ir::{Address, Literal};
use crate::error::{Error, Result};
use crate::types::DataType;

/// Index of a function, doubling as its memory segment id
pub type FuncId = usize;

/// Index of a block in the arena
pub type BlockId = usize;

/// Name of the implicit global function
pub const GLOBAL_NAME: &str = "glob";

/// Named, typed entity
#[derive(Debug, Clone, PartialEq)]
pub struct Typed {
    /// Identifier
    pub name: String,
    /// Declared type
    pub ty: DataType,
}

/// Variable, parameter or temporary with its storage location
#[derive(Debug, Clone, PartialEq)]
pub struct Var {
    /// Name and type
    pub typed: Typed,
    /// Slot (first slot for tensors)
    pub address: Address,
    /// Tensor dimensions, empty for scalars
    pub dims: Vec<usize>,
    /// Known constant value, for literal temporaries
    pub value: Option<Literal>,
}

impl Var {
    /// Identifier
    pub fn name(&self) -> &str {
        &self.typed.name
    }

    /// Declared type
    pub fn ty(&self) -> DataType {
        self.typed.ty
    }

    /// True if declared with dimensions
    pub fn is_tensor(&self) -> bool {
        !self.dims.is_empty()
    }

    /// Number of slots the variable occupies
    pub fn slots(&self) -> usize {
        self.dims.iter().product()
    }
}

/// One lexical scope
#[derive(Debug, Clone)]
pub struct Block {
    /// Declared variables
    pub vars: HashMap<String, Var>,
    /// Functions declared directly in this scope
    pub funcs: HashMap<String, FuncId>,
    /// Compiler-generated temporaries
    pub temps: HashMap<String, Var>,
    /// Next temporary index per type
    pub temp_counters: HashMap<DataType, usize>,
    /// Nested blocks in creation order
    pub children: Vec<BlockId>,
    /// Enclosing scope
    pub parent: Option<BlockId>,
    /// Function whose segment holds this scope's storage
    pub func: FuncId,
}

impl Block {
    fn new(parent: Option<BlockId>, func: FuncId) -> Self {
        Block {
            vars: HashMap::new(),
            funcs: HashMap::new(),
            temps: HashMap::new(),
            temp_counters: HashMap::new(),
            children: Vec::new(),
            parent,
            func,
        }
    }

    fn declares(&self, name: &str) -> bool {
        self.vars.contains_key(name) || self.funcs.contains_key(name)
    }
}

/// Function: signature, top-level scope and entry point
#[derive(Debug, Clone)]
pub struct Func {
    /// Name and return type
    pub typed: Typed,
    /// Top-level scope of the body
    pub block: BlockId,
    /// Index of the first quadruple of the body
    pub entry: usize,
    /// Parameters in call order
    pub params: Vec<Var>,
    /// Slot in the enclosing function's segment receiving the return value
    pub return_slot: Option<Address>,
    /// Slots a frame of this function's segment needs
    pub slots: usize,
}

impl Func {
    /// Identifier
    pub fn name(&self) -> &str {
        &self.typed.name
    }

    /// Declared return type
    pub fn ty(&self) -> DataType {
        self.typed.ty
    }
}

/// Scoped symbol table for one compilation
#[derive(Debug, Clone)]
pub struct FuncDir {
    funcs: Vec<Func>,
    blocks: Vec<Block>,
    stack: Vec<BlockId>,
}

impl FuncDir {
    /// Directory holding only the global scope
    pub fn new() -> Self {
        FuncDir {
            funcs: vec![Func {
                typed: Typed {
                    name: GLOBAL_NAME.to_string(),
                    ty: DataType::Void,
                },
                block: 0,
                entry: 0,
                params: Vec::new(),
                return_slot: None,
                slots: 0,
            }],
            blocks: vec![Block::new(None, 0)],
            stack: vec![0],
        }
    }

    /// Function by id
    pub fn func(&self, id: FuncId) -> &Func {
        &self.funcs[id]
    }

    /// Block by id
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id]
    }

    /// Innermost active scope
    pub fn current_block(&self) -> &Block {
        &self.blocks[self.current_block_id()]
    }

    fn current_block_id(&self) -> BlockId {
        *self.stack.last().unwrap_or(&0)
    }

    /// Id of the function being generated
    pub fn current_func_id(&self) -> FuncId {
        self.current_block().func
    }

    /// Function being generated
    pub fn current_func(&self) -> &Func {
        &self.funcs[self.current_func_id()]
    }

    /// Frame size of every segment, indexed by segment id
    pub fn segment_sizes(&self) -> Vec<usize> {
        self.funcs.iter().map(|f| f.slots).collect()
    }

    fn ensure_undeclared(&self, name: &str) -> Result<()> {
        if self.current_block().declares(name) {
            return Err(Error::Redeclaration {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn allocate(&mut self, name: &str, slots: usize) -> Result<Address> {
        let func_id = self.current_func_id();
        let func = &mut self.funcs[func_id];
        let offset = func.slots;
        func.slots = offset
            .checked_add(slots)
            .ok_or_else(|| Error::StorageOverflow {
                name: name.to_string(),
            })?;
        Ok(Address::new(func_id, offset))
    }

    /// Declare a scalar in the innermost scope
    pub fn declare_variable(&mut self, name: &str, ty: DataType) -> Result<Var> {
        self.declare_tensor(name, ty, &[])
    }

    /// Declare a variable with the given dimensions in the innermost scope
    pub fn declare_tensor(&mut self, name: &str, ty: DataType, dims: &[usize]) -> Result<Var> {
        self.ensure_undeclared(name)?;

        // element offsets are computed with Int arithmetic at run time
        let slots = dims
            .iter()
            .try_fold(1usize, |acc, &dim| acc.checked_mul(dim))
            .filter(|&slots| {
                i64::try_from(slots).is_ok() && dims.iter().all(|&d| i64::try_from(d).is_ok())
            })
            .ok_or_else(|| Error::StorageOverflow {
                name: name.to_string(),
            })?;
        let var = Var {
            typed: Typed {
                name: name.to_string(),
                ty,
            },
            address: self.allocate(name, slots)?,
            dims: dims.to_vec(),
            value: None,
        };

        let block = self.current_block_id();
        self.blocks[block].vars.insert(name.to_string(), var.clone());
        Ok(var)
    }

    /// Register a function in the innermost scope and enter its body
    ///
    /// Non-void functions get a return slot in the enclosing segment, which
    /// stays active while the callee runs.
    pub fn declare_function(&mut self, name: &str, ty: DataType, entry: usize) -> Result<FuncId> {
        self.ensure_undeclared(name)?;

        let return_slot = if ty == DataType::Void {
            None
        } else {
            Some(self.allocate(name, 1)?)
        };

        let id = self.funcs.len();
        let parent = self.current_block_id();
        let block = self.blocks.len();
        self.blocks.push(Block::new(Some(parent), id));
        self.funcs.push(Func {
            typed: Typed {
                name: name.to_string(),
                ty,
            },
            block,
            entry,
            params: Vec::new(),
            return_slot,
            slots: 0,
        });
        self.blocks[parent].funcs.insert(name.to_string(), id);
        self.stack.push(block);

        tracing::debug!(function = name, segment = id, entry, "declared function");
        Ok(id)
    }

    /// Record the parameter list of the function being generated
    pub fn set_params(&mut self, params: Vec<Var>) {
        let id = self.current_func_id();
        self.funcs[id].params = params;
    }

    /// Leave the body of the function being generated
    pub fn leave_function(&mut self) -> Result<FuncId> {
        let id = self.current_func_id();
        if id == 0 || self.funcs[id].block != self.current_block_id() {
            return Err(Error::ScopeUnderflow);
        }
        self.stack.pop();
        Ok(id)
    }

    /// Open a nested block inside the current scope
    pub fn enter_block(&mut self) {
        let parent = self.current_block_id();
        let func = self.current_func_id();
        let id = self.blocks.len();
        self.blocks.push(Block::new(Some(parent), func));
        self.blocks[parent].children.push(id);
        self.stack.push(id);
    }

    /// Close the innermost nested block
    pub fn leave_block(&mut self) -> Result<()> {
        let id = self.current_block_id();
        if self.stack.len() <= 1 || self.funcs[self.blocks[id].func].block == id {
            return Err(Error::ScopeUnderflow);
        }
        self.stack.pop();
        Ok(())
    }

    /// Find a variable, innermost scope first
    pub fn resolve_variable(&self, name: &str) -> Result<&Var> {
        self.stack
            .iter()
            .rev()
            .find_map(|&b| self.blocks[b].vars.get(name))
            .ok_or_else(|| Error::UnresolvedIdentifier {
                name: name.to_string(),
            })
    }

    /// Find a function, innermost scope first
    pub fn resolve_function(&self, name: &str) -> Result<&Func> {
        self.stack
            .iter()
            .rev()
            .find_map(|&b| self.blocks[b].funcs.get(name))
            .map(|&id| &self.funcs[id])
            .ok_or_else(|| Error::UnresolvedFunction {
                name: name.to_string(),
            })
    }

    /// Find a function id, innermost scope first
    pub fn resolve_function_id(&self, name: &str) -> Result<FuncId> {
        self.stack
            .iter()
            .rev()
            .find_map(|&b| self.blocks[b].funcs.get(name).copied())
            .ok_or_else(|| Error::UnresolvedFunction {
                name: name.to_string(),
            })
    }

    /// Fresh temporary in the innermost scope, named `<TYPE>_<n>`
    pub fn new_temporary(&mut self, ty: DataType, value: Option<Literal>) -> Result<Var> {
        let block = self.current_block_id();
        let counter = self.blocks[block].temp_counters.entry(ty).or_insert(0);
        let name = format!("{}_{}", ty, counter);
        *counter += 1;

        let var = Var {
            address: self.allocate(&name, 1)?,
            typed: Typed { name: name.clone(), ty },
            dims: Vec::new(),
            value,
        };
        self.blocks[block].temps.insert(name, var.clone());
        Ok(var)
    }

    /// Temporary of the innermost scope by name
    pub fn temporary(&self, name: &str) -> Option<&Var> {
        self.current_block().temps.get(name)
    }
}

impl Default for FuncDir {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redeclaration_in_same_scope_fails() {
        let mut dir = FuncDir::new();
        dir.declare_variable("x", DataType::Int).unwrap();
        let err = dir.declare_variable("x", DataType::Float).unwrap_err();
        assert_eq!(err, Error::Redeclaration { name: "x".into() });
    }

    #[test]
    fn test_shadowing_in_nested_block() {
        let mut dir = FuncDir::new();
        let outer = dir.declare_variable("x", DataType::Int).unwrap();
        dir.enter_block();
        let inner = dir.declare_variable("x", DataType::Float).unwrap();
        assert_ne!(outer.address, inner.address);
        assert_eq!(dir.resolve_variable("x").unwrap().ty(), DataType::Float);
        dir.leave_block().unwrap();
        assert_eq!(dir.resolve_variable("x").unwrap().ty(), DataType::Int);
    }

    #[test]
    fn test_variable_and_function_share_namespace() {
        let mut dir = FuncDir::new();
        dir.declare_variable("f", DataType::Int).unwrap();
        let err = dir.declare_function("f", DataType::Void, 1).unwrap_err();
        assert!(matches!(err, Error::Redeclaration { .. }));
    }

    #[test]
    fn test_function_scope_and_segments() {
        let mut dir = FuncDir::new();
        dir.declare_variable("g", DataType::Int).unwrap();
        let id = dir.declare_function("f", DataType::Int, 3).unwrap();
        assert_eq!(id, 1);
        assert_eq!(dir.current_func_id(), 1);

        let a = dir.declare_variable("a", DataType::Int).unwrap();
        assert_eq!(a.address, Address::new(1, 0));
        dir.set_params(vec![a]);

        // globals are visible from inside the function
        assert_eq!(dir.resolve_variable("g").unwrap().address.segment, 0);
        // and the function can see itself for recursion
        assert_eq!(dir.resolve_function("f").unwrap().entry, 3);

        assert_eq!(dir.leave_function().unwrap(), 1);
        assert!(dir.resolve_variable("a").is_err());

        let f = dir.resolve_function("f").unwrap();
        assert_eq!(f.params.len(), 1);
        assert_eq!(f.return_slot, Some(Address::new(0, 1)));
        assert_eq!(dir.segment_sizes(), vec![2, 1]);
    }

    #[test]
    fn test_block_storage_lives_in_function_segment() {
        let mut dir = FuncDir::new();
        dir.declare_function("f", DataType::Void, 1).unwrap();
        dir.declare_variable("a", DataType::Int).unwrap();
        dir.enter_block();
        let b = dir.declare_variable("b", DataType::Int).unwrap();
        assert_eq!(b.address, Address::new(1, 1));
        dir.leave_block().unwrap();
        dir.leave_function().unwrap();
        assert_eq!(dir.segment_sizes(), vec![0, 2]);
        assert_eq!(dir.block(dir.func(1).block).children.len(), 1);
    }

    #[test]
    fn test_temporaries_are_named_per_type() {
        let mut dir = FuncDir::new();
        let t0 = dir.new_temporary(DataType::Int, None).unwrap();
        let t1 = dir.new_temporary(DataType::Int, None).unwrap();
        let f0 = dir.new_temporary(DataType::GpuFloat, Some(Literal::Float(1.5))).unwrap();
        assert_eq!(t0.name(), "INT_0");
        assert_eq!(t1.name(), "INT_1");
        assert_eq!(f0.name(), "GPU_FLOAT_0");
        assert_ne!(t0.address, t1.address);
        assert_eq!(dir.temporary("GPU_FLOAT_0").unwrap().value, Some(Literal::Float(1.5)));
    }

    #[test]
    fn test_tensor_occupies_product_of_dims() {
        let mut dir = FuncDir::new();
        let t = dir.declare_tensor("m", DataType::Float, &[3, 4]).unwrap();
        assert!(t.is_tensor());
        assert_eq!(t.slots(), 12);
        let next = dir.declare_variable("n", DataType::Int).unwrap();
        assert_eq!(next.address.offset, 12);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_tensor_is_rejected() {
        let mut dir = FuncDir::new();
        let err = dir
            .declare_tensor("m", DataType::Int, &[1 << 32, 1 << 32])
            .unwrap_err();
        assert_eq!(err, Error::StorageOverflow { name: "m".into() });

        // a zero dimension does not hide an unrepresentable one
        let err = dir
            .declare_tensor("z", DataType::Int, &[0, usize::MAX])
            .unwrap_err();
        assert_eq!(err, Error::StorageOverflow { name: "z".into() });

        // nothing was allocated or declared
        assert!(dir.resolve_variable("m").is_err());
        assert_eq!(dir.segment_sizes(), vec![0]);
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_segment_that_cannot_grow_is_rejected() {
        let mut dir = FuncDir::new();
        dir.declare_tensor("big", DataType::Int, &[i64::MAX as usize])
            .unwrap();
        dir.declare_tensor("more", DataType::Int, &[i64::MAX as usize])
            .unwrap();
        let err = dir.declare_tensor("pair", DataType::Int, &[2]).unwrap_err();
        assert_eq!(err, Error::StorageOverflow { name: "pair".into() });

        // the last slot is still free
        let last = dir.declare_variable("x", DataType::Int).unwrap();
        assert_eq!(last.address.offset, usize::MAX - 1);
        assert!(matches!(
            dir.new_temporary(DataType::Int, None),
            Err(Error::StorageOverflow { .. })
        ));
    }

    #[test]
    fn test_unresolved_and_underflow() {
        let mut dir = FuncDir::new();
        assert!(matches!(
            dir.resolve_variable("nope"),
            Err(Error::UnresolvedIdentifier { .. })
        ));
        assert!(matches!(
            dir.resolve_function("nope"),
            Err(Error::UnresolvedFunction { .. })
        ));
        assert_eq!(dir.leave_block(), Err(Error::ScopeUnderflow));
        assert_eq!(dir.leave_function(), Err(Error::ScopeUnderflow));
    }
}
